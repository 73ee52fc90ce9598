//! Status record and cache entry types.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Epoch millis now, shared by record stamping and freshness checks.
pub(crate) fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

/// Persisted per-product status: the system of record for "is this fresh
/// enough to skip a remote check".
///
/// Created on first reconciliation, mutated on every reconciliation and on
/// every publish; deleted only when the product itself is deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub product_id: String,
    /// The remote description field is non-empty.
    pub has_remote_content: bool,
    /// Local sections exist, or the remote markup matches this system's
    /// structural markers.
    pub has_recognized_layout: bool,
    /// Unpublished draft edits exist.
    pub has_draft: bool,
    pub section_count: usize,
    /// Epoch millis of the last actual remote sample; 0 if never sampled.
    pub last_remote_check: i64,
}

impl StatusRecord {
    /// Empty record for a product that has never been reconciled.
    #[must_use]
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            has_remote_content: false,
            has_recognized_layout: false,
            has_draft: false,
            section_count: 0,
            last_remote_check: 0,
        }
    }

    /// A recognized published layout and an unpublished draft cannot both be
    /// true; such a record is stale regardless of age and forces a fresh
    /// reconciliation pass.
    #[must_use]
    pub fn is_contradictory(&self) -> bool {
        self.has_recognized_layout && self.has_draft
    }

    /// Whether the last remote sample falls within the freshness window.
    #[must_use]
    pub fn is_fresh(&self, window: Duration) -> bool {
        if self.last_remote_check <= 0 {
            return false;
        }
        let age_ms = now_millis().saturating_sub(self.last_remote_check);
        age_ms >= 0 && (age_ms as u128) < window.as_millis()
    }
}

/// Where a status answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    /// Fresh, non-contradictory persisted record.
    PersistedRecord,
    /// Unexpired in-process cache entry.
    MemoryCache,
    /// Recomputed this call from local stores (and possibly the remote).
    Reconciled,
}

impl std::fmt::Display for StatusSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersistedRecord => write!(f, "record"),
            Self::MemoryCache => write!(f, "memory"),
            Self::Reconciled => write!(f, "reconciled"),
        }
    }
}

/// Point-in-time status answer returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductStatus {
    pub product_id: String,
    pub has_remote_content: bool,
    pub has_recognized_layout: bool,
    pub has_draft: bool,
    pub section_count: usize,
    pub source: StatusSource,
}

impl ProductStatus {
    pub(crate) fn from_record(record: &StatusRecord, source: StatusSource) -> Self {
        Self {
            product_id: record.product_id.clone(),
            has_remote_content: record.has_remote_content,
            has_recognized_layout: record.has_recognized_layout,
            has_draft: record.has_draft,
            section_count: record.section_count,
            source,
        }
    }
}

/// In-process cache entry: a pure performance optimization with no authority.
#[derive(Debug, Clone)]
pub(crate) struct MemoryEntry {
    pub record: StatusRecord,
    pub inserted_at: Instant,
}

impl MemoryEntry {
    pub fn new(record: StatusRecord) -> Self {
        Self { record, inserted_at: Instant::now() }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() >= ttl
    }
}
