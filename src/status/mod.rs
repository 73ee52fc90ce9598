// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Status reconciliation across the local stores, the persisted status tier,
//! and the remote catalog.
//!
//! A product's status answers four questions: does the remote description
//! have content, is that content this system's layout, are there unpublished
//! draft edits, and how many sections exist. Computing that naively would
//! cost a remote read per product per question, which the shared rate limit
//! cannot afford; the [`StatusReconciler`] answers from two cache tiers and
//! only samples the remote when local knowledge cannot decide.
//!
//! Resolution order per product:
//!
//! 1. Persisted [`StatusRecord`], if fresh and non-contradictory. The record
//!    is the system of record for "fresh enough to skip a remote check".
//! 2. In-process memory cache (short TTL). Pure optimization, no authority;
//!    consulted only when the record is absent or expired.
//! 3. Full reconciliation: local sections, draft store, and a remote sample
//!    through the request channel when local content is absent. The result
//!    is written back to both tiers.
//!
//! A record claiming both a recognized published layout and an unpublished
//! draft is contradictory. It is treated as stale regardless of age, and the
//! fresh pass resolves it: publication supersedes drafts, so the draft flag
//! is dropped and the draft store is cleared for that product.
//!
//! `status()` never errors. When the remote is unreachable the pass degrades
//! to local knowledge plus the stale record, and the degraded answer is kept
//! out of the persisted tier so the next pass samples again.

pub mod record;

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::channel::{Priority, RequestChannel};
use crate::codec::ContentCodec;
use crate::config::SyncConfig;
use crate::section::Section;
use crate::stores::traits::{DraftStore, LocalContentStore, RemoteError, StatusStore, StoreError};

use record::{now_millis, MemoryEntry};
pub use record::{ProductStatus, StatusRecord, StatusSource};

/// Per-call resolution options.
#[derive(Debug, Clone, Copy)]
pub struct StatusQuery {
    /// Bypass both cache tiers and sample the remote unconditionally.
    pub force_remote: bool,
    /// Priority for any remote read this resolution issues.
    pub priority: Priority,
}

impl Default for StatusQuery {
    fn default() -> Self {
        Self { force_remote: false, priority: Priority::Normal }
    }
}

/// Tiered status resolution for catalog products.
pub struct StatusReconciler {
    channel: Arc<RequestChannel>,
    codec: Arc<ContentCodec>,
    content: Arc<dyn LocalContentStore>,
    drafts: Arc<dyn DraftStore>,
    records: Arc<dyn StatusStore>,
    memory: DashMap<String, MemoryEntry>,
    fresh_window: Duration,
    memory_ttl: Duration,
    batch_group_size: usize,
    batch_group_pause: Duration,
}

impl StatusReconciler {
    pub fn new(
        config: &SyncConfig,
        channel: Arc<RequestChannel>,
        codec: Arc<ContentCodec>,
        content: Arc<dyn LocalContentStore>,
        drafts: Arc<dyn DraftStore>,
        records: Arc<dyn StatusStore>,
    ) -> Self {
        Self {
            channel,
            codec,
            content,
            drafts,
            records,
            memory: DashMap::new(),
            fresh_window: Duration::from_secs(config.status_fresh_secs),
            memory_ttl: Duration::from_secs(config.memory_ttl_secs),
            batch_group_size: config.batch_group_size.max(1),
            batch_group_pause: Duration::from_millis(config.batch_group_pause_ms),
        }
    }

    /// Resolve a product's status with default options.
    pub async fn status(&self, product_id: &str) -> ProductStatus {
        self.status_with(product_id, StatusQuery::default()).await
    }

    /// Resolve a product's status. Infallible: failures along the way narrow
    /// the answer instead of surfacing.
    #[tracing::instrument(skip(self, query), level = "debug")]
    pub async fn status_with(&self, product_id: &str, query: StatusQuery) -> ProductStatus {
        let started = Instant::now();
        let status = self.resolve(product_id, query).await;

        crate::metrics::record_status_latency(started.elapsed());
        crate::metrics::record_status_resolution(&status.source.to_string());
        debug!(
            product_id,
            source = %status.source,
            has_remote_content = status.has_remote_content,
            has_recognized_layout = status.has_recognized_layout,
            has_draft = status.has_draft,
            section_count = status.section_count,
            "Status resolved"
        );
        status
    }

    /// Resolve many products. Ids are reconciled in small parallel groups
    /// with a pause between groups so a large sweep never floods the
    /// request queue.
    ///
    /// Returns one answer per input id, in input order. Each
    /// [`ProductStatus`] carries its `product_id`, so callers wanting an
    /// id-keyed map can collect the pairs directly; the `Vec` shape is kept
    /// because it also preserves the input ordering.
    pub async fn batch_status(&self, product_ids: &[String]) -> Vec<ProductStatus> {
        let query = StatusQuery { force_remote: false, priority: Priority::Background };
        let mut results = Vec::with_capacity(product_ids.len());

        for (index, group) in product_ids.chunks(self.batch_group_size).enumerate() {
            if index > 0 && !self.batch_group_pause.is_zero() {
                tokio::time::sleep(self.batch_group_pause).await;
            }
            let group_results = futures::future::join_all(
                group.iter().map(|id| self.status_with(id, query)),
            )
            .await;
            results.extend(group_results);
        }
        results
    }

    /// Record a successful publication.
    ///
    /// The publish itself already proved what the status is, so both tiers
    /// are overwritten unconditionally: remote content present, layout
    /// recognized, drafts superseded and cleared. Store failures are logged
    /// and do not fail the publish they follow.
    pub async fn on_publish(&self, product_id: &str) {
        let section_count = match self.content.sections_for(product_id).await {
            Ok(sections) => sections.len(),
            Err(StoreError::NotFound) => 0,
            Err(err) => {
                warn!(product_id, %err, "Content read failed after publish, recording zero sections");
                0
            }
        };

        if let Err(err) = self.drafts.clear_for(product_id).await {
            warn!(product_id, %err, "Draft clear failed after publish");
        }

        let record = StatusRecord {
            product_id: product_id.to_string(),
            has_remote_content: true,
            has_recognized_layout: true,
            has_draft: false,
            section_count,
            last_remote_check: now_millis(),
        };
        if let Err(err) = self.records.save(&record).await {
            warn!(product_id, %err, "Status record write failed after publish");
        }
        self.memory.insert(product_id.to_string(), MemoryEntry::new(record));
        info!(product_id, section_count, "Publish recorded in status tiers");
    }

    /// Drop both cache tiers for a product (e.g. after out-of-band edits).
    pub async fn invalidate(&self, product_id: &str) -> Result<(), StoreError> {
        self.memory.remove(product_id);
        self.records.invalidate(product_id).await
    }

    async fn resolve(&self, product_id: &str, query: StatusQuery) -> ProductStatus {
        let prior = match self.records.load(product_id).await {
            Ok(prior) => prior,
            Err(StoreError::NotFound) => None,
            Err(err) => {
                warn!(product_id, %err, "Status record read failed, reconciling without it");
                None
            }
        };

        if !query.force_remote {
            // A contradictory record is stale regardless of age and skips
            // straight to the fresh pass.
            if prior.as_ref().is_some_and(|r| r.is_contradictory()) {
                debug!(product_id, "Contradictory status record, forcing reconciliation");
            } else {
                if let Some(prior) = &prior {
                    if prior.is_fresh(self.fresh_window) {
                        self.memory
                            .insert(product_id.to_string(), MemoryEntry::new(prior.clone()));
                        return ProductStatus::from_record(prior, StatusSource::PersistedRecord);
                    }
                }
                if let Some(entry) = self.memory.get(product_id) {
                    if !entry.is_expired(self.memory_ttl) && !entry.record.is_contradictory() {
                        return ProductStatus::from_record(
                            &entry.record,
                            StatusSource::MemoryCache,
                        );
                    }
                }
            }
        }

        self.reconcile(product_id, prior, query).await
    }

    async fn reconcile(
        &self,
        product_id: &str,
        prior: Option<StatusRecord>,
        query: StatusQuery,
    ) -> ProductStatus {
        let local =
            sections_or_empty(self.content.sections_for(product_id).await, "content", product_id);
        let drafts =
            sections_or_empty(self.drafts.sections_for(product_id).await, "drafts", product_id);

        // Carried forward when this pass does not (or cannot) sample.
        let mut has_remote_content = prior.as_ref().is_some_and(|r| r.has_remote_content);
        let mut remote_recognized = prior.as_ref().is_some_and(|r| r.has_recognized_layout);
        let mut remote_section_estimate = 0;
        let mut sampled = false;
        let mut degraded = false;

        // Local sections already decide recognition and count; only a product
        // with nothing local needs the remote sample.
        if query.force_remote || local.is_empty() {
            match self.channel.get_description(product_id, query.priority).await {
                Ok(markup) => {
                    sampled = true;
                    has_remote_content = !markup.trim().is_empty();
                    let detection = self.codec.detect_layout(&markup);
                    remote_recognized = detection.recognized;
                    remote_section_estimate = detection.section_count;
                }
                Err(RemoteError::NotFound) => {
                    sampled = true;
                    has_remote_content = false;
                    remote_recognized = false;
                }
                Err(err) => {
                    degraded = true;
                    warn!(product_id, %err, "Remote sample failed, answering from local knowledge");
                    crate::metrics::record_degraded_pass("remote_unavailable");
                }
            }
        }

        let has_recognized_layout = !local.is_empty() || remote_recognized;

        let has_draft = if !drafts.is_empty() && has_recognized_layout {
            // Publication supersedes drafts; a draft alongside a recognized
            // layout is leftover state, not pending work.
            crate::metrics::record_contradiction_resolved();
            info!(product_id, "Draft superseded by recognized layout, clearing");
            if let Err(err) = self.drafts.clear_for(product_id).await {
                warn!(product_id, %err, "Draft clear failed during reconciliation");
            }
            false
        } else {
            !drafts.is_empty()
        };

        let section_count = if !local.is_empty() {
            local.len()
        } else if sampled && remote_section_estimate > 0 {
            remote_section_estimate
        } else if has_draft {
            drafts.len()
        } else if degraded {
            prior.as_ref().map_or(0, |r| r.section_count)
        } else {
            0
        };

        let record = StatusRecord {
            product_id: product_id.to_string(),
            has_remote_content,
            has_recognized_layout,
            has_draft,
            section_count,
            // Zero marks "never actually sampled"; a pass answered from
            // local knowledge alone must not look remote-fresh later.
            last_remote_check: if sampled {
                now_millis()
            } else {
                prior.as_ref().map_or(0, |r| r.last_remote_check)
            },
        };

        // A degraded answer stays out of the persisted tier so the next
        // pass samples again; the memory entry absorbs immediate repeats.
        if !degraded {
            if let Err(err) = self.records.save(&record).await {
                warn!(product_id, %err, "Status record write failed");
            }
        }
        self.memory.insert(product_id.to_string(), MemoryEntry::new(record.clone()));

        ProductStatus::from_record(&record, StatusSource::Reconciled)
    }

}

/// Local-tier reads never fail a resolution; a broken store reads as empty.
fn sections_or_empty(
    result: Result<Vec<Section>, StoreError>,
    tier: &str,
    product_id: &str,
) -> Vec<Section> {
    match result {
        Ok(sections) => sections,
        Err(StoreError::NotFound) => Vec::new(),
        Err(err) => {
            warn!(product_id, tier, %err, "Local read failed, treating as empty");
            Vec::new()
        }
    }
}
