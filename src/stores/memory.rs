//! In-memory collaborator stores backed by `DashMap`.
//!
//! Used for embedding the engine without external storage and throughout the
//! test suite. Each store implements the corresponding trait from
//! [`super::traits`].

use async_trait::async_trait;
use dashmap::DashMap;

use crate::section::Section;
use crate::status::record::StatusRecord;

use super::traits::{DraftStore, LocalContentStore, StatusStore, StoreError};

/// In-memory locally-saved content, keyed by product id.
#[derive(Default)]
pub struct InMemoryContentStore {
    data: DashMap<String, Vec<Section>>,
}

impl InMemoryContentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the saved sections for a product.
    pub fn set_sections(&self, product_id: &str, sections: Vec<Section>) {
        self.data.insert(product_id.to_string(), sections);
    }

    pub fn remove(&self, product_id: &str) {
        self.data.remove(product_id);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl LocalContentStore for InMemoryContentStore {
    async fn sections_for(&self, product_id: &str) -> Result<Vec<Section>, StoreError> {
        Ok(self
            .data
            .get(product_id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }
}

/// In-memory unpublished drafts, keyed by product id.
#[derive(Default)]
pub struct InMemoryDraftStore {
    data: DashMap<String, Vec<Section>>,
}

impl InMemoryDraftStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sections(&self, product_id: &str, sections: Vec<Section>) {
        self.data.insert(product_id.to_string(), sections);
    }

    #[must_use]
    pub fn has_draft(&self, product_id: &str) -> bool {
        self.data
            .get(product_id)
            .map(|r| !r.value().is_empty())
            .unwrap_or(false)
    }
}

#[async_trait]
impl DraftStore for InMemoryDraftStore {
    async fn sections_for(&self, product_id: &str) -> Result<Vec<Section>, StoreError> {
        Ok(self
            .data
            .get(product_id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }

    async fn clear_for(&self, product_id: &str) -> Result<(), StoreError> {
        self.data.remove(product_id);
        Ok(())
    }
}

/// In-memory status record tier.
///
/// Persisted deployments use [`super::sql::SqlStatusStore`] instead; this
/// keeps the same contract without durability.
#[derive(Default)]
pub struct InMemoryStatusStore {
    data: DashMap<String, StatusRecord>,
}

impl InMemoryStatusStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn load(&self, product_id: &str) -> Result<Option<StatusRecord>, StoreError> {
        Ok(self.data.get(product_id).map(|r| r.value().clone()))
    }

    async fn save(&self, record: &StatusRecord) -> Result<(), StoreError> {
        self.data.insert(record.product_id.clone(), record.clone());
        Ok(())
    }

    async fn invalidate(&self, product_id: &str) -> Result<(), StoreError> {
        self.data.remove(product_id);
        Ok(())
    }
}
