use async_trait::async_trait;
use thiserror::Error;

use crate::section::Section;
use crate::status::record::StatusRecord;

/// Errors from local collaborator stores (content, drafts, status records).
///
/// Inside reconciliation these are logged and treated as "no data from this
/// source"; they never propagate to `status()` callers.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Errors from the remote catalog service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The remote signaled rate-limiting. Retried internally by the request
    /// channel; direct callers never observe this except as added latency.
    #[error("remote rate limit exceeded")]
    Throttled,
    /// The product does not exist remotely.
    #[error("product not found in remote catalog")]
    NotFound,
    /// Any other remote failure (validation, transport, ...). Surfaced once
    /// to the submitting caller, never retried.
    #[error("remote catalog unavailable: {0}")]
    Unavailable(String),
}

/// Read-only access to content explicitly saved locally for a product.
#[async_trait]
pub trait LocalContentStore: Send + Sync {
    async fn sections_for(&self, product_id: &str) -> Result<Vec<Section>, StoreError>;
}

/// Unpublished draft edits for a product. The engine reads drafts and clears
/// them when publication supersedes them.
#[async_trait]
pub trait DraftStore: Send + Sync {
    async fn sections_for(&self, product_id: &str) -> Result<Vec<Section>, StoreError>;

    /// Delete all draft sections for a product.
    async fn clear_for(&self, product_id: &str) -> Result<(), StoreError>;
}

/// The remote catalog's single rich-text description field.
///
/// Invoked only through the request channel, never directly.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    async fn get_description(&self, product_id: &str) -> Result<String, RemoteError>;
    async fn set_description(&self, product_id: &str, markup: &str) -> Result<(), RemoteError>;
}

/// Persisted status records (the longer-TTL cache tier).
#[async_trait]
pub trait StatusStore: Send + Sync {
    async fn load(&self, product_id: &str) -> Result<Option<StatusRecord>, StoreError>;
    async fn save(&self, record: &StatusRecord) -> Result<(), StoreError>;
    async fn invalidate(&self, product_id: &str) -> Result<(), StoreError>;
}

/// Resolves a store identifier to its public domain, used by the codec's
/// absolute-URL pass.
pub trait DomainResolver: Send + Sync {
    /// Public base URL for the store, without a trailing slash
    /// (e.g. `https://store.example.com`).
    fn public_domain_for(&self, store_id: &str) -> String;
}

/// Resolver for stores reachable under a shared base domain
/// (`https://{store_id}.{base}`).
#[derive(Debug, Clone)]
pub struct SubdomainResolver {
    base: String,
}

impl SubdomainResolver {
    #[must_use]
    pub fn new(base: impl Into<String>) -> Self {
        Self { base: base.into() }
    }
}

impl DomainResolver for SubdomainResolver {
    fn public_domain_for(&self, store_id: &str) -> String {
        // Already-qualified identifiers pass through.
        if store_id.contains('.') {
            format!("https://{}", store_id.trim_end_matches('/'))
        } else {
            format!("https://{}.{}", store_id, self.base)
        }
    }
}

/// Resolver that always returns one fixed domain, for single-store
/// deployments and tests.
#[derive(Debug, Clone)]
pub struct FixedDomainResolver {
    domain: String,
}

impl FixedDomainResolver {
    #[must_use]
    pub fn new(domain: impl Into<String>) -> Self {
        let domain = domain.into();
        Self { domain: domain.trim_end_matches('/').to_string() }
    }
}

impl DomainResolver for FixedDomainResolver {
    fn public_domain_for(&self, _store_id: &str) -> String {
        self.domain.clone()
    }
}
