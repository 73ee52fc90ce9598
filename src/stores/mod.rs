//! Collaborator seams: local content, drafts, the remote catalog, the
//! persisted status tier, and domain resolution.
//!
//! The engine depends on these only through the traits in [`traits`];
//! [`memory`] provides embeddable in-memory implementations and [`sql`]
//! the durable status tier.

pub mod memory;
pub mod sql;
pub mod traits;

use std::sync::Arc;

use crate::config::SyncConfig;

pub use memory::{InMemoryContentStore, InMemoryDraftStore, InMemoryStatusStore};
pub use sql::SqlStatusStore;
pub use traits::{
    DomainResolver, DraftStore, FixedDomainResolver, LocalContentStore, RemoteCatalog,
    RemoteError, StatusStore, StoreError, SubdomainResolver,
};

/// Build the status-record tier named by the configuration: the durable SQL
/// store when `status_db_url` is set, the in-memory tier otherwise.
pub async fn status_store_for(config: &SyncConfig) -> Result<Arc<dyn StatusStore>, StoreError> {
    match &config.status_db_url {
        Some(url) => Ok(Arc::new(SqlStatusStore::new(url).await?)),
        None => Ok(Arc::new(InMemoryStatusStore::new())),
    }
}
