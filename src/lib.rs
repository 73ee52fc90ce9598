// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! # Catalog Sync
//!
//! A content synchronization and status engine for publishing structured
//! product content into a rate-limited e-commerce catalog.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Section Model                          │
//! │  • Typed content blocks (features, specs, videos, ...)     │
//! │  • At most one section per kind, fixed render order        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Content Codec                          │
//! │  • Deterministic encode: sections → markup                 │
//! │  • Best-effort decode: markup → sections, never errors    │
//! │  • Absolute-URL rewrite against the store's public domain  │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Request Channel                          │
//! │  • Single worker, priority queue, FIFO within a level      │
//! │  • Minimum inter-request spacing                           │
//! │  • Throttle absorbed: head re-queue + backoff              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Status Reconciler                         │
//! │  • Memory cache (short TTL) → persisted record → remote    │
//! │  • Contradiction repair: publish supersedes drafts         │
//! │  • Degrades to local knowledge when the remote is down     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use catalog_sync::{
//!     ContentCodec, Priority, RequestChannel, Section, SectionSet, SkuIdentity,
//!     StatusReconciler, SyncConfig,
//! };
//! use catalog_sync::stores::{InMemoryContentStore, InMemoryDraftStore, InMemoryStatusStore};
//! # use catalog_sync::RemoteCatalog;
//!
//! # async fn example(remote: Arc<dyn RemoteCatalog>) {
//! let config = SyncConfig::default();
//! let channel = RequestChannel::new(remote, &config);
//! let codec = Arc::new(ContentCodec::new("https://store.example.com"));
//!
//! let content = Arc::new(InMemoryContentStore::new());
//! let drafts = Arc::new(InMemoryDraftStore::new());
//! let records = Arc::new(InMemoryStatusStore::new());
//! let reconciler = StatusReconciler::new(
//!     &config, channel.clone(), codec.clone(), content.clone(), drafts, records,
//! );
//!
//! // Publish: encode the saved sections and write them remotely.
//! let sections = SectionSet::from_sections(vec![
//!     Section::features(vec!["Fast".into(), "Light".into()]),
//! ]);
//! let markup = codec.encode(&sections, &SkuIdentity::single("W-100"));
//! channel
//!     .set_description("prod-1", &markup, Priority::Interactive)
//!     .await
//!     .expect("publish");
//! reconciler.on_publish("prod-1").await;
//!
//! // Status answers come from the cache tiers, not the remote.
//! let status = reconciler.status("prod-1").await;
//! assert!(status.has_recognized_layout);
//! # }
//! ```
//!
//! ## Features
//!
//! - **Rate-limit discipline**: every remote call funnels through one
//!   spaced, priority-ordered request stream
//! - **Invisible throttle recovery**: throttled requests retry at the queue
//!   head; callers only see latency
//! - **Deterministic publishing**: identical content encodes to identical
//!   markup, making republish idempotent
//! - **Tiered status**: in-process cache and a persisted record tier keep
//!   status reads off the remote API
//! - **Self-repair**: contradictory cached state forces a fresh pass and
//!   clears superseded drafts
//!
//! ## Configuration
//!
//! See [`SyncConfig`] for all configuration options.
//!
//! ## Modules
//!
//! - [`section`]: Typed content sections and the [`SectionSet`] container
//! - [`codec`]: [`ContentCodec`] encode/decode and layout detection
//! - [`channel`]: The rate-limited [`RequestChannel`]
//! - [`status`]: The tiered [`StatusReconciler`]
//! - [`stores`]: Collaborator traits plus in-memory and SQL implementations

pub mod channel;
pub mod codec;
pub mod config;
pub mod metrics;
pub mod section;
pub mod status;
pub mod stores;

pub use channel::{ChannelStatus, Priority, RemoteRequest, RemoteResponse, RequestChannel};
pub use codec::detect::{DetectionPolicy, LayoutDetection};
pub use codec::{ContentCodec, SkuIdentity};
pub use config::SyncConfig;
pub use section::{Section, SectionKind, SectionPayload, SectionSet};
pub use status::{ProductStatus, StatusQuery, StatusReconciler, StatusRecord, StatusSource};
pub use stores::traits::{
    DomainResolver, DraftStore, FixedDomainResolver, LocalContentStore, RemoteCatalog,
    RemoteError, StatusStore, StoreError, SubdomainResolver,
};
pub use stores::SqlStatusStore;
