// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Content codec: structured sections to markup and back.
//!
//! [`ContentCodec::encode`] is total and deterministic: identical sections
//! and SKU identity always produce byte-identical markup, which is what makes
//! republish idempotent. [`ContentCodec::decode`] is partial and heuristic:
//! it recovers whatever sections it can locate by structural marker and never
//! errors on malformed input.
//!
//! The codec has no network or storage dependency. The only external input
//! is the store's public domain, used by the absolute-URL pass.
//!
//! # Example
//!
//! ```
//! use catalog_sync::codec::{ContentCodec, SkuIdentity};
//! use catalog_sync::section::{Section, SectionSet};
//!
//! let codec = ContentCodec::new("https://store.example.com");
//! let sections = SectionSet::from_sections(vec![
//!     Section::features(vec!["Fast".into(), "Light".into()]),
//! ]);
//!
//! let markup = codec.encode(&sections, &SkuIdentity::single("W-100"));
//! assert!(markup.contains("id=\"tab-features\""));
//!
//! let recovered = codec.decode(&markup);
//! assert_eq!(recovered.len(), 1);
//! ```

pub mod detect;
mod decode;
mod encode;
pub mod markup;

use regex::Regex;

use crate::stores::traits::DomainResolver;

use decode::Selectors;
use detect::DetectionPolicy;

/// Identity attribute carried by the root element and every section block.
pub const IDENTITY_ATTR: &str = "data-sku";
/// Class of the root container element.
pub const CONTAINER_CLASS: &str = "product-tabs-wrapper";
/// Class carried by every section block.
pub const TAB_CONTENT_CLASS: &str = "tab-content";
/// Section block ids are `tab-{kind}`.
pub const SECTION_ID_PREFIX: &str = "tab-";

pub(crate) const DEFAULT_CHANNEL_PROMO: &str =
    "Subscribe to our channel for more product videos.";
pub(crate) const VIDEO_PLACEHOLDER_TEXT: &str = "Video coming soon";
pub(crate) const DATASHEET_LINK_TEXT: &str = "Product Datasheet";
pub(crate) const DOC_FULL_LIST_HREF: &str = "/pages/documentation";
pub(crate) const DOC_FULL_LIST_TEXT: &str = "View the full documentation library";
pub(crate) const DEFAULT_CONTAINER_HEADING: &str = "Compatible Container";
pub(crate) const COLLECTION_LINK_TEXT: &str = "Browse the full collection";

/// Product-SKU identity written into generated markup: a single SKU or the
/// comma-joined list of all known variant SKUs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkuIdentity {
    Single(String),
    Variants(Vec<String>),
}

impl SkuIdentity {
    #[must_use]
    pub fn single(sku: impl Into<String>) -> Self {
        Self::Single(sku.into())
    }

    #[must_use]
    pub fn variants(skus: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Variants(skus.into_iter().map(Into::into).collect())
    }

    /// Attribute value form: the SKU, or variants joined with commas.
    #[must_use]
    pub fn attr_value(&self) -> String {
        match self {
            Self::Single(sku) => sku.clone(),
            Self::Variants(skus) => skus.join(","),
        }
    }
}

/// Deterministic serializer and best-effort parser for tab content markup.
pub struct ContentCodec {
    public_domain: String,
    policy: DetectionPolicy,
    relative_url: Regex,
    selectors: Selectors,
}

impl ContentCodec {
    /// Codec for a store with a known public domain
    /// (e.g. `https://store.example.com`, no trailing slash).
    #[must_use]
    pub fn new(public_domain: impl Into<String>) -> Self {
        Self::with_policy(public_domain, DetectionPolicy::default())
    }

    /// Codec carrying the detection policy from the engine configuration.
    #[must_use]
    pub fn from_config(public_domain: impl Into<String>, config: &crate::config::SyncConfig) -> Self {
        Self::with_policy(public_domain, config.detection.clone())
    }

    #[must_use]
    pub fn with_policy(public_domain: impl Into<String>, policy: DetectionPolicy) -> Self {
        let public_domain = public_domain.into().trim_end_matches('/').to_string();
        Self {
            public_domain,
            policy,
            // Site-relative href/src values; protocol-relative (`//`) and
            // absolute URLs are left untouched by the rewrite closure.
            relative_url: Regex::new(r#"(href|src)="(/[^"]*)""#)
                .unwrap_or_else(|e| unreachable!("static regex: {e}")),
            selectors: Selectors::new(),
        }
    }

    /// Codec resolving the domain from a store identifier.
    #[must_use]
    pub fn for_store(
        resolver: &dyn DomainResolver,
        store_id: &str,
        policy: DetectionPolicy,
    ) -> Self {
        Self::with_policy(resolver.public_domain_for(store_id), policy)
    }

    #[must_use]
    pub fn public_domain(&self) -> &str {
        &self.public_domain
    }

    /// Block id for a section kind (`tab-features` etc.).
    #[must_use]
    pub(crate) fn block_id(kind: crate::section::SectionKind) -> String {
        format!("{}{}", SECTION_ID_PREFIX, kind.as_str())
    }
}
