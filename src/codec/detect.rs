//! Structural-marker detection for remote markup.
//!
//! A lighter check than full decode: string-level scans that answer "is this
//! description one of ours" and estimate the section count without building a
//! DOM. Used by reconciliation, which may run over thousands of products.

use serde::Deserialize;

use crate::section::SectionKind;

use super::{ContentCodec, CONTAINER_CLASS, IDENTITY_ATTR, TAB_CONTENT_CLASS};

/// Which markers count toward recognizing a layout as self-generated.
///
/// The default is the narrowest rule: the identity attribute must be present
/// AND at least one structural marker (container class, tab-content class, or
/// a known section id). Broader or narrower variants are configuration, not
/// code.
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionPolicy {
    /// Require the identity attribute on top of a structural marker.
    #[serde(default = "default_true")]
    pub require_identity_attr: bool,
    /// Accept the root container class as a structural marker.
    #[serde(default = "default_true")]
    pub accept_container_class: bool,
    /// Accept the per-block tab-content class as a structural marker.
    #[serde(default = "default_true")]
    pub accept_tab_content: bool,
    /// Accept any known section id as a structural marker.
    #[serde(default = "default_true")]
    pub accept_section_ids: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DetectionPolicy {
    fn default() -> Self {
        Self {
            require_identity_attr: true,
            accept_container_class: true,
            accept_tab_content: true,
            accept_section_ids: true,
        }
    }
}

/// Result of a structural-marker scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutDetection {
    /// The markup matches this system's structural markers under the policy.
    pub recognized: bool,
    /// Number of known section ids found (estimate of section count).
    pub section_count: usize,
}

impl ContentCodec {
    /// Scan markup for this system's structural markers.
    ///
    /// Never errors; unrecognizable or empty input yields
    /// `{recognized: false, section_count: 0}`.
    #[must_use]
    pub fn detect_layout(&self, markup: &str) -> LayoutDetection {
        detect_with_policy(markup, &self.policy)
    }
}

pub(crate) fn detect_with_policy(markup: &str, policy: &DetectionPolicy) -> LayoutDetection {
    let section_count = SectionKind::ALL
        .iter()
        .filter(|kind| markup.contains(&format!("id=\"{}\"", ContentCodec::block_id(**kind))))
        .count();

    let has_identity = markup.contains(&format!("{}=\"", IDENTITY_ATTR));
    let has_structural = (policy.accept_container_class && markup.contains(CONTAINER_CLASS))
        || (policy.accept_tab_content && markup.contains(TAB_CONTENT_CLASS))
        || (policy.accept_section_ids && section_count > 0);

    let recognized = has_structural && (has_identity || !policy.require_identity_attr);

    LayoutDetection { recognized, section_count }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> ContentCodec {
        ContentCodec::new("https://store.example.com")
    }

    #[test]
    fn test_empty_markup_not_recognized() {
        let detection = codec().detect_layout("");
        assert!(!detection.recognized);
        assert_eq!(detection.section_count, 0);
    }

    #[test]
    fn test_foreign_markup_not_recognized() {
        let detection = codec().detect_layout("<p>Hand-written description.</p>");
        assert!(!detection.recognized);
    }

    #[test]
    fn test_marker_without_identity_not_recognized_by_default() {
        let markup = r#"<div class="product-tabs-wrapper"><p>x</p></div>"#;
        assert!(!codec().detect_layout(markup).recognized);
    }

    #[test]
    fn test_identity_without_marker_not_recognized() {
        let markup = r#"<div data-sku="W-100"><p>x</p></div>"#;
        assert!(!codec().detect_layout(markup).recognized);
    }

    #[test]
    fn test_identity_plus_any_marker_recognized() {
        let by_container =
            r#"<div class="product-tabs-wrapper" data-sku="W-100"></div>"#;
        let by_tab_class = r#"<div data-sku="W-100"><div class="tab-content"></div></div>"#;
        let by_section_id = r#"<div data-sku="W-100"><div id="tab-features"></div></div>"#;

        for markup in [by_container, by_tab_class, by_section_id] {
            assert!(codec().detect_layout(markup).recognized, "markup: {markup}");
        }
    }

    #[test]
    fn test_section_count_estimate() {
        let markup = r#"
            <div class="product-tabs-wrapper" data-sku="W-100">
                <div id="tab-description"></div>
                <div id="tab-features"></div>
                <div id="tab-specifications"></div>
            </div>"#;
        let detection = codec().detect_layout(markup);
        assert!(detection.recognized);
        assert_eq!(detection.section_count, 3);
    }

    #[test]
    fn test_relaxed_policy_recognizes_without_identity() {
        let policy = DetectionPolicy { require_identity_attr: false, ..Default::default() };
        let codec = ContentCodec::with_policy("https://store.example.com", policy);
        let markup = r#"<div class="product-tabs-wrapper"></div>"#;
        assert!(codec.detect_layout(markup).recognized);
    }

    #[test]
    fn test_policy_can_narrow_markers() {
        let policy = DetectionPolicy {
            accept_container_class: false,
            accept_tab_content: false,
            ..Default::default()
        };
        let codec = ContentCodec::with_policy("https://store.example.com", policy);

        let container_only =
            r#"<div class="product-tabs-wrapper" data-sku="W-100"></div>"#;
        assert!(!codec.detect_layout(container_only).recognized);

        let with_section = r#"<div data-sku="W-100"><div id="tab-videos"></div></div>"#;
        assert!(codec.detect_layout(with_section).recognized);
    }
}
