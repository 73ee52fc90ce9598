//! Structured product content sections.
//!
//! A [`Section`] is one named content block for a product (features list,
//! spec table, video embed, ...). Sections are immutable value objects keyed
//! by [`SectionKind`]; a [`SectionSet`] holds at most one section per kind.
//!
//! # Example
//!
//! ```
//! use catalog_sync::section::{Section, SectionSet, SectionKind};
//!
//! let mut set = SectionSet::new();
//! set.insert(Section::features(vec!["Fast".into(), "Light".into()]));
//! set.insert(Section::features(vec!["Replaced".into()]));
//!
//! // Inserting a second section of the same kind replaces the first.
//! assert_eq!(set.len(), 1);
//! assert!(set.get(SectionKind::Features).is_some());
//! ```

use serde::{Deserialize, Serialize};

/// The fixed enumeration of content block kinds.
///
/// The string form of each kind doubles as its structural marker in generated
/// markup (`id="tab-features"` etc.), so the spelling here is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Description,
    Features,
    Applications,
    Specifications,
    Videos,
    Documentation,
    SafetyGuidelines,
    SkuNomenclature,
    CompatibleContainer,
    SterilizationMethod,
}

impl SectionKind {
    /// All kinds, in no particular order. Use [`SectionKind::render_order`]
    /// for display/encode ordering.
    pub const ALL: [SectionKind; 10] = [
        Self::Description,
        Self::Features,
        Self::Applications,
        Self::Specifications,
        Self::Videos,
        Self::Documentation,
        Self::SafetyGuidelines,
        Self::SkuNomenclature,
        Self::CompatibleContainer,
        Self::SterilizationMethod,
    ];

    /// Fixed rendering order: primary group, then the additional group,
    /// then the secondary group. Independent of edit order.
    #[must_use]
    pub fn render_order() -> &'static [SectionKind; 10] {
        &[
            // Primary group
            Self::Description,
            Self::Features,
            Self::Applications,
            Self::Specifications,
            Self::Videos,
            Self::Documentation,
            // Additional group
            Self::SafetyGuidelines,
            Self::SkuNomenclature,
            Self::CompatibleContainer,
            // Secondary group
            Self::SterilizationMethod,
        ]
    }

    /// Marker string used in ids/classes (`"features"`, `"sku-nomenclature"`, ...).
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Features => "features",
            Self::Applications => "applications",
            Self::Specifications => "specifications",
            Self::Videos => "videos",
            Self::Documentation => "documentation",
            Self::SafetyGuidelines => "safety-guidelines",
            Self::SkuNomenclature => "sku-nomenclature",
            Self::CompatibleContainer => "compatible-container",
            Self::SterilizationMethod => "sterilization-method",
        }
    }

    /// Parse a marker string back into a kind.
    #[must_use]
    pub fn from_marker(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.as_str() == s)
    }

    /// Whether this kind's payload is a plain ordered list of strings.
    #[must_use]
    pub fn is_text_list(&self) -> bool {
        matches!(
            self,
            Self::Features | Self::Applications | Self::SafetyGuidelines | Self::SterilizationMethod
        )
    }
}

impl std::fmt::Display for SectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An image reference (url + alt text) used in logo grids and galleries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Logo {
    pub url: String,
    #[serde(default)]
    pub alt: String,
}

/// One row of the specifications table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecRow {
    pub item: String,
    pub value: String,
}

/// A documentation hyperlink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocLink {
    pub href: String,
    pub text: String,
}

/// One code/description component of the SKU nomenclature block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuComponent {
    pub code: String,
    #[serde(default)]
    pub description: String,
    /// Optional per-component image gallery.
    #[serde(default)]
    pub gallery: Vec<Logo>,
}

/// One linked item in the compatible-container grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerItem {
    #[serde(default)]
    pub image: Option<String>,
    pub title: String,
    pub url: String,
    /// Optional type/handle line shown under the title.
    #[serde(default)]
    pub type_line: Option<String>,
}

/// Free-text description with optional title and logo grid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionContent {
    #[serde(default)]
    pub title: String,
    /// Free text; paragraphs are separated by blank lines.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub logos: Vec<Logo>,
}

/// Video embed plus channel promotion line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoContent {
    #[serde(default)]
    pub url: Option<String>,
    /// Custom channel-promotion text; a fixed default is used when absent.
    #[serde(default)]
    pub channel_text: Option<String>,
}

/// Datasheet and additional documentation links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentationContent {
    #[serde(default)]
    pub datasheet_url: Option<String>,
    #[serde(default)]
    pub links: Vec<DocLink>,
}

/// SKU nomenclature breakdown: heading, images, and code components.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkuNomenclatureContent {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub main_image: Option<Logo>,
    #[serde(default)]
    pub gallery: Vec<Logo>,
    #[serde(default)]
    pub components: Vec<SkuComponent>,
}

/// Compatible-container grid or collection link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibleContainerContent {
    #[serde(default)]
    pub heading: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub items: Vec<ContainerItem>,
    /// Used for a single collection link when no items are present.
    #[serde(default)]
    pub collection_handle: Option<String>,
}

/// Kind-specific structured payload of a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionPayload {
    Description(DescriptionContent),
    /// Ordered list of strings (features, applications, safety guidelines,
    /// sterilization methods).
    TextList(Vec<String>),
    Specifications(Vec<SpecRow>),
    Videos(VideoContent),
    Documentation(DocumentationContent),
    SkuNomenclature(SkuNomenclatureContent),
    CompatibleContainer(CompatibleContainerContent),
}

/// One named content block for a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub kind: SectionKind,
    pub payload: SectionPayload,
}

impl Section {
    pub fn description(content: DescriptionContent) -> Self {
        Self { kind: SectionKind::Description, payload: SectionPayload::Description(content) }
    }

    pub fn features(items: Vec<String>) -> Self {
        Self { kind: SectionKind::Features, payload: SectionPayload::TextList(items) }
    }

    pub fn applications(items: Vec<String>) -> Self {
        Self { kind: SectionKind::Applications, payload: SectionPayload::TextList(items) }
    }

    pub fn safety_guidelines(items: Vec<String>) -> Self {
        Self { kind: SectionKind::SafetyGuidelines, payload: SectionPayload::TextList(items) }
    }

    pub fn sterilization_method(items: Vec<String>) -> Self {
        Self { kind: SectionKind::SterilizationMethod, payload: SectionPayload::TextList(items) }
    }

    pub fn specifications(rows: Vec<SpecRow>) -> Self {
        Self { kind: SectionKind::Specifications, payload: SectionPayload::Specifications(rows) }
    }

    pub fn videos(content: VideoContent) -> Self {
        Self { kind: SectionKind::Videos, payload: SectionPayload::Videos(content) }
    }

    pub fn documentation(content: DocumentationContent) -> Self {
        Self { kind: SectionKind::Documentation, payload: SectionPayload::Documentation(content) }
    }

    pub fn sku_nomenclature(content: SkuNomenclatureContent) -> Self {
        Self { kind: SectionKind::SkuNomenclature, payload: SectionPayload::SkuNomenclature(content) }
    }

    pub fn compatible_container(content: CompatibleContainerContent) -> Self {
        Self {
            kind: SectionKind::CompatibleContainer,
            payload: SectionPayload::CompatibleContainer(content),
        }
    }
}

/// A product's sections, keyed by kind (at most one per kind).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionSet {
    sections: std::collections::BTreeMap<SectionKind, Section>,
}

impl SectionSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from a list of sections. Later duplicates of a kind
    /// replace earlier ones.
    #[must_use]
    pub fn from_sections(sections: impl IntoIterator<Item = Section>) -> Self {
        let mut set = Self::new();
        for section in sections {
            set.insert(section);
        }
        set
    }

    /// Insert a section, replacing any existing section of the same kind.
    /// Returns the replaced section, if any.
    pub fn insert(&mut self, section: Section) -> Option<Section> {
        self.sections.insert(section.kind, section)
    }

    #[must_use]
    pub fn get(&self, kind: SectionKind) -> Option<&Section> {
        self.sections.get(&kind)
    }

    #[must_use]
    pub fn contains(&self, kind: SectionKind) -> bool {
        self.sections.contains_key(&kind)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Sections in the fixed rendering order (primary group, additional
    /// group, secondary group). Pure and idempotent: ordering an already
    /// ordered set yields the same sequence.
    pub fn ordered(&self) -> impl Iterator<Item = &Section> {
        SectionKind::render_order()
            .iter()
            .filter_map(move |kind| self.sections.get(kind))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Section> {
        self.sections.values()
    }
}
