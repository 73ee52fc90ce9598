//! Best-effort recovery of sections from published markup.
//!
//! Decode is the inverse of encode only for content the encoder produced;
//! for anything else it degrades to recovering whatever blocks it can locate
//! by structural marker. It never errors: unparseable input yields an empty
//! set, a damaged block yields a section with whatever fields survived.

use scraper::{ElementRef, Html, Selector};

use crate::section::{
    CompatibleContainerContent, ContainerItem, DescriptionContent, DocLink, DocumentationContent,
    Logo, Section, SectionKind, SectionSet, SkuComponent, SkuNomenclatureContent, SpecRow,
    VideoContent,
};

use super::{
    ContentCodec, DATASHEET_LINK_TEXT, DEFAULT_CHANNEL_PROMO, DEFAULT_CONTAINER_HEADING,
    DOC_FULL_LIST_HREF, DOC_FULL_LIST_TEXT,
};

/// Precompiled selectors, built once per codec.
pub(super) struct Selectors {
    blocks: Vec<(SectionKind, Selector)>,
    document_heading: Selector,
    paragraph: Selector,
    list_item: Selector,
    table_row: Selector,
    table_cell: Selector,
    logo_grid_img: Selector,
    video_embed: Selector,
    channel_promo: Selector,
    doc_link: Selector,
    sku_heading: Selector,
    sku_main_image: Selector,
    sku_gallery_img: Selector,
    sku_component: Selector,
    sku_component_code: Selector,
    sku_component_desc: Selector,
    sku_component_img: Selector,
    container_heading: Selector,
    container_description: Selector,
    container_item: Selector,
    container_item_image: Selector,
    container_item_title: Selector,
    container_item_type: Selector,
    collection_link: Selector,
}

fn sel(source: &str) -> Selector {
    Selector::parse(source).expect("static selector")
}

impl Selectors {
    pub(super) fn new() -> Self {
        Self {
            blocks: SectionKind::ALL
                .iter()
                .map(|kind| (*kind, sel(&format!("#{}", ContentCodec::block_id(*kind)))))
                .collect(),
            document_heading: sel("h2.product-title"),
            paragraph: sel("p"),
            list_item: sel("li"),
            table_row: sel("tr"),
            table_cell: sel("td"),
            logo_grid_img: sel("div.logo-grid img"),
            video_embed: sel("iframe.video-embed"),
            channel_promo: sel("p.channel-promo"),
            doc_link: sel("li a"),
            sku_heading: sel("h3.sku-heading"),
            sku_main_image: sel("img.sku-main-image"),
            sku_gallery_img: sel("div.sku-gallery img"),
            sku_component: sel("div.sku-component"),
            sku_component_code: sel("h4.sku-component__code"),
            sku_component_desc: sel("p.sku-component__desc"),
            sku_component_img: sel("div.sku-component__gallery img"),
            container_heading: sel("h3.container-heading"),
            container_description: sel("p.container-description"),
            container_item: sel("div.container-item"),
            container_item_image: sel("img.container-item__image"),
            container_item_title: sel("a.container-item__title"),
            container_item_type: sel("p.container-item__type"),
            collection_link: sel("a.container-collection-link"),
        }
    }
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn first_text(el: ElementRef<'_>, selector: &Selector) -> Option<String> {
    el.select(selector).next().map(text_of).filter(|t| !t.is_empty())
}

fn attr_of(el: ElementRef<'_>, name: &str) -> Option<String> {
    el.value().attr(name).map(str::to_string).filter(|v| !v.is_empty())
}

fn image_of(el: ElementRef<'_>) -> Option<Logo> {
    attr_of(el, "src").map(|url| Logo {
        url,
        alt: el.value().attr("alt").unwrap_or_default().to_string(),
    })
}

impl ContentCodec {
    /// Recover sections from markup.
    ///
    /// Blocks are located by structural marker (`id="tab-{kind}"`); unknown
    /// content around and between blocks is ignored. Never errors.
    #[must_use]
    pub fn decode(&self, markup: &str) -> SectionSet {
        let document = Html::parse_fragment(markup);
        let mut set = SectionSet::new();

        for (kind, selector) in &self.selectors.blocks {
            let Some(block) = document.select(selector).next() else {
                continue;
            };
            set.insert(self.decode_block(*kind, block, &document));
        }

        crate::metrics::record_codec("decode", set.len());
        set
    }

    fn decode_block(&self, kind: SectionKind, block: ElementRef<'_>, document: &Html) -> Section {
        let s = &self.selectors;
        match kind {
            SectionKind::Description => Section::description(self.decode_description(block, document)),
            SectionKind::Features => Section::features(decode_text_list(block, s)),
            SectionKind::Applications => Section::applications(decode_text_list(block, s)),
            SectionKind::SafetyGuidelines => Section::safety_guidelines(decode_text_list(block, s)),
            SectionKind::SterilizationMethod => {
                Section::sterilization_method(decode_text_list(block, s))
            }
            SectionKind::Specifications => Section::specifications(decode_specifications(block, s)),
            SectionKind::Videos => Section::videos(decode_videos(block, s)),
            SectionKind::Documentation => Section::documentation(decode_documentation(block, s)),
            SectionKind::SkuNomenclature => {
                Section::sku_nomenclature(decode_sku_nomenclature(block, s))
            }
            SectionKind::CompatibleContainer => {
                Section::compatible_container(decode_compatible_container(block, s))
            }
        }
    }

    fn decode_description(&self, block: ElementRef<'_>, document: &Html) -> DescriptionContent {
        let s = &self.selectors;

        // The document heading lives outside the block; look inside first in
        // case older markup nested it.
        let title = first_text(block, &s.document_heading)
            .or_else(|| document.select(&s.document_heading).next().map(text_of))
            .unwrap_or_default();

        let paragraphs: Vec<String> = block
            .select(&s.paragraph)
            .map(text_of)
            .filter(|p| !p.is_empty())
            .collect();

        let logos = block.select(&s.logo_grid_img).filter_map(image_of).collect();

        DescriptionContent { title, body: paragraphs.join("\n\n"), logos }
    }
}

fn decode_text_list(block: ElementRef<'_>, s: &Selectors) -> Vec<String> {
    block
        .select(&s.list_item)
        .map(text_of)
        .filter(|item| !item.is_empty())
        .collect()
}

fn decode_specifications(block: ElementRef<'_>, s: &Selectors) -> Vec<SpecRow> {
    block
        .select(&s.table_row)
        .filter_map(|row| {
            // Header rows carry th cells only and fall through here; rows
            // missing either cell are dropped.
            let mut cells = row.select(&s.table_cell);
            let item = text_of(cells.next()?);
            let value = text_of(cells.next()?);
            // Literal header text occasionally shows up as a plain td row.
            if item.eq_ignore_ascii_case("item") && value.eq_ignore_ascii_case("value") {
                return None;
            }
            Some(SpecRow { item, value })
        })
        .collect()
}

fn decode_videos(block: ElementRef<'_>, s: &Selectors) -> VideoContent {
    let url = block
        .select(&s.video_embed)
        .next()
        .and_then(|iframe| attr_of(iframe, "src"));

    let channel_text = first_text(block, &s.channel_promo)
        .filter(|text| text != DEFAULT_CHANNEL_PROMO);

    VideoContent { url, channel_text }
}

fn decode_documentation(block: ElementRef<'_>, s: &Selectors) -> DocumentationContent {
    let mut docs = DocumentationContent::default();

    for anchor in block.select(&s.doc_link) {
        let Some(href) = attr_of(anchor, "href") else {
            continue;
        };
        let text = text_of(anchor);

        if text == DOC_FULL_LIST_TEXT || href.ends_with(DOC_FULL_LIST_HREF) {
            continue;
        }
        if text == DATASHEET_LINK_TEXT && docs.datasheet_url.is_none() {
            docs.datasheet_url = Some(href);
        } else {
            docs.links.push(DocLink { href, text });
        }
    }
    docs
}

fn decode_sku_nomenclature(block: ElementRef<'_>, s: &Selectors) -> SkuNomenclatureContent {
    let components = block
        .select(&s.sku_component)
        .filter_map(|component| {
            let code = first_text(component, &s.sku_component_code)?;
            Some(SkuComponent {
                code,
                description: first_text(component, &s.sku_component_desc).unwrap_or_default(),
                gallery: component.select(&s.sku_component_img).filter_map(image_of).collect(),
            })
        })
        .collect();

    SkuNomenclatureContent {
        heading: first_text(block, &s.sku_heading),
        main_image: block.select(&s.sku_main_image).next().and_then(image_of),
        gallery: block.select(&s.sku_gallery_img).filter_map(image_of).collect(),
        components,
    }
}

fn decode_compatible_container(block: ElementRef<'_>, s: &Selectors) -> CompatibleContainerContent {
    let items = block
        .select(&s.container_item)
        .filter_map(|item| {
            let title_link = item.select(&s.container_item_title).next()?;
            Some(ContainerItem {
                image: item
                    .select(&s.container_item_image)
                    .next()
                    .and_then(|img| attr_of(img, "src")),
                title: text_of(title_link),
                url: attr_of(title_link, "href").unwrap_or_default(),
                type_line: first_text(item, &s.container_item_type),
            })
        })
        .collect::<Vec<_>>();

    let collection_handle = if items.is_empty() {
        block
            .select(&s.collection_link)
            .next()
            .and_then(|link| attr_of(link, "href"))
            .and_then(|href| {
                href.rsplit_once("/collections/").map(|(_, handle)| handle.to_string())
            })
    } else {
        None
    };

    CompatibleContainerContent {
        heading: first_text(block, &s.container_heading)
            .filter(|heading| heading != DEFAULT_CONTAINER_HEADING),
        description: first_text(block, &s.container_description),
        items,
        collection_handle,
    }
}

#[cfg(test)]
mod tests {
    use super::super::SkuIdentity;
    use super::*;
    use crate::section::SectionPayload;

    fn codec() -> ContentCodec {
        ContentCodec::new("https://store.example.com")
    }

    #[test]
    fn test_decode_empty_and_garbage() {
        let codec = codec();
        assert!(codec.decode("").is_empty());
        assert!(codec.decode("not markup at all <<<>>>").is_empty());
        assert!(codec.decode("<p>Hand-written description.</p>").is_empty());
    }

    #[test]
    fn test_decode_text_list_block() {
        let markup = r#"
            <div id="tab-features" class="tab-content" data-sku="W-100">
                <ul><li>Fast</li><li>Light</li><li></li></ul>
            </div>"#;
        let set = codec().decode(markup);

        let section = set.get(SectionKind::Features).unwrap();
        match &section.payload {
            SectionPayload::TextList(items) => {
                assert_eq!(items, &vec!["Fast".to_string(), "Light".to_string()]);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_decode_skips_header_row() {
        let markup = r#"
            <div id="tab-specifications">
                <table class="spec-table">
                    <tr><th>ITEM</th><th>VALUE</th></tr>
                    <tr><td>Volume</td><td>500 mL</td></tr>
                </table>
            </div>"#;
        let set = codec().decode(markup);

        match &set.get(SectionKind::Specifications).unwrap().payload {
            SectionPayload::Specifications(rows) => {
                assert_eq!(
                    rows,
                    &vec![SpecRow { item: "Volume".into(), value: "500 mL".into() }]
                );
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_decode_video_placeholder_maps_to_none() {
        let markup = r#"
            <div id="tab-videos">
                <p class="video-placeholder">Video coming soon</p>
                <p class="channel-promo">Subscribe to our channel for more product videos.</p>
            </div>"#;
        let set = codec().decode(markup);

        match &set.get(SectionKind::Videos).unwrap().payload {
            SectionPayload::Videos(video) => {
                assert_eq!(video.url, None);
                assert_eq!(video.channel_text, None);
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_decode_documentation_filters_fixed_links() {
        let markup = r#"
            <div id="tab-documentation">
                <ul class="doc-links">
                    <li><a href="https://store.example.com/files/w.pdf">Product Datasheet</a></li>
                    <li><a href="https://store.example.com/files/cert.pdf">Certificate</a></li>
                    <li><a href="https://store.example.com/pages/documentation">View the full documentation library</a></li>
                </ul>
            </div>"#;
        let set = codec().decode(markup);

        match &set.get(SectionKind::Documentation).unwrap().payload {
            SectionPayload::Documentation(docs) => {
                assert_eq!(
                    docs.datasheet_url.as_deref(),
                    Some("https://store.example.com/files/w.pdf")
                );
                assert_eq!(docs.links.len(), 1);
                assert_eq!(docs.links[0].text, "Certificate");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_decode_collection_handle() {
        let markup = r#"
            <div id="tab-compatible-container">
                <h3 class="container-heading">Compatible Container</h3>
                <a class="container-collection-link"
                   href="https://store.example.com/collections/containers">Browse the full collection</a>
            </div>"#;
        let set = codec().decode(markup);

        match &set.get(SectionKind::CompatibleContainer).unwrap().payload {
            SectionPayload::CompatibleContainer(content) => {
                assert_eq!(content.heading, None, "default heading maps to None");
                assert_eq!(content.collection_handle.as_deref(), Some("containers"));
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let codec = codec();
        let original = SectionSet::from_sections(vec![
            Section::description(DescriptionContent {
                title: "Widget".into(),
                body: "First paragraph.\n\nSecond paragraph.".into(),
                logos: vec![],
            }),
            Section::features(vec!["Fast".into(), "Light".into()]),
            Section::specifications(vec![SpecRow {
                item: "Mass".into(),
                value: "3 kg".into(),
            }]),
            Section::videos(VideoContent {
                url: Some("https://videos.example.com/embed/42".into()),
                channel_text: None,
            }),
        ]);

        let markup = codec.encode(&original, &SkuIdentity::single("W-100"));
        let recovered = codec.decode(&markup);

        assert_eq!(recovered, original);
    }

    #[test]
    fn test_decode_damaged_block_keeps_surviving_fields() {
        // Unclosed tags, a row missing its value cell, and a stray td-based
        // header row.
        let markup = r#"
            <div id="tab-specifications">
                <table class="spec-table">
                    <tr><td>ITEM</td><td>VALUE</td></tr>
                    <tr><td>Volume</tr>
                    <tr><td>Mass</td><td>3 kg</td></tr>
                </table>
            <div id="tab-features"><ul><li>Fast</ul>"#;
        let set = codec().decode(markup);

        assert!(set.contains(SectionKind::Features));
        match &set.get(SectionKind::Specifications).unwrap().payload {
            SectionPayload::Specifications(rows) => {
                // Header-text and one-cell rows are dropped.
                assert_eq!(
                    rows,
                    &vec![SpecRow { item: "Mass".into(), value: "3 kg".into() }]
                );
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }

    #[test]
    fn test_decode_sku_nomenclature() {
        let markup = r#"
            <div id="tab-sku-nomenclature">
                <h3 class="sku-heading">How to read our SKUs</h3>
                <img class="sku-main-image" src="https://store.example.com/cdn/sku.png" alt="SKU map" />
                <div class="sku-component">
                    <h4 class="sku-component__code">W</h4>
                    <p class="sku-component__desc">Widget family</p>
                </div>
            </div>"#;
        let set = codec().decode(markup);

        match &set.get(SectionKind::SkuNomenclature).unwrap().payload {
            SectionPayload::SkuNomenclature(content) => {
                assert_eq!(content.heading.as_deref(), Some("How to read our SKUs"));
                assert_eq!(content.main_image.as_ref().unwrap().alt, "SKU map");
                assert_eq!(content.components.len(), 1);
                assert_eq!(content.components[0].code, "W");
                assert_eq!(content.components[0].description, "Widget family");
            }
            other => panic!("unexpected payload: {:?}", other),
        }
    }
}
