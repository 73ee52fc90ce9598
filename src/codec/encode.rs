//! Section-set serialization to markup.

use regex::Captures;

use crate::section::{
    CompatibleContainerContent, DescriptionContent, DocumentationContent, Logo, Section,
    SectionKind, SectionPayload, SectionSet, SkuNomenclatureContent, SpecRow, VideoContent,
};

use super::markup::Node;
use super::{
    ContentCodec, SkuIdentity, COLLECTION_LINK_TEXT, CONTAINER_CLASS, DATASHEET_LINK_TEXT,
    DEFAULT_CHANNEL_PROMO, DEFAULT_CONTAINER_HEADING, DOC_FULL_LIST_HREF, DOC_FULL_LIST_TEXT,
    IDENTITY_ATTR, TAB_CONTENT_CLASS, VIDEO_PLACEHOLDER_TEXT,
};

impl ContentCodec {
    /// Serialize sections into the markup document published to the remote
    /// catalog's description field.
    ///
    /// Sections render in the fixed order regardless of insertion order. The
    /// output is byte-deterministic for identical input.
    #[must_use]
    pub fn encode(&self, sections: &SectionSet, sku: &SkuIdentity) -> String {
        let mut root = Node::new("div")
            .class(CONTAINER_CLASS)
            .attr(IDENTITY_ATTR, sku.attr_value());

        // Document heading from the description title, ahead of all blocks.
        if let Some(Section { payload: SectionPayload::Description(desc), .. }) =
            sections.get(SectionKind::Description)
        {
            if !desc.title.trim().is_empty() {
                root = root.child(
                    Node::new("h2").class("product-title").text(desc.title.trim()),
                );
            }
        }

        for section in sections.ordered() {
            root = root.child(self.encode_section(section, sku));
        }

        let markup = root.to_html();
        crate::metrics::record_codec("encode", sections.len());
        self.rewrite_relative_urls(&markup)
    }

    /// Rewrite site-relative `href`/`src` values against the store's public
    /// domain. Applied over the fully assembled markup so every section type,
    /// present and future, gets the same treatment.
    fn rewrite_relative_urls(&self, markup: &str) -> String {
        self.relative_url
            .replace_all(markup, |caps: &Captures<'_>| {
                let path = &caps[2];
                // Protocol-relative URLs are not site-relative.
                if path.starts_with("//") {
                    caps[0].to_string()
                } else {
                    format!("{}=\"{}{}\"", &caps[1], self.public_domain, path)
                }
            })
            .into_owned()
    }

    fn encode_section(&self, section: &Section, sku: &SkuIdentity) -> Node {
        let block = Node::new("div")
            .id(Self::block_id(section.kind))
            .class(TAB_CONTENT_CLASS)
            .attr(IDENTITY_ATTR, sku.attr_value());

        match &section.payload {
            SectionPayload::Description(desc) => encode_description(block, desc),
            SectionPayload::TextList(items) => encode_text_list(block, items),
            SectionPayload::Specifications(rows) => encode_specifications(block, rows),
            SectionPayload::Videos(video) => encode_videos(block, video),
            SectionPayload::Documentation(docs) => encode_documentation(block, docs),
            SectionPayload::SkuNomenclature(sku_content) => {
                encode_sku_nomenclature(block, sku_content)
            }
            SectionPayload::CompatibleContainer(container) => {
                encode_compatible_container(block, container)
            }
        }
    }
}

/// Split free text into paragraphs on blank-line boundaries.
fn split_paragraphs(body: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in body.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n"));
    }
    paragraphs
}

fn image_node(logo: &Logo, class: &'static str) -> Node {
    Node::new("img")
        .class(class)
        .attr("src", &logo.url)
        .attr("alt", &logo.alt)
}

fn encode_description(mut block: Node, desc: &DescriptionContent) -> Node {
    for paragraph in split_paragraphs(&desc.body) {
        block = block.child(Node::new("p").text(paragraph));
    }
    if !desc.logos.is_empty() {
        block = block.child(
            Node::new("div")
                .class("logo-grid")
                .children(desc.logos.iter().map(|logo| image_node(logo, "logo-grid__item"))),
        );
    }
    block
}

fn encode_text_list(block: Node, items: &[String]) -> Node {
    block.child(
        Node::new("ul").children(items.iter().map(|item| Node::new("li").text(item))),
    )
}

fn encode_specifications(block: Node, rows: &[SpecRow]) -> Node {
    let header = Node::new("tr")
        .child(Node::new("th").text("ITEM"))
        .child(Node::new("th").text("VALUE"));

    let table = Node::new("table").class("spec-table").child(header).children(
        rows.iter().map(|row| {
            Node::new("tr")
                .child(Node::new("td").text(&row.item))
                .child(Node::new("td").text(&row.value))
        }),
    );
    block.child(table)
}

fn encode_videos(mut block: Node, video: &VideoContent) -> Node {
    block = match &video.url {
        Some(url) if !url.trim().is_empty() => block.child(
            Node::new("iframe")
                .class("video-embed")
                .attr("src", url.trim())
                .attr("frameborder", "0")
                .attr("allowfullscreen", "true"),
        ),
        _ => block.child(
            Node::new("p").class("video-placeholder").text(VIDEO_PLACEHOLDER_TEXT),
        ),
    };

    let promo = video
        .channel_text
        .as_deref()
        .filter(|text| !text.trim().is_empty())
        .unwrap_or(DEFAULT_CHANNEL_PROMO);
    block.child(Node::new("p").class("channel-promo").text(promo))
}

fn encode_documentation(block: Node, docs: &DocumentationContent) -> Node {
    let mut list = Node::new("ul").class("doc-links");

    if let Some(url) = docs.datasheet_url.as_deref().filter(|u| !u.trim().is_empty()) {
        list = list.child(
            Node::new("li")
                .child(Node::new("a").attr("href", url.trim()).text(DATASHEET_LINK_TEXT)),
        );
    }
    for link in &docs.links {
        list = list.child(
            Node::new("li").child(Node::new("a").attr("href", &link.href).text(&link.text)),
        );
    }
    // The full-list link is always emitted last.
    list = list.child(
        Node::new("li").child(
            Node::new("a").attr("href", DOC_FULL_LIST_HREF).text(DOC_FULL_LIST_TEXT),
        ),
    );

    block.child(list)
}

fn encode_sku_nomenclature(mut block: Node, content: &SkuNomenclatureContent) -> Node {
    if let Some(heading) = content.heading.as_deref().filter(|h| !h.trim().is_empty()) {
        block = block.child(Node::new("h3").class("sku-heading").text(heading.trim()));
    }
    if let Some(main) = &content.main_image {
        block = block.child(image_node(main, "sku-main-image"));
    }
    if !content.gallery.is_empty() {
        block = block.child(
            Node::new("div")
                .class("sku-gallery")
                .children(content.gallery.iter().map(|logo| image_node(logo, "sku-gallery__item"))),
        );
    }

    for component in &content.components {
        let mut node = Node::new("div")
            .class("sku-component")
            .child(Node::new("h4").class("sku-component__code").text(&component.code));
        if !component.description.trim().is_empty() {
            node = node.child(
                Node::new("p").class("sku-component__desc").text(&component.description),
            );
        }
        if !component.gallery.is_empty() {
            node = node.child(
                Node::new("div").class("sku-component__gallery").children(
                    component
                        .gallery
                        .iter()
                        .map(|logo| image_node(logo, "sku-component__image")),
                ),
            );
        }
        block = block.child(node);
    }
    block
}

fn encode_compatible_container(mut block: Node, content: &CompatibleContainerContent) -> Node {
    let heading = content
        .heading
        .as_deref()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or(DEFAULT_CONTAINER_HEADING);
    block = block.child(Node::new("h3").class("container-heading").text(heading));

    if let Some(description) = content.description.as_deref().filter(|d| !d.trim().is_empty()) {
        block = block.child(Node::new("p").class("container-description").text(description));
    }

    if !content.items.is_empty() {
        let grid = Node::new("div").class("container-grid").children(
            content.items.iter().map(|item| {
                let mut node = Node::new("div").class("container-item");
                if let Some(image) = item.image.as_deref().filter(|i| !i.trim().is_empty()) {
                    node = node.child(
                        Node::new("img").class("container-item__image").attr("src", image),
                    );
                }
                node = node.child(
                    Node::new("a")
                        .class("container-item__title")
                        .attr("href", &item.url)
                        .text(&item.title),
                );
                if let Some(line) = item.type_line.as_deref().filter(|l| !l.trim().is_empty()) {
                    node = node.child(Node::new("p").class("container-item__type").text(line));
                }
                node
            }),
        );
        block = block.child(grid);
    } else if let Some(handle) =
        content.collection_handle.as_deref().filter(|h| !h.trim().is_empty())
    {
        block = block.child(
            Node::new("a")
                .class("container-collection-link")
                .attr("href", format!("/collections/{}", handle.trim()))
                .text(COLLECTION_LINK_TEXT),
        );
    }
    block
}
