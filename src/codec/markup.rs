//! Minimal markup builder.
//!
//! Encode assembles a tree of [`Node`]s and renders it to text in one final
//! pass. Building through a tree instead of string concatenation keeps
//! escaping and the absolute-URL rewrite uniform across section types,
//! including ones added later.

/// One element node: tag, ordered attributes, ordered children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    tag: &'static str,
    attrs: Vec<(&'static str, String)>,
    children: Vec<Content>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Content {
    Element(Node),
    Text(String),
}

// Elements rendered without a closing tag.
const VOID_TAGS: &[&str] = &["img", "br", "hr"];

impl Node {
    #[must_use]
    pub fn new(tag: &'static str) -> Self {
        Self { tag, attrs: Vec::new(), children: Vec::new() }
    }

    #[must_use]
    pub fn attr(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.attrs.push((name, value.into()));
        self
    }

    #[must_use]
    pub fn id(self, value: impl Into<String>) -> Self {
        self.attr("id", value)
    }

    #[must_use]
    pub fn class(self, value: impl Into<String>) -> Self {
        self.attr("class", value)
    }

    #[must_use]
    pub fn child(mut self, node: Node) -> Self {
        self.children.push(Content::Element(node));
        self
    }

    #[must_use]
    pub fn child_if(self, node: Option<Node>) -> Self {
        match node {
            Some(node) => self.child(node),
            None => self,
        }
    }

    #[must_use]
    pub fn children(mut self, nodes: impl IntoIterator<Item = Node>) -> Self {
        for node in nodes {
            self.children.push(Content::Element(node));
        }
        self
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Content::Text(text.into()));
        self
    }

    /// Render to markup text. Deterministic: attributes and children render
    /// in insertion order, text and attribute values are escaped.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.render(&mut out);
        out
    }

    fn render(&self, out: &mut String) {
        out.push('<');
        out.push_str(self.tag);
        for (name, value) in &self.attrs {
            out.push(' ');
            out.push_str(name);
            out.push_str("=\"");
            escape_attr(value, out);
            out.push('"');
        }

        if VOID_TAGS.contains(&self.tag) {
            out.push_str(" />");
            return;
        }

        out.push('>');
        for child in &self.children {
            match child {
                Content::Element(node) => node.render(out),
                Content::Text(text) => escape_text(text, out),
            }
        }
        out.push_str("</");
        out.push_str(self.tag);
        out.push('>');
    }
}

fn escape_text(text: &str, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
}

fn escape_attr(value: &str, out: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_nested() {
        let node = Node::new("div")
            .id("root")
            .class("outer")
            .child(Node::new("p").text("hello"))
            .child(Node::new("p").text("world"));

        assert_eq!(
            node.to_html(),
            r#"<div id="root" class="outer"><p>hello</p><p>world</p></div>"#
        );
    }

    #[test]
    fn test_text_escaping() {
        let node = Node::new("p").text("a < b & c > d");
        assert_eq!(node.to_html(), "<p>a &lt; b &amp; c &gt; d</p>");
    }

    #[test]
    fn test_attr_escaping() {
        let node = Node::new("a").attr("href", "/x?a=1&b=\"2\"");
        assert_eq!(node.to_html(), r#"<a href="/x?a=1&amp;b=&quot;2&quot;"></a>"#);
    }

    #[test]
    fn test_void_element() {
        let node = Node::new("img").attr("src", "/logo.png").attr("alt", "Logo");
        assert_eq!(node.to_html(), r#"<img src="/logo.png" alt="Logo" />"#);
    }

    #[test]
    fn test_render_is_deterministic() {
        let build = || {
            Node::new("ul")
                .class("items")
                .children((0..5).map(|i| Node::new("li").text(format!("item {}", i))))
        };
        assert_eq!(build().to_html(), build().to_html());
    }
}
