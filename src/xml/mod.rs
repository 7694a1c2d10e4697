//! Structured documents: an owned XML tree, path queries and transforms.
//!
//! # Layout
//!
//! ```text
//! xml/
//! ├── mod.rs        # Document / Element tree, parsing, serialization
//! ├── query.rs      # path-expression subset over the tree
//! └── transform.rs  # compiled transform programs bound to a document
//! ```

pub mod query;
pub mod transform;

use std::{fs, path::Path, str};

use quick_xml::{
    Reader,
    escape::{escape, unescape},
    events::{BytesStart, Event},
};

use crate::error::{Error, Result};
pub use query::{Query, Selected};
pub use transform::{Transform, TransformCache, TransformOutput};

/// Name reported in parse errors for documents that did not come from a file.
const INLINE_SOURCE: &str = "<inline>";

// ============================================================================
// Tree
// ============================================================================

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(Element),
    Text(String),
}

/// An XML element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Content>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Content::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.push_text(&text.into());
        self
    }

    /// Value of the attribute `name`, if present.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|c| match c {
            Content::Element(e) => Some(e),
            Content::Text(_) => None,
        })
    }

    /// Concatenated text of all descendants, in document order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Content::Text(t) => out.push_str(t),
                Content::Element(e) => e.collect_text(out),
            }
        }
    }

    /// Append text, merging with a trailing text node.
    fn push_text(&mut self, text: &str) {
        if let Some(Content::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(Content::Text(text.to_owned()));
        }
    }

    /// Compact markup of this element and its subtree.
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_compact(&mut out);
        out
    }

    fn write_open(&self, out: &mut String, close: bool) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape(v.as_str()));
            out.push('"');
        }
        out.push_str(if close { "/>" } else { ">" });
    }

    fn write_compact(&self, out: &mut String) {
        if self.children.is_empty() {
            self.write_open(out, true);
            return;
        }
        self.write_open(out, false);
        for child in &self.children {
            match child {
                Content::Text(t) => out.push_str(&escape(t.as_str())),
                Content::Element(e) => e.write_compact(out),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }

    /// Indent element-only content; mixed content is written compactly.
    fn write_pretty(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);

        let element_only = self.children.iter().all(|c| match c {
            Content::Element(_) => true,
            Content::Text(t) => t.trim().is_empty(),
        });
        if self.children.is_empty() || !element_only || self.elements().next().is_none() {
            self.write_compact(out);
            out.push('\n');
            return;
        }

        self.write_open(out, false);
        out.push('\n');
        for child in self.elements() {
            child.write_pretty(out, depth + 1);
        }
        out.push_str(&indent);
        out.push_str("</");
        out.push_str(&self.name);
        out.push_str(">\n");
    }
}

/// A parsed document with exactly one root element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    root: Element,
}

impl Document {
    pub fn new(root: Element) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// Parse a document held in memory.
    pub fn parse_str(text: &str) -> Result<Self> {
        Self::parse_at(text, Path::new(INLINE_SOURCE))
    }

    fn parse_at(text: &str, path: &Path) -> Result<Self> {
        parse_tree(text)
            .map(|root| Self { root })
            .map_err(|message| Error::Parse {
                path: path.to_path_buf(),
                message,
            })
    }

    /// All nodes selected by `query`.
    pub fn select(&self, query: &Query) -> Vec<Selected> {
        query.evaluate(self)
    }

    /// Pretty markup with an XML declaration, UTF-8 encoded.
    pub fn to_pretty_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        self.root.write_pretty(&mut out, 0);
        out
    }
}

/// Read and parse the document at `path`.
pub fn parse_file(path: &Path) -> Result<Document> {
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Document::parse_at(&text, path)
}

// ============================================================================
// Parsing
// ============================================================================

fn parse_tree(text: &str) -> std::result::Result<Element, String> {
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("{e} at position {}", reader.error_position()))?;

        match event {
            Event::Start(e) => stack.push(start_element(&e)?),
            Event::Empty(e) => attach(&mut stack, &mut root, start_element(&e)?)?,
            Event::End(_) => {
                let element = stack.pop().ok_or("unexpected closing tag")?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::Text(e) => {
                let raw = utf8(&e)?;
                push_text(&mut stack, &unescape(raw).map_err(|e| e.to_string())?)?;
            }
            Event::CData(e) => push_text(&mut stack, utf8(&e)?)?,
            Event::GeneralRef(e) => {
                let reference = format!("&{};", utf8(&e)?);
                push_text(&mut stack, &unescape(&reference).map_err(|e| e.to_string())?)?;
            }
            Event::Eof => break,
            // comments, processing instructions, declarations, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(format!("unclosed element <{}>", open.name));
    }
    root.ok_or_else(|| "no root element".to_owned())
}

fn utf8(bytes: &[u8]) -> std::result::Result<&str, String> {
    str::from_utf8(bytes).map_err(|e| e.to_string())
}

fn start_element(e: &BytesStart<'_>) -> std::result::Result<Element, String> {
    let mut element = Element::new(utf8(e.name().as_ref())?);
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = utf8(attr.key.as_ref())?.to_owned();
        let value = unescape(utf8(&attr.value)?)
            .map_err(|e| e.to_string())?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> std::result::Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Content::Element(element)),
        None if root.is_some() => return Err(format!("second root element <{}>", element.name)),
        None => *root = Some(element),
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) -> std::result::Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.push_text(text),
        None if text.trim().is_empty() => {}
        None => return Err(format!("text outside the root element: {:?}", text.trim())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const POST: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!-- sample -->
<post lang="pl" orig-date="2021-03-04">
  <title>Fish &amp; chips</title>
  <tags>food; travel</tags>
  <body><p>Hello <b>world</b>&#33;</p><![CDATA[<raw>]]></body>
</post>
"#;

    #[test]
    fn test_parse_structure() {
        let doc = Document::parse_str(POST).unwrap();
        let root = doc.root();
        assert_eq!(root.name, "post");
        assert_eq!(root.attribute("lang"), Some("pl"));
        assert_eq!(root.attribute("orig-date"), Some("2021-03-04"));
        assert_eq!(root.attribute("missing"), None);

        let names: Vec<_> = root.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["title", "tags", "body"]);
    }

    #[test]
    fn test_parse_entities_and_cdata() {
        let doc = Document::parse_str(POST).unwrap();
        let mut elements = doc.root().elements();
        assert_eq!(elements.next().unwrap().text(), "Fish & chips");
        elements.next();
        assert_eq!(elements.next().unwrap().text(), "Hello world!<raw>");
    }

    #[test]
    fn test_parse_attribute_entities() {
        let doc = Document::parse_str(r#"<a title="x &lt; y &quot;z&quot;"/>"#).unwrap();
        assert_eq!(doc.root().attribute("title"), Some(r#"x < y "z""#));
    }

    #[test]
    fn test_parse_errors() {
        for bad in [
            "",
            "<a><b></a>",
            "<a>",
            "<a/><b/>",
            "text<a/>",
            "<a>&unknown;</a>",
        ] {
            let err = Document::parse_str(bad).unwrap_err();
            assert!(matches!(err, Error::Parse { .. }), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_parse_file_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.xml");
        fs::write(&path, "<post><title></post>").unwrap();

        match parse_file(&path).unwrap_err() {
            Error::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_to_xml_escapes() {
        let e = Element::new("a")
            .with_attribute("href", "?x=1&y=2")
            .with_text("1 < 2")
            .with_child(Element::new("br"));
        assert_eq!(e.to_xml(), r#"<a href="?x=1&amp;y=2">1 &lt; 2<br/></a>"#);
    }

    #[test]
    fn test_pretty_output() {
        let doc = Document::new(
            Element::new("urlset").with_child(
                Element::new("url").with_child(Element::new("loc").with_text("https://a.b/")),
            ),
        );
        assert_eq!(
            doc.to_pretty_xml(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <urlset>\n  <url>\n    <loc>https://a.b/</loc>\n  </url>\n</urlset>\n"
        );
    }

    #[test]
    fn test_pretty_output_reparses() {
        let doc = Document::parse_str(POST).unwrap();
        let again = Document::parse_str(&doc.to_pretty_xml()).unwrap();
        assert_eq!(again.root().attribute("lang"), Some("pl"));
        assert_eq!(again.root().elements().count(), 3);
    }
}
