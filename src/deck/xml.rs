//! Minimal owned XML tree for editing package parts
//!
//! Qualified names (`p:sp`, `a:t`) are kept verbatim; namespace declarations
//! are ordinary attributes, so a parsed part serializes back with the same
//! prefixes it was read with.

use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Write;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder-style child append
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key.to_string(), value)),
        }
    }

    /// Child elements, skipping text
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements_mut().find(|e| e.name == name)
    }

    /// Follow a path of child names
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |node, name| node.child(name))
    }

    pub fn find_mut(&mut self, path: &[&str]) -> Option<&mut Element> {
        let mut node = self;
        for name in path {
            node = node.child_mut(name)?;
        }
        Some(node)
    }

    /// All descendant elements with the given name, depth first
    pub fn descendants<'a>(&'a self, name: &str, found: &mut Vec<&'a Element>) {
        for child in self.elements() {
            if child.name == name {
                found.push(child);
            }
            child.descendants(name, found);
        }
    }

    /// Concatenated text content of the element and its descendants
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                Node::Text(t) | Node::CData(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }

    fn write<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if self.children.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        for child in &self.children {
            match child {
                Node::Element(e) => e.write(writer)?,
                Node::Text(t) => writer.write_event(Event::Text(BytesText::new(t)))?,
                Node::CData(t) => writer.write_event(Event::CData(BytesCData::new(t.as_str())))?,
            }
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }
}

fn start_element(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()));
    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn append(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Parse a document and return its root element
pub fn parse(bytes: &[u8]) -> Result<Element> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    let mut reader = Reader::from_reader(bytes);
    let mut stack: Vec<Element> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => stack.push(start_element(&start)?),
            Event::Empty(start) => {
                let element = start_element(&start)?;
                if stack.is_empty() {
                    return Ok(element);
                }
                append(&mut stack, Node::Element(element));
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::Template("unbalanced closing tag".to_string()))?;
                if stack.is_empty() {
                    return Ok(element);
                }
                append(&mut stack, Node::Element(element));
            }
            Event::Text(text) => {
                if !stack.is_empty() {
                    let text = text.unescape()?.into_owned();
                    append(&mut stack, Node::Text(text));
                }
            }
            Event::CData(data) => {
                let text = String::from_utf8_lossy(&data.into_inner()).into_owned();
                append(&mut stack, Node::CData(text));
            }
            Event::Eof => return Err(Error::Template("document has no root element".to_string())),
            _ => {}
        }
    }
}

/// Serialize a root element with a standalone XML declaration
pub fn to_bytes(root: &Element) -> Result<Vec<u8>> {
    let mut writer = Writer::new(Vec::new());
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    writer.get_mut().extend_from_slice(b"\r\n");
    root.write(&mut writer)?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_serialize_keeps_prefixes() {
        let source = br#"<?xml version="1.0"?><p:sld xmlns:p="urn:p" xmlns:a="urn:a"><a:t>A &amp; B</a:t><p:x k="1 &lt; 2"/></p:sld>"#;
        let root = parse(source).unwrap();

        assert_eq!(root.name, "p:sld");
        assert_eq!(root.attr("xmlns:a"), Some("urn:a"));
        assert_eq!(root.child("a:t").unwrap().text(), "A & B");
        assert_eq!(root.child("p:x").unwrap().attr("k"), Some("1 < 2"));

        let written = String::from_utf8(to_bytes(&root).unwrap()).unwrap();
        assert!(written.starts_with("<?xml"));
        assert!(written.contains("<a:t>A &amp; B</a:t>"));
        assert!(written.contains(r#"<p:x k="1 &lt; 2"/>"#));
    }

    #[test]
    fn test_whitespace_text_is_preserved() {
        let root = parse(b"<a:p><a:t> two  spaces </a:t></a:p>").unwrap();
        assert_eq!(root.text(), " two  spaces ");
    }

    #[test]
    fn test_find() {
        let mut root = parse(b"<a><b><c>x</c></b></a>").unwrap();
        assert_eq!(root.find(&["b", "c"]).unwrap().text(), "x");
        assert!(root.find(&["b", "d"]).is_none());

        root.find_mut(&["b", "c"]).unwrap().set_attr("v", "1");
        assert_eq!(root.find(&["b", "c"]).unwrap().attr("v"), Some("1"));
    }

    #[test]
    fn test_serialize_escapes_and_cdata() {
        let mut root = Element::new("p:sld")
            .with_attr("name", "\"quoted\" & <tagged>")
            .with_child(Element::new("a:t").with_text("1 < 2 > 0"))
            .with_child(Element::new("p:empty"));
        root.children.push(Node::CData("raw <b>".to_string()));

        let written = String::from_utf8(to_bytes(&root).unwrap()).unwrap();
        assert!(written.starts_with(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#));
        assert!(written.contains(r#"name="&quot;quoted&quot; &amp; &lt;tagged&gt;""#));
        assert!(written.contains("<a:t>1 &lt; 2 &gt; 0</a:t>"));
        assert!(written.contains("<p:empty/>"));
        assert!(written.contains("<![CDATA[raw <b>]]>"));
        assert!(written.ends_with("</p:sld>"));

        let reparsed = parse(written.as_bytes()).unwrap();
        assert_eq!(reparsed.attr("name"), Some("\"quoted\" & <tagged>"));
        assert_eq!(reparsed.child("a:t").unwrap().text(), "1 < 2 > 0");
    }

    #[test]
    fn test_descendants() {
        let root = parse(b"<r><t>1</t><g><t>2</t></g></r>").unwrap();
        let mut found = Vec::new();
        root.descendants("t", &mut found);
        let texts: Vec<String> = found.iter().map(|e| e.text()).collect();
        assert_eq!(texts, vec!["1", "2"]);
    }

    #[test]
    fn test_empty_document_is_an_error() {
        assert!(parse(b"<?xml version=\"1.0\"?>").is_err());
    }
}
