//! Owned XML element tree.
//!
//! Content trees of slides, layouts and masters are held as [`XmlElement`]s so
//! they can be cloned by value, edited in place and serialized back. Text and
//! attribute values are kept in their escaped form exactly as read, which
//! keeps a parse/serialize cycle faithful to the source markup.

use crate::common::xml::{escape_xml, unescape_xml};
use crate::ooxml::opc::error::{OpcError, Result};
use crate::ooxml::xml::namespace::split_qname;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

/// XML declaration written in front of every serialized part.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;

/// A node in an element's content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    /// Character data, still escaped
    Text(String),
    CData(String),
    Comment(String),
}

impl XmlNode {
    /// Get the node as an element, if it is one.
    #[inline]
    pub fn as_element(&self) -> Option<&XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            _ => None,
        }
    }

    #[inline]
    pub fn as_element_mut(&mut self) -> Option<&mut XmlElement> {
        match self {
            XmlNode::Element(e) => Some(e),
            _ => None,
        }
    }
}

impl From<XmlElement> for XmlNode {
    fn from(element: XmlElement) -> Self {
        XmlNode::Element(element)
    }
}

/// An XML element with its attributes and children, namespace declarations included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    /// Qualified name as written (e.g. "p:sp")
    name: String,
    /// Attributes in document order with escaped values; includes `xmlns` declarations
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    /// Create an empty element with a qualified name.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`set_attr`](Self::set_attr).
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Parse the root element of an XML document.
    ///
    /// The XML declaration, processing instructions and DOCTYPE are dropped;
    /// everything inside the root element is preserved.
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        let mut buf = Vec::new();
        let mut stack: Vec<XmlElement> = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => stack.push(Self::from_start(e)?),
                Event::Empty(ref e) => {
                    let element = Self::from_start(e)?;
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(XmlNode::Element(element)),
                        None => return Ok(element),
                    }
                },
                Event::End(_) => {
                    if let Some(element) = stack.pop() {
                        match stack.last_mut() {
                            Some(parent) => parent.children.push(XmlNode::Element(element)),
                            None => return Ok(element),
                        }
                    }
                },
                Event::Text(ref t) => {
                    if let Some(current) = stack.last_mut() {
                        current.push_text_raw(std::str::from_utf8(t)?);
                    }
                },
                Event::GeneralRef(ref r) => {
                    if let Some(current) = stack.last_mut() {
                        let entity = format!("&{};", std::str::from_utf8(r)?);
                        current.push_text_raw(&entity);
                    }
                },
                Event::CData(ref t) => {
                    if let Some(current) = stack.last_mut() {
                        let text = std::str::from_utf8(t)?.to_string();
                        current.children.push(XmlNode::CData(text));
                    }
                },
                Event::Comment(ref t) => {
                    if let Some(current) = stack.last_mut() {
                        let text = std::str::from_utf8(t)?.to_string();
                        current.children.push(XmlNode::Comment(text));
                    }
                },
                Event::Eof => break,
                _ => {},
            }
            buf.clear();
        }

        Err(OpcError::XmlError("No root element found".to_string()))
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let mut element = Self::new(std::str::from_utf8(start.name().as_ref())?);
        for attr in start.attributes() {
            let attr = attr?;
            let key = std::str::from_utf8(attr.key.as_ref())?;
            let value = std::str::from_utf8(&attr.value)?;
            element.attributes.push((key.to_string(), value.to_string()));
        }
        Ok(element)
    }

    /// Append raw text, merging with a trailing text node.
    fn push_text_raw(&mut self, text: &str) {
        if let Some(XmlNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }

    /// Get the qualified name (e.g. "p:sp").
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the local name (e.g. "sp" for "p:sp").
    #[inline]
    pub fn local_name(&self) -> &str {
        split_qname(&self.name).1
    }

    /// Get the namespace prefix, if any.
    #[inline]
    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.name).0
    }

    /// Get an attribute's value in its escaped form.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Get an attribute's value with entities resolved.
    pub fn attr_unescaped(&self, name: &str) -> Option<String> {
        self.attr(name).map(|value| unescape_xml(value).into_owned())
    }

    /// Get an attribute by local name, whatever its prefix.
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| split_qname(key).1 == local && !key.starts_with("xmlns"))
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute from an unescaped value, keeping its position if it exists.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let value = escape_xml(value).into_owned();
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    /// Remove an attribute, returning its escaped value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let idx = self.attributes.iter().position(|(key, _)| key == name)?;
        Some(self.attributes.remove(idx).1)
    }

    /// Iterate attributes as (qualified name, escaped value) in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub(crate) fn attributes_mut(&mut self) -> impl Iterator<Item = (&str, &mut String)> {
        self.attributes.iter_mut().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate the namespace declarations on this element as (prefix, uri).
    ///
    /// The default namespace declaration yields an empty prefix.
    pub fn namespace_decls(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|(key, value)| {
            if key == "xmlns" {
                Some(("", value.as_str()))
            } else {
                key.strip_prefix("xmlns:").map(|prefix| (prefix, value.as_str()))
            }
        })
    }

    /// Get the child nodes.
    #[inline]
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    /// Get mutable access to the child nodes.
    #[inline]
    pub fn children_mut(&mut self) -> &mut Vec<XmlNode> {
        &mut self.children
    }

    /// Iterate the child elements, skipping text and comments.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(XmlNode::as_element)
    }

    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut XmlElement> {
        self.children.iter_mut().filter_map(XmlNode::as_element_mut)
    }

    /// Get the first child element with a local name.
    pub fn child(&self, local: &str) -> Option<&XmlElement> {
        self.elements().find(|e| e.local_name() == local)
    }

    pub fn child_mut(&mut self, local: &str) -> Option<&mut XmlElement> {
        self.elements_mut().find(|e| e.local_name() == local)
    }

    /// Follow a path of local names from this element.
    pub fn find(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter().try_fold(self, |element, local| element.child(local))
    }

    pub fn find_mut(&mut self, path: &[&str]) -> Option<&mut XmlElement> {
        path.iter().try_fold(self, |element, local| element.child_mut(local))
    }

    /// Append a child element.
    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    /// Insert a node before the first child element whose local name is in
    /// `successors`, or append it when none is present.
    ///
    /// Returns the index the node was inserted at.
    pub fn insert_before(&mut self, node: XmlNode, successors: &[&str]) -> usize {
        let idx = self
            .children
            .iter()
            .position(|n| matches!(n, XmlNode::Element(e) if successors.contains(&e.local_name())))
            .unwrap_or(self.children.len());
        self.children.insert(idx, node);
        idx
    }

    /// Remove every child element with a local name, returning how many were removed.
    pub fn remove_children(&mut self, local: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|n| !matches!(n, XmlNode::Element(e) if e.local_name() == local));
        before - self.children.len()
    }

    /// Iterate this element and all its descendant elements in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Concatenated, unescaped character data of this element and its descendants.
    pub fn text(&self) -> String {
        let mut text = String::new();
        self.collect_text(&mut text);
        text
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                XmlNode::Element(e) => e.collect_text(out),
                XmlNode::Text(t) => out.push_str(&unescape_xml(t)),
                XmlNode::CData(t) => out.push_str(t),
                XmlNode::Comment(_) => {},
            }
        }
    }

    /// Serialize as a standalone XML document, declaration included.
    pub fn to_xml(&self) -> String {
        let mut xml = String::with_capacity(XML_DECLARATION.len() + 1 + self.estimated_xml_len());
        xml.push_str(XML_DECLARATION);
        xml.push('\n');
        self.write_xml(&mut xml);
        xml
    }

    /// Serialize as standalone XML document bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_xml().into_bytes()
    }

    /// Serialize this element without a declaration.
    pub fn to_fragment(&self) -> String {
        let mut xml = String::with_capacity(self.estimated_xml_len());
        self.write_xml(&mut xml);
        xml
    }

    fn estimated_xml_len(&self) -> usize {
        let attrs: usize = self
            .attributes
            .iter()
            .map(|(k, v)| k.len() + v.len() + 4)
            .sum();
        let children: usize = self
            .children
            .iter()
            .map(|n| match n {
                XmlNode::Element(e) => e.estimated_xml_len(),
                XmlNode::Text(t) => t.len(),
                XmlNode::CData(t) => t.len() + 12,
                XmlNode::Comment(t) => t.len() + 7,
            })
            .sum();
        2 * self.name.len() + 5 + attrs + children
    }

    fn write_xml(&self, output: &mut String) {
        output.push('<');
        output.push_str(&self.name);

        for (key, value) in &self.attributes {
            output.push(' ');
            output.push_str(key);
            output.push_str("=\"");
            // Values read from single-quoted attributes may carry bare double quotes
            if memchr::memchr(b'"', value.as_bytes()).is_some() {
                output.push_str(&value.replace('"', "&quot;"));
            } else {
                output.push_str(value);
            }
            output.push('"');
        }

        if self.children.is_empty() {
            output.push_str("/>");
            return;
        }

        output.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(e) => e.write_xml(output),
                XmlNode::Text(t) => output.push_str(t),
                XmlNode::CData(t) => {
                    output.push_str("<![CDATA[");
                    output.push_str(t);
                    output.push_str("]]>");
                },
                XmlNode::Comment(t) => {
                    output.push_str("<!--");
                    output.push_str(t);
                    output.push_str("-->");
                },
            }
        }
        output.push_str("</");
        output.push_str(&self.name);
        output.push('>');
    }
}

/// Pre-order iterator over an element and its descendant elements.
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let element = self.stack.pop()?;
        self.stack.extend(element.elements().collect::<Vec<_>>().into_iter().rev());
        Some(element)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &[u8] = br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld name="Q&amp;A"><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>Fish &amp; chips</a:t></a:r></a:p></p:txBody></p:sp><!-- note --><p:extLst/></p:spTree></p:cSld></p:sld>"#;

    #[test]
    fn test_parse_and_navigate() {
        let root = XmlElement::parse(SLIDE).unwrap();
        assert_eq!(root.name(), "p:sld");
        assert_eq!(root.local_name(), "sld");
        assert_eq!(root.prefix(), Some("p"));

        let c_sld = root.child("cSld").unwrap();
        assert_eq!(c_sld.attr("name"), Some("Q&amp;A"));
        assert_eq!(c_sld.attr_unescaped("name").as_deref(), Some("Q&A"));

        let sp_tree = root.find(&["cSld", "spTree"]).unwrap();
        assert_eq!(sp_tree.elements().count(), 2);
        assert_eq!(sp_tree.children().len(), 3);
        assert_eq!(root.text(), "Fish & chips");
    }

    #[test]
    fn test_serialization_is_faithful() {
        let root = XmlElement::parse(SLIDE).unwrap();
        let xml = root.to_xml();
        assert!(xml.starts_with(XML_DECLARATION));
        assert!(xml.contains("<a:t>Fish &amp; chips</a:t>"));
        assert!(xml.contains("<!-- note -->"));
        assert!(xml.contains("<p:extLst/>"));

        let reparsed = XmlElement::parse(xml.as_bytes()).unwrap();
        assert_eq!(reparsed, root);
    }

    #[test]
    fn test_single_quoted_attribute_with_double_quote() {
        let root = XmlElement::parse(br#"<a descr='say "hi"'/>"#).unwrap();
        assert_eq!(root.to_fragment(), r#"<a descr="say &quot;hi&quot;"/>"#);
    }

    #[test]
    fn test_insert_before_and_remove_children() {
        let mut root = XmlElement::parse(SLIDE).unwrap();
        let sp_tree = root.find_mut(&["cSld", "spTree"]).unwrap();

        let idx = sp_tree.insert_before(XmlElement::new("p:pic").into(), &["extLst"]);
        assert_eq!(idx, 2);
        let names: Vec<&str> = sp_tree.elements().map(|e| e.local_name()).collect();
        assert_eq!(names, ["sp", "pic", "extLst"]);

        assert_eq!(sp_tree.remove_children("extLst"), 1);
        let idx = sp_tree.insert_before(XmlElement::new("p:cxnSp").into(), &["extLst"]);
        assert_eq!(idx, sp_tree.children().len() - 1);
    }

    #[test]
    fn test_attributes_and_namespaces() {
        let mut el = XmlElement::new("p:sldLayoutId").with_attr("id", "2147483649");
        el.set_attr("r:id", "rId1");
        el.set_attr("id", "2147483650");
        assert_eq!(el.attr("id"), Some("2147483650"));
        assert_eq!(el.attr_local("id"), Some("2147483650"));
        assert_eq!(el.to_fragment(), r#"<p:sldLayoutId id="2147483650" r:id="rId1"/>"#);

        assert_eq!(el.remove_attr("r:id").as_deref(), Some("rId1"));
        assert_eq!(el.attr("r:id"), None);

        let root = XmlElement::parse(SLIDE).unwrap();
        let decls: Vec<(&str, &str)> = root.namespace_decls().collect();
        assert_eq!(decls.len(), 2);
        assert_eq!(decls[1].0, "p");
    }

    #[test]
    fn test_descendants_in_document_order() {
        let root = XmlElement::parse(br#"<a><b><c/></b><d/></a>"#).unwrap();
        let names: Vec<&str> = root.descendants().map(|e| e.name()).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_parse_rejects_empty_document() {
        assert!(XmlElement::parse(b"<?xml version=\"1.0\"?>").is_err());
        assert!(XmlElement::parse(b"<a><b></a>").is_err());
    }
}
