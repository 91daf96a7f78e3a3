//! Minimal element tree for SecurePay messages.
//!
//! Requests are assembled as a tree so they can be redacted for logging
//! without touching the copy that goes over the wire. Responses are read
//! back into the same shape, and looked up with slash-separated paths
//! relative to an element (`Payment/TxnList/Txn`).

use std::io::Cursor;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use thiserror::Error;

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("Malformed XML: {0}")]
    Malformed(#[from] quick_xml::Error),
    #[error("Invalid document structure: {0}")]
    Structure(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: impl ToString) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First element matching `path`, relative to `self`.
    pub fn find(&self, path: &str) -> Option<&Element> {
        path.split('/')
            .filter(|segment| !segment.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }

    pub fn find_mut(&mut self, path: &str) -> Option<&mut Element> {
        let mut node = self;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            node = node.children.iter_mut().find(|c| c.name == segment)?;
        }
        Some(node)
    }

    /// Every element matching `path`, in document order.
    pub fn find_all(&self, path: &str) -> Vec<&Element> {
        let mut nodes = vec![self];
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            nodes = nodes
                .into_iter()
                .flat_map(|n| n.children.iter().filter(move |c| c.name == segment))
                .collect();
        }
        nodes
    }

    pub fn find_all_mut(&mut self, path: &str) -> Vec<&mut Element> {
        let mut nodes = vec![self];
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            nodes = nodes
                .into_iter()
                .flat_map(|n| n.children.iter_mut().filter(move |c| c.name == segment))
                .collect();
        }
        nodes
    }

    pub fn find_text(&self, path: &str) -> Option<&str> {
        self.find(path).map(|e| e.text.as_str())
    }

    /// Serializes the tree, prefixed with the XML declaration.
    pub fn to_xml(&self) -> Result<String, XmlError> {
        let mut writer = Writer::new(Cursor::new(Vec::new()));
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_to(&mut writer)?;

        String::from_utf8(writer.into_inner().into_inner())
            .map_err(|e| XmlError::Structure(e.to_string()))
    }

    fn write_to(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<(), XmlError> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }

        if self.children.is_empty() && self.text.is_empty() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }

        writer.write_event(Event::Start(start))?;
        if !self.text.is_empty() {
            writer.write_event(Event::Text(BytesText::new(&self.text)))?;
        }
        for child in &self.children {
            child.write_to(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.name.as_str())))?;
        Ok(())
    }

    /// Parses a complete document with exactly one root element.
    pub fn parse(input: &str) -> Result<Element, XmlError> {
        let mut reader = Reader::from_str(input);
        reader.trim_text(true);

        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(XmlError::Structure("multiple root elements".to_string()));
                    }
                    stack.push(element_from_start(&start)?);
                }
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        XmlError::Structure("closing tag without opening tag".to_string())
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    match stack.last_mut() {
                        Some(current) => current.text.push_str(&text),
                        None => {
                            return Err(XmlError::Structure(
                                "text outside of the root element".to_string(),
                            ))
                        }
                    }
                }
                Event::CData(data) => {
                    let text = String::from_utf8_lossy(&data).into_owned();
                    match stack.last_mut() {
                        Some(current) => current.text.push_str(&text),
                        None => {
                            return Err(XmlError::Structure(
                                "CDATA outside of the root element".to_string(),
                            ))
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(XmlError::Structure("unclosed element".to_string()));
        }
        root.ok_or_else(|| XmlError::Structure("no root element".to_string()))
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element, XmlError> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(XmlError::Structure("multiple root elements".to_string())),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Element {
        Element::new("SecurePayMessage")
            .with_child(
                Element::new("MerchantInfo")
                    .with_child(Element::new("merchantID").with_text("ABC0001"))
                    .with_child(Element::new("password").with_text("abc123")),
            )
            .with_child(
                Element::new("Payment").with_child(
                    Element::new("TxnList")
                        .with_attribute("count", "1")
                        .with_child(Element::new("Txn").with_attribute("ID", "1")),
                ),
            )
    }

    #[test]
    fn test_serializes_with_declaration() {
        let xml = Element::new("RequestType").with_text("Echo").to_xml().unwrap();
        assert_eq!(
            xml,
            format!("{}<RequestType>Echo</RequestType>", XML_DECLARATION)
        );
    }

    #[test]
    fn test_escapes_text() {
        let xml = Element::new("note").with_text("a < b & c").to_xml().unwrap();
        assert!(xml.ends_with("<note>a &lt; b &amp; c</note>"));
    }

    #[test]
    fn test_empty_element_is_self_closing() {
        let xml = Element::new("password").to_xml().unwrap();
        assert!(xml.ends_with("<password/>"));
    }

    #[test]
    fn test_parse_reads_back_written_tree() {
        let original = sample();
        let parsed = Element::parse(&original.to_xml().unwrap()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_find_by_path() {
        let doc = sample();
        assert_eq!(doc.find_text("MerchantInfo/merchantID"), Some("ABC0001"));
        assert_eq!(
            doc.find("Payment/TxnList").and_then(|e| e.attribute("count")),
            Some("1")
        );
        assert!(doc.find("Payment/TxnList/Txn/CreditCardInfo").is_none());
        assert_eq!(doc.find_all("Payment/TxnList/Txn").len(), 1);
    }

    #[test]
    fn test_parse_rejects_mismatched_tags() {
        assert!(Element::parse("<a><b></a>").is_err());
    }

    #[test]
    fn test_parse_rejects_plain_text() {
        assert!(Element::parse("Service Unavailable").is_err());
    }

    #[test]
    fn test_parse_rejects_unclosed_document() {
        assert!(Element::parse("<SecurePayMessage><Status>").is_err());
    }

    #[test]
    fn test_parse_unescapes_entities() {
        let doc = Element::parse("<r><t>Tom &amp; Jerry</t></r>").unwrap();
        assert_eq!(doc.find_text("t"), Some("Tom & Jerry"));
    }
}
