//! Minimal XML element tree built on `quick-xml`.
//!
//! Both the XML-RPC codec and the keyword documentation reader work on
//! small documents, so the whole input is parsed into an owned tree first
//! and then interpreted. Comments, processing instructions and the XML
//! declaration are dropped; text (including CDATA) is kept in document order
//! alongside child elements.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// A node inside an [`XmlElement`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An owned XML element with its attributes and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    /// Iterates over child elements, skipping text nodes.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// Iterates over child elements with the given name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |el| el.name == name)
    }

    /// First child element with the given name.
    #[must_use]
    pub fn child<'a>(&'a self, name: &str) -> Option<&'a XmlElement> {
        self.elements().find(|el| el.name == name)
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Concatenated text of this element and all descendants, in document order.
    #[must_use]
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(t) => out.push_str(t),
                XmlNode::Element(el) => el.collect_text(out),
            }
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(XmlNode::Text(last)) = self.children.last_mut() {
            last.push_str(text);
        } else {
            self.children.push(XmlNode::Text(text.to_string()));
        }
    }
}

/// Errors produced while parsing XML into an [`XmlElement`] tree.
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    #[error("malformed XML at byte {position}: {message}")]
    Syntax { position: u64, message: String },
    #[error("document has no root element")]
    Empty,
    #[error("unexpected content after the root element")]
    TrailingContent,
    #[error("unclosed element <{0}>")]
    Unclosed(String),
}

/// Parses a complete document and returns its root element.
///
/// # Errors
///
/// Returns [`XmlError`] when the input is not well-formed, has no root
/// element, or has more than one top-level element.
pub fn parse_document(input: &str) -> Result<XmlElement, XmlError> {
    let mut reader = Reader::from_str(input);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let event = reader.read_event().map_err(|e| XmlError::Syntax {
            position: position(&reader),
            message: e.to_string(),
        })?;

        match event {
            Event::Start(start) => {
                stack.push(open_element(&start, &reader)?);
            }
            Event::Empty(start) => {
                let element = open_element(&start, &reader)?;
                attach(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                // quick-xml checks that end names match their start tags.
                if let Some(element) = stack.pop() {
                    attach(element, &mut stack, &mut root)?;
                }
            }
            Event::Text(text) => {
                let unescaped = text.unescape().map_err(|e| XmlError::Syntax {
                    position: position(&reader),
                    message: e.to_string(),
                })?;
                if let Some(top) = stack.last_mut() {
                    top.push_text(&unescaped);
                } else if !unescaped.trim().is_empty() {
                    return Err(XmlError::TrailingContent);
                }
            }
            Event::CData(cdata) => {
                let raw = cdata.into_inner();
                if let Some(top) = stack.last_mut() {
                    top.push_text(&String::from_utf8_lossy(&raw));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::Unclosed(open.name));
    }
    root.ok_or(XmlError::Empty)
}

fn position(reader: &Reader<&[u8]>) -> u64 {
    u64::try_from(reader.buffer_position()).unwrap_or(u64::MAX)
}

fn open_element(start: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<XmlElement, XmlError> {
    let syntax = |message: String| XmlError::Syntax {
        position: position(reader),
        message,
    };

    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| syntax(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| syntax(e.to_string()))?
            .into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
    })
}

fn attach(
    element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(XmlNode::Element(element));
        Ok(())
    } else if root.is_none() {
        *root = Some(element);
        Ok(())
    } else {
        Err(XmlError::TrailingContent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nested_elements_and_attributes() {
        let doc = parse_document(
            r#"<?xml version="1.0"?>
            <doc><members><member name="M:A.b">text</member></members></doc>"#,
        )
        .unwrap();
        assert_eq!(doc.name, "doc");
        let member = doc.child("members").unwrap().child("member").unwrap();
        assert_eq!(member.attribute("name"), Some("M:A.b"));
        assert_eq!(member.text(), "text");
    }

    #[test]
    fn unescapes_entities_in_text_and_attributes() {
        let doc = parse_document(r#"<a title="x &amp; y">1 &lt; 2</a>"#).unwrap();
        assert_eq!(doc.attribute("title"), Some("x & y"));
        assert_eq!(doc.text(), "1 < 2");
    }

    #[test]
    fn text_concatenates_descendants_in_order() {
        let doc = parse_document("<summary>Start <c>vm</c> now</summary>").unwrap();
        assert_eq!(doc.text(), "Start vm now");
        assert_eq!(doc.elements().count(), 1);
    }

    #[test]
    fn keeps_cdata_and_whitespace() {
        let doc = parse_document("<v>  <![CDATA[<raw>]]>  </v>").unwrap();
        assert_eq!(doc.text(), "  <raw>  ");
    }

    #[test]
    fn self_closing_elements_are_children() {
        let doc = parse_document("<value><nil/></value>").unwrap();
        assert_eq!(doc.child("nil").map(|n| n.children.len()), Some(0));
    }

    #[test]
    fn child_lookup_outlives_borrowed_name() {
        let doc = parse_document("<a><b>1</b><b>2</b></a>").unwrap();
        let found = {
            let name = String::from("b");
            doc.child(&name)
        };
        assert_eq!(found.map(XmlElement::text), Some("1".to_string()));
        assert!(doc.child("c").is_none());
    }

    #[test]
    fn rejects_mismatched_end_tag() {
        assert!(matches!(
            parse_document("<a><b></a>"),
            Err(XmlError::Syntax { .. })
        ));
    }

    #[test]
    fn rejects_unclosed_and_empty_documents() {
        assert!(parse_document("<a><b></b>").is_err());
        assert!(matches!(parse_document("   "), Err(XmlError::Empty)));
    }

    #[test]
    fn rejects_two_roots() {
        assert!(matches!(
            parse_document("<a/><b/>"),
            Err(XmlError::TrailingContent)
        ));
    }
}
