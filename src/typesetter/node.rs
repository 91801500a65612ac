//! The markup tree the typesetter reads.
//!
//! A node has a tag, the text before its first child, the `tail` text after
//! its own end tag, children and attributes. That is all a parsed XHTML
//! fragment needs, and it also deserializes straight from JSON.

use std::collections::BTreeMap;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

use crate::error::QuireError;

/// Tag of the node wrapped around a fragment with more than one root.
pub const FRAGMENT_TAG: &str = "document";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupNode {
    pub tag: String,
    pub text: Option<String>,
    pub tail: Option<String>,
    pub children: Vec<MarkupNode>,
    pub attributes: BTreeMap<String, String>,
}

impl MarkupNode {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_tail(mut self, tail: &str) -> Self {
        self.tail = Some(tail.to_string());
        self
    }

    pub fn with_child(mut self, child: MarkupNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn from_json(json: &str) -> Result<Self, QuireError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a well-formed XML fragment. Several top-level elements are
    /// wrapped in a [`FRAGMENT_TAG`] node.
    pub fn from_xml(xml: &str) -> Result<Self, QuireError> {
        let mut reader = Reader::from_str(xml);
        let mut stack = vec![MarkupNode::new(FRAGMENT_TAG)];
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => stack.push(open_node(&e)?),
                Event::Empty(e) => {
                    let node = open_node(&e)?;
                    attach(&mut stack, node);
                }
                Event::End(_) => {
                    if stack.len() < 2 {
                        return Err(QuireError::Xml("unexpected end tag".to_string()));
                    }
                    if let Some(node) = stack.pop() {
                        attach(&mut stack, node);
                    }
                }
                Event::Text(e) => {
                    let text = e.unescape()?;
                    push_text(&mut stack, &text);
                }
                Event::CData(e) => {
                    let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                    push_text(&mut stack, &text);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if stack.len() != 1 {
            return Err(QuireError::Xml(format!(
                "unclosed element <{}>",
                stack.last().map(|n| n.tag.as_str()).unwrap_or_default()
            )));
        }
        let mut root = stack.remove(0);
        let only_whitespace = root.text.as_deref().map_or(true, |t| t.trim().is_empty());
        if root.children.len() == 1 && only_whitespace {
            let mut node = root.children.remove(0);
            node.tail = None;
            return Ok(node);
        }
        Ok(root)
    }
}

fn open_node(e: &BytesStart) -> Result<MarkupNode, QuireError> {
    let mut node = MarkupNode::new(&String::from_utf8_lossy(e.name().as_ref()));
    for attr in e.attributes() {
        let attr = attr.map_err(|err| QuireError::Xml(err.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value()?.to_string();
        node.attributes.insert(key, value);
    }
    Ok(node)
}

fn attach(stack: &mut [MarkupNode], node: MarkupNode) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Text goes to the open node until it has a child, then to the last
/// child's tail.
fn push_text(stack: &mut [MarkupNode], text: &str) {
    let Some(open) = stack.last_mut() else {
        return;
    };
    let slot = match open.children.last_mut() {
        Some(child) => &mut child.tail,
        None => &mut open.text,
    };
    slot.get_or_insert_with(String::new).push_str(text);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_and_tail() {
        let node = MarkupNode::from_xml("<p>Hello <em>big</em> world</p>").unwrap();
        assert_eq!(node.tag, "p");
        assert_eq!(node.text.as_deref(), Some("Hello "));
        assert_eq!(node.children[0].text.as_deref(), Some("big"));
        assert_eq!(node.children[0].tail.as_deref(), Some(" world"));
    }

    #[test]
    fn test_attributes_and_entities() {
        let node = MarkupNode::from_xml(r#"<img src="a&amp;b.png"/>"#).unwrap();
        assert_eq!(node.attribute("src"), Some("a&b.png"));
        let node = MarkupNode::from_xml("<p>1 &lt; 2</p>").unwrap();
        assert_eq!(node.text.as_deref(), Some("1 < 2"));
    }

    #[test]
    fn test_several_roots_are_wrapped() {
        let node = MarkupNode::from_xml("<h1>A</h1><p>B</p>").unwrap();
        assert_eq!(node.tag, FRAGMENT_TAG);
        assert_eq!(node.children.len(), 2);
    }

    #[test]
    fn test_malformed_xml_is_an_error() {
        assert!(matches!(MarkupNode::from_xml("<p>open"), Err(QuireError::Xml(_))));
        assert!(MarkupNode::from_xml("<p></q>").is_err());
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let node = MarkupNode::from_json(r#"{"tag": "p", "text": "Hi"}"#).unwrap();
        assert_eq!(node.tag, "p");
        assert!(node.children.is_empty());
        assert!(node.tail.is_none());
    }
}
