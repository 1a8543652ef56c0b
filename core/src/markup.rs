//! Markup trees and the parser that builds them.
//!
//! # Design
//! `Element` is an owned tree: attributes keep document order, children keep
//! document order and may repeat tag names. Parsing sits behind the `Parser`
//! trait so a service can swap in another markup dialect; `XmlParser` is the
//! default and is built on `quick-xml`'s pull reader.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::CallError;

const FORMAT: &str = "markup";

/// A child of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

/// An element with ordered attributes and ordered children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
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

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Concatenated direct text children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                Node::Text(text) => Some(text.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// First descendant (depth-first, self included) whose local name matches.
    pub fn find(&self, local_name: &str) -> Option<&Element> {
        if self.local_name() == local_name {
            return Some(self);
        }
        self.elements().find_map(|child| child.find(local_name))
    }

    /// Name without any `prefix:`.
    pub fn local_name(&self) -> &str {
        self.name
            .rsplit_once(':')
            .map_or(self.name.as_str(), |(_, local)| local)
    }
}

/// Turns markup text into an element tree.
pub trait Parser {
    fn parse(&self, text: &str) -> Result<Element, CallError>;
}

/// XML parser over `quick-xml`.
///
/// Whitespace-only text between elements is dropped; comments, processing
/// instructions and the XML declaration are ignored. CDATA sections become
/// text nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlParser;

impl Parser for XmlParser {
    fn parse(&self, text: &str) -> Result<Element, CallError> {
        let mut reader = Reader::from_str(text);
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event()
                .map_err(|e| CallError::interpretation(FORMAT, e))?;
            match event {
                Event::Start(start) => stack.push(open_element(&start)?),
                Event::Empty(start) => {
                    let element = open_element(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| CallError::interpretation(FORMAT, "unbalanced end tag"))?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(raw) => {
                    let text = raw
                        .unescape()
                        .map_err(|e| CallError::interpretation(FORMAT, e))?;
                    push_text(&mut stack, &text);
                }
                Event::CData(data) => {
                    let bytes = data.into_inner();
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|e| CallError::interpretation(FORMAT, e))?;
                    push_text(&mut stack, text);
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(CallError::interpretation(FORMAT, "unexpected end of document"));
        }
        root.ok_or_else(|| CallError::interpretation(FORMAT, "document has no root element"))
    }
}

fn open_element(start: &BytesStart<'_>) -> Result<Element, CallError> {
    let name = std::str::from_utf8(start.name().as_ref())
        .map_err(|e| CallError::interpretation(FORMAT, e))?
        .to_string();
    let mut element = Element::new(name);
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| CallError::interpretation(FORMAT, e))?;
        let key = std::str::from_utf8(attribute.key.as_ref())
            .map_err(|e| CallError::interpretation(FORMAT, e))?
            .to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| CallError::interpretation(FORMAT, e))?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), CallError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(CallError::interpretation(
                FORMAT,
                "document has more than one root element",
            ))
        }
    }
    Ok(())
}

fn push_text(stack: &mut [Element], text: &str) {
    if text.trim().is_empty() {
        return;
    }
    if let Some(parent) = stack.last_mut() {
        parent.children.push(Node::Text(text.to_string()));
    }
}
