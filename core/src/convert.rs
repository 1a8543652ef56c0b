//! Conversion of markup trees into nested JSON values.
//!
//! # Rules
//! - An element with no attributes and no children becomes its text (`""`).
//! - Attributes go under `@attributes` as name → string value.
//! - An element whose only child is text becomes that text, unless it also
//!   has attributes, in which case the text goes under `@text`.
//! - Child elements are keyed by tag name in first-occurrence order. A tag
//!   seen once maps to its converted value; a repeated tag maps to an array
//!   of converted values in document order.
//! - Text mixed in with child elements is concatenated, trimmed and kept
//!   under `@text`.

use serde_json::{Map, Value};

use crate::markup::{Element, Node};
use crate::response::Data;

/// Key holding an element's attributes.
pub const ATTRIBUTES_KEY: &str = "@attributes";
/// Key holding an element's text when it cannot collapse to a scalar.
pub const TEXT_KEY: &str = "@text";

/// Stateless markup → value converter.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralConverter;

impl StructuralConverter {
    pub fn convert(&self, element: &Element) -> Value {
        let has_elements = element.elements().next().is_some();

        if element.attributes.is_empty() && !has_elements {
            return Value::String(element.text());
        }

        let mut map = Map::new();
        if !element.attributes.is_empty() {
            let attributes = element
                .attributes
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            map.insert(ATTRIBUTES_KEY.to_string(), Value::Object(attributes));
        }

        if !has_elements {
            let text = element.text();
            if !text.is_empty() {
                map.insert(TEXT_KEY.to_string(), Value::String(text));
            }
            return Value::Object(map);
        }

        let mixed_text = element.text();
        let mixed_text = mixed_text.trim();
        if !mixed_text.is_empty() {
            map.insert(TEXT_KEY.to_string(), Value::String(mixed_text.to_string()));
        }

        for node in &element.children {
            if let Node::Element(child) = node {
                insert_grouped(&mut map, &child.name, self.convert(child));
            }
        }
        Value::Object(map)
    }

    /// Convert any markup inside `data`; everything else is returned as is.
    /// Running this on its own output changes nothing.
    pub fn convert_data(&self, data: &Data) -> Data {
        match data {
            Data::Markup(element) => Data::Structured(self.convert(element)),
            Data::List(items) => Data::List(items.iter().map(|d| self.convert_data(d)).collect()),
            other => other.clone(),
        }
    }
}

/// Converted elements are never arrays, so an array under `name` is
/// always an earlier group.
fn insert_grouped(map: &mut Map<String, Value>, name: &str, value: Value) {
    match map.get_mut(name) {
        None => {
            map.insert(name.to_string(), value);
        }
        Some(Value::Array(group)) => group.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
    }
}
