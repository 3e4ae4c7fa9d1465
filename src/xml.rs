//! # TCX Text to Document Tree
//!
//! Converts raw TCX (XML) text into the JSON document tree that
//! [`crate::parse_activity`] walks:
//!
//! - every element becomes a key named after its local name (`ns3:TPX` → `TPX`)
//! - attributes go under `"$"`
//! - an element with neither attributes nor child elements becomes its trimmed
//!   text (`""` when empty)
//! - otherwise text goes under `"_"`
//! - a repeated child element becomes an array, in document order; a single
//!   one stays an object
//!
//! All leaf values are strings, so numbers go through the same lenient field
//! parsing as any other tree.

use roxmltree::{Document, Node};
use serde_json::{Map, Value};

use crate::error::Result;

/// Parse TCX text into a document tree rooted at its top-level element.
///
/// # Example
/// ```
/// use run_analyzer::xml_to_tree;
///
/// let tree = xml_to_tree(r#"<Activity Sport="Running"><Id>2024-05-01T07:00:00Z</Id></Activity>"#).unwrap();
/// assert_eq!(tree["Activity"]["$"]["Sport"], "Running");
/// assert_eq!(tree["Activity"]["Id"], "2024-05-01T07:00:00Z");
/// ```
pub fn xml_to_tree(text: &str) -> Result<Value> {
    let document = Document::parse(text)?;
    let root = document.root_element();

    let mut tree = Map::new();
    tree.insert(root.tag_name().name().to_string(), element_to_value(root));
    Ok(Value::Object(tree))
}

fn element_to_value(element: Node) -> Value {
    let attributes: Map<String, Value> = element
        .attributes()
        .map(|attr| (attr.name().to_string(), Value::String(attr.value().to_string())))
        .collect();

    let mut children = Map::new();
    let mut text = String::new();

    for child in element.children() {
        if child.is_element() {
            let name = child.tag_name().name().to_string();
            let value = element_to_value(child);
            match children.get_mut(&name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    children.insert(name, value);
                }
            }
        } else if child.is_text() {
            text.push_str(child.text().unwrap_or_default());
        }
    }

    let text = text.trim();
    if attributes.is_empty() && children.is_empty() {
        return Value::String(text.to_string());
    }
    if !text.is_empty() {
        children.insert("_".to_string(), Value::String(text.to_string()));
    }
    if !attributes.is_empty() {
        children.insert("$".to_string(), Value::Object(attributes));
    }
    Value::Object(children)
}
