//! Flattening of supplier XML feeds into field maps.
//!
//! Suppliers disagree on whether values live in attributes or child
//! elements, so each matching element becomes one [`FeedItem`] holding both:
//! attributes first, then the trimmed text of each direct child element.

use std::collections::BTreeMap;

use roxmltree::{Document, Node, ParsingOptions};
use thiserror::Error;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("feed is not well-formed XML: {0}")]
    Malformed(String),
}

/// One product-like element, flattened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedItem {
    fields: BTreeMap<String, String>,
}

impl FeedItem {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let mut item = Self::default();
        for (name, value) in pairs {
            item.insert(name, value);
        }
        item
    }

    fn insert(&mut self, name: &str, value: &str) {
        self.fields
            .entry(name.to_owned())
            .or_insert_with(|| value.trim().to_owned());
    }

    /// Non-empty value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    /// First non-empty value among `aliases`, in precedence order.
    pub fn first_of(&self, aliases: &FieldAliases) -> Option<&str> {
        aliases.names.iter().find_map(|name| self.get(name))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Ordered source field names for one canonical field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldAliases {
    pub field: &'static str,
    pub names: &'static [&'static str],
}

impl FieldAliases {
    pub const fn new(field: &'static str, names: &'static [&'static str]) -> Self {
        Self { field, names }
    }
}

/// Decodes feed bytes as UTF-8, dropping a BOM and replacing invalid sequences.
pub fn decode(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

/// Returns every element named one of `tags`, anywhere in the document.
///
/// Empty or whitespace-only input is an empty feed, not an error.
pub fn parse_items(bytes: &[u8], tags: &[&str]) -> Result<Vec<FeedItem>, FeedError> {
    let text = decode(bytes);
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    let document = Document::parse_with_options(&text, options)
        .map_err(|error| FeedError::Malformed(error.to_string()))?;

    Ok(document
        .descendants()
        .filter(|node| node.is_element() && tags.contains(&node.tag_name().name()))
        .map(flatten)
        .collect())
}

fn flatten(node: Node<'_, '_>) -> FeedItem {
    let mut item = FeedItem::default();
    for attribute in node.attributes() {
        item.insert(attribute.name(), attribute.value());
    }
    for child in node.children().filter(Node::is_element) {
        let text = child
            .descendants()
            .filter(Node::is_text)
            .filter_map(|text| text.text())
            .collect::<String>();
        item.insert(child.tag_name().name(), &text);
    }
    item
}

#[cfg(test)]
mod tests {
    use super::*;

    const CODE: FieldAliases = FieldAliases::new("code", &["sku", "code"]);

    #[test]
    fn attributes_and_children_are_flattened() {
        let xml = br#"<?xml version="1.0" encoding="UTF-8"?>
            <catalog>
              <products>
                <product code="A1"><name> Fan </name><price>10,50</price></product>
                <product><code>B2</code><name><![CDATA[Lamp & shade]]></name></product>
              </products>
            </catalog>"#;

        let items = parse_items(xml, &["product"]).expect("parse");

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].get("code"), Some("A1"));
        assert_eq!(items[0].get("name"), Some("Fan"));
        assert_eq!(items[0].get("price"), Some("10,50"));
        assert_eq!(items[1].get("name"), Some("Lamp & shade"));
    }

    #[test]
    fn aliases_resolve_in_order_skipping_blanks() {
        let item = FeedItem::from_pairs([("sku", "  "), ("code", "C3")]);
        assert_eq!(item.first_of(&CODE), Some("C3"));
    }

    #[test]
    fn empty_and_element_free_feeds_yield_no_items() {
        assert!(parse_items(b"", &["product"]).expect("empty").is_empty());
        assert!(parse_items(b"  \n", &["product"]).expect("blank").is_empty());
        assert!(parse_items(b"<products/>", &["product"]).expect("none").is_empty());
    }

    #[test]
    fn bom_is_stripped_and_broken_xml_is_reported() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"<products><product code=\"A\"/></products>");
        assert_eq!(parse_items(&bytes, &["product"]).expect("bom").len(), 1);

        let error = parse_items(b"<products><product>", &["product"]).expect_err("broken");
        assert!(matches!(error, FeedError::Malformed(_)));
    }
}
