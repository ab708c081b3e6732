//! Typed model of a creative-editor design document.
//!
//! A design is `pages → cells → elements`. Only the fields the payload
//! optimizer touches are typed; every other key is carried through `extra`
//! untouched. Sub-trees that do not fit the typed shape (a page that is a
//! string, `elements` that is an object, ...) are kept as [`Lenient::Raw`] so
//! they round-trip verbatim and are skipped by every walk.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::error::DesignParseError;

/// Element `type` of embedded images.
pub const IMAGE_ELEMENT: &str = "image";

/// Key holding the SHA-256 of a replaced image.
pub const CONTENT_BACKUP: &str = "content_backup";

/// Key holding the original length of a replaced image.
pub const CONTENT_SIZE: &str = "content_size";

/// Flag telling the client to re-supply a replaced image.
pub const NEEDS_REUPLOAD: &str = "needs_reupload";

/// A value that is either the expected shape or kept raw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Lenient<T> {
    Parsed(T),
    Raw(Value),
}

impl<T> Lenient<T> {
    pub fn parsed_mut(&mut self) -> Option<&mut T> {
        match self {
            Lenient::Parsed(t) => Some(t),
            Lenient::Raw(_) => None,
        }
    }

    pub fn parsed(&self) -> Option<&T> {
        match self {
            Lenient::Parsed(t) => Some(t),
            Lenient::Raw(_) => None,
        }
    }
}

/// Root design document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub pages: Option<Lenient<Vec<Lenient<Page>>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub cells: Option<Lenient<Vec<Lenient<Cell>>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub elements: Option<Lenient<Vec<Lenient<Element>>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A placed object inside a cell (image, text, shape, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    #[serde(
        rename = "type",
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub kind: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub content: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub filters: Option<Lenient<Map<String, Value>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Element {
    pub fn is_image(&self) -> bool {
        matches!(&self.kind, Some(Value::String(k)) if k == IMAGE_ELEMENT)
    }

    /// Embedded content as text, when it is a string.
    pub fn content_str(&self) -> Option<&str> {
        self.content.as_ref().and_then(Value::as_str)
    }

    /// Filter map, when present and well-formed.
    pub fn filters_mut(&mut self) -> Option<&mut Map<String, Value>> {
        self.filters.as_mut().and_then(Lenient::parsed_mut)
    }
}

/// Outcome of [`DesignDocument::parse`].
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedDesign {
    /// An image-bearing design.
    Design(DesignDocument),
    /// An object without `pages`; handed back untouched.
    PassThrough(Value),
}

impl DesignDocument {
    /// Validate the top-level shape and read the typed model.
    ///
    /// The root must be an object. A root without `pages` is not a design
    /// this crate knows how to optimize and is returned as
    /// [`ParsedDesign::PassThrough`].
    pub fn parse(value: Value) -> Result<ParsedDesign, DesignParseError> {
        let has_pages = match &value {
            Value::Object(map) => map.contains_key("pages"),
            other => return Err(DesignParseError::NotAnObject(json_kind(other))),
        };
        if !has_pages {
            return Ok(ParsedDesign::PassThrough(value));
        }
        serde_json::from_value(value)
            .map(ParsedDesign::Design)
            .map_err(|e| DesignParseError::Malformed(e.to_string()))
    }

    /// Well-formed pages, skipping raw ones.
    pub fn pages_mut(&mut self) -> impl Iterator<Item = &mut Page> {
        self.pages
            .as_mut()
            .and_then(Lenient::parsed_mut)
            .into_iter()
            .flat_map(|pages| pages.iter_mut().filter_map(Lenient::parsed_mut))
    }

    /// Number of well-formed pages.
    pub fn page_count(&self) -> usize {
        self.pages
            .as_ref()
            .and_then(Lenient::parsed)
            .map(|pages| pages.iter().filter(|p| p.parsed().is_some()).count())
            .unwrap_or(0)
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

impl Page {
    pub fn cells_mut(&mut self) -> impl Iterator<Item = &mut Cell> {
        self.cells
            .as_mut()
            .and_then(Lenient::parsed_mut)
            .into_iter()
            .flat_map(|cells| cells.iter_mut().filter_map(Lenient::parsed_mut))
    }

    /// Page identifier, accepting numeric or string ids.
    pub fn id(&self) -> Option<String> {
        match self.extra.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl Cell {
    pub fn elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.elements
            .as_mut()
            .and_then(Lenient::parsed_mut)
            .into_iter()
            .flat_map(|elements| elements.iter_mut().filter_map(Lenient::parsed_mut))
    }
}

/// Deserialize a field that is present in the input, even when it is `null`.
///
/// Plain `Option<T>` maps `null` to `None`, which would drop the key on the
/// way out.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse_design(value: Value) -> DesignDocument {
        match DesignDocument::parse(value).unwrap() {
            ParsedDesign::Design(doc) => doc,
            ParsedDesign::PassThrough(_) => panic!("expected a design"),
        }
    }

    #[test]
    fn test_parse_rejects_non_object_root() {
        let err = DesignDocument::parse(json!([1, 2])).unwrap_err();
        assert_eq!(err, DesignParseError::NotAnObject("array"));
    }

    #[test]
    fn test_parse_without_pages_passes_through() {
        let value = json!({"title": "Album"});
        let parsed = DesignDocument::parse(value.clone()).unwrap();
        assert_eq!(parsed, ParsedDesign::PassThrough(value));
    }

    #[test]
    fn test_round_trip_preserves_unknown_fields() {
        let value = json!({
            "version": 3,
            "pages": [{
                "id": "p1",
                "layout": "grid",
                "cells": [{
                    "id": "c1",
                    "elements": [
                        {"type": "text", "text": "Hi", "x": 1.5},
                        {"type": "image", "content": "data:image/png;base64,AAAA", "filters": {"hue": 10}}
                    ]
                }]
            }]
        });
        let doc = parse_design(value.clone());
        assert_eq!(doc.to_value().unwrap(), value);
    }

    #[test]
    fn test_malformed_subtrees_are_kept_raw() {
        let value = json!({
            "pages": [
                "not a page",
                {"cells": {"oops": true}},
                {"cells": [{"elements": 7}, 42]},
                {"cells": null}
            ]
        });
        let mut doc = parse_design(value.clone());
        assert_eq!(doc.page_count(), 3);
        // nothing well-formed below the pages
        let elements: usize = doc
            .pages_mut()
            .flat_map(|p| p.cells_mut())
            .map(|c| c.elements_mut().count())
            .sum();
        assert_eq!(elements, 0);
        assert_eq!(doc.to_value().unwrap(), value);
    }

    #[test]
    fn test_non_array_pages_is_kept_raw() {
        let value = json!({"pages": {"0": {}}});
        let doc = parse_design(value.clone());
        assert!(matches!(doc.pages, Some(Lenient::Raw(_))));
        assert_eq!(doc.page_count(), 0);
        assert_eq!(doc.to_value().unwrap(), value);
    }

    #[test]
    fn test_element_helpers() {
        let mut doc = parse_design(json!({
            "pages": [{"cells": [{"elements": [
                {"type": "image", "content": "data:image/png;base64,AA", "filters": "corrupt"}
            ]}]}]
        }));
        let element = doc
            .pages_mut()
            .flat_map(|p| p.cells_mut())
            .flat_map(|c| c.elements_mut())
            .next()
            .unwrap();
        assert!(element.is_image());
        assert_eq!(element.content_str(), Some("data:image/png;base64,AA"));
        assert!(element.filters_mut().is_none());
    }

    #[test]
    fn test_page_id_accepts_numbers() {
        let mut doc = parse_design(json!({"pages": [{"id": 7}, {"id": "cover"}, {}]}));
        let ids: Vec<Option<String>> = doc.pages_mut().map(|p| p.id()).collect();
        assert_eq!(ids, vec![Some("7".into()), Some("cover".into()), None]);
    }
}
