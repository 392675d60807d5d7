//! Uniform property access across entry variants.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use super::ModelError;

/// Properties every entry exposes.
pub const OBJECT_PROPERTIES: &[&str] = &[
    "@id",
    "@parentID",
    "upnp:class",
    "dc:title",
    "dc:creator",
    "@restricted",
    "upnp:writeStatus",
];

pub const ITEM_PROPERTIES: &[&str] = &["@refID"];

pub const CONTAINER_PROPERTIES: &[&str] = &["@childCount", "@searchable", "upnp:containerUpdateID"];

/// Properties maintained by the catalog itself.
pub const READ_ONLY_PROPERTIES: &[&str] = &[
    "@id",
    "@parentID",
    "upnp:class",
    "@childCount",
    "upnp:containerUpdateID",
];

/// A property value as seen by rendering and ingestion layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    Integer(i64),
    Bool(bool),
}

impl PropertyValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            PropertyValue::Bool(_) => 0,
            PropertyValue::Integer(_) => 1,
            PropertyValue::Text(_) => 2,
        }
    }

    /// Ordering used when sorting browse results. Text compares case-insensitively.
    pub fn sort_cmp(&self, other: &PropertyValue) -> Ordering {
        match (self, other) {
            (PropertyValue::Text(a), PropertyValue::Text(b)) => a
                .to_lowercase()
                .cmp(&b.to_lowercase())
                .then_with(|| a.cmp(b)),
            (PropertyValue::Integer(a), PropertyValue::Integer(b)) => a.cmp(b),
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Text(s) => f.write_str(s),
            PropertyValue::Integer(n) => write!(f, "{n}"),
            PropertyValue::Bool(b) => f.write_str(if *b { "1" } else { "0" }),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::Text(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Integer(value)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

/// Property access for the columns one hierarchy level introduces.
///
/// `get` and `set` return `None` when `name` does not belong to the level,
/// so levels of one lineage can be tried in turn.
pub(crate) trait PropertyLevel {
    const NAMES: &'static [&'static str];

    fn get(&self, name: &str) -> Option<PropertyValue>;

    fn set(&mut self, name: &str, value: &PropertyValue) -> Option<Result<(), ModelError>>;
}

pub(crate) fn text(name: &str, value: &PropertyValue) -> Result<String, ModelError> {
    value
        .as_text()
        .map(str::to_string)
        .ok_or_else(|| type_mismatch(name, "text"))
}

pub(crate) fn integer(name: &str, value: &PropertyValue) -> Result<i64, ModelError> {
    value.as_integer().ok_or_else(|| type_mismatch(name, "integer"))
}

pub(crate) fn boolean(name: &str, value: &PropertyValue) -> Result<bool, ModelError> {
    value.as_bool().ok_or_else(|| type_mismatch(name, "bool"))
}

fn type_mismatch(name: &str, expected: &'static str) -> ModelError {
    ModelError::TypeMismatch {
        property: name.to_string(),
        expected,
    }
}

/// Assign `value` to a text slot.
pub(crate) fn assign_text(
    slot: &mut String,
    name: &str,
    value: &PropertyValue,
) -> Result<(), ModelError> {
    *slot = text(name, value)?;
    Ok(())
}

/// Assign `value` to an integer slot.
pub(crate) fn assign_integer(
    slot: &mut i64,
    name: &str,
    value: &PropertyValue,
) -> Result<(), ModelError> {
    *slot = integer(name, value)?;
    Ok(())
}
