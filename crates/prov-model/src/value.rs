//! Typed attribute values
//!
//! Node attributes and extras are trees of [`AttributeValue`]. The JSON form
//! is the archive encoding, so it has to round-trip exactly:
//!
//! - integers stay integers and floats keep a fractional part or exponent
//! - timestamps carry their UTC offset and are wrapped as
//!   `{"$timestamp": "<RFC 3339>"}` so they never decay into plain strings
//! - mappings with a key starting with `$` are wrapped as `{"$map": {...}}`
//!   so they cannot be mistaken for a tagged value
//!
//! Non-finite floats have no JSON representation and encode as `null`.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute or extras mapping of a node
pub type Attributes = BTreeMap<String, AttributeValue>;

/// A typed scalar or nested value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// Explicit absence of a value
    Null,
    /// Boolean flag
    Bool(bool),
    /// Signed 64-bit integer
    Integer(i64),
    /// Double precision float
    Float(f64),
    /// Timezone-aware instant
    Timestamp(Timestamp),
    /// UTF-8 text
    String(String),
    /// Ordered sequence
    List(Vec<AttributeValue>),
    /// Nested mapping
    Map(#[serde(with = "escaped_map")] BTreeMap<String, AttributeValue>),
}

/// Timezone-aware timestamp wrapper used by the tagged JSON form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Timestamp {
    /// Instant with its original offset preserved
    #[serde(rename = "$timestamp")]
    pub value: DateTime<FixedOffset>,
}

/// JSON form of nested mappings
mod escaped_map {
    use super::AttributeValue;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::collections::BTreeMap;

    const ESCAPE: char = '$';

    #[derive(Serialize)]
    struct EscapedRef<'a> {
        #[serde(rename = "$map")]
        map: &'a BTreeMap<String, AttributeValue>,
    }

    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct Escaped {
        #[serde(rename = "$map")]
        map: BTreeMap<String, AttributeValue>,
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Escaped(Escaped),
        Plain(BTreeMap<String, AttributeValue>),
    }

    fn needs_escape(map: &BTreeMap<String, AttributeValue>) -> bool {
        map.keys().any(|key| key.starts_with(ESCAPE))
    }

    pub(super) fn serialize<S: Serializer>(
        map: &BTreeMap<String, AttributeValue>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        if needs_escape(map) {
            EscapedRef { map }.serialize(serializer)
        } else {
            map.serialize(serializer)
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<String, AttributeValue>, D::Error> {
        Ok(match Repr::deserialize(deserializer)? {
            Repr::Escaped(escaped) => escaped.map,
            Repr::Plain(map) => map,
        })
    }
}

impl AttributeValue {
    /// Build a timestamp value keeping the given offset
    #[inline]
    #[must_use]
    pub fn timestamp(value: DateTime<FixedOffset>) -> Self {
        Self::Timestamp(Timestamp { value })
    }

    /// Borrow as string if this is a string value
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value, if any
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Float value, if any
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Boolean value, if any
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Timestamp value, if any
    #[must_use]
    pub fn as_timestamp(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            Self::Timestamp(t) => Some(t.value),
            _ => None,
        }
    }

    /// Borrow as nested mapping, if any
    #[must_use]
    pub fn as_map(&self) -> Option<&BTreeMap<String, AttributeValue>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Walk nested mappings along `path`
    ///
    /// Returns `None` as soon as a segment is missing or a non-mapping value
    /// is reached before the end of the path.
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&AttributeValue> {
        let mut current = self;
        for segment in path {
            current = current.as_map()?.get(*segment)?;
        }
        Some(current)
    }
}

/// Look up a dotted path starting from a top-level attributes mapping
#[must_use]
pub fn lookup<'a>(attributes: &'a Attributes, path: &[&str]) -> Option<&'a AttributeValue> {
    let (first, rest) = path.split_first()?;
    attributes.get(*first)?.get_path(rest)
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<FixedOffset>> for AttributeValue {
    fn from(value: DateTime<FixedOffset>) -> Self {
        Self::timestamp(value)
    }
}

impl From<DateTime<Utc>> for AttributeValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::timestamp(value.fixed_offset())
    }
}

impl From<Vec<AttributeValue>> for AttributeValue {
    fn from(value: Vec<AttributeValue>) -> Self {
        Self::List(value)
    }
}

impl From<BTreeMap<String, AttributeValue>> for AttributeValue {
    fn from(value: BTreeMap<String, AttributeValue>) -> Self {
        Self::Map(value)
    }
}
