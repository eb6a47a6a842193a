use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Maximum number of operations in a single write batch.
pub const MAX_BATCH_OPERATIONS: usize = 100;

/// Maximum serialized size of an entity's attribute map in bytes (1 MiB).
pub const MAX_ENTITY_SIZE: usize = 1024 * 1024;

/// Reserved attribute name addressing an entity's partition key in filters.
pub const PARTITION_KEY: &str = "PartitionKey";

/// Reserved attribute name addressing an entity's row key in filters.
pub const ROW_KEY: &str = "RowKey";

/// Reserved attribute name addressing an entity's server timestamp in filters.
pub const TIMESTAMP: &str = "Timestamp";

/// The type of an attribute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttrType {
    String,
    Number,
    Bool,
    Timestamp,
    Binary,
}

/// A write timestamp in microseconds since the Unix epoch.
///
/// Timestamps are assigned by the storage layer on every successful write
/// and are monotonically non-decreasing per key; callers never construct
/// write timestamps themselves.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn from_micros(micros: i64) -> Self {
        Timestamp(micros)
    }

    pub fn as_micros(&self) -> i64 {
        self.0
    }

    /// Current wall-clock time. Used by backends as the floor for the
    /// timestamps they issue.
    pub(crate) fn wall() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as i64)
            .unwrap_or(0)
    }
}

/// A runtime-typed attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    String(String),
    Number(f64),
    Bool(bool),
    Timestamp(Timestamp),
    Binary(Vec<u8>),
}

impl AttrValue {
    pub fn attr_type(&self) -> AttrType {
        match self {
            AttrValue::String(_) => AttrType::String,
            AttrValue::Number(_) => AttrType::Number,
            AttrValue::Bool(_) => AttrType::Bool,
            AttrValue::Timestamp(_) => AttrType::Timestamp,
            AttrValue::Binary(_) => AttrType::Binary,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::String(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::String(s)
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Number(n as f64)
    }
}

impl From<i32> for AttrValue {
    fn from(n: i32) -> Self {
        AttrValue::Number(n as f64)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl From<Timestamp> for AttrValue {
    fn from(ts: Timestamp) -> Self {
        AttrValue::Timestamp(ts)
    }
}

impl From<Vec<u8>> for AttrValue {
    fn from(bytes: Vec<u8>) -> Self {
        AttrValue::Binary(bytes)
    }
}

/// An entity's attribute map, ordered by attribute name.
pub type AttrMap = BTreeMap<String, AttrValue>;

/// A stored record: attribute map plus its `(PartitionKey, RowKey)` identity.
///
/// `timestamp` is `None` on the caller side; the store assigns it on every
/// successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub partition_key: String,
    pub row_key: String,
    pub attrs: AttrMap,
    pub timestamp: Option<Timestamp>,
}

impl Entity {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Entity {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            attrs: AttrMap::new(),
            timestamp: None,
        }
    }

    /// Add an attribute (builder style).
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn attr(&self, name: &str) -> Option<&AttrValue> {
        self.attrs.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_ordering() {
        let a = Timestamp::from_micros(100);
        let b = Timestamp::from_micros(200);
        assert!(a < b);
        assert_eq!(a.as_micros(), 100);
    }

    #[test]
    fn test_attr_value_types() {
        assert_eq!(AttrValue::from("x").attr_type(), AttrType::String);
        assert_eq!(AttrValue::from(1.5).attr_type(), AttrType::Number);
        assert_eq!(AttrValue::from(true).attr_type(), AttrType::Bool);
        assert_eq!(
            AttrValue::from(Timestamp::from_micros(1)).attr_type(),
            AttrType::Timestamp
        );
        assert_eq!(AttrValue::from(vec![1u8, 2]).attr_type(), AttrType::Binary);
    }

    #[test]
    fn test_entity_builder() {
        let e = Entity::new("41", "29")
            .with_attr("Continent", "Europe")
            .with_attr("Population", 15_000_000_i64);
        assert_eq!(e.partition_key, "41");
        assert_eq!(e.row_key, "29");
        assert_eq!(e.attr("Continent"), Some(&AttrValue::from("Europe")));
        assert!(e.timestamp.is_none());
    }
}
