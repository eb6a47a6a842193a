//! Schema-driven conversion between typed records and stored attribute maps.
//!
//! A record declares its shape through [`TableRecord::schema`]: which fields
//! serve as the partition and row keys, and the name and type of every
//! mapped attribute. The codec is purely functional; it performs no I/O.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Error, Result, SchemaError};
use crate::types::{AttrMap, AttrType, AttrValue, Entity, Timestamp};

/// A mapped attribute definition (name + type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttrDef {
    pub name: String,
    pub attr_type: AttrType,
    pub required: bool,
}

/// Declares how a record maps onto a stored entity: which fields carry the
/// partition and row keys, and which fields are persisted as attributes.
///
/// Fields not named here are ignored by the codec; attributes present in
/// storage but absent from the schema are ignored on decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    pub partition_key: String,
    pub row_key: String,
    pub attributes: Vec<AttrDef>,
}

impl RecordSchema {
    /// Name the record fields serving as partition and row key.
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        RecordSchema {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
            attributes: Vec::new(),
        }
    }

    /// Add a required attribute mapping.
    pub fn attr(mut self, name: impl Into<String>, attr_type: AttrType) -> Self {
        self.attributes.push(AttrDef {
            name: name.into(),
            attr_type,
            required: true,
        });
        self
    }

    /// Add an optional attribute mapping. Absent on either side is fine.
    pub fn optional_attr(mut self, name: impl Into<String>, attr_type: AttrType) -> Self {
        self.attributes.push(AttrDef {
            name: name.into(),
            attr_type,
            required: false,
        });
        self
    }
}

/// Capability interface for records storable in a table.
pub trait TableRecord: Serialize + DeserializeOwned {
    fn schema() -> RecordSchema;
}

/// Encode a record into an [`Entity`] according to its schema.
pub fn encode<T: TableRecord>(record: &T) -> Result<Entity> {
    let schema = T::schema();
    let value = serde_json::to_value(record)
        .map_err(|e| SchemaError::InvalidRecord(e.to_string()))?;
    let obj = match value.as_object() {
        Some(obj) => obj,
        None => {
            return Err(SchemaError::InvalidRecord(
                "record must serialize to an object".to_string(),
            )
            .into())
        }
    };

    let partition_key = key_field(obj, &schema.partition_key)?;
    let row_key = key_field(obj, &schema.row_key)?;

    let mut attrs = AttrMap::new();
    for def in &schema.attributes {
        match obj.get(&def.name) {
            Some(Value::Null) | None => {
                if def.required {
                    return Err(SchemaError::MissingAttribute(def.name.clone()).into());
                }
            }
            Some(v) => {
                attrs.insert(def.name.clone(), json_to_attr_value(v, def.attr_type, &def.name)?);
            }
        }
    }

    Ok(Entity {
        partition_key,
        row_key,
        attrs,
        timestamp: None,
    })
}

/// Decode an [`Entity`] back into a record according to its schema.
///
/// Attributes the schema does not name are ignored; a required attribute
/// missing from the stored map fails with [`SchemaError::MissingAttribute`].
pub fn decode<T: TableRecord>(entity: &Entity) -> Result<T> {
    let schema = T::schema();
    let mut obj = Map::new();
    obj.insert(
        schema.partition_key.clone(),
        Value::String(entity.partition_key.clone()),
    );
    obj.insert(schema.row_key.clone(), Value::String(entity.row_key.clone()));

    for def in &schema.attributes {
        match entity.attrs.get(&def.name) {
            Some(v) => {
                obj.insert(def.name.clone(), attr_value_to_json(v));
            }
            None if def.required => {
                return Err(SchemaError::MissingAttribute(def.name.clone()).into());
            }
            None => {}
        }
    }

    serde_json::from_value(Value::Object(obj))
        .map_err(|e| Error::from(SchemaError::InvalidRecord(e.to_string())))
}

/// Extract a key field from a serialized record: must exist, be a string,
/// and be non-empty.
fn key_field(obj: &Map<String, Value>, name: &str) -> Result<String> {
    let value = obj
        .get(name)
        .ok_or_else(|| SchemaError::MissingAttribute(name.to_string()))?;
    let s = value.as_str().ok_or_else(|| SchemaError::TypeMismatch {
        name: name.to_string(),
        expected: AttrType::String,
        actual: infer_attr_type(value),
    })?;
    if s.is_empty() {
        return Err(SchemaError::EmptyKey(name.to_string()).into());
    }
    Ok(s.to_string())
}

/// Convert a JSON value to an [`AttrValue`], given the expected [`AttrType`].
pub fn json_to_attr_value(val: &Value, attr_type: AttrType, name: &str) -> Result<AttrValue> {
    let mismatch = || SchemaError::TypeMismatch {
        name: name.to_string(),
        expected: attr_type,
        actual: infer_attr_type(val),
    };
    match attr_type {
        AttrType::String => {
            let s = val.as_str().ok_or_else(mismatch)?;
            Ok(AttrValue::String(s.to_string()))
        }
        AttrType::Number => {
            let n = val.as_f64().ok_or_else(mismatch)?;
            Ok(AttrValue::Number(n))
        }
        AttrType::Bool => {
            let b = val.as_bool().ok_or_else(mismatch)?;
            Ok(AttrValue::Bool(b))
        }
        AttrType::Timestamp => {
            let micros = val.as_i64().ok_or_else(mismatch)?;
            Ok(AttrValue::Timestamp(Timestamp::from_micros(micros)))
        }
        AttrType::Binary => {
            let arr = val.as_array().ok_or_else(mismatch)?;
            let bytes: Vec<u8> = arr
                .iter()
                .map(|v| v.as_u64().map(|n| n as u8).ok_or_else(mismatch))
                .collect::<std::result::Result<_, _>>()?;
            Ok(AttrValue::Binary(bytes))
        }
    }
}

/// Infer an [`AttrType`] from a JSON value (for error messages).
fn infer_attr_type(val: &Value) -> AttrType {
    if val.is_string() {
        AttrType::String
    } else if val.is_number() {
        AttrType::Number
    } else if val.is_boolean() {
        AttrType::Bool
    } else {
        AttrType::Binary
    }
}

/// Convert an [`AttrValue`] back to a JSON value.
pub fn attr_value_to_json(value: &AttrValue) -> Value {
    match value {
        AttrValue::String(s) => Value::String(s.clone()),
        AttrValue::Number(n) => Value::from(*n),
        AttrValue::Bool(b) => Value::Bool(*b),
        AttrValue::Timestamp(ts) => Value::from(ts.as_micros()),
        AttrValue::Binary(b) => {
            let arr: Vec<Value> = b.iter().map(|&byte| Value::from(byte)).collect();
            Value::Array(arr)
        }
    }
}
