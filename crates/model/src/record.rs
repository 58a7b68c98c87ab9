//! Record values and identifiers
//!
//! Records travel through corral as JSON object maps; the schema decides which
//! attribute holds the primary key. Identifiers are integers or strings
//! depending on the model's key type.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Field name -> value payload, used for creation and as record storage
pub type FieldMap = serde_json::Map<String, Value>;

/// A resolved primary-key value
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Auto-incrementing integer key
    Int(i64),
    /// String key (slugs, UUIDs rendered as text, ...)
    Str(String),
}

impl RecordId {
    /// Extract an identifier from a JSON value.
    ///
    /// Accepts integers and non-empty strings; everything else (objects,
    /// arrays, floats, null) does not identify a record.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(RecordId::Int),
            Value::String(s) if !s.is_empty() => Some(RecordId::Str(s.clone())),
            _ => None,
        }
    }

    /// Extract as i64 if this is an integer key
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RecordId::Int(id) => Some(*id),
            _ => None,
        }
    }

    /// Extract as &str if this is a string key
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RecordId::Str(id) => Some(id),
            _ => None,
        }
    }

    /// The identifier as a JSON value
    pub fn to_value(&self) -> Value {
        match self {
            RecordId::Int(id) => Value::from(*id),
            RecordId::Str(id) => Value::from(id.clone()),
        }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(id) => write!(f, "{}", id),
            RecordId::Str(id) => write!(f, "{}", id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Int(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Str(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        RecordId::Str(id)
    }
}

/// A stored entity: an object map of attribute values
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: FieldMap,
}

impl Record {
    pub fn new(fields: FieldMap) -> Self {
        Self { fields }
    }

    /// Get an attribute value
    pub fn get(&self, attr: &str) -> Option<&Value> {
        self.fields.get(attr)
    }

    /// Set an attribute value
    pub fn set(&mut self, attr: &str, value: Value) {
        self.fields.insert(attr.to_string(), value);
    }

    /// The identifier stored under the given primary-key attribute
    pub fn id(&self, pk_attr: &str) -> Option<RecordId> {
        self.fields.get(pk_attr).and_then(RecordId::from_value)
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }
}

impl From<FieldMap> for Record {
    fn from(fields: FieldMap) -> Self {
        Self::new(fields)
    }
}

/// Convenience for building field maps in tests and fixtures
pub fn fields(pairs: &[(&str, Value)]) -> FieldMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
