//! Runtime value types and the stored value representation.
//!
//! Every field kind declares one [`ValueType`]. A field instance holds a
//! [`Value`] of that type in memory and a [`StoredValue`] at rest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// The closed set of runtime value types a field kind can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ValueType {
    /// Free text, HTML, markdown, colors and other string payloads
    Text,
    /// Checkbox-style flags
    Bool,
    /// Optional whole numbers
    Integer,
    /// Optional UTC instants
    DateTime,
    /// Optional link to another stored object (media, page, post)
    Reference,
}

impl ValueType {
    /// Stable lowercase name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Text => "text",
            ValueType::Bool => "bool",
            ValueType::Integer => "integer",
            ValueType::DateTime => "date-time",
            ValueType::Reference => "reference",
        }
    }

    /// The documented zero value returned for empty or malformed payloads.
    pub fn zero(self) -> Value {
        match self {
            ValueType::Text => Value::Text(String::new()),
            ValueType::Bool => Value::Bool(false),
            ValueType::Integer => Value::Integer(None),
            ValueType::DateTime => Value::DateTime(None),
            ValueType::Reference => Value::Reference(None),
        }
    }
}

impl std::fmt::Display for ValueType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Value {
    Text(String),
    Bool(bool),
    Integer(Option<i64>),
    DateTime(Option<DateTime<Utc>>),
    Reference(Option<Ulid>),
}

impl Value {
    /// The runtime type of this value.
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Text(_) => ValueType::Text,
            Value::Bool(_) => ValueType::Bool,
            Value::Integer(_) => ValueType::Integer,
            Value::DateTime(_) => ValueType::DateTime,
            Value::Reference(_) => ValueType::Reference,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// True when this is the zero value of its type.
    pub fn is_zero(&self) -> bool {
        *self == self.value_type().zero()
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(Some(n))
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::DateTime(Some(t))
    }
}

impl From<Ulid> for Value {
    fn from(id: Ulid) -> Self {
        Value::Reference(Some(id))
    }
}

/// The at-rest form of a field instance.
///
/// This pair is the contract other tooling must honor when reading or writing
/// content directly against storage: `discriminator` is a registered field kind
/// name and `payload` is that kind's text encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoredValue {
    pub discriminator: String,
    pub payload: String,
}

impl StoredValue {
    pub fn new(discriminator: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            discriminator: discriminator.into(),
            payload: payload.into(),
        }
    }
}
