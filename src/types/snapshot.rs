//! Raw and decrypted telemetry snapshots

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unprocessed fetch result: field name → opaque JSON value
pub type RawSnapshot = serde_json::Map<String, Value>;

/// Snapshot after decryption and type coercion
pub type DecryptedSnapshot = BTreeMap<String, Scalar>;

/// A typed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
    /// Arrays and objects are carried through untouched
    Nested(Value),
}

impl Scalar {
    /// Map a JSON value without any decryption or coercion
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => n.as_f64().map(Scalar::Number).unwrap_or(Scalar::Null),
            Value::String(s) => Scalar::Text(s.clone()),
            Value::Null => Scalar::Null,
            other => Scalar::Nested(other.clone()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Loose truthiness used for switch-like device fields
    pub fn is_truthy(&self) -> bool {
        match self {
            Scalar::Bool(b) => *b,
            Scalar::Number(n) => *n != 0.0,
            Scalar::Text(s) => matches!(
                s.trim().to_ascii_lowercase().as_str(),
                "true" | "pressed" | "on" | "active" | "yes" | "1"
            ),
            Scalar::Null | Scalar::Nested(_) => false,
        }
    }

    /// Render as an opaque identifier (integral numbers lose the ".0")
    pub fn to_identifier(&self) -> Option<String> {
        match self {
            Scalar::Text(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Scalar::Number(n) if n.is_finite() => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    Some(format!("{}", *n as i64))
                } else {
                    Some(n.to_string())
                }
            }
            Scalar::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

/// How the normalizer treats one field before decryption
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldClass {
    /// Name is on the skip-list; value is kept as-is
    PassThrough,
    /// Long enough string; attempt decryption
    Candidate,
    /// Already typed (bool, number, null, nested) or too short to be ciphertext
    Typed,
}

/// Look up the first present, non-null field among aliases
pub fn first_field<'a>(snapshot: &'a DecryptedSnapshot, names: &[&str]) -> Option<&'a Scalar> {
    names
        .iter()
        .filter_map(|name| snapshot.get(*name))
        .find(|value| !matches!(value, Scalar::Null))
}
