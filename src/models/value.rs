//! Column and parameter values.
//!
//! [`Value`] is the single currency between the engine and drivers: bound
//! parameters are sent as values and every decoded column comes back as one.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A database value, used both for bound parameters and decoded columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// NULL value
    Null,
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    Float(f64),
    Text(String),
    /// Binary data (base64 encoded in JSON)
    #[serde(with = "base64_bytes")]
    Bytes(Vec<u8>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the type name of this value for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(v) => write!(f, "{}", v),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Text(v) => write!(f, "'{}'", v),
            Self::Bytes(v) => write!(f, "<{} bytes>", v.len()),
        }
    }
}

/// Custom serialization for binary data as base64.
mod base64_bytes {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Null.type_name(), "null");
        assert_eq!(Value::Int(3).type_name(), "int");
        assert_eq!(Value::Text("a".into()).type_name(), "text");
        assert_eq!(Value::Bytes(vec![1]).type_name(), "bytes");
    }

    #[test]
    fn test_untagged_json_shape() {
        let json = serde_json::to_string(&vec![
            Value::Int(542),
            Value::Text("King".to_string()),
            Value::Null,
        ])
        .unwrap();
        assert_eq!(json, r#"[542,"King",null]"#);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Text("x".into()).to_string(), "'x'");
        assert_eq!(Value::Bytes(vec![0, 1, 2]).to_string(), "<3 bytes>");
    }
}
