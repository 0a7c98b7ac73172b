//! Domain-side values.

use crate::Result;
use crate::error::{Error, MappingErrorKind};
use serde::{Deserialize, Serialize};

/// A domain value, as produced by an adapter's `to_domain` and consumed by
/// entity field setters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Absent value
    Null,

    /// Boolean
    Bool(bool),

    /// Integer
    Int(i64),

    /// String
    Text(String),

    /// Structured JSON document
    Json(serde_json::Value),

    /// Associative JSON object (keyed entries)
    Map(serde_json::Map<String, serde_json::Value>),

    /// Associative JSON array (positional entries)
    List(Vec<serde_json::Value>),
}

impl FieldValue {
    /// Check if this value is absent.
    pub const fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Get the domain type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "bool",
            FieldValue::Int(_) => "int",
            FieldValue::Text(_) => "string",
            FieldValue::Json(_) => "json",
            FieldValue::Map(_) => "map",
            FieldValue::List(_) => "list",
        }
    }

    /// Text form used when flattening primary keys into a lookup string.
    pub fn key_text(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            FieldValue::Int(i) => i.to_string(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Json(j) => j.to_string(),
            FieldValue::Map(m) => serde_json::Value::Object(m.clone()).to_string(),
            FieldValue::List(l) => serde_json::Value::Array(l.clone()).to_string(),
        }
    }

    /// Extract a typed value.
    #[allow(clippy::result_large_err)]
    pub fn extract<T: FromField>(self) -> Result<T> {
        T::from_field(self)
    }
}

fn mismatch(expected: &str, found: &FieldValue) -> Error {
    Error::mapping(
        MappingErrorKind::TypeMismatch,
        "",
        format!("expected {expected}, found {}", found.type_name()),
    )
}

/// Trait for converting a `FieldValue` into a typed entity field.
pub trait FromField: Sized {
    /// Convert from a FieldValue, returning an error if the types differ.
    #[allow(clippy::result_large_err)]
    fn from_field(value: FieldValue) -> Result<Self>;
}

impl FromField for FieldValue {
    fn from_field(value: FieldValue) -> Result<Self> {
        Ok(value)
    }
}

impl FromField for bool {
    fn from_field(value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::Bool(b) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

impl FromField for i64 {
    fn from_field(value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::Int(i) => Ok(i),
            other => Err(mismatch("int", &other)),
        }
    }
}

impl FromField for i32 {
    fn from_field(value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::Int(i) => i32::try_from(i).map_err(|_| {
                Error::mapping(
                    MappingErrorKind::TypeMismatch,
                    "",
                    format!("value {i} out of range for i32"),
                )
            }),
            other => Err(mismatch("int", &other)),
        }
    }
}

impl FromField for String {
    fn from_field(value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::Text(s) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl FromField for serde_json::Value {
    fn from_field(value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::Json(j) => Ok(j),
            FieldValue::Map(m) => Ok(serde_json::Value::Object(m)),
            FieldValue::List(l) => Ok(serde_json::Value::Array(l)),
            other => Err(mismatch("json", &other)),
        }
    }
}

impl FromField for serde_json::Map<String, serde_json::Value> {
    fn from_field(value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::Map(m) => Ok(m),
            other => Err(mismatch("map", &other)),
        }
    }
}

impl FromField for Vec<serde_json::Value> {
    fn from_field(value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::List(l) => Ok(l),
            other => Err(mismatch("list", &other)),
        }
    }
}

impl<T: FromField> FromField for Option<T> {
    fn from_field(value: FieldValue) -> Result<Self> {
        match value {
            FieldValue::Null => Ok(None),
            other => T::from_field(other).map(Some),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(i64::from(v))
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        FieldValue::Json(v)
    }
}

impl From<serde_json::Map<String, serde_json::Value>> for FieldValue {
    fn from(v: serde_json::Map<String, serde_json::Value>) -> Self {
        FieldValue::Map(v)
    }
}

impl From<Vec<serde_json::Value>> for FieldValue {
    fn from(v: Vec<serde_json::Value>) -> Self {
        FieldValue::List(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(FieldValue::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_typed_values() {
        assert_eq!(FieldValue::Int(7).extract::<i64>().unwrap(), 7);
        assert_eq!(FieldValue::Int(7).extract::<i32>().unwrap(), 7);
        assert_eq!(
            FieldValue::Text("Ada".into()).extract::<String>().unwrap(),
            "Ada"
        );
        assert_eq!(FieldValue::Null.extract::<Option<String>>().unwrap(), None);
        assert_eq!(
            FieldValue::Bool(true).extract::<Option<bool>>().unwrap(),
            Some(true)
        );
    }

    #[test]
    fn extract_reports_mismatch() {
        let err = FieldValue::Text("x".into()).extract::<i64>().unwrap_err();
        assert!(matches!(
            err,
            Error::Mapping(ref e) if e.kind == MappingErrorKind::TypeMismatch
        ));
        assert!(FieldValue::Int(i64::MAX).extract::<i32>().is_err());
    }

    #[test]
    fn key_text_forms() {
        assert_eq!(FieldValue::Int(7).key_text(), "7");
        assert_eq!(FieldValue::Bool(false).key_text(), "0");
        assert_eq!(FieldValue::Null.key_text(), "");
    }
}
