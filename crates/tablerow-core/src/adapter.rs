//! Type adapters: conversion between one domain value type and one storage
//! representation.
//!
//! Every adapter satisfies the round-trip law: for any domain value `v` it
//! accepts, `to_domain(&to_storage(&v)?)? == v`. All adapters map `Null` to
//! `Null` in both directions; nullability is a column concern.

use crate::Result;
use crate::error::{DecodeError, Error, MappingErrorKind};
use crate::field_value::FieldValue;
use crate::types::StorageType;
use crate::value::Value;
use std::fmt;

/// Converts values for a single column.
pub trait TypeAdapter: fmt::Debug + Send + Sync {
    /// Name of the domain type this adapter produces, e.g. `"int"`.
    fn domain_type_name(&self) -> &'static str;

    /// Storage type tag consumed by DDL generators.
    fn storage_type(&self) -> StorageType;

    /// Convert a storage value into its domain value.
    #[allow(clippy::result_large_err)]
    fn to_domain(&self, value: &Value) -> Result<FieldValue>;

    /// Convert a domain value into its storage value.
    #[allow(clippy::result_large_err)]
    fn to_storage(&self, value: &FieldValue) -> Result<Value>;
}

fn wrong_domain(adapter: &dyn TypeAdapter, value: &FieldValue) -> Error {
    Error::mapping(
        MappingErrorKind::TypeMismatch,
        "",
        format!(
            "{} adapter cannot store a {} value",
            adapter.domain_type_name(),
            value.type_name()
        ),
    )
}

/// Integer values stored in `INTEGER(n)` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntegerAdapter {
    size: u32,
}

impl IntegerAdapter {
    /// Create an adapter with the given display size.
    pub const fn new(size: u32) -> Self {
        Self { size }
    }

    /// Display size hint.
    pub const fn size(&self) -> u32 {
        self.size
    }
}

impl Default for IntegerAdapter {
    fn default() -> Self {
        Self::new(10)
    }
}

impl TypeAdapter for IntegerAdapter {
    fn domain_type_name(&self) -> &'static str {
        "int"
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Integer(self.size)
    }

    #[allow(clippy::cast_possible_truncation, clippy::float_cmp)]
    fn to_domain(&self, value: &Value) -> Result<FieldValue> {
        match value {
            Value::Null => Ok(FieldValue::Null),
            Value::BigInt(i) => Ok(FieldValue::Int(*i)),
            Value::Bool(b) => Ok(FieldValue::Int(i64::from(*b))),
            Value::Double(d) if d.fract() == 0.0 && d.is_finite() => {
                Ok(FieldValue::Int(*d as i64))
            }
            Value::Text(s) => s.trim().parse::<i64>().map(FieldValue::Int).map_err(|e| {
                DecodeError::new("int", format!("'{s}' is not an integer"))
                    .with_source(e)
                    .into()
            }),
            other => Err(DecodeError::new(
                "int",
                format!("cannot read an integer from {}", other.type_name()),
            )
            .into()),
        }
    }

    fn to_storage(&self, value: &FieldValue) -> Result<Value> {
        match value {
            FieldValue::Null => Ok(Value::Null),
            FieldValue::Int(i) => Ok(Value::BigInt(*i)),
            FieldValue::Bool(b) => Ok(Value::BigInt(i64::from(*b))),
            FieldValue::Text(s) => s
                .trim()
                .parse::<i64>()
                .map(Value::BigInt)
                .map_err(|_| wrong_domain(self, value)),
            other => Err(wrong_domain(self, other)),
        }
    }
}

/// Variable-length strings with a maximum length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringAdapter {
    max_length: u32,
    base: String,
}

impl StringAdapter {
    /// Create a `VARCHAR(max_length)` adapter.
    pub fn new(max_length: u32) -> Self {
        Self::with_base(max_length, "VARCHAR")
    }

    /// Create an adapter with a custom base type, e.g. `CHAR`.
    pub fn with_base(max_length: u32, base: &str) -> Self {
        Self {
            max_length,
            base: base.to_string(),
        }
    }

    /// Maximum number of characters.
    pub const fn max_length(&self) -> u32 {
        self.max_length
    }
}

impl Default for StringAdapter {
    fn default() -> Self {
        Self::new(255)
    }
}

impl TypeAdapter for StringAdapter {
    fn domain_type_name(&self) -> &'static str {
        "string"
    }

    fn storage_type(&self) -> StorageType {
        StorageType::sized(&self.base, self.max_length)
    }

    fn to_domain(&self, value: &Value) -> Result<FieldValue> {
        match value {
            Value::Null => Ok(FieldValue::Null),
            Value::Bytes(b) => String::from_utf8(b.clone())
                .map(FieldValue::Text)
                .map_err(|e| {
                    DecodeError::new("string", "binary value is not valid UTF-8")
                        .with_source(e)
                        .into()
                }),
            other => Ok(FieldValue::Text(other.to_text().unwrap_or_default())),
        }
    }

    fn to_storage(&self, value: &FieldValue) -> Result<Value> {
        let text = match value {
            FieldValue::Null => return Ok(Value::Null),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Int(i) => i.to_string(),
            other => return Err(wrong_domain(self, other)),
        };
        let len = text.chars().count();
        if len > self.max_length as usize {
            return Err(Error::mapping(
                MappingErrorKind::TooLong,
                "",
                format!("{len} characters exceed the maximum of {}", self.max_length),
            ));
        }
        Ok(Value::Text(text))
    }
}

/// Booleans stored as configurable tokens (default `"1"` / `"0"` in an
/// `INTEGER(1)` column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BooleanAdapter {
    storage: StorageType,
    true_token: String,
    false_token: String,
}

impl BooleanAdapter {
    /// Create an adapter with custom storage type and tokens.
    pub fn with_tokens(
        storage: StorageType,
        true_token: impl Into<String>,
        false_token: impl Into<String>,
    ) -> Self {
        Self {
            storage,
            true_token: true_token.into(),
            false_token: false_token.into(),
        }
    }

    /// Token stored for `true`.
    pub fn true_token(&self) -> &str {
        &self.true_token
    }

    /// Token stored for `false`.
    pub fn false_token(&self) -> &str {
        &self.false_token
    }
}

impl Default for BooleanAdapter {
    fn default() -> Self {
        Self::with_tokens(StorageType::Integer(1), "1", "0")
    }
}

impl TypeAdapter for BooleanAdapter {
    fn domain_type_name(&self) -> &'static str {
        "bool"
    }

    fn storage_type(&self) -> StorageType {
        self.storage.clone()
    }

    fn to_domain(&self, value: &Value) -> Result<FieldValue> {
        if value.is_null() {
            return Ok(FieldValue::Null);
        }
        let token = value.to_text().ok_or_else(|| {
            Error::from(DecodeError::new(
                "bool",
                format!("cannot read a token from {}", value.type_name()),
            ))
        })?;
        // Anything that is not the true token reads as false.
        Ok(FieldValue::Bool(token == self.true_token))
    }

    fn to_storage(&self, value: &FieldValue) -> Result<Value> {
        let flag = match value {
            FieldValue::Null => return Ok(Value::Null),
            FieldValue::Bool(b) => *b,
            FieldValue::Int(i) => *i != 0,
            other => return Err(wrong_domain(self, other)),
        };
        let token = if flag {
            &self.true_token
        } else {
            &self.false_token
        };
        Ok(Value::Text(token.clone()))
    }
}

/// How a JSON adapter decodes documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonMode {
    /// Objects decode to `FieldValue::Map`, arrays to `FieldValue::List`;
    /// scalar documents are rejected.
    #[default]
    Associative,
    /// Any document decodes to `FieldValue::Json`.
    Document,
}

/// JSON documents stored as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonAdapter {
    size: u32,
    base: String,
    mode: JsonMode,
}

impl JsonAdapter {
    /// Create an adapter storing documents in `base(size)`.
    pub fn new(size: u32, base: &str, mode: JsonMode) -> Self {
        Self {
            size,
            base: base.to_string(),
            mode,
        }
    }

    /// Default storage (`VARCHAR(16384)`) with the given decode mode.
    pub fn with_mode(mode: JsonMode) -> Self {
        Self::new(16384, "VARCHAR", mode)
    }

    /// Decode mode.
    pub const fn mode(&self) -> JsonMode {
        self.mode
    }

    fn parse(&self, value: &Value) -> Result<serde_json::Value> {
        let parsed: serde_json::Result<serde_json::Value> = match value {
            Value::Text(s) => serde_json::from_str(s),
            Value::Bytes(b) => serde_json::from_slice(b),
            other => {
                return Err(DecodeError::new(
                    self.domain_type_name(),
                    format!("expected JSON text, found {}", other.type_name()),
                )
                .into());
            }
        };
        parsed.map_err(|e| {
            DecodeError::new(self.domain_type_name(), format!("malformed JSON: {e}"))
                .with_source(e)
                .into()
        })
    }
}

impl Default for JsonAdapter {
    fn default() -> Self {
        Self::with_mode(JsonMode::default())
    }
}

impl TypeAdapter for JsonAdapter {
    fn domain_type_name(&self) -> &'static str {
        "json"
    }

    fn storage_type(&self) -> StorageType {
        StorageType::sized(&self.base, self.size)
    }

    fn to_domain(&self, value: &Value) -> Result<FieldValue> {
        if value.is_null() {
            return Ok(FieldValue::Null);
        }
        let doc = self.parse(value)?;
        match (self.mode, doc) {
            (JsonMode::Document, doc) => Ok(FieldValue::Json(doc)),
            (JsonMode::Associative, serde_json::Value::Object(map)) => Ok(FieldValue::Map(map)),
            (JsonMode::Associative, serde_json::Value::Array(list)) => Ok(FieldValue::List(list)),
            (JsonMode::Associative, scalar) => Err(DecodeError::new(
                self.domain_type_name(),
                format!("associative decode needs an object or array, found {scalar}"),
            )
            .into()),
        }
    }

    fn to_storage(&self, value: &FieldValue) -> Result<Value> {
        let text = match value {
            FieldValue::Null => return Ok(Value::Null),
            FieldValue::Json(doc) => doc.to_string(),
            FieldValue::Map(map) => serde_json::Value::Object(map.clone()).to_string(),
            FieldValue::List(list) => serde_json::Value::Array(list.clone()).to_string(),
            other => return Err(wrong_domain(self, other)),
        };
        Ok(Value::Text(text))
    }
}

/// Arrays stored as JSON text; always decodes associatively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayAdapter {
    inner: JsonAdapter,
}

impl ArrayAdapter {
    /// Create an adapter storing arrays in `base(size)`.
    pub fn new(size: u32, base: &str) -> Self {
        Self {
            inner: JsonAdapter::new(size, base, JsonMode::Associative),
        }
    }
}

impl Default for ArrayAdapter {
    fn default() -> Self {
        Self::new(4096, "VARCHAR")
    }
}

impl TypeAdapter for ArrayAdapter {
    fn domain_type_name(&self) -> &'static str {
        "array"
    }

    fn storage_type(&self) -> StorageType {
        self.inner.storage_type()
    }

    fn to_domain(&self, value: &Value) -> Result<FieldValue> {
        self.inner.to_domain(value).map_err(|e| match e {
            Error::Decode(mut d) => {
                d.adapter = "array";
                Error::Decode(d)
            }
            other => other,
        })
    }

    fn to_storage(&self, value: &FieldValue) -> Result<Value> {
        match value {
            FieldValue::Null | FieldValue::Map(_) | FieldValue::List(_) => {
                self.inner.to_storage(value)
            }
            other => Err(wrong_domain(self, other)),
        }
    }
}

/// String passthrough with a caller-chosen storage tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSqlAdapter {
    tag: String,
}

impl RawSqlAdapter {
    /// Create a passthrough adapter declaring `tag`.
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }
}

impl Default for RawSqlAdapter {
    fn default() -> Self {
        Self::new("VARCHAR")
    }
}

impl TypeAdapter for RawSqlAdapter {
    fn domain_type_name(&self) -> &'static str {
        "string"
    }

    fn storage_type(&self) -> StorageType {
        StorageType::Custom(self.tag.clone())
    }

    fn to_domain(&self, value: &Value) -> Result<FieldValue> {
        match value {
            Value::Null => Ok(FieldValue::Null),
            other => other.to_text().map(FieldValue::Text).ok_or_else(|| {
                DecodeError::new("string", "binary value has no text form").into()
            }),
        }
    }

    fn to_storage(&self, value: &FieldValue) -> Result<Value> {
        match value {
            FieldValue::Null => Ok(Value::Null),
            FieldValue::Text(s) => Ok(Value::Text(s.clone())),
            FieldValue::Int(i) => Ok(Value::Text(i.to_string())),
            other => Err(wrong_domain(self, other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn round_trip(adapter: &dyn TypeAdapter, value: FieldValue) {
        let stored = adapter.to_storage(&value).unwrap();
        assert_eq!(adapter.to_domain(&stored).unwrap(), value, "via {stored:?}");
    }

    #[test]
    fn round_trip_law_holds_for_builtin_adapters() {
        let int = IntegerAdapter::default();
        for v in [0, 7, -42, i64::MAX, i64::MIN] {
            round_trip(&int, FieldValue::Int(v));
        }

        let string = StringAdapter::new(16);
        for v in ["", "Ada", "naïve café", "with-dash"] {
            round_trip(&string, FieldValue::Text(v.into()));
        }

        let boolean = BooleanAdapter::default();
        round_trip(&boolean, FieldValue::Bool(true));
        round_trip(&boolean, FieldValue::Bool(false));

        let custom = BooleanAdapter::with_tokens(StorageType::sized("CHAR", 1), "Y", "N");
        round_trip(&custom, FieldValue::Bool(true));
        round_trip(&custom, FieldValue::Bool(false));

        let assoc = JsonAdapter::default();
        let serde_json::Value::Object(map) = json!({"level": 3, "tags": ["a", "b"]}) else {
            unreachable!()
        };
        round_trip(&assoc, FieldValue::Map(map));
        round_trip(&assoc, FieldValue::List(vec![json!(1), json!({"x": null})]));

        let document = JsonAdapter::with_mode(JsonMode::Document);
        for doc in [json!(null), json!(3), json!("s"), json!({"a": [1, 2]})] {
            round_trip(&document, FieldValue::Json(doc));
        }

        let array = ArrayAdapter::default();
        round_trip(&array, FieldValue::List(vec![json!("x"), json!(2)]));

        let raw = RawSqlAdapter::new("DATETIME");
        round_trip(&raw, FieldValue::Text("2021-01-01 00:00:00".into()));

        for adapter in [
            &int as &dyn TypeAdapter,
            &string,
            &boolean,
            &assoc,
            &document,
            &array,
            &raw,
        ] {
            round_trip(adapter, FieldValue::Null);
        }
    }

    #[test]
    fn storage_tags_and_domain_names() {
        assert_eq!(IntegerAdapter::default().storage_type().mnemonic(), "INTEGER(10)");
        assert_eq!(StringAdapter::default().storage_type().mnemonic(), "VARCHAR(255)");
        assert_eq!(BooleanAdapter::default().storage_type().mnemonic(), "INTEGER(1)");
        assert_eq!(JsonAdapter::default().storage_type().mnemonic(), "VARCHAR(16384)");
        assert_eq!(ArrayAdapter::default().storage_type().mnemonic(), "VARCHAR(4096)");
        assert_eq!(ArrayAdapter::default().domain_type_name(), "array");
        assert_eq!(BooleanAdapter::default().domain_type_name(), "bool");
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = JsonAdapter::default()
            .to_domain(&Value::Text("{not json".into()))
            .unwrap_err();
        assert!(matches!(err, Error::Decode(ref d) if d.adapter == "json"));

        let err = ArrayAdapter::default()
            .to_domain(&Value::Text("[1,".into()))
            .unwrap_err();
        assert!(matches!(err, Error::Decode(ref d) if d.adapter == "array"));
    }

    #[test]
    fn associative_mode_rejects_scalar_documents() {
        let err = JsonAdapter::default()
            .to_domain(&Value::Text("5".into()))
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));

        let doc = JsonAdapter::with_mode(JsonMode::Document)
            .to_domain(&Value::Text("5".into()))
            .unwrap();
        assert_eq!(doc, FieldValue::Json(json!(5)));
    }

    #[test]
    fn integer_reads_numeric_text_and_rejects_garbage() {
        let int = IntegerAdapter::default();
        assert_eq!(int.to_domain(&Value::Text(" 12 ".into())).unwrap(), FieldValue::Int(12));
        assert_eq!(int.to_storage(&FieldValue::Text("7".into())).unwrap(), Value::BigInt(7));
        assert!(matches!(
            int.to_domain(&Value::Text("twelve".into())),
            Err(Error::Decode(_))
        ));
        assert!(matches!(
            int.to_storage(&FieldValue::Text("seven".into())),
            Err(Error::Mapping(_))
        ));
    }

    #[test]
    fn boolean_reads_non_true_tokens_as_false() {
        let boolean = BooleanAdapter::default();
        assert_eq!(boolean.to_domain(&Value::BigInt(1)).unwrap(), FieldValue::Bool(true));
        assert_eq!(boolean.to_domain(&Value::Text("yes".into())).unwrap(), FieldValue::Bool(false));
        assert_eq!(boolean.to_storage(&FieldValue::Bool(true)).unwrap(), Value::Text("1".into()));
    }

    #[test]
    fn string_enforces_max_length() {
        let err = StringAdapter::new(3)
            .to_storage(&FieldValue::Text("abcd".into()))
            .unwrap_err();
        assert!(matches!(err, Error::Mapping(ref m) if m.kind == MappingErrorKind::TooLong));
        assert_eq!(
            StringAdapter::new(3).to_storage(&FieldValue::Text("äöü".into())).unwrap(),
            Value::Text("äöü".into())
        );
    }
}
