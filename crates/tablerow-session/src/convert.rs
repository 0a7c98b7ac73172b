//! Conversion between entities and plain JSON objects or rows.
//!
//! Entities built here are never considered loaded from storage, so they can
//! be inserted.

use std::fmt;
use tablerow_core::{DecodeError, Entity, Error, Result, Row, RowMapper, Value};

/// Converts entities of one type to and from JSON.
pub struct RowConverter<E: Entity> {
    mapper: RowMapper<E>,
}

impl<E: Entity> RowConverter<E> {
    #[allow(clippy::result_large_err)]
    pub fn new() -> Result<Self> {
        Ok(Self {
            mapper: RowMapper::new()?,
        })
    }

    pub fn with_mapper(mapper: RowMapper<E>) -> Self {
        Self { mapper }
    }

    pub fn mapper(&self) -> &RowMapper<E> {
        &self.mapper
    }

    /// Build an entity from a JSON object of column name to storage value.
    #[allow(clippy::result_large_err)]
    pub fn from_json(&self, json: &str) -> Result<E> {
        let parsed: serde_json::Value = serde_json::from_str(json).map_err(|e| {
            Error::from(DecodeError::new("json", "malformed JSON document").with_source(e))
        })?;
        match parsed {
            serde_json::Value::Object(map) => self.from_map(&map),
            other => Err(DecodeError::new(
                "json",
                format!("expected a JSON object, found {other}"),
            )
            .into()),
        }
    }

    #[allow(clippy::result_large_err)]
    pub fn from_map(&self, map: &serde_json::Map<String, serde_json::Value>) -> Result<E> {
        let row = Row::from_pairs(
            map.iter()
                .map(|(name, value)| (name.clone(), Value::from_json(value))),
        );
        self.from_row(&row)
    }

    #[allow(clippy::result_large_err)]
    pub fn from_row(&self, row: &Row) -> Result<E> {
        self.mapper.instantiate(row, false)
    }

    #[allow(clippy::result_large_err)]
    pub fn to_row(&self, entity: &E) -> Result<Row> {
        self.mapper.dehydrate(entity)
    }

    #[allow(clippy::result_large_err)]
    pub fn to_map(&self, entity: &E) -> Result<serde_json::Map<String, serde_json::Value>> {
        Ok(self.to_row(entity)?.to_json())
    }

    #[allow(clippy::result_large_err)]
    pub fn to_json(&self, entity: &E) -> Result<String> {
        Ok(serde_json::Value::Object(self.to_map(entity)?).to_string())
    }
}

impl<E: Entity> fmt::Debug for RowConverter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowConverter")
            .field("mapper", &self.mapper)
            .finish()
    }
}
