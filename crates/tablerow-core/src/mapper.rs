//! Hydration and dehydration of entities against resolved metadata.

use crate::Result;
use crate::error::{Error, MappingErrorKind};
use crate::field_value::FieldValue;
use crate::identifiers::{join_primary_key, split_primary_key};
use crate::model::{Accessors, Entity};
use crate::resolve::{ResolvedMetadata, resolve};
use crate::row::Row;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// Converts entities of one type to and from storage rows.
pub struct RowMapper<E: Entity> {
    metadata: Arc<ResolvedMetadata>,
    accessors: Accessors<E>,
}

impl<E: Entity> RowMapper<E> {
    /// Build a mapper from the entity's registered metadata and accessors.
    #[allow(clippy::result_large_err)]
    pub fn new() -> Result<Self> {
        Ok(Self::with_parts(resolve::<E>()?, E::accessors()))
    }

    pub fn with_parts(metadata: Arc<ResolvedMetadata>, accessors: Accessors<E>) -> Self {
        Self {
            metadata,
            accessors,
        }
    }

    pub fn metadata(&self) -> &Arc<ResolvedMetadata> {
        &self.metadata
    }

    pub fn accessors(&self) -> &Accessors<E> {
        &self.accessors
    }

    /// Domain value of one column, keys included.
    #[allow(clippy::result_large_err)]
    pub fn field_value(&self, entity: &E, column: &str) -> Result<FieldValue> {
        if self.metadata.is_primary_key(column) {
            return Ok(entity
                .keys()
                .current(column)
                .cloned()
                .unwrap_or(FieldValue::Null));
        }
        self.accessors
            .get(column)
            .map(|accessor| accessor.get(entity))
            .ok_or_else(|| {
                Error::mapping(
                    MappingErrorKind::MissingAccessor,
                    column,
                    "no field accessor registered",
                )
            })
    }

    /// Convert an entity into a storage row covering every mapped column.
    ///
    /// Absent values take the column default when one is declared.
    #[allow(clippy::result_large_err)]
    pub fn dehydrate(&self, entity: &E) -> Result<Row> {
        let mut names = Vec::new();
        let mut values = Vec::new();
        for column in self.metadata.mapped_columns() {
            let mut value = self.field_value(entity, column.name())?;
            if value.is_null() {
                if let Some(default) = column.default() {
                    value = default.clone();
                }
            }
            let stored = column.to_storage(&value)?;
            tracing::trace!(column = column.name(), value = ?stored, "Dehydrated column");
            names.push(column.name().to_string());
            values.push(stored);
        }
        Ok(Row::new(names, values))
    }

    /// Load a row into an entity.
    ///
    /// Every column is checked and converted before the entity is touched, so
    /// an unknown column or a decode failure leaves it unchanged. Current key
    /// values are always reset; former key values are reset and recorded only
    /// when the row comes from storage.
    #[allow(clippy::result_large_err)]
    pub fn hydrate(&self, entity: &mut E, row: &Row, from_storage: bool) -> Result<()> {
        let mut converted = Vec::with_capacity(row.len());
        for (name, stored) in row.iter() {
            let column = self.metadata.column(name).ok_or_else(|| {
                Error::mapping(
                    MappingErrorKind::UnknownColumn,
                    name,
                    format!(
                        "no column '{name}' declared on table '{}'",
                        self.metadata.table_name()
                    ),
                )
            })?;
            let is_key = self.metadata.is_primary_key(name);
            if !is_key && !self.accessors.contains(name) {
                return Err(Error::mapping(
                    MappingErrorKind::MissingAccessor,
                    name,
                    "no field accessor registered",
                ));
            }
            let value = column.to_domain(stored)?;
            tracing::trace!(column = name, from_storage, "Hydrated column");
            converted.push((name, is_key, value));
        }

        entity.keys_mut().begin_hydration(from_storage);
        for (name, is_key, value) in converted {
            if is_key {
                entity.keys_mut().record(name, value, from_storage);
            } else if let Some(accessor) = self.accessors.get(name) {
                accessor.set(entity, value)?;
            }
        }
        Ok(())
    }

    /// Build a fresh entity from a row.
    #[allow(clippy::result_large_err)]
    pub fn instantiate(&self, row: &Row, from_storage: bool) -> Result<E> {
        let mut entity = E::default();
        self.hydrate(&mut entity, row, from_storage)?;
        Ok(entity)
    }

    /// Current key values in primary key order. Unset components are `Null`.
    pub fn primary_key_values(&self, entity: &E) -> Vec<FieldValue> {
        self.metadata
            .primary_keys()
            .iter()
            .map(|k| entity.keys().current(k).cloned().unwrap_or(FieldValue::Null))
            .collect()
    }

    /// Key values as last loaded from storage; empty if never loaded.
    pub fn former_primary_key_values(&self, entity: &E) -> Vec<FieldValue> {
        let keys = entity.keys();
        if !keys.is_loaded() {
            return Vec::new();
        }
        self.metadata
            .primary_keys()
            .iter()
            .map(|k| keys.former(k).cloned().unwrap_or(FieldValue::Null))
            .collect()
    }

    /// Overwrite the current key with the former key.
    pub fn reset_primary_key(&self, entity: &mut E) {
        entity.keys_mut().reset();
    }

    /// Set current key values positionally, in primary key order.
    ///
    /// Extra values are ignored; missing ones leave the component untouched.
    pub fn set_primary(&self, entity: &mut E, values: Vec<FieldValue>) {
        for (column, value) in self.metadata.primary_keys().iter().zip(values) {
            entity.keys_mut().set(column.clone(), value);
        }
    }

    /// Flat, escaped string form of the current key.
    pub fn primary_key_string(&self, entity: &E) -> String {
        join_primary_key(
            self.primary_key_values(entity)
                .iter()
                .map(FieldValue::key_text),
        )
    }

    /// Reverse of [`primary_key_string`](Self::primary_key_string).
    pub fn split_primary_key_string(key: &str) -> Vec<String> {
        split_primary_key(key)
    }

    /// Storage form of the current key, in primary key order.
    #[allow(clippy::result_large_err)]
    pub fn primary_key_storage_values(&self, entity: &E) -> Result<Vec<(String, Value)>> {
        self.metadata
            .primary_keys()
            .iter()
            .map(|k| {
                let value = entity.keys().current(k).cloned().unwrap_or(FieldValue::Null);
                let stored = match self.metadata.column(k) {
                    Some(column) => column.to_storage(&value)?,
                    None => Value::Null,
                };
                Ok((k.clone(), stored))
            })
            .collect()
    }
}

impl<E: Entity> fmt::Debug for RowMapper<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowMapper")
            .field("table", &self.metadata.table_name())
            .field("accessors", &self.accessors)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{BooleanAdapter, IntegerAdapter, StringAdapter};
    use crate::field::{Column, Table};
    use crate::model::{KeyState, Metadata};

    #[derive(Debug, Default)]
    struct Score {
        keys: KeyState,
        points: i64,
        verified: bool,
    }

    impl Entity for Score {
        fn declare() -> Metadata {
            Metadata::new()
                .table(Table::named("scores").primary_key(["region", "id"]))
                .column(Column::new("id", IntegerAdapter::default()))
                .column(Column::new("region", StringAdapter::new(8)))
                .column(Column::new("points", IntegerAdapter::default()).default_value(0))
                .column(Column::new("verified", BooleanAdapter::default()))
        }

        fn accessors() -> Accessors<Self> {
            Accessors::<Self>::new()
                .field(
                    "points",
                    |s| FieldValue::Int(s.points),
                    |s, v| {
                        s.points = v.extract::<Option<i64>>()?.unwrap_or_default();
                        Ok(())
                    },
                )
                .field(
                    "verified",
                    |s| FieldValue::Bool(s.verified),
                    |s, v| {
                        s.verified = v.extract()?;
                        Ok(())
                    },
                )
        }

        fn keys(&self) -> &KeyState {
            &self.keys
        }

        fn keys_mut(&mut self) -> &mut KeyState {
            &mut self.keys
        }
    }

    fn storage_row() -> Row {
        Row::from_pairs([
            ("id", Value::BigInt(3)),
            ("region", Value::from("eu")),
            ("points", Value::BigInt(120)),
            ("verified", Value::from("1")),
        ])
    }

    #[test]
    fn hydrate_from_storage_records_former_keys() {
        let mapper = RowMapper::<Score>::new().unwrap();
        let score = mapper.instantiate(&storage_row(), true).unwrap();
        assert_eq!(score.points, 120);
        assert!(score.verified);
        assert_eq!(
            mapper.primary_key_values(&score),
            vec![FieldValue::from("eu"), FieldValue::Int(3)]
        );
        assert_eq!(
            mapper.former_primary_key_values(&score),
            mapper.primary_key_values(&score)
        );
    }

    #[test]
    fn hydrate_without_provenance_leaves_former_empty() {
        let mapper = RowMapper::<Score>::new().unwrap();
        let score = mapper.instantiate(&storage_row(), false).unwrap();
        assert_eq!(mapper.primary_key_values(&score).len(), 2);
        assert!(mapper.former_primary_key_values(&score).is_empty());
    }

    #[test]
    fn local_key_edits_can_be_reset() {
        let mapper = RowMapper::<Score>::new().unwrap();
        let mut score = mapper.instantiate(&storage_row(), true).unwrap();
        mapper.set_primary(&mut score, vec![FieldValue::from("us"), FieldValue::Int(9)]);
        assert_eq!(mapper.primary_key_string(&score), "us-9");
        assert_eq!(
            mapper.former_primary_key_values(&score),
            vec![FieldValue::from("eu"), FieldValue::Int(3)]
        );
        mapper.reset_primary_key(&mut score);
        assert_eq!(mapper.primary_key_string(&score), "eu-3");
    }

    #[test]
    fn dehydrate_covers_every_column_and_applies_defaults() {
        let mapper = RowMapper::<Score>::new().unwrap();
        let mut score = Score::default();
        mapper.set_primary(&mut score, vec![FieldValue::from("eu"), FieldValue::Int(4)]);
        score.verified = true;
        let row = mapper.dehydrate(&score).unwrap();
        assert_eq!(
            row.column_names().collect::<Vec<_>>(),
            ["id", "region", "points", "verified"]
        );
        assert_eq!(row.get_by_name("id"), Some(&Value::BigInt(4)));
        assert_eq!(row.get_by_name("points"), Some(&Value::BigInt(0)));
        assert_eq!(row.get_by_name("verified"), Some(&Value::from("1")));
    }

    #[test]
    fn unknown_column_is_a_mapping_error() {
        let mapper = RowMapper::<Score>::new().unwrap();
        let row = Row::from_pairs([("nickname", Value::from("x"))]);
        let err = mapper.instantiate(&row, true).unwrap_err();
        assert!(matches!(
            err,
            Error::Mapping(ref e) if e.kind == MappingErrorKind::UnknownColumn
        ));
        assert_eq!(err.column(), Some("nickname"));
    }

    #[test]
    fn key_storage_values_follow_key_order() {
        let mapper = RowMapper::<Score>::new().unwrap();
        let mut score = Score::default();
        mapper.set_primary(&mut score, vec![FieldValue::from("eu"), FieldValue::from("12")]);
        assert_eq!(
            mapper.primary_key_storage_values(&score).unwrap(),
            [
                ("region".to_string(), Value::from("eu")),
                ("id".to_string(), Value::BigInt(12)),
            ]
        );
        mapper.set_primary(&mut score, vec![FieldValue::from("eu"), FieldValue::from("x")]);
        assert!(mapper.primary_key_storage_values(&score).is_err());
    }

    #[test]
    fn failed_hydration_leaves_the_entity_untouched() {
        let mapper = RowMapper::<Score>::new().unwrap();
        let mut score = mapper.instantiate(&storage_row(), true).unwrap();
        let bad = Row::from_pairs([
            ("id", Value::BigInt(8)),
            ("region", Value::from("us")),
            ("points", Value::from("many")),
        ]);
        assert!(matches!(
            mapper.hydrate(&mut score, &bad, true),
            Err(Error::Decode(_))
        ));
        let unknown = Row::from_pairs([("id", Value::BigInt(8)), ("nickname", Value::from("x"))]);
        assert!(mapper.hydrate(&mut score, &unknown, true).is_err());

        assert_eq!(mapper.primary_key_string(&score), "eu-3");
        assert_eq!(
            mapper.former_primary_key_values(&score),
            vec![FieldValue::from("eu"), FieldValue::Int(3)]
        );
        assert_eq!(score.points, 120);
    }

    #[test]
    fn primary_key_strings_escape_separators() {
        let mapper = RowMapper::<Score>::new().unwrap();
        let mut score = Score::default();
        mapper.set_primary(&mut score, vec![FieldValue::from("eu-west"), FieldValue::Int(1)]);
        let key = mapper.primary_key_string(&score);
        assert_eq!(key, "eu\\-west-1");
        assert_eq!(RowMapper::<Score>::split_primary_key_string(&key), ["eu-west", "1"]);
    }
}
