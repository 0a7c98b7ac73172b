//! Column, index, foreign key and table declarations.

use crate::Result;
use crate::adapter::TypeAdapter;
use crate::field_value::FieldValue;
use crate::identifiers::short_type_name;
use crate::model::Entity;
use crate::resolve::{ResolvedMetadata, resolve};
use crate::types::StorageType;
use crate::value::Value;
use std::fmt;
use std::sync::Arc;

/// A mapped column: a name plus the adapter that converts its values.
#[derive(Debug)]
pub struct Column {
    name: String,
    adapter: Box<dyn TypeAdapter>,
    nullable: bool,
    default: Option<FieldValue>,
}

impl Column {
    /// Create a nullable column without a default.
    pub fn new(name: impl Into<String>, adapter: impl TypeAdapter + 'static) -> Self {
        Self {
            name: name.into(),
            adapter: Box::new(adapter),
            nullable: true,
            default: None,
        }
    }

    /// Set whether the column accepts NULL.
    #[must_use]
    pub fn nullable(mut self, value: bool) -> Self {
        self.nullable = value;
        self
    }

    /// Shorthand for `nullable(false)`.
    #[must_use]
    pub fn not_null(self) -> Self {
        self.nullable(false)
    }

    /// Domain value written when the entity field is absent.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<FieldValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn adapter(&self) -> &dyn TypeAdapter {
        self.adapter.as_ref()
    }

    pub const fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn default(&self) -> Option<&FieldValue> {
        self.default.as_ref()
    }

    pub fn storage_type(&self) -> StorageType {
        self.adapter.storage_type()
    }

    /// Convert a storage value through this column's adapter.
    #[allow(clippy::result_large_err)]
    pub fn to_domain(&self, value: &Value) -> Result<FieldValue> {
        self.adapter
            .to_domain(value)
            .map_err(|e| e.in_column(&self.name))
    }

    /// Convert a domain value through this column's adapter.
    #[allow(clippy::result_large_err)]
    pub fn to_storage(&self, value: &FieldValue) -> Result<Value> {
        self.adapter
            .to_storage(value)
            .map_err(|e| e.in_column(&self.name))
    }
}

/// A (possibly unique) index over one or more columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Index {
    name: String,
    columns: Vec<String>,
    unique: bool,
}

impl Index {
    /// Create an index with the default name.
    ///
    /// The default name is `uniq_` or `index_` followed by the lowercased
    /// column names joined with `_`.
    pub fn new<I, S>(columns: I, unique: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let prefix = if unique { "uniq_" } else { "index_" };
        let name = format!("{prefix}{}", columns.join("_").to_lowercase());
        Self {
            name,
            columns,
            unique,
        }
    }

    /// Shorthand for a unique index.
    pub fn unique<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(columns, true)
    }

    /// Override the generated name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub const fn is_unique(&self) -> bool {
        self.unique
    }

    /// Render the constraint clause, e.g. `CONSTRAINT UNIQUE INDEX uniq_id (id)`.
    pub fn sql_fragment(&self) -> String {
        let kind = if self.unique { "UNIQUE INDEX" } else { "INDEX" };
        format!(
            "CONSTRAINT {kind} {} ({})",
            self.name,
            self.columns.join(", ")
        )
    }
}

/// Lazy reference to another entity type.
///
/// The target is resolved only when asked for, so entities may reference each
/// other without recursion during their own resolution.
#[derive(Clone, Copy)]
pub struct EntityRef {
    type_name: &'static str,
    resolver: fn() -> Result<Arc<ResolvedMetadata>>,
}

impl EntityRef {
    pub fn of<T: Entity>() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            resolver: resolve::<T>,
        }
    }

    /// Short (unqualified) type name of the target.
    pub fn short_name(&self) -> &'static str {
        short_type_name(self.type_name)
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Resolve the target's metadata.
    #[allow(clippy::result_large_err)]
    pub fn resolve(&self) -> Result<Arc<ResolvedMetadata>> {
        (self.resolver)()
    }
}

impl fmt::Debug for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EntityRef").field(&self.type_name).finish()
    }
}

/// Foreign key from local columns to columns of another entity.
#[derive(Debug, Clone)]
pub struct ForeignKey {
    name: String,
    target: EntityRef,
    target_columns: Vec<String>,
    local_columns: Vec<String>,
}

impl ForeignKey {
    /// Create a foreign key with the default name.
    ///
    /// The default name is `fk_` followed by the lowercased short target type
    /// name and target columns, joined with `_`.
    pub fn new<I, J, S, U>(target: EntityRef, target_columns: I, local_columns: J) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = U>,
        S: Into<String>,
        U: Into<String>,
    {
        let target_columns: Vec<String> = target_columns.into_iter().map(Into::into).collect();
        let local_columns: Vec<String> = local_columns.into_iter().map(Into::into).collect();
        let name = format!(
            "fk_{}_{}",
            target.short_name(),
            target_columns.join("_")
        )
        .to_lowercase();
        Self {
            name,
            target,
            target_columns,
            local_columns,
        }
    }

    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub const fn target(&self) -> &EntityRef {
        &self.target
    }

    pub fn target_columns(&self) -> &[String] {
        &self.target_columns
    }

    pub fn local_columns(&self) -> &[String] {
        &self.local_columns
    }
}

/// Table declaration.
///
/// A declaration without a name inherits one from an earlier declaration or,
/// failing that, from the entity type name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    name: Option<String>,
    primary_keys: Vec<String>,
    auto_key: Option<String>,
}

impl Table {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn unnamed() -> Self {
        Self::default()
    }

    /// Set the primary key columns, in key order.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_keys = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Column whose value the storage backend generates on insert.
    #[must_use]
    pub fn auto_key(mut self, column: impl Into<String>) -> Self {
        self.auto_key = Some(column.into());
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn auto_key_column(&self) -> Option<&str> {
        self.auto_key.as_deref()
    }

    /// Merge a later declaration on top of this one.
    ///
    /// The later name and auto key win when present. Primary keys accumulate,
    /// earlier ones first.
    #[must_use]
    pub fn merge(self, later: Table) -> Table {
        let mut primary_keys = self.primary_keys;
        primary_keys.extend(later.primary_keys);
        Table {
            name: later.name.or(self.name),
            primary_keys,
            auto_key: later.auto_key.or(self.auto_key),
        }
    }

    pub(crate) fn with_name(mut self, name: String) -> Self {
        self.name = Some(name);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{IntegerAdapter, JsonAdapter};
    use crate::error::Error;

    #[test]
    fn index_default_names() {
        assert_eq!(Index::unique(["id"]).name(), "uniq_id");
        assert_eq!(Index::new(["Region", "Level"], false).name(), "index_region_level");
        assert_eq!(Index::unique(["id"]).named("pk_idx").name(), "pk_idx");
    }

    #[test]
    fn index_sql_fragment() {
        assert_eq!(
            Index::unique(["id"]).sql_fragment(),
            "CONSTRAINT UNIQUE INDEX uniq_id (id)"
        );
        assert_eq!(
            Index::new(["a", "b"], false).sql_fragment(),
            "CONSTRAINT INDEX index_a_b (a, b)"
        );
    }

    #[test]
    fn table_merge_accumulates_keys() {
        let base = Table::unnamed().primary_key(["id"]).auto_key("id");
        let own = Table::named("players").primary_key(["region"]);
        let merged = base.merge(own);
        assert_eq!(merged.name(), Some("players"));
        assert_eq!(merged.primary_keys(), ["id", "region"]);
        assert_eq!(merged.auto_key_column(), Some("id"));

        let renamed = Table::named("a").merge(Table::unnamed());
        assert_eq!(renamed.name(), Some("a"));
    }

    #[test]
    fn column_errors_carry_column_name() {
        let col = Column::new("settings", JsonAdapter::default());
        let err = col.to_domain(&Value::Text("{".into())).unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(err.column(), Some("settings"));
    }

    #[test]
    fn column_builder() {
        let col = Column::new("level", IntegerAdapter::default())
            .not_null()
            .default_value(1);
        assert!(!col.is_nullable());
        assert_eq!(col.default(), Some(&FieldValue::Int(1)));
        assert_eq!(col.storage_type(), StorageType::Integer(10));
    }
}
