//! Entity and fragment traits, declaration bundles and field accessors.
//!
//! An entity type describes itself with [`Entity::declare`], returning a
//! [`Metadata`] bundle of its own table, column, index and foreign key
//! declarations plus the fragments it composes and the entity it extends.
//! The resolver folds these into a single
//! [`ResolvedMetadata`](crate::resolve::ResolvedMetadata).

use crate::Result;
use crate::field::{Column, EntityRef, ForeignKey, Index, Table};
use crate::field_value::FieldValue;
use std::collections::BTreeMap;
use std::fmt;

/// A domain type whose instances map to rows of one table.
///
/// Primary key values are not ordinary fields: they live in the entity's
/// [`KeyState`], which tracks both the current values and the values last
/// loaded from storage.
///
/// # Example
///
/// ```
/// use tablerow_core::prelude::*;
///
/// #[derive(Debug, Default)]
/// struct Player {
///     keys: KeyState,
///     name: String,
/// }
///
/// impl Entity for Player {
///     fn declare() -> Metadata {
///         Metadata::new()
///             .table(Table::named("players").primary_key(["id"]))
///             .column(Column::new("id", IntegerAdapter::default()).not_null())
///             .column(Column::new("name", StringAdapter::new(255)))
///     }
///
///     fn accessors() -> Accessors<Self> {
///         Accessors::<Self>::new().field(
///             "name",
///             |p| FieldValue::from(p.name.clone()),
///             |p, v| {
///                 p.name = v.extract()?;
///                 Ok(())
///             },
///         )
///     }
///
///     fn keys(&self) -> &KeyState {
///         &self.keys
///     }
///
///     fn keys_mut(&mut self) -> &mut KeyState {
///         &mut self.keys
///     }
/// }
/// ```
pub trait Entity: Default + Send + Sync + 'static {
    /// Declarations attached directly to this type.
    fn declare() -> Metadata;

    /// Getter/setter table for the non-key columns.
    fn accessors() -> Accessors<Self>;

    fn keys(&self) -> &KeyState;

    fn keys_mut(&mut self) -> &mut KeyState;
}

/// A reusable bundle of declarations composable into several entity types.
pub trait Fragment: 'static {
    fn declare() -> Metadata;
}

#[derive(Clone, Copy)]
pub(crate) struct FragmentRef {
    pub(crate) type_name: &'static str,
    pub(crate) declare: fn() -> Metadata,
}

/// Declarations of one entity type or fragment, before resolution.
#[derive(Default)]
pub struct Metadata {
    pub(crate) fragments: Vec<FragmentRef>,
    pub(crate) parent: Option<EntityRef>,
    pub(crate) table: Option<Table>,
    pub(crate) columns: Vec<Column>,
    pub(crate) indexes: Vec<Index>,
    pub(crate) foreign_keys: Vec<ForeignKey>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compose a fragment. Fragments fold in the order they are composed,
    /// before the parent and before this bundle's own declarations.
    #[must_use]
    pub fn compose<F: Fragment>(mut self) -> Self {
        self.fragments.push(FragmentRef {
            type_name: std::any::type_name::<F>(),
            declare: F::declare,
        });
        self
    }

    /// Inherit the resolved metadata of another entity type.
    #[must_use]
    pub fn extends<P: crate::model::Entity>(mut self) -> Self {
        self.parent = Some(EntityRef::of::<P>());
        self
    }

    /// Set the table declaration. A second call replaces the first.
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }

    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    #[must_use]
    pub fn index(mut self, index: Index) -> Self {
        self.indexes.push(index);
        self
    }

    #[must_use]
    pub fn foreign_key(mut self, foreign_key: ForeignKey) -> Self {
        self.foreign_keys.push(foreign_key);
        self
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metadata")
            .field(
                "fragments",
                &self.fragments.iter().map(|r| r.type_name).collect::<Vec<_>>(),
            )
            .field("parent", &self.parent)
            .field("table", &self.table)
            .field("columns", &self.columns)
            .field("indexes", &self.indexes)
            .field("foreign_keys", &self.foreign_keys)
            .finish()
    }
}

/// Reads a column's domain value from an entity.
pub type Getter<E> = fn(&E) -> FieldValue;

/// Writes a column's domain value into an entity.
#[allow(clippy::result_large_err)]
pub type Setter<E> = fn(&mut E, FieldValue) -> Result<()>;

/// Getter/setter pair bound to one column name.
pub struct FieldAccessor<E> {
    column: String,
    getter: Getter<E>,
    setter: Setter<E>,
}

impl<E> FieldAccessor<E> {
    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn get(&self, entity: &E) -> FieldValue {
        (self.getter)(entity)
    }

    #[allow(clippy::result_large_err)]
    pub fn set(&self, entity: &mut E, value: FieldValue) -> Result<()> {
        (self.setter)(entity, value).map_err(|e| e.in_column(&self.column))
    }
}

impl<E> fmt::Debug for FieldAccessor<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("column", &self.column)
            .finish_non_exhaustive()
    }
}

/// Field accessor table of one entity type, keyed by column name.
pub struct Accessors<E> {
    fields: Vec<FieldAccessor<E>>,
}

impl<E> Accessors<E> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Register an accessor. Registering a column twice replaces the first.
    #[must_use]
    pub fn field(mut self, column: impl Into<String>, getter: Getter<E>, setter: Setter<E>) -> Self {
        let column = column.into();
        self.fields.retain(|f| f.column != column);
        self.fields.push(FieldAccessor {
            column,
            getter,
            setter,
        });
        self
    }

    pub fn get(&self, column: &str) -> Option<&FieldAccessor<E>> {
        self.fields.iter().find(|f| f.column == column)
    }

    pub fn contains(&self, column: &str) -> bool {
        self.get(column).is_some()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.column.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<E> Default for Accessors<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Accessors<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.columns()).finish()
    }
}

/// Current and former primary key values of one entity instance.
///
/// `former` stays empty until the instance is hydrated from storage, and
/// afterwards changes only on the next hydration from storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyState {
    current: BTreeMap<String, FieldValue>,
    former: BTreeMap<String, FieldValue>,
}

impl KeyState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, column: &str) -> Option<&FieldValue> {
        self.current.get(column)
    }

    pub fn former(&self, column: &str) -> Option<&FieldValue> {
        self.former.get(column)
    }

    /// Set a current key value. The former value is untouched.
    pub fn set(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.current.insert(column.into(), value.into());
    }

    /// Was this instance ever hydrated from storage?
    pub fn is_loaded(&self) -> bool {
        !self.former.is_empty()
    }

    pub fn has_current(&self) -> bool {
        self.current.values().any(|v| !v.is_null())
    }

    /// Discard local key edits.
    pub fn reset(&mut self) {
        self.current = self.former.clone();
    }

    pub(crate) fn begin_hydration(&mut self, from_storage: bool) {
        self.current.clear();
        if from_storage {
            self.former.clear();
        }
    }

    pub(crate) fn record(&mut self, column: &str, value: FieldValue, from_storage: bool) {
        if from_storage {
            self.former.insert(column.to_string(), value.clone());
        }
        self.current.insert(column.to_string(), value);
    }
}
