//! Metadata resolution and the per-type registry.
//!
//! Resolution folds declarations strictly left to right: composed fragments
//! in composition order, then the parent entity, then the type's own
//! declarations. Later table names and auto keys win; primary keys, columns,
//! indexes and foreign keys accumulate.

use crate::Result;
use crate::error::{Error, SchemaError, SchemaErrorKind};
use crate::field::{Column, ForeignKey, Index, Table};
use crate::identifiers::{is_valid_identifier, short_type_name, snake_case};
use crate::model::{Entity, Metadata};
use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

/// Final, merged metadata of one entity type.
#[derive(Debug)]
pub struct ResolvedMetadata {
    entity: &'static str,
    table: Table,
    // Table as declared, before any name was derived; what descendants fold.
    declared_table: Table,
    table_name: String,
    columns: Vec<Arc<Column>>,
    lookup: HashMap<String, usize>,
    indexes: Vec<Index>,
    foreign_keys: Vec<ForeignKey>,
}

impl ResolvedMetadata {
    /// Full Rust type name of the entity.
    pub fn entity_name(&self) -> &'static str {
        self.entity
    }

    pub fn table(&self) -> &Table {
        &self.table
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_keys(&self) -> &[String] {
        self.table.primary_keys()
    }

    pub fn auto_key(&self) -> Option<&str> {
        self.table.auto_key_column()
    }

    pub fn is_primary_key(&self, column: &str) -> bool {
        self.primary_keys().iter().any(|k| k == column)
    }

    /// Every resolved column in encounter order, duplicates included.
    pub fn columns(&self) -> &[Arc<Column>] {
        &self.columns
    }

    /// Column definition by name. With duplicate names the last one wins.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.lookup.get(name).map(|&i| self.columns[i].as_ref())
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.lookup.contains_key(name)
    }

    /// Distinct columns used for mapping.
    ///
    /// Each name appears once, at its first position, carrying its last
    /// definition.
    pub fn mapped_columns(&self) -> impl Iterator<Item = &Column> {
        let mut seen = HashSet::new();
        self.columns.iter().filter_map(move |c| {
            if seen.insert(c.name()) {
                self.column(c.name())
            } else {
                None
            }
        })
    }

    /// Distinct column names in mapping order.
    pub fn column_names(&self) -> Vec<&str> {
        self.mapped_columns().map(Column::name).collect()
    }

    pub fn indexes(&self) -> &[Index] {
        &self.indexes
    }

    pub fn foreign_keys(&self) -> &[ForeignKey] {
        &self.foreign_keys
    }
}

#[derive(Default)]
struct Parts {
    table: Option<Table>,
    columns: Vec<Arc<Column>>,
    indexes: Vec<Index>,
    foreign_keys: Vec<ForeignKey>,
}

impl Parts {
    fn absorb(&mut self, later: Parts) {
        self.table = match (self.table.take(), later.table) {
            (Some(earlier), Some(later)) => Some(earlier.merge(later)),
            (earlier, later) => later.or(earlier),
        };
        self.columns.extend(later.columns);
        self.indexes.extend(later.indexes);
        self.foreign_keys.extend(later.foreign_keys);
    }

    fn from_resolved(resolved: &ResolvedMetadata) -> Self {
        Self {
            table: Some(resolved.declared_table.clone()),
            columns: resolved.columns.clone(),
            indexes: resolved.indexes.clone(),
            foreign_keys: resolved.foreign_keys.clone(),
        }
    }
}

#[allow(clippy::result_large_err)]
fn flatten(metadata: Metadata) -> Result<Parts> {
    let Metadata {
        fragments,
        parent,
        table,
        columns,
        indexes,
        foreign_keys,
    } = metadata;

    let mut parts = Parts::default();
    for fragment in fragments {
        tracing::trace!(fragment = fragment.type_name, "Folding fragment");
        parts.absorb(flatten((fragment.declare)())?);
    }
    if let Some(parent) = parent {
        tracing::trace!(parent = parent.type_name(), "Folding parent");
        let resolved = parent.resolve()?;
        parts.absorb(Parts::from_resolved(&resolved));
    }
    parts.absorb(Parts {
        table,
        columns: columns.into_iter().map(Arc::new).collect(),
        indexes,
        foreign_keys,
    });
    Ok(parts)
}

/// Resolve a declaration bundle without touching the registry.
///
/// `entity` is the full Rust type name; an unnamed table takes the snake_case
/// form of its last path segment.
#[allow(clippy::result_large_err)]
pub fn resolve_declaration(entity: &'static str, metadata: Metadata) -> Result<ResolvedMetadata> {
    let parts = flatten(metadata)?;

    let table = parts.table.ok_or_else(|| {
        Error::Schema(SchemaError {
            kind: SchemaErrorKind::MissingTable,
            entity: entity.to_string(),
            message: "no table declared on the entity, its fragments or its parents".to_string(),
        })
    })?;

    let table_name = match table.name() {
        Some(name) => name.to_string(),
        None => snake_case(short_type_name(entity)),
    };
    if !is_valid_identifier(&table_name) {
        return Err(Error::Schema(SchemaError {
            kind: SchemaErrorKind::InvalidName,
            entity: entity.to_string(),
            message: format!("'{table_name}' is not a valid table name"),
        }));
    }
    let declared_table = table.clone();
    let table = table.with_name(table_name.clone());

    let mut lookup = HashMap::with_capacity(parts.columns.len());
    for (i, column) in parts.columns.iter().enumerate() {
        if lookup.insert(column.name().to_string(), i).is_some() {
            tracing::warn!(
                entity,
                column = column.name(),
                "Duplicate column declaration, the last one wins"
            );
        }
    }

    tracing::debug!(
        entity,
        table = %table_name,
        columns = parts.columns.len(),
        primary_keys = ?table.primary_keys(),
        "Resolved entity metadata"
    );

    Ok(ResolvedMetadata {
        entity,
        table,
        declared_table,
        table_name,
        columns: parts.columns,
        lookup,
        indexes: parts.indexes,
        foreign_keys: parts.foreign_keys,
    })
}

type Registry = RwLock<HashMap<TypeId, Arc<ResolvedMetadata>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Resolve an entity type, memoized for the process lifetime.
///
/// The first completed resolution of a type wins. Resolution runs outside
/// the registry lock so that resolving a parent from inside a child does not
/// deadlock.
#[allow(clippy::result_large_err)]
pub fn resolve<E: Entity>() -> Result<Arc<ResolvedMetadata>> {
    let key = TypeId::of::<E>();
    // The map is insert-only, so a poisoned lock still holds valid entries.
    if let Some(found) = registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
    {
        return Ok(Arc::clone(found));
    }

    let built = Arc::new(resolve_declaration(std::any::type_name::<E>(), E::declare())?);
    let mut map = registry().write().unwrap_or_else(PoisonError::into_inner);
    Ok(Arc::clone(map.entry(key).or_insert(built)))
}

/// Has this entity type been resolved already?
pub fn is_resolved<E: Entity>() -> bool {
    registry()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(&TypeId::of::<E>())
}
