//! Record lifecycle: an entity bound to its storage row.
//!
//! A [`Record`] wraps one entity together with a shared [`RecordManager`]
//! and tracks three flags:
//!
//! - `is_empty`: fixed at construction, true when no key values were given
//! - `exists_in_storage`: a matching row was found or written
//! - `is_synced`: local fields match the last load or write
//!
//! ```text
//!   Empty ──(no transitions)
//!   New ──insert──▶ Clean ──edit──▶ Dirty ──update──▶ Clean
//!    ▲                │                │
//!    └────delete──────┴────delete──────┘
//! ```

use crate::crud::CrudHelper;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;
use tablerow_core::{Criteria, Entity, Executor, FieldValue, Result, SchemaHelper, Value};

/// Crud helper and schema helper shared by all records of one entity type.
pub struct RecordManager<E: Entity, X: Executor, S: SchemaHelper> {
    crud: CrudHelper<E, X>,
    schema: S,
}

impl<E: Entity, X: Executor, S: SchemaHelper> RecordManager<E, X, S> {
    pub fn new(crud: CrudHelper<E, X>, schema: S) -> Self {
        Self { crud, schema }
    }

    /// Build a manager and wrap it for sharing between records.
    pub fn shared(crud: CrudHelper<E, X>, schema: S) -> Arc<Self> {
        Arc::new(Self::new(crud, schema))
    }

    pub fn crud(&self) -> &CrudHelper<E, X> {
        &self.crud
    }

    pub fn schema(&self) -> &S {
        &self.schema
    }
}

impl<E: Entity, X: Executor, S: SchemaHelper> fmt::Debug for RecordManager<E, X, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordManager")
            .field("crud", &self.crud)
            .finish_non_exhaustive()
    }
}

/// Derived lifecycle state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Constructed without key values
    Empty,
    /// Keyed, but no matching row in storage
    New,
    /// In storage, fields match the last load or write
    Clean,
    /// In storage, local fields may differ
    Dirty,
}

/// An entity with an explicit existence and synchronization state.
pub struct Record<E: Entity, X: Executor, S: SchemaHelper> {
    manager: Arc<RecordManager<E, X, S>>,
    entity: E,
    is_empty: bool,
    exists_in_storage: bool,
    is_synced: bool,
}

impl<E: Entity, X: Executor, S: SchemaHelper> Record<E, X, S> {
    /// Create a record for the given key values, in primary key order.
    ///
    /// With key values, the record immediately tries to load its row. With
    /// none, the record is empty and storage is not consulted.
    #[allow(clippy::result_large_err)]
    pub fn new(manager: Arc<RecordManager<E, X, S>>, keys: Vec<FieldValue>) -> Result<Self> {
        let mut entity = E::default();
        let is_empty = keys.is_empty();
        manager.crud().mapper().set_primary(&mut entity, keys);
        let mut record = Self {
            manager,
            entity,
            is_empty,
            exists_in_storage: false,
            is_synced: false,
        };
        if !record.is_empty {
            record.reload(None)?;
        }
        tracing::debug!(
            table = record.table(),
            state = ?record.state(),
            "Constructed record"
        );
        Ok(record)
    }

    /// Create a record around an entity built in memory.
    ///
    /// The record is keyed if the entity carries any key value. Storage is not
    /// consulted; call [`reload`](Self::reload) to look the row up.
    pub fn from_entity(manager: Arc<RecordManager<E, X, S>>, entity: E) -> Self {
        let is_empty = !entity.keys().has_current() && !entity.keys().is_loaded();
        Self {
            manager,
            entity,
            is_empty,
            exists_in_storage: false,
            is_synced: false,
        }
    }

    fn table(&self) -> &str {
        self.manager.crud().table()
    }

    pub fn manager(&self) -> &Arc<RecordManager<E, X, S>> {
        &self.manager
    }

    pub fn crud(&self) -> &CrudHelper<E, X> {
        self.manager.crud()
    }

    pub fn schema(&self) -> &S {
        self.manager.schema()
    }

    pub fn entity(&self) -> &E {
        &self.entity
    }

    pub fn into_entity(self) -> E {
        self.entity
    }

    pub const fn is_empty(&self) -> bool {
        self.is_empty
    }

    pub const fn exists_in_storage(&self) -> bool {
        self.exists_in_storage
    }

    pub const fn is_synced(&self) -> bool {
        self.is_synced
    }

    /// `None` for an empty record, else whether it exists and is synced.
    pub const fn synced(&self) -> Option<bool> {
        if self.is_empty {
            None
        } else {
            Some(self.exists_in_storage && self.is_synced)
        }
    }

    pub const fn state(&self) -> RecordState {
        match (self.is_empty, self.exists_in_storage, self.is_synced) {
            (true, _, _) => RecordState::Empty,
            (false, false, _) => RecordState::New,
            (false, true, true) => RecordState::Clean,
            (false, true, false) => RecordState::Dirty,
        }
    }

    /// Mutate the entity. The record stops being synced.
    pub fn edit<R>(&mut self, f: impl FnOnce(&mut E) -> R) -> R {
        self.is_synced = false;
        f(&mut self.entity)
    }

    /// Insert the entity. No-op returning `false` when empty or already stored.
    ///
    /// A key generated by storage is written back into the entity's key state.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.table()))]
    #[allow(clippy::result_large_err)]
    pub fn insert(&mut self) -> Result<bool> {
        if self.is_empty || self.exists_in_storage {
            tracing::debug!(state = ?self.state(), "Insert skipped");
            return Ok(false);
        }
        self.is_synced = false;
        let key = self.manager.crud().create_one(&self.entity)?;
        self.adopt_generated_key(&key)?;
        self.is_synced = true;
        self.exists_in_storage = true;
        tracing::debug!(key = %key, "Record inserted");
        Ok(true)
    }

    #[allow(clippy::result_large_err)]
    fn adopt_generated_key(&mut self, key: &str) -> Result<()> {
        let metadata = Arc::clone(self.manager.crud().metadata());
        let Some(auto) = metadata.auto_key() else {
            return Ok(());
        };
        let unset = self
            .entity
            .keys()
            .current(auto)
            .is_none_or(FieldValue::is_null);
        if !unset {
            return Ok(());
        }
        if let Some(column) = metadata.column(auto) {
            let value = column.to_domain(&Value::Text(key.to_string()))?;
            self.entity.keys_mut().set(auto, value);
        }
        Ok(())
    }

    /// Write the entity to its row. No-op returning `false` when empty or not stored.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.table()))]
    #[allow(clippy::result_large_err)]
    pub fn update(&mut self) -> Result<bool> {
        if self.is_empty || !self.exists_in_storage {
            tracing::debug!(state = ?self.state(), "Update skipped");
            return Ok(false);
        }
        self.is_synced = false;
        let affected = self.manager.crud().update_one(&self.entity)?;
        if affected {
            self.is_synced = true;
        }
        Ok(affected)
    }

    /// Update when stored, insert otherwise.
    #[allow(clippy::result_large_err)]
    pub fn upsert(&mut self) -> Result<bool> {
        if self.exists_in_storage {
            self.update()
        } else {
            self.insert()
        }
    }

    /// Delete the row. No-op returning `false` when not stored.
    ///
    /// A successful delete leaves the record new: not stored and not synced.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.table()))]
    #[allow(clippy::result_large_err)]
    pub fn delete(&mut self) -> Result<bool> {
        if !self.exists_in_storage {
            return Ok(false);
        }
        self.is_synced = false;
        let removed = self.manager.crud().delete_one(&self.entity)?;
        if removed {
            self.exists_in_storage = false;
        }
        tracing::debug!(removed, "Record deleted");
        Ok(removed)
    }

    /// Reload the entity from storage.
    ///
    /// Without criteria the current key selects the row, and an already
    /// synced record returns `true` without a storage call.
    #[tracing::instrument(level = "debug", skip(self, criteria), fields(table = %self.table()))]
    #[allow(clippy::result_large_err)]
    pub fn reload(&mut self, criteria: Option<&Criteria>) -> Result<bool> {
        let by_key;
        let criteria = match criteria {
            Some(criteria) => criteria,
            None if self.is_synced => return Ok(true),
            None => {
                by_key = self.manager.crud().criteria_for(&self.entity)?;
                &by_key
            }
        };
        let Some(row) = self.manager.crud().read_columns(criteria, None)? else {
            self.exists_in_storage = false;
            self.is_synced = false;
            tracing::debug!("Record not found");
            return Ok(false);
        };
        self.manager
            .crud()
            .mapper()
            .hydrate(&mut self.entity, &row, true)?;
        self.is_synced = true;
        self.exists_in_storage = true;
        tracing::debug!("Record reloaded");
        Ok(true)
    }

    #[allow(clippy::result_large_err)]
    pub fn create_table(&self) -> Result<bool> {
        self.manager.schema().create_table()
    }

    #[allow(clippy::result_large_err)]
    pub fn drop_table(&self) -> Result<bool> {
        self.manager.schema().drop_table()
    }
}

impl<E: Entity, X: Executor, S: SchemaHelper> Deref for Record<E, X, S> {
    type Target = E;

    fn deref(&self) -> &E {
        &self.entity
    }
}

impl<E, X, S> fmt::Debug for Record<E, X, S>
where
    E: Entity + fmt::Debug,
    X: Executor,
    S: SchemaHelper,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("table", &self.table())
            .field("entity", &self.entity)
            .field("state", &self.state())
            .finish()
    }
}
