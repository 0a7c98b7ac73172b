//! Write-back cache of entities keyed by primary key string.
//!
//! Entries are either synchronized (known to match storage) or pending (local
//! changes not yet written). Values are shared handles: mutating one through
//! a handle returned by [`Cache::get`] does not mark the entry pending; call
//! [`Cache::set`] or [`Cache::mark_pending`] for that.

use crate::crud::CrudHelper;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use tablerow_core::identifiers::split_primary_key;
use tablerow_core::{
    Criteria, Entity, Error, Executor, FieldValue, MappingErrorKind, Result, StorageErrorKind,
};

/// One cached entity and its synchronization flag.
#[derive(Debug)]
pub struct CachedEntry<E> {
    value: Arc<RwLock<E>>,
    synchronized: bool,
}

impl<E> CachedEntry<E> {
    fn synced(value: Arc<RwLock<E>>) -> Self {
        Self {
            value,
            synchronized: true,
        }
    }

    fn pending(value: Arc<RwLock<E>>) -> Self {
        Self {
            value,
            synchronized: false,
        }
    }

    /// Shared handle to the cached entity.
    pub fn value(&self) -> Arc<RwLock<E>> {
        Arc::clone(&self.value)
    }

    pub const fn is_synchronized(&self) -> bool {
        self.synchronized
    }
}

/// Outcome of [`Cache::persist_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistReport {
    /// Keys written and now synchronized
    pub persisted: Vec<String>,
    /// Keys whose update affected no row; they stay pending
    pub still_pending: Vec<String>,
}

impl PersistReport {
    pub fn is_complete(&self) -> bool {
        self.still_pending.is_empty()
    }
}

/// Keyed store of entities layered over a [`CrudHelper`].
pub struct Cache<E: Entity, X: Executor> {
    crud: CrudHelper<E, X>,
    entries: BTreeMap<String, CachedEntry<E>>,
}

fn poisoned(table: &str) -> Error {
    Error::storage(
        StorageErrorKind::Backend,
        Some(table),
        "cached entity lock poisoned",
    )
}

impl<E: Entity, X: Executor> Cache<E, X> {
    pub fn new(crud: CrudHelper<E, X>) -> Self {
        Self {
            crud,
            entries: BTreeMap::new(),
        }
    }

    pub fn crud(&self) -> &CrudHelper<E, X> {
        &self.crud
    }

    /// Get an entity, reading it from storage on a miss.
    ///
    /// The key is split into primary key components, each converted through
    /// its key column's adapter. A hit is cached as synchronized; a miss is
    /// not cached, so asking again queries storage again.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.crud.table()))]
    #[allow(clippy::result_large_err)]
    pub fn get(&mut self, key: &str) -> Result<Option<Arc<RwLock<E>>>> {
        if let Some(entry) = self.entries.get(key) {
            tracing::debug!(synchronized = entry.synchronized, "Cache hit");
            return Ok(Some(entry.value()));
        }
        let values: Vec<FieldValue> = split_primary_key(key)
            .into_iter()
            .map(FieldValue::Text)
            .collect();
        let criteria = match self.crud.primary_key_values_to_criteria(&values) {
            Ok(criteria) => criteria,
            // A key part no key column can hold cannot name a row.
            Err(Error::Mapping(e))
                if matches!(
                    e.kind,
                    MappingErrorKind::TypeMismatch | MappingErrorKind::TooLong
                ) =>
            {
                tracing::debug!(column = %e.column, "Cache miss, key does not fit its column");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        let Some(entity) = self.crud.read_one_by(&criteria)? else {
            tracing::debug!("Cache miss, not in storage");
            return Ok(None);
        };
        tracing::debug!("Cache miss, loaded from storage");
        let value = Arc::new(RwLock::new(entity));
        self.entries
            .insert(key.to_string(), CachedEntry::synced(Arc::clone(&value)));
        Ok(Some(value))
    }

    /// Store an entity as pending, replacing any existing entry.
    pub fn set(&mut self, key: impl Into<String>, value: E) -> Arc<RwLock<E>> {
        let value = Arc::new(RwLock::new(value));
        let key = key.into();
        tracing::debug!(key = %key, "Cache set, entry pending");
        self.entries
            .insert(key, CachedEntry::pending(Arc::clone(&value)));
        value
    }

    /// Mark an existing entry pending after mutating it through its handle.
    ///
    /// Returns `false` if the key is not cached.
    pub fn mark_pending(&mut self, key: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.synchronized = false;
                true
            }
            None => false,
        }
    }

    /// Entries with local changes not yet written, in key order.
    pub fn get_pending(&self) -> Vec<(&str, &CachedEntry<E>)> {
        self.entries
            .iter()
            .filter(|(_, entry)| !entry.synchronized)
            .map(|(key, entry)| (key.as_str(), entry))
            .collect()
    }

    /// Cache entities as synchronized, keyed by their primary key string.
    ///
    /// Existing entries for the same key are overwritten, pending ones included.
    pub fn load(&mut self, entities: Vec<E>) -> usize {
        let count = entities.len();
        for entity in entities {
            let key = self.crud.mapper().primary_key_string(&entity);
            let previous = self
                .entries
                .insert(key.clone(), CachedEntry::synced(Arc::new(RwLock::new(entity))));
            if previous.is_some_and(|p| !p.synchronized) {
                tracing::warn!(key = %key, "Loading over a pending entry, local changes discarded");
            }
        }
        tracing::debug!(count, "Loaded entries");
        count
    }

    /// Load every row of the table.
    #[allow(clippy::result_large_err)]
    pub fn load_all(&mut self) -> Result<usize> {
        let entities = self.crud.list_all()?;
        Ok(self.load(entities))
    }

    /// Load the rows matching `criteria`.
    #[allow(clippy::result_large_err)]
    pub fn load_by_criteria(&mut self, criteria: &Criteria) -> Result<usize> {
        let entities = self.crud.read_many(criteria)?;
        Ok(self.load(entities))
    }

    /// Drop every entry without writing anything. Returns the number of
    /// pending entries discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.entries.values().filter(|e| !e.synchronized).count();
        if discarded > 0 {
            tracing::warn!(discarded, "Clearing cache with pending entries");
        }
        self.entries.clear();
        discarded
    }

    /// Remove one entry, returning its handle.
    pub fn remove(&mut self, key: &str) -> Option<Arc<RwLock<E>>> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Write every pending entry through `update_one`.
    ///
    /// Entries whose update affects a row become synchronized. The others stay
    /// pending and are listed in the report. A storage error stops the run;
    /// entries written before it stay synchronized.
    #[tracing::instrument(level = "debug", skip(self), fields(table = %self.crud.table()))]
    #[allow(clippy::result_large_err)]
    pub fn persist_all(&mut self) -> Result<PersistReport> {
        let mut report = PersistReport::default();
        let table = self.crud.table().to_string();
        for (key, entry) in &mut self.entries {
            if entry.synchronized {
                continue;
            }
            let affected = {
                let entity = entry.value.read().map_err(|_| poisoned(&table))?;
                self.crud.update_one(&entity)?
            };
            if affected {
                entry.synchronized = true;
                report.persisted.push(key.clone());
            } else {
                tracing::warn!(key = %key, "Update affected no row, entry stays pending");
                report.still_pending.push(key.clone());
            }
        }
        tracing::debug!(
            persisted = report.persisted.len(),
            still_pending = report.still_pending.len(),
            "Persisted pending entries"
        );
        Ok(report)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Is the entry cached and synchronized? `None` if not cached.
    pub fn is_synchronized(&self, key: &str) -> Option<bool> {
        self.entries.get(key).map(|e| e.synchronized)
    }
}

impl<E: Entity, X: Executor> fmt::Debug for Cache<E, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cache")
            .field("table", &self.crud.table())
            .field("entries", &self.entries.len())
            .field("pending", &self.get_pending().len())
            .finish()
    }
}
