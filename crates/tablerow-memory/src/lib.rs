//! In-memory storage executor for TableRow.
//!
//! `MemoryStore` keeps tables as plain row lists behind a mutex and evaluates
//! [`Criteria`] directly. Tables are created through [`MemorySchema`], the
//! store's [`SchemaHelper`]. Every executor call is appended to a call log so
//! tests can assert on exactly what reached storage.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tablerow_core::identifiers::join_primary_key;
use tablerow_core::{
    Criteria, Entity, Error, Executor, ResolvedMetadata, Result, Row, SchemaHelper,
    StorageErrorKind, Value, resolve,
};

/// One executor call, as recorded in the call log.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Insert {
        table: String,
        row: Row,
    },
    InsertMany {
        table: String,
        rows: Vec<Row>,
    },
    SelectOne {
        table: String,
        criteria: Criteria,
        columns: Option<Vec<String>>,
    },
    SelectMany {
        table: String,
        criteria: Criteria,
    },
    Update {
        table: String,
        row: Row,
        criteria: Criteria,
    },
    Delete {
        table: String,
        criteria: Criteria,
    },
}

impl Call {
    pub fn table(&self) -> &str {
        match self {
            Call::Insert { table, .. }
            | Call::InsertMany { table, .. }
            | Call::SelectOne { table, .. }
            | Call::SelectMany { table, .. }
            | Call::Update { table, .. }
            | Call::Delete { table, .. } => table,
        }
    }

    pub fn is_select(&self) -> bool {
        matches!(self, Call::SelectOne { .. } | Call::SelectMany { .. })
    }

    pub fn is_write(&self) -> bool {
        !self.is_select()
    }
}

#[derive(Debug, Clone)]
struct MemoryTable {
    columns: Vec<String>,
    primary_keys: Vec<String>,
    auto_key: Option<String>,
    next_id: i64,
    rows: Vec<Row>,
}

impl MemoryTable {
    fn from_metadata(metadata: &ResolvedMetadata) -> Self {
        Self {
            columns: metadata
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            primary_keys: metadata.primary_keys().to_vec(),
            auto_key: metadata.auto_key().map(str::to_string),
            next_id: 1,
            rows: Vec::new(),
        }
    }

    /// Lay a row out over the table's columns, filling gaps with NULL.
    fn normalize(&self, row: &Row) -> Row {
        let mut names = self.columns.clone();
        let mut values: Vec<Value> = self
            .columns
            .iter()
            .map(|c| row.get_by_name(c).cloned().unwrap_or(Value::Null))
            .collect();
        for (name, value) in row.iter() {
            if !self.columns.iter().any(|c| c == name) {
                names.push(name.to_string());
                values.push(value.clone());
            }
        }
        Row::new(names, values)
    }

    fn key_of(&self, row: &Row) -> Vec<Value> {
        self.primary_keys
            .iter()
            .map(|k| row.get_by_name(k).cloned().unwrap_or(Value::Null))
            .collect()
    }

    fn key_string(&self, row: &Row) -> String {
        join_primary_key(
            self.key_of(row)
                .iter()
                .map(|v| v.to_text().unwrap_or_default()),
        )
    }

    fn same_key(&self, a: &Row, b: &Row) -> bool {
        !self.primary_keys.is_empty()
            && self
                .key_of(a)
                .iter()
                .zip(self.key_of(b).iter())
                .all(|(x, y)| x.loosely_equals(y))
    }

    #[allow(clippy::result_large_err)]
    fn insert(&mut self, table: &str, row: &Row) -> Result<String> {
        let mut row = self.normalize(row);
        let mut generated = None;
        if let Some(auto) = self.auto_key.clone() {
            match row.get_by_name(&auto).and_then(Value::as_i64) {
                Some(id) => self.next_id = self.next_id.max(id.saturating_add(1)),
                None => {
                    let id = self.next_id;
                    self.next_id = self.next_id.saturating_add(1);
                    row = Row::from_pairs(row.iter().map(|(name, value)| {
                        let value = if name == auto {
                            Value::BigInt(id)
                        } else {
                            value.clone()
                        };
                        (name.to_string(), value)
                    }));
                    generated = Some(id);
                }
            }
        }

        if self.rows.iter().any(|existing| self.same_key(existing, &row)) {
            return Err(Error::storage(
                StorageErrorKind::Constraint,
                Some(table),
                format!("duplicate primary key '{}'", self.key_string(&row)),
            ));
        }

        let key = match (generated, &self.auto_key) {
            (Some(id), _) => id.to_string(),
            (None, Some(auto)) => row
                .get_by_name(auto)
                .and_then(Value::to_text)
                .unwrap_or_default(),
            (None, None) => self.key_string(&row),
        };
        self.rows.push(row);
        Ok(key)
    }
}

/// Thread-safe in-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<HashMap<String, MemoryTable>>,
    calls: Mutex<Vec<Call>>,
}

fn poisoned(what: &str) -> Error {
    Error::storage(
        StorageErrorKind::Backend,
        None,
        format!("memory store {what} lock poisoned"),
    )
}

fn missing_table(table: &str) -> Error {
    Error::storage(
        StorageErrorKind::TableNotFound,
        Some(table),
        "table does not exist",
    )
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a shared store.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    #[allow(clippy::result_large_err)]
    fn tables(&self) -> Result<MutexGuard<'_, HashMap<String, MemoryTable>>> {
        self.tables.lock().map_err(|_| poisoned("table"))
    }

    #[allow(clippy::result_large_err)]
    fn log(&self, call: Call) -> Result<()> {
        self.calls.lock().map_err(|_| poisoned("call log"))?.push(call);
        Ok(())
    }

    /// Create the table described by `metadata`.
    ///
    /// Returns `false` if a table of that name already exists.
    #[allow(clippy::result_large_err)]
    pub fn create_table(&self, metadata: &ResolvedMetadata) -> Result<bool> {
        let mut tables = self.tables()?;
        let name = metadata.table_name();
        if tables.contains_key(name) {
            tracing::debug!(table = name, "Table already exists");
            return Ok(false);
        }
        tables.insert(name.to_string(), MemoryTable::from_metadata(metadata));
        tracing::debug!(table = name, "Created table");
        Ok(true)
    }

    /// Drop a table. Returns `false` if it did not exist.
    #[allow(clippy::result_large_err)]
    pub fn drop_table(&self, table: &str) -> Result<bool> {
        let dropped = self.tables()?.remove(table).is_some();
        tracing::debug!(table, dropped, "Dropped table");
        Ok(dropped)
    }

    #[allow(clippy::result_large_err)]
    pub fn has_table(&self, table: &str) -> Result<bool> {
        Ok(self.tables()?.contains_key(table))
    }

    /// Insert a row without logging the call.
    #[allow(clippy::result_large_err)]
    pub fn seed(&self, table: &str, row: Row) -> Result<String> {
        let mut tables = self.tables()?;
        let memory = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        memory.insert(table, &row)
    }

    /// Snapshot of every row in a table.
    #[allow(clippy::result_large_err)]
    pub fn rows(&self, table: &str) -> Result<Vec<Row>> {
        let tables = self.tables()?;
        let memory = tables.get(table).ok_or_else(|| missing_table(table))?;
        Ok(memory.rows.clone())
    }

    /// Snapshot of the call log.
    #[allow(clippy::result_large_err)]
    pub fn calls(&self) -> Result<Vec<Call>> {
        Ok(self.calls.lock().map_err(|_| poisoned("call log"))?.clone())
    }

    #[allow(clippy::result_large_err)]
    pub fn clear_calls(&self) -> Result<()> {
        self.calls.lock().map_err(|_| poisoned("call log"))?.clear();
        Ok(())
    }
}

impl Executor for MemoryStore {
    #[tracing::instrument(level = "debug", skip(self, row))]
    fn insert(&self, table: &str, row: &Row) -> Result<String> {
        self.log(Call::Insert {
            table: table.to_string(),
            row: row.clone(),
        })?;
        let mut tables = self.tables()?;
        let memory = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let key = memory.insert(table, row)?;
        tracing::debug!(key = %key, "Inserted row");
        Ok(key)
    }

    #[tracing::instrument(level = "debug", skip(self, rows), fields(count = rows.len()))]
    fn insert_many(&self, table: &str, rows: &[Row]) -> Result<bool> {
        self.log(Call::InsertMany {
            table: table.to_string(),
            rows: rows.to_vec(),
        })?;
        let mut tables = self.tables()?;
        let memory = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let snapshot = memory.clone();
        for row in rows {
            if let Err(e) = memory.insert(table, row) {
                tracing::warn!(error = %e, "Batch insert failed, rolling back");
                *memory = snapshot;
                return Ok(false);
            }
        }
        Ok(true)
    }

    #[tracing::instrument(level = "debug", skip(self, criteria, columns))]
    fn select_one(
        &self,
        table: &str,
        criteria: &Criteria,
        columns: Option<&[&str]>,
    ) -> Result<Option<Row>> {
        self.log(Call::SelectOne {
            table: table.to_string(),
            criteria: criteria.clone(),
            columns: columns.map(|cols| cols.iter().map(|c| (*c).to_string()).collect()),
        })?;
        let tables = self.tables()?;
        let memory = tables.get(table).ok_or_else(|| missing_table(table))?;
        let found = memory.rows.iter().find(|row| criteria.matches(row));
        tracing::debug!(found = found.is_some(), "Selected one row");
        Ok(found.map(|row| match columns {
            Some(cols) => row.project(cols),
            None => row.clone(),
        }))
    }

    #[tracing::instrument(level = "debug", skip(self, criteria))]
    fn select_many(&self, table: &str, criteria: &Criteria) -> Result<Vec<Row>> {
        self.log(Call::SelectMany {
            table: table.to_string(),
            criteria: criteria.clone(),
        })?;
        let tables = self.tables()?;
        let memory = tables.get(table).ok_or_else(|| missing_table(table))?;
        let rows: Vec<Row> = memory
            .rows
            .iter()
            .filter(|row| criteria.matches(row))
            .cloned()
            .collect();
        tracing::debug!(count = rows.len(), "Selected rows");
        Ok(rows)
    }

    #[tracing::instrument(level = "debug", skip(self, row, criteria))]
    fn update(&self, table: &str, row: &Row, criteria: &Criteria) -> Result<bool> {
        self.log(Call::Update {
            table: table.to_string(),
            row: row.clone(),
            criteria: criteria.clone(),
        })?;
        let mut tables = self.tables()?;
        let memory = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let mut affected = 0usize;
        for existing in &mut memory.rows {
            if !criteria.matches(existing) {
                continue;
            }
            let updated = Row::from_pairs(existing.iter().map(|(name, value)| {
                let value = row.get_by_name(name).unwrap_or(value).clone();
                (name.to_string(), value)
            }));
            *existing = updated;
            affected += 1;
        }
        tracing::debug!(affected, "Updated rows");
        Ok(affected > 0)
    }

    #[tracing::instrument(level = "debug", skip(self, criteria))]
    fn delete(&self, table: &str, criteria: &Criteria) -> Result<bool> {
        self.log(Call::Delete {
            table: table.to_string(),
            criteria: criteria.clone(),
        })?;
        let mut tables = self.tables()?;
        let memory = tables.get_mut(table).ok_or_else(|| missing_table(table))?;
        let before = memory.rows.len();
        memory.rows.retain(|row| !criteria.matches(row));
        let removed = before - memory.rows.len();
        tracing::debug!(removed, "Deleted rows");
        Ok(removed > 0)
    }
}

/// Schema helper creating one entity's table in a [`MemoryStore`].
#[derive(Debug, Clone)]
pub struct MemorySchema {
    store: Arc<MemoryStore>,
    metadata: Arc<ResolvedMetadata>,
}

impl MemorySchema {
    pub fn new(store: Arc<MemoryStore>, metadata: Arc<ResolvedMetadata>) -> Self {
        Self { store, metadata }
    }

    /// Schema helper for an entity type's resolved metadata.
    #[allow(clippy::result_large_err)]
    pub fn for_entity<E: Entity>(store: Arc<MemoryStore>) -> Result<Self> {
        Ok(Self::new(store, resolve::<E>()?))
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}

impl SchemaHelper for MemorySchema {
    fn create_table(&self) -> Result<bool> {
        self.store.create_table(&self.metadata)
    }

    fn drop_table(&self) -> Result<bool> {
        self.store.drop_table(self.metadata.table_name())
    }
}
