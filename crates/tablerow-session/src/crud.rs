//! Generic CRUD operations for one entity type.

use std::fmt;
use std::sync::Arc;
use tablerow_core::{
    Accessors, Criteria, Entity, Error, Executor, FieldValue, IntegrityError, ResolvedMetadata,
    Result, Row, RowMapper, resolve,
};

/// Columns left out of the rows sent on insert or update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrudOptions {
    insert_excluded_columns: Vec<String>,
    update_excluded_columns: Vec<String>,
}

impl CrudOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Omit these columns from inserted rows, e.g. columns filled by storage defaults.
    #[must_use]
    pub fn exclude_on_insert<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.insert_excluded_columns
            .extend(columns.into_iter().map(Into::into));
        self
    }

    /// Omit these columns from updated rows, e.g. creation timestamps.
    #[must_use]
    pub fn exclude_on_update<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_excluded_columns
            .extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn insert_excluded_columns(&self) -> &[String] {
        &self.insert_excluded_columns
    }

    pub fn update_excluded_columns(&self) -> &[String] {
        &self.update_excluded_columns
    }
}

/// CRUD requester for one entity type over a storage executor.
///
/// Construction checks that the entity satisfies the mapping contract, so
/// configuration mistakes surface before any storage call.
pub struct CrudHelper<E: Entity, X: Executor> {
    executor: X,
    mapper: RowMapper<E>,
    options: CrudOptions,
}

#[allow(clippy::result_large_err)]
fn validate<E>(
    metadata: &ResolvedMetadata,
    accessors: &Accessors<E>,
    options: &CrudOptions,
) -> Result<()> {
    let entity = metadata.entity_name();
    if metadata.primary_keys().is_empty() {
        return Err(Error::config(entity, "no primary key declared"));
    }
    for key in metadata.primary_keys() {
        if !metadata.has_column(key) {
            return Err(Error::config(
                entity,
                format!("primary key '{key}' is not a declared column"),
            ));
        }
        if accessors.contains(key) {
            return Err(Error::config(
                entity,
                format!("primary key '{key}' is held in the key state and cannot have a field accessor"),
            ));
        }
    }
    if let Some(auto) = metadata.auto_key() {
        if !metadata.has_column(auto) {
            return Err(Error::config(
                entity,
                format!("auto key '{auto}' is not a declared column"),
            ));
        }
    }
    for column in metadata.mapped_columns() {
        let name = column.name();
        if !metadata.is_primary_key(name) && !accessors.contains(name) {
            return Err(Error::config(
                entity,
                format!("column '{name}' has no field accessor"),
            ));
        }
    }
    if let Some(stray) = accessors.columns().find(|c| !metadata.has_column(c)) {
        return Err(Error::config(
            entity,
            format!("field accessor '{stray}' does not match any declared column"),
        ));
    }
    let excluded = options
        .insert_excluded_columns()
        .iter()
        .chain(options.update_excluded_columns());
    for column in excluded {
        if !metadata.has_column(column) {
            return Err(Error::config(
                entity,
                format!("excluded column '{column}' is not a declared column"),
            ));
        }
    }
    Ok(())
}

impl<E: Entity, X: Executor> CrudHelper<E, X> {
    /// Create a helper with default options.
    #[allow(clippy::result_large_err)]
    pub fn new(executor: X) -> Result<Self> {
        Self::with_options(executor, CrudOptions::default())
    }

    #[allow(clippy::result_large_err)]
    pub fn with_options(executor: X, options: CrudOptions) -> Result<Self> {
        let metadata = resolve::<E>()?;
        let accessors = E::accessors();
        validate(&metadata, &accessors, &options)?;
        tracing::debug!(
            entity = metadata.entity_name(),
            table = metadata.table_name(),
            "Created CRUD helper"
        );
        Ok(Self {
            executor,
            mapper: RowMapper::with_parts(metadata, accessors),
            options,
        })
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    pub fn mapper(&self) -> &RowMapper<E> {
        &self.mapper
    }

    pub fn metadata(&self) -> &Arc<ResolvedMetadata> {
        self.mapper.metadata()
    }

    pub fn options(&self) -> &CrudOptions {
        &self.options
    }

    /// Name of the managed table.
    pub fn table(&self) -> &str {
        self.mapper.metadata().table_name()
    }

    /// Insert an entity, returning the generated or primary key string.
    ///
    /// An entity loaded from storage cannot be inserted again.
    #[tracing::instrument(level = "debug", skip(self, entity), fields(table = %self.table()))]
    #[allow(clippy::result_large_err)]
    pub fn create_one(&self, entity: &E) -> Result<String> {
        self.ensure_insertable(entity)?;
        let row = self
            .mapper
            .dehydrate(entity)?
            .without(self.options.insert_excluded_columns());
        let key = self.executor.insert(self.table(), &row)?;
        tracing::debug!(key = %key, "Created row");
        Ok(key)
    }

    /// Insert several entities. Returns the executor's all-or-nothing flag.
    #[tracing::instrument(level = "debug", skip(self, entities), fields(table = %self.table(), count = entities.len()))]
    #[allow(clippy::result_large_err)]
    pub fn create_many(&self, entities: &[E]) -> Result<bool> {
        let rows = entities
            .iter()
            .map(|entity| {
                self.ensure_insertable(entity)?;
                Ok(self
                    .mapper
                    .dehydrate(entity)?
                    .without(self.options.insert_excluded_columns()))
            })
            .collect::<Result<Vec<Row>>>()?;
        self.executor.insert_many(self.table(), &rows)
    }

    /// Read one entity by primary key values given in primary key order.
    #[allow(clippy::result_large_err)]
    pub fn read_one(&self, values: &[FieldValue]) -> Result<Option<E>> {
        let criteria = self.primary_key_values_to_criteria(values)?;
        self.read_one_by(&criteria)
    }

    /// Read the first entity matching `criteria`.
    #[tracing::instrument(level = "debug", skip(self, criteria), fields(table = %self.table()))]
    #[allow(clippy::result_large_err)]
    pub fn read_one_by(&self, criteria: &Criteria) -> Result<Option<E>> {
        match self.executor.select_one(self.table(), criteria, None)? {
            Some(row) => {
                tracing::debug!("Row found");
                self.instantiate_from_row(&row, true).map(Some)
            }
            None => {
                tracing::debug!("No row found");
                Ok(None)
            }
        }
    }

    /// Read some or all columns of the first row matching `criteria`.
    #[allow(clippy::result_large_err)]
    pub fn read_columns(&self, criteria: &Criteria, columns: Option<&[&str]>) -> Result<Option<Row>> {
        self.executor.select_one(self.table(), criteria, columns)
    }

    /// Read every entity matching `criteria`.
    #[tracing::instrument(level = "debug", skip(self, criteria), fields(table = %self.table()))]
    #[allow(clippy::result_large_err)]
    pub fn read_many(&self, criteria: &Criteria) -> Result<Vec<E>> {
        let rows = self.executor.select_many(self.table(), criteria)?;
        tracing::debug!(count = rows.len(), "Rows found");
        rows.iter()
            .map(|row| self.instantiate_from_row(row, true))
            .collect()
    }

    /// Read every entity of the table.
    #[allow(clippy::result_large_err)]
    pub fn list_all(&self) -> Result<Vec<E>> {
        self.read_many(&Criteria::all())
    }

    /// Write every column of an entity to the row selected by its current key.
    #[tracing::instrument(level = "debug", skip(self, entity), fields(table = %self.table()))]
    #[allow(clippy::result_large_err)]
    pub fn update_one(&self, entity: &E) -> Result<bool> {
        let criteria = self.criteria_for(entity)?;
        let row = self
            .mapper
            .dehydrate(entity)?
            .without(self.options.update_excluded_columns());
        let affected = self.executor.update(self.table(), &row, &criteria)?;
        tracing::debug!(affected, "Updated row");
        Ok(affected)
    }

    /// Delete the row selected by an entity's current key.
    #[tracing::instrument(level = "debug", skip(self, entity), fields(table = %self.table()))]
    #[allow(clippy::result_large_err)]
    pub fn delete_one(&self, entity: &E) -> Result<bool> {
        let criteria = self.criteria_for(entity)?;
        let affected = self.executor.delete(self.table(), &criteria)?;
        tracing::debug!(affected, "Deleted row");
        Ok(affected)
    }

    /// Equality criteria over the primary key, zipping `values` positionally.
    ///
    /// Values must follow primary key order. Missing trailing values select
    /// on NULL; extra values are ignored. Each value is converted through its
    /// key column's adapter.
    #[allow(clippy::result_large_err)]
    pub fn primary_key_values_to_criteria(&self, values: &[FieldValue]) -> Result<Criteria> {
        let metadata = self.mapper.metadata();
        let mut criteria = Criteria::all();
        for (i, key) in metadata.primary_keys().iter().enumerate() {
            let value = values.get(i).unwrap_or(&FieldValue::Null);
            let stored = match metadata.column(key) {
                Some(column) => column.to_storage(value)?,
                None => tablerow_core::Value::Null,
            };
            criteria = criteria.eq(key.clone(), stored);
        }
        Ok(criteria)
    }

    /// Criteria selecting an entity by its current key.
    #[allow(clippy::result_large_err)]
    pub fn criteria_for(&self, entity: &E) -> Result<Criteria> {
        Ok(Criteria::from_pairs(
            self.mapper.primary_key_storage_values(entity)?,
        ))
    }

    /// Build an entity from a row.
    #[allow(clippy::result_large_err)]
    pub fn instantiate_from_row(&self, row: &Row, from_storage: bool) -> Result<E> {
        self.mapper.instantiate(row, from_storage)
    }

    #[allow(clippy::result_large_err)]
    fn ensure_insertable(&self, entity: &E) -> Result<()> {
        if entity.keys().is_loaded() {
            return Err(Error::Integrity(IntegrityError {
                table: self.table().to_string(),
                primary_key: self.mapper.primary_key_string(entity),
                message: "entity was loaded from storage and cannot be inserted again".to_string(),
            }));
        }
        Ok(())
    }
}

impl<E: Entity, X: Executor> fmt::Debug for CrudHelper<E, X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudHelper")
            .field("table", &self.table())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Player, Scoreless, UntrackedField, player, players_store};
    use tablerow_core::{StorageErrorKind, Value};
    use tablerow_memory::Call;

    #[test]
    fn construction_validates_the_mapping_contract() {
        let store = players_store();
        assert!(CrudHelper::<Player, _>::new(Arc::clone(&store)).is_ok());

        let err = CrudHelper::<Scoreless, _>::new(Arc::clone(&store)).unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("no primary key"));

        let err = CrudHelper::<UntrackedField, _>::new(Arc::clone(&store)).unwrap_err();
        assert!(err.to_string().contains("column 'level' has no field accessor"));

        let err = CrudHelper::<Player, _>::with_options(
            store,
            CrudOptions::new().exclude_on_update(["nope"]),
        )
        .unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn create_read_update_delete() {
        let store = players_store();
        let crud = CrudHelper::<Player, _>::new(Arc::clone(&store)).unwrap();

        assert_eq!(crud.create_one(&player(7, "Ada")).unwrap(), "7");
        let mut loaded = crud.read_one(&[FieldValue::Int(7)]).unwrap().unwrap();
        assert_eq!(loaded.name, "Ada");
        assert!(loaded.keys.is_loaded());

        loaded.name = "Grace".into();
        assert!(crud.update_one(&loaded).unwrap());
        let reread = crud
            .read_one_by(&Criteria::all().eq("name", "Grace"))
            .unwrap()
            .unwrap();
        assert_eq!(crud.mapper().primary_key_string(&reread), "7");

        assert!(crud.delete_one(&reread).unwrap());
        assert!(!crud.delete_one(&reread).unwrap());
        assert!(crud.read_one(&[FieldValue::Int(7)]).unwrap().is_none());
    }

    #[test]
    fn loaded_entities_cannot_be_inserted_again() {
        let store = players_store();
        let crud = CrudHelper::<Player, _>::new(Arc::clone(&store)).unwrap();
        crud.create_one(&player(1, "Ada")).unwrap();
        let loaded = crud.read_one(&[FieldValue::Int(1)]).unwrap().unwrap();
        store.clear_calls().unwrap();

        let err = crud.create_one(&loaded).unwrap_err();
        assert!(matches!(err, Error::Integrity(_)));
        assert!(store.calls().unwrap().is_empty());
    }

    #[test]
    fn key_values_are_converted_through_key_adapters() {
        let store = players_store();
        let crud = CrudHelper::<Player, _>::new(store).unwrap();
        let criteria = crud
            .primary_key_values_to_criteria(&[FieldValue::from("7")])
            .unwrap();
        assert_eq!(criteria.equality_value("id"), Some(&Value::BigInt(7)));

        let criteria = crud.primary_key_values_to_criteria(&[]).unwrap();
        assert_eq!(criteria.equality_value("id"), Some(&Value::Null));
    }

    #[test]
    fn incomplete_keys_select_nothing() {
        let store = players_store();
        store
            .seed(
                "players",
                Row::from_pairs([("id", Value::Null), ("name", Value::from("Ghost"))]),
            )
            .unwrap();
        let crud = CrudHelper::<Player, _>::new(Arc::clone(&store)).unwrap();
        assert!(crud.read_one(&[]).unwrap().is_none());
        assert!(!crud.delete_one(&Player::default()).unwrap());
        assert_eq!(store.rows("players").unwrap().len(), 1);
    }

    #[test]
    fn excluded_columns_are_left_out() {
        let store = players_store();
        let crud = CrudHelper::<Player, _>::with_options(
            Arc::clone(&store),
            CrudOptions::new().exclude_on_update(["name"]),
        )
        .unwrap();
        crud.create_one(&player(3, "Ada")).unwrap();
        let mut loaded = crud.read_one(&[FieldValue::Int(3)]).unwrap().unwrap();
        loaded.name = "Grace".into();
        store.clear_calls().unwrap();
        crud.update_one(&loaded).unwrap();

        let calls = store.calls().unwrap();
        let Call::Update { row, criteria, .. } = &calls[0] else {
            panic!("expected an update, got {calls:?}");
        };
        assert!(!row.contains_column("name"));
        assert_eq!(criteria.equality_value("id"), Some(&Value::BigInt(3)));
        let stored = crud.read_one(&[FieldValue::Int(3)]).unwrap().unwrap();
        assert_eq!(stored.name, "Ada");
    }

    #[test]
    fn batch_and_listing() {
        let store = players_store();
        let crud = CrudHelper::<Player, _>::new(Arc::clone(&store)).unwrap();
        assert!(crud.create_many(&[player(1, "Ada"), player(2, "Grace")]).unwrap());
        assert!(!crud.create_many(&[player(3, "Linus"), player(1, "Dup")]).unwrap());
        assert_eq!(crud.list_all().unwrap().len(), 2);
        assert_eq!(
            crud.read_many(&Criteria::all().gt("id", 1)).unwrap().len(),
            1
        );
        let row = crud
            .read_columns(&Criteria::all().eq("id", 2), Some(&["name"][..]))
            .unwrap()
            .unwrap();
        assert_eq!(row.get_by_name("name"), Some(&Value::from("Grace")));
    }

    #[test]
    fn storage_errors_propagate() {
        let store = tablerow_memory::MemoryStore::shared();
        let crud = CrudHelper::<Player, _>::new(store).unwrap();
        let err = crud.list_all().unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(ref e) if e.kind == StorageErrorKind::TableNotFound
        ));
    }
}
