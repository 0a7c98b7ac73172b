//! Collaborator traits: the storage executor and the schema helper.

use crate::Result;
use crate::criteria::Criteria;
use crate::row::Row;
use std::sync::Arc;

/// Executes generic row operations against one storage backend.
///
/// Methods take `&self` so executors can be shared between helpers; an
/// executor needing mutation uses interior locking.
#[allow(clippy::result_large_err)]
pub trait Executor: Send + Sync {
    /// Insert a row, returning the generated or primary key as a string.
    fn insert(&self, table: &str, row: &Row) -> Result<String>;

    /// Insert many rows. Returns `true` only if every row was inserted.
    fn insert_many(&self, table: &str, rows: &[Row]) -> Result<bool>;

    /// Fetch the first row matching `criteria`, optionally projected.
    fn select_one(
        &self,
        table: &str,
        criteria: &Criteria,
        columns: Option<&[&str]>,
    ) -> Result<Option<Row>>;

    /// Fetch every row matching `criteria`.
    fn select_many(&self, table: &str, criteria: &Criteria) -> Result<Vec<Row>>;

    /// Update rows matching `criteria`. Returns whether any row was affected.
    fn update(&self, table: &str, row: &Row, criteria: &Criteria) -> Result<bool>;

    /// Delete rows matching `criteria`. Returns whether any row was affected.
    fn delete(&self, table: &str, criteria: &Criteria) -> Result<bool>;
}

/// Creates and drops the table of one entity type.
#[allow(clippy::result_large_err)]
pub trait SchemaHelper: Send + Sync {
    fn create_table(&self) -> Result<bool>;

    fn drop_table(&self) -> Result<bool>;
}

macro_rules! forward_executor {
    ($ty:ty) => {
        impl<T: Executor + ?Sized> Executor for $ty {
            fn insert(&self, table: &str, row: &Row) -> Result<String> {
                (**self).insert(table, row)
            }

            fn insert_many(&self, table: &str, rows: &[Row]) -> Result<bool> {
                (**self).insert_many(table, rows)
            }

            fn select_one(
                &self,
                table: &str,
                criteria: &Criteria,
                columns: Option<&[&str]>,
            ) -> Result<Option<Row>> {
                (**self).select_one(table, criteria, columns)
            }

            fn select_many(&self, table: &str, criteria: &Criteria) -> Result<Vec<Row>> {
                (**self).select_many(table, criteria)
            }

            fn update(&self, table: &str, row: &Row, criteria: &Criteria) -> Result<bool> {
                (**self).update(table, row, criteria)
            }

            fn delete(&self, table: &str, criteria: &Criteria) -> Result<bool> {
                (**self).delete(table, criteria)
            }
        }
    };
}

forward_executor!(&T);
forward_executor!(Arc<T>);
forward_executor!(Box<T>);

macro_rules! forward_schema_helper {
    ($ty:ty) => {
        impl<T: SchemaHelper + ?Sized> SchemaHelper for $ty {
            fn create_table(&self) -> Result<bool> {
                (**self).create_table()
            }

            fn drop_table(&self) -> Result<bool> {
                (**self).drop_table()
            }
        }
    };
}

forward_schema_helper!(&T);
forward_schema_helper!(Arc<T>);
forward_schema_helper!(Box<T>);
