//! Storage row representation.

use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column names shared across all rows read from the same table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    names: Vec<String>,
    name_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create column info from a list of column names.
    ///
    /// A repeated name resolves to its last position.
    pub fn new(names: Vec<String>) -> Self {
        let name_to_index = names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            names,
            name_to_index,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get the index of a column by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.name_to_index.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// An ordered set of column name / storage value pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<Value>,
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a row from parallel name and value lists.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        let columns = Arc::new(ColumnInfo::new(column_names));
        Self { values, columns }
    }

    /// Create a row with shared column metadata.
    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    /// Build a row from `(name, value)` pairs.
    ///
    /// # Examples
    ///
    /// ```
    /// use tablerow_core::{Row, Value};
    ///
    /// let row = Row::from_pairs([("id", Value::BigInt(7)), ("name", Value::from("Ada"))]);
    /// assert_eq!(row.get_by_name("name"), Some(&Value::from("Ada")));
    /// ```
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let (names, values): (Vec<String>, Vec<Value>) = pairs
            .into_iter()
            .map(|(name, value)| (name.into(), value))
            .unzip();
        Self::new(names, values)
    }

    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.names().iter().map(String::as_str)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Iterate over `(column_name, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Copy of this row restricted to the given columns, in the given order.
    ///
    /// Columns the row does not carry are skipped.
    #[must_use]
    pub fn project(&self, columns: &[&str]) -> Row {
        Row::from_pairs(columns.iter().filter_map(|name| {
            self.get_by_name(name)
                .map(|value| ((*name).to_string(), value.clone()))
        }))
    }

    /// Copy of this row without the given columns.
    #[must_use]
    pub fn without(&self, excluded: &[String]) -> Row {
        Row::from_pairs(
            self.iter()
                .filter(|(name, _)| !excluded.iter().any(|e| e == name))
                .map(|(name, value)| (name.to_string(), value.clone())),
        )
    }

    /// Plain JSON object of this row.
    pub fn to_json(&self) -> serde_json::Map<String, serde_json::Value> {
        self.iter()
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect()
    }
}
