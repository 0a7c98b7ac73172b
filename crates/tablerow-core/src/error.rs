//! Error types for TableRow operations.

use std::fmt;

/// The primary error type for all TableRow operations.
#[derive(Debug)]
pub enum Error {
    /// Entity type does not satisfy the mapping contract
    Config(ConfigError),
    /// Metadata resolution could not determine a table
    Schema(SchemaError),
    /// Row/entity mapping errors (unknown column, wrong domain type)
    Mapping(MappingError),
    /// Adapter received malformed storage input
    Decode(DecodeError),
    /// Attempt to re-insert an already persisted entity
    Integrity(IntegrityError),
    /// Failure reported by the storage executor
    Storage(StorageError),
}

#[derive(Debug)]
pub struct ConfigError {
    pub entity: String,
    pub message: String,
}

#[derive(Debug)]
pub struct SchemaError {
    pub kind: SchemaErrorKind,
    pub entity: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaErrorKind {
    /// No table declaration anywhere in the composition graph
    MissingTable,
    /// Declared or derived table name is not a usable identifier
    InvalidName,
}

#[derive(Debug)]
pub struct MappingError {
    pub kind: MappingErrorKind,
    pub column: String,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingErrorKind {
    /// The row carries a column with no adapter
    UnknownColumn,
    /// A domain value does not fit the column's adapter
    TypeMismatch,
    /// A string exceeds the adapter's maximum length
    TooLong,
    /// A non-key column has no field accessor
    MissingAccessor,
}

#[derive(Debug)]
pub struct DecodeError {
    pub column: Option<String>,
    pub adapter: &'static str,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug)]
pub struct IntegrityError {
    pub table: String,
    pub primary_key: String,
    pub message: String,
}

#[derive(Debug)]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub table: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Table does not exist in the backend
    TableNotFound,
    /// Table already exists in the backend
    TableExists,
    /// Constraint violation (duplicate primary key, ...)
    Constraint,
    /// Any other backend failure
    Backend,
}

impl Error {
    /// Build a configuration error for an entity type.
    pub fn config(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            entity: entity.into(),
            message: message.into(),
        })
    }

    /// Build a mapping error for a column.
    pub fn mapping(
        kind: MappingErrorKind,
        column: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Mapping(MappingError {
            kind,
            column: column.into(),
            message: message.into(),
        })
    }

    /// Build a backend storage error.
    pub fn storage(
        kind: StorageErrorKind,
        table: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Error::Storage(StorageError {
            kind,
            table: table.map(str::to_string),
            message: message.into(),
            source: None,
        })
    }

    /// Is this a configuration problem detected before reaching storage?
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Schema(_))
    }

    /// Did the backend report a missing table?
    pub fn is_not_found_table(&self) -> bool {
        matches!(
            self,
            Error::Storage(StorageError {
                kind: StorageErrorKind::TableNotFound,
                ..
            })
        )
    }

    /// Column the error relates to, if any.
    pub fn column(&self) -> Option<&str> {
        match self {
            Error::Mapping(e) => Some(&e.column),
            Error::Decode(e) => e.column.as_deref(),
            _ => None,
        }
    }

    /// Attach a column name to a decode error produced by a bare adapter call.
    #[must_use]
    pub fn in_column(self, column: &str) -> Self {
        match self {
            Error::Decode(mut e) if e.column.is_none() => {
                e.column = Some(column.to_string());
                Error::Decode(e)
            }
            Error::Mapping(mut e) if e.column.is_empty() => {
                e.column = column.to_string();
                Error::Mapping(e)
            }
            other => other,
        }
    }
}

impl DecodeError {
    /// Create a decode error for an adapter without column context.
    pub fn new(adapter: &'static str, message: impl Into<String>) -> Self {
        Self {
            column: None,
            adapter,
            message: message.into(),
            source: None,
        }
    }

    /// Attach the underlying cause.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {e}"),
            Error::Schema(e) => write!(f, "Schema error: {e}"),
            Error::Mapping(e) => write!(f, "Mapping error: {e}"),
            Error::Decode(e) => write!(f, "Decode error: {e}"),
            Error::Integrity(e) => write!(f, "Integrity error: {e}"),
            Error::Storage(e) => write!(f, "Storage error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Decode(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Storage(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.message)
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.entity, self.message)
    }
}

impl fmt::Display for MappingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "column '{}': {}", self.column, self.message)
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(f, "{} adapter, column '{}': {}", self.adapter, col, self.message)
        } else {
            write!(f, "{} adapter: {}", self.adapter, self.message)
        }
    }
}

impl fmt::Display for IntegrityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (table '{}', primary key '{}')",
            self.message, self.table, self.primary_key
        )
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(table) = &self.table {
            write!(f, "{} (table '{}')", self.message, table)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<SchemaError> for Error {
    fn from(err: SchemaError) -> Self {
        Error::Schema(err)
    }
}

impl From<MappingError> for Error {
    fn from(err: MappingError) -> Self {
        Error::Mapping(err)
    }
}

impl From<DecodeError> for Error {
    fn from(err: DecodeError) -> Self {
        Error::Decode(err)
    }
}

impl From<IntegrityError> for Error {
    fn from(err: IntegrityError) -> Self {
        Error::Integrity(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

/// Result type alias for TableRow operations.
pub type Result<T> = std::result::Result<T, Error>;
