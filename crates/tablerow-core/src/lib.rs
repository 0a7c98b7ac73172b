//! Core types and traits for TableRow.
//!
//! This crate provides the metadata-driven mapping layer:
//!
//! - `Entity` and `Fragment` traits with explicit declaration bundles
//! - Type adapters converting domain values to and from storage values
//! - The metadata resolver and its per-type registry
//! - `RowMapper` for hydration and dehydration with key provenance
//! - `Executor` and `SchemaHelper` collaborator traits

pub mod adapter;
pub mod connection;
pub mod criteria;
pub mod error;
pub mod field;
pub mod field_value;
pub mod fragments;
pub mod identifiers;
pub mod mapper;
pub mod model;
pub mod resolve;
pub mod row;
pub mod types;
pub mod value;

pub use adapter::{
    ArrayAdapter, BooleanAdapter, IntegerAdapter, JsonAdapter, JsonMode, RawSqlAdapter,
    StringAdapter, TypeAdapter,
};
pub use connection::{Executor, SchemaHelper};
pub use criteria::{Comparison, Condition, Criteria};
pub use error::{
    ConfigError, DecodeError, Error, IntegrityError, MappingError, MappingErrorKind, Result,
    SchemaError, SchemaErrorKind, StorageError, StorageErrorKind,
};
pub use field::{Column, EntityRef, ForeignKey, Index, Table};
pub use field_value::{FieldValue, FromField};
pub use fragments::{HasId, HasPublicId};
pub use mapper::RowMapper;
pub use model::{Accessors, Entity, FieldAccessor, Fragment, Getter, KeyState, Metadata, Setter};
pub use resolve::{ResolvedMetadata, is_resolved, resolve, resolve_declaration};
pub use row::{ColumnInfo, Row};
pub use types::StorageType;
pub use value::Value;

/// Everything needed to declare an entity type.
pub mod prelude {
    pub use crate::{
        Accessors, ArrayAdapter, BooleanAdapter, Column, Criteria, Entity, EntityRef, Error,
        FieldValue, ForeignKey, Fragment, HasId, HasPublicId, Index, IntegerAdapter, JsonAdapter,
        JsonMode, KeyState, Metadata, Result, Row, RowMapper, StringAdapter, Table, Value,
    };
}
