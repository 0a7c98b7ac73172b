//! TableRow - metadata-driven row mapping for Rust.
//!
//! TableRow maps domain entities to rows of a storage table using explicit,
//! composable metadata declarations:
//!
//! - Entities declare their table, columns, indexes and foreign keys through
//!   a [`Metadata`] bundle, optionally composing reusable fragments
//! - Type adapters convert each column between its domain and storage form
//! - [`CrudHelper`] runs single-table create/read/update/delete
//! - [`Record`] tracks whether an entity exists in storage and is in sync
//! - [`Cache`] defers writes until [`Cache::persist_all`]
//!
//! Storage itself is reached through the [`Executor`] and [`SchemaHelper`]
//! traits. [`MemoryStore`] is a complete in-memory implementation.
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//! use tablerow::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Player {
//!     keys: KeyState,
//!     name: String,
//! }
//!
//! impl Entity for Player {
//!     fn declare() -> Metadata {
//!         Metadata::new()
//!             .table(Table::named("players").primary_key(["id"]))
//!             .column(Column::new("id", IntegerAdapter::default()).not_null())
//!             .column(Column::new("name", StringAdapter::new(255)))
//!     }
//!
//!     fn accessors() -> Accessors<Self> {
//!         Accessors::<Self>::new().field(
//!             "name",
//!             |p| FieldValue::from(p.name.clone()),
//!             |p, v| {
//!                 p.name = v.extract()?;
//!                 Ok(())
//!             },
//!         )
//!     }
//!
//!     fn keys(&self) -> &KeyState {
//!         &self.keys
//!     }
//!
//!     fn keys_mut(&mut self) -> &mut KeyState {
//!         &mut self.keys
//!     }
//! }
//!
//! # fn main() -> tablerow::Result<()> {
//! let store = MemoryStore::shared();
//! MemorySchema::for_entity::<Player>(Arc::clone(&store))?.create_table()?;
//!
//! let mut ada = Player { name: "Ada".into(), ..Player::default() };
//! ada.keys.set("id", 7);
//! let crud = CrudHelper::<Player, _>::new(Arc::clone(&store))?;
//! crud.create_one(&ada)?;
//!
//! let mut cache = Cache::new(crud);
//! let cached = cache.get("7")?.expect("row 7 was inserted");
//! assert_eq!(cached.read().map(|p| p.name.clone()).unwrap_or_default(), "Ada");
//! # Ok(())
//! # }
//! ```

pub use tablerow_core::{
    Accessors, ArrayAdapter, BooleanAdapter, Column, ColumnInfo, Comparison, Condition,
    ConfigError, Criteria, DecodeError, Entity, EntityRef, Error, Executor, FieldAccessor,
    FieldValue, ForeignKey, Fragment, FromField, Getter, HasId, HasPublicId, Index,
    IntegerAdapter, IntegrityError, JsonAdapter, JsonMode, KeyState, MappingError,
    MappingErrorKind, Metadata, RawSqlAdapter, ResolvedMetadata, Result, Row, RowMapper,
    SchemaError, SchemaErrorKind, SchemaHelper, Setter, StorageError, StorageErrorKind,
    StorageType, StringAdapter, Table, TypeAdapter, Value, is_resolved, resolve,
    resolve_declaration,
};
pub use tablerow_core::identifiers;
pub use tablerow_memory::{Call, MemorySchema, MemoryStore};
pub use tablerow_session::{
    Cache, CachedEntry, CrudHelper, CrudOptions, PersistReport, Record, RecordManager,
    RecordState, RowConverter,
};

/// Prelude module for convenient imports.
///
/// ```
/// use tablerow::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Declarations
        Accessors,
        ArrayAdapter,
        BooleanAdapter,
        // Session
        Cache,
        Column,
        Criteria,
        CrudHelper,
        CrudOptions,
        Entity,
        EntityRef,
        Error,
        // Storage
        Executor,
        FieldValue,
        ForeignKey,
        Fragment,
        HasId,
        HasPublicId,
        Index,
        IntegerAdapter,
        JsonAdapter,
        JsonMode,
        KeyState,
        MemorySchema,
        MemoryStore,
        Metadata,
        Record,
        RecordManager,
        RecordState,
        Result,
        Row,
        RowConverter,
        RowMapper,
        SchemaHelper,
        StringAdapter,
        Table,
        Value,
    };
}
