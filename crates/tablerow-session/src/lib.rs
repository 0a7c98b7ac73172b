//! Session-level operations for TableRow.
//!
//! - [`CrudHelper`]: create/read/update/delete for one entity type
//! - [`Record`]: an entity with an explicit existence and sync state
//! - [`Cache`]: write-back cache tracking pending and synchronized entries
//! - [`RowConverter`]: entity to JSON and back
//!
//! All operations are synchronous and run until the executor returns.

pub mod cache;
pub mod convert;
pub mod crud;
pub mod record;

pub use cache::{Cache, CachedEntry, PersistReport};
pub use convert::RowConverter;
pub use crud::{CrudHelper, CrudOptions};
pub use record::{Record, RecordManager, RecordState};
