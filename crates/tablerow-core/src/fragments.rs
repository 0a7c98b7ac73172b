//! Reusable declaration fragments.

use crate::adapter::{IntegerAdapter, StringAdapter};
use crate::field::{Column, Index, Table};
use crate::model::{Fragment, Metadata};

/// Integer `id` column, generated by storage and used as the base primary key.
///
/// Composing entities may extend the key with their own primary key columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct HasId;

impl Fragment for HasId {
    fn declare() -> Metadata {
        Metadata::new()
            .table(Table::unnamed().primary_key(["id"]).auto_key("id"))
            .column(Column::new("id", IntegerAdapter::default()).not_null())
            .index(Index::unique(["id"]))
    }
}

/// Unique string `public_id` column.
#[derive(Debug, Clone, Copy, Default)]
pub struct HasPublicId;

impl Fragment for HasPublicId {
    fn declare() -> Metadata {
        Metadata::new()
            .column(Column::new("public_id", StringAdapter::default()).not_null())
            .index(Index::unique(["public_id"]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::resolve_declaration;

    #[test]
    fn has_id_contributes_key_and_auto_key() {
        let resolved = resolve_declaration(
            "shop::Order",
            Metadata::new()
                .compose::<HasId>()
                .compose::<HasPublicId>()
                .table(Table::unnamed().primary_key(["shop"])),
        )
        .unwrap();
        assert_eq!(resolved.table_name(), "order");
        assert_eq!(resolved.primary_keys(), ["id", "shop"]);
        assert_eq!(resolved.auto_key(), Some("id"));
        assert_eq!(resolved.column_names(), ["id", "public_id"]);
        let names: Vec<&str> = resolved.indexes().iter().map(|i| i.name()).collect();
        assert_eq!(names, ["uniq_id", "uniq_public_id"]);
        assert!(!resolved.column("public_id").unwrap().is_nullable());
    }
}
