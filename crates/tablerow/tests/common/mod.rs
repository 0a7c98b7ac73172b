#![allow(dead_code)]

use std::sync::Arc;
use tablerow::prelude::*;

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Player {
    pub keys: KeyState,
    pub name: String,
}

impl Entity for Player {
    fn declare() -> Metadata {
        Metadata::new()
            .table(Table::named("players").primary_key(["id"]))
            .column(Column::new("id", IntegerAdapter::default()).not_null())
            .column(Column::new("name", StringAdapter::new(255)))
    }

    fn accessors() -> Accessors<Self> {
        Accessors::<Self>::new().field(
            "name",
            |p| FieldValue::from(p.name.clone()),
            |p, v| {
                p.name = v.extract::<Option<String>>()?.unwrap_or_default();
                Ok(())
            },
        )
    }

    fn keys(&self) -> &KeyState {
        &self.keys
    }

    fn keys_mut(&mut self) -> &mut KeyState {
        &mut self.keys
    }
}

pub fn player(id: i64, name: &str) -> Player {
    let mut player = Player {
        name: name.to_string(),
        ..Player::default()
    };
    player.keys.set("id", id);
    player
}

pub type PlayerRecord = Record<Player, Arc<MemoryStore>, MemorySchema>;

/// A store with an empty `players` table.
pub fn players_store() -> Arc<MemoryStore> {
    let store = MemoryStore::shared();
    let schema = MemorySchema::for_entity::<Player>(Arc::clone(&store)).unwrap();
    assert!(schema.create_table().unwrap());
    store
}

pub fn player_manager(
    store: &Arc<MemoryStore>,
) -> Arc<RecordManager<Player, Arc<MemoryStore>, MemorySchema>> {
    let crud = CrudHelper::new(Arc::clone(store)).unwrap();
    let schema = MemorySchema::for_entity::<Player>(Arc::clone(store)).unwrap();
    RecordManager::shared(crud, schema)
}

pub fn seed_player(store: &MemoryStore, id: i64, name: &str) {
    store
        .seed(
            "players",
            Row::from_pairs([("id", Value::BigInt(id)), ("name", Value::from(name))]),
        )
        .unwrap();
}
