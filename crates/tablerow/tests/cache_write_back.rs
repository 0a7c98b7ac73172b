mod common;

use common::{Player, player, players_store, seed_player};
use std::sync::Arc;
use tablerow::prelude::*;
use tablerow::{Call, PersistReport};

#[test]
fn read_then_write_back_one_player() {
    let store = players_store();
    seed_player(&store, 7, "Ada");
    let mut cache = Cache::new(CrudHelper::<Player, _>::new(Arc::clone(&store)).unwrap());

    let ada = cache.get("7").unwrap().unwrap();
    {
        let ada = ada.read().unwrap();
        assert_eq!(ada.name, "Ada");
        assert_eq!(ada.keys.current("id"), Some(&FieldValue::Int(7)));
    }
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.is_synchronized("7"), Some(true));
    assert_eq!(
        store.calls().unwrap(),
        [Call::SelectOne {
            table: "players".into(),
            criteria: Criteria::all().eq("id", 7_i64),
            columns: None,
        }]
    );

    cache.set("7", player(7, "Grace"));
    assert_eq!(cache.is_synchronized("7"), Some(false));

    let report = cache.persist_all().unwrap();
    assert_eq!(
        report,
        PersistReport {
            persisted: vec!["7".into()],
            still_pending: Vec::new(),
        }
    );
    assert_eq!(cache.is_synchronized("7"), Some(true));

    let calls = store.calls().unwrap();
    assert_eq!(calls.len(), 2);
    assert_eq!(
        calls[1],
        Call::Update {
            table: "players".into(),
            row: Row::from_pairs([("id", Value::BigInt(7)), ("name", Value::from("Grace"))]),
            criteria: Criteria::all().eq("id", 7_i64),
        }
    );
}

#[test]
fn pending_entries_never_touch_storage_until_persisted() {
    let store = players_store();
    seed_player(&store, 1, "Ada");
    let mut cache = Cache::new(CrudHelper::<Player, _>::new(Arc::clone(&store)).unwrap());

    cache.set("1", player(1, "Local"));
    let value = cache.get("1").unwrap().unwrap();
    assert_eq!(value.read().unwrap().name, "Local");
    assert!(store.calls().unwrap().is_empty());

    let pending = cache.get_pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].0, "1");
    assert!(!pending[0].1.is_synchronized());

    assert!(cache.persist_all().unwrap().is_complete());
    assert!(cache.get_pending().is_empty());
    assert_eq!(store.rows("players").unwrap()[0].get_by_name("name"), Some(&Value::from("Local")));
}

#[test]
fn failed_updates_stay_pending() {
    let store = players_store();
    let mut cache = Cache::new(CrudHelper::<Player, _>::new(Arc::clone(&store)).unwrap());

    cache.set("9", player(9, "Nobody"));
    let report = cache.persist_all().unwrap();
    assert!(report.persisted.is_empty());
    assert_eq!(report.still_pending, ["9"]);
    assert_eq!(cache.get_pending().len(), 1);
}

#[test]
fn non_numeric_key_for_an_integer_key_is_a_miss() {
    let store = players_store();
    seed_player(&store, 7, "Ada");
    let mut cache = Cache::new(CrudHelper::<Player, _>::new(Arc::clone(&store)).unwrap());

    assert!(matches!(cache.get("abc"), Ok(None)));
    assert!(!cache.contains("abc"));
    assert!(cache.get("7").unwrap().is_some());
}

#[test]
fn composite_keys_round_trip_through_the_key_string() {
    let store = MemoryStore::shared();
    MemorySchema::for_entity::<Score>(Arc::clone(&store))
        .unwrap()
        .create_table()
        .unwrap();
    store
        .seed(
            "scores",
            Row::from_pairs([
                ("region", Value::from("eu-west")),
                ("id", Value::BigInt(3)),
                ("points", Value::BigInt(40)),
            ]),
        )
        .unwrap();

    let crud = CrudHelper::<Score, _>::new(Arc::clone(&store)).unwrap();
    let mut cache = Cache::new(crud);
    assert_eq!(cache.load_all().unwrap(), 1);
    assert!(cache.contains(r"eu\-west-3"));

    cache.clear();
    let score = cache.get(r"eu\-west-3").unwrap().unwrap();
    assert_eq!(score.read().unwrap().points, 40);
}

#[derive(Debug, Default)]
struct Score {
    keys: KeyState,
    points: i64,
}

impl Entity for Score {
    fn declare() -> Metadata {
        Metadata::new()
            .table(Table::named("scores").primary_key(["region", "id"]))
            .column(Column::new("region", StringAdapter::new(32)))
            .column(Column::new("id", IntegerAdapter::default()))
            .column(Column::new("points", IntegerAdapter::default()))
    }

    fn accessors() -> Accessors<Self> {
        Accessors::<Self>::new().field(
            "points",
            |s| FieldValue::Int(s.points),
            |s, v| {
                s.points = v.extract::<Option<i64>>()?.unwrap_or_default();
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
