use std::sync::Arc;
use tablerow::prelude::*;
use tablerow::{Call, StorageErrorKind};

#[derive(Debug, Default)]
struct Lamp {
    keys: KeyState,
    label: String,
    lit: bool,
    settings: serde_json::Map<String, serde_json::Value>,
}

impl Entity for Lamp {
    fn declare() -> Metadata {
        Metadata::new()
            .compose::<HasId>()
            .table(Table::named("lamps"))
            .column(Column::new("label", StringAdapter::new(40)))
            .column(Column::new("lit", BooleanAdapter::default()))
            .column(Column::new(
                "settings",
                JsonAdapter::with_mode(JsonMode::Associative),
            ))
    }

    fn accessors() -> Accessors<Self> {
        Accessors::<Self>::new()
            .field(
                "label",
                |l| FieldValue::from(l.label.clone()),
                |l, v| {
                    l.label = v.extract::<Option<String>>()?.unwrap_or_default();
                    Ok(())
                },
            )
            .field(
                "lit",
                |l| FieldValue::Bool(l.lit),
                |l, v| {
                    l.lit = v.extract::<Option<bool>>()?.unwrap_or_default();
                    Ok(())
                },
            )
            .field(
                "settings",
                |l| FieldValue::Map(l.settings.clone()),
                |l, v| {
                    l.settings = v
                        .extract::<Option<serde_json::Map<String, serde_json::Value>>>()?
                        .unwrap_or_default();
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

fn lamps_store() -> Arc<MemoryStore> {
    let store = MemoryStore::shared();
    MemorySchema::for_entity::<Lamp>(Arc::clone(&store))
        .unwrap()
        .create_table()
        .unwrap();
    store
}

fn lamp(label: &str, lit: bool) -> Lamp {
    let mut settings = serde_json::Map::new();
    settings.insert("watts".into(), serde_json::json!(40));
    Lamp {
        label: label.into(),
        lit,
        settings,
        ..Lamp::default()
    }
}

#[test]
fn storage_form_follows_the_adapters() {
    let store = lamps_store();
    let crud = CrudHelper::<Lamp, _>::new(Arc::clone(&store)).unwrap();
    assert_eq!(crud.create_one(&lamp("desk", true)).unwrap(), "1");

    let row = &store.rows("lamps").unwrap()[0];
    assert_eq!(row.get_by_name("id"), Some(&Value::BigInt(1)));
    assert_eq!(row.get_by_name("lit"), Some(&Value::from("1")));
    assert_eq!(row.get_by_name("settings"), Some(&Value::from(r#"{"watts":40}"#)));

    let loaded = crud.read_one(&[FieldValue::Int(1)]).unwrap().unwrap();
    assert!(loaded.lit);
    assert_eq!(loaded.settings["watts"], serde_json::json!(40));
    assert!(loaded.keys.is_loaded());
}

#[test]
fn loaded_entities_cannot_be_inserted_again() {
    let store = lamps_store();
    let crud = CrudHelper::<Lamp, _>::new(Arc::clone(&store)).unwrap();
    crud.create_one(&lamp("desk", false)).unwrap();
    let loaded = crud.read_one(&[FieldValue::Int(1)]).unwrap().unwrap();
    assert!(matches!(crud.create_one(&loaded), Err(Error::Integrity(_))));
    assert!(matches!(
        crud.create_many(&[lamp("hall", true), loaded]),
        Err(Error::Integrity(_))
    ));
    assert_eq!(store.rows("lamps").unwrap().len(), 1);
}

#[test]
fn excluded_columns_are_left_out_of_writes() {
    let store = lamps_store();
    let options = CrudOptions::new()
        .exclude_on_insert(["settings"])
        .exclude_on_update(["label"]);
    let crud = CrudHelper::<Lamp, _>::with_options(Arc::clone(&store), options).unwrap();

    crud.create_one(&lamp("desk", false)).unwrap();
    let mut loaded = crud.read_one(&[FieldValue::Int(1)]).unwrap().unwrap();
    assert!(loaded.settings.is_empty());

    loaded.label = "ignored".into();
    loaded.lit = true;
    assert!(crud.update_one(&loaded).unwrap());

    let calls = store.calls().unwrap();
    match &calls[0] {
        Call::Insert { row, .. } => assert!(!row.contains_column("settings")),
        other => panic!("expected insert, got {other:?}"),
    }
    let stored = crud.read_one(&[FieldValue::Int(1)]).unwrap().unwrap();
    assert_eq!(stored.label, "desk");
    assert!(stored.lit);
}

#[test]
fn unknown_excluded_columns_are_a_configuration_error() {
    let options = CrudOptions::new().exclude_on_insert(["colour"]);
    let err = CrudHelper::<Lamp, _>::with_options(lamps_store(), options).unwrap_err();
    assert!(err.is_configuration());
}

#[test]
fn batch_insert_reports_all_or_nothing() {
    let store = lamps_store();
    let crud = CrudHelper::<Lamp, _>::new(Arc::clone(&store)).unwrap();
    assert!(crud.create_many(&[lamp("a", true), lamp("b", false)]).unwrap());
    assert_eq!(crud.list_all().unwrap().len(), 2);

    let lit = crud
        .read_many(&Criteria::all().eq("lit", "1"))
        .unwrap();
    assert_eq!(lit.len(), 1);
    assert_eq!(lit[0].label, "a");
}

#[test]
fn missing_tables_surface_as_storage_errors() {
    let crud = CrudHelper::<Lamp, _>::new(MemoryStore::shared()).unwrap();
    let err = crud.list_all().unwrap_err();
    assert!(matches!(
        err,
        Error::Storage(ref e) if e.kind == StorageErrorKind::TableNotFound
    ));
}

#[test]
fn json_documents_convert_without_storage_provenance() {
    let converter = RowConverter::<Lamp>::new().unwrap();
    let lamp = converter
        .from_json(r#"{"id": 9, "label": "porch", "lit": "0", "settings": "{\"watts\":60}"}"#)
        .unwrap();
    assert_eq!(lamp.label, "porch");
    assert!(!lamp.lit);
    assert_eq!(lamp.settings["watts"], serde_json::json!(60));
    assert!(!lamp.keys.is_loaded());

    let store = lamps_store();
    let crud = CrudHelper::<Lamp, _>::new(Arc::clone(&store)).unwrap();
    assert_eq!(crud.create_one(&lamp).unwrap(), "9");

    let exported = converter.to_map(&lamp).unwrap();
    assert_eq!(exported["id"], serde_json::json!(9));
    assert_eq!(exported["lit"], serde_json::json!("0"));
}
