use std::borrow::Cow;
use std::sync::LazyLock;

use memquery_filter::{FieldOp, FieldTable};
use memquery_store::{
    FilterExpr, KeySelection, KeyStrategy, KeyedStore, Patch, Record, StoreConfig, StoreError,
    StoredRecord,
};
use serde_json::{Value, json};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
struct Movie {
    id: Uuid,
    name: String,
    is_online: bool,
    picture_url: Option<String>,
}

static MOVIE_FIELDS: LazyLock<FieldTable<Movie>> = LazyLock::new(|| {
    FieldTable::<Movie>::new()
        .with("id", |m| json!(m.id.to_string()))
        .with("name", |m| json!(m.name))
        .with("isOnline", |m| json!(m.is_online))
        .with("pictureUrl", |m| json!(m.picture_url))
});

impl Record for Movie {
    fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
        MOVIE_FIELDS.get(self, name).map(Cow::Owned)
    }
}

impl StoredRecord for Movie {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), String> {
        match (name, value) {
            ("id", Value::String(s)) => {
                self.id = Uuid::parse_str(&s).map_err(|e| e.to_string())?;
            }
            ("name", Value::String(s)) => self.name = s,
            ("isOnline", Value::Bool(b)) => self.is_online = b,
            ("pictureUrl", Value::String(s)) => self.picture_url = Some(s),
            ("pictureUrl", Value::Null) => self.picture_url = None,
            (name, value) => return Err(format!("cannot assign {value} to `{name}`")),
        }
        Ok(())
    }
}

fn movie(name: &str) -> Movie {
    Movie {
        id: Uuid::now_v7(),
        name: name.to_string(),
        is_online: false,
        picture_url: None,
    }
}

fn patch(value: Value) -> Patch {
    match value {
        Value::Object(map) => map,
        _ => panic!("patch must be an object"),
    }
}

fn store_of(names: &[&str]) -> (KeyedStore<Uuid, Movie>, Vec<Uuid>) {
    let movies: Vec<Movie> = names.iter().map(|n| movie(n)).collect();
    let ids = movies.iter().map(|m| m.id).collect();
    (KeyedStore::with_records("id", movies).unwrap(), ids)
}

#[test]
fn typed_records_are_keyed_by_uuid() {
    let (store, ids) = store_of(&["Heat (1995)", "Ran (1985)"]);
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(store.get_all_keys(), sorted);
    assert_eq!(store.get(&ids[1]).unwrap().name, "Ran (1985)");
}

#[test]
fn typed_search_uses_field_table() {
    let (store, _) = store_of(&["The Matrix (1999)", "Matrix Reloaded (2003)", "Heat (1995)"]);
    let expr = FilterExpr::field("name", FieldOp::includes("matrix").case_insensitive());
    let mut found: Vec<String> = store.search(&expr).into_iter().map(|m| m.name).collect();
    found.sort();
    assert_eq!(found, vec!["Matrix Reloaded (2003)", "The Matrix (1999)"]);
}

#[test]
fn typed_update_rejects_wrong_value_type_atomically() {
    let (mut store, ids) = store_of(&["Heat (1995)"]);
    let before = store.get(&ids[0]).unwrap();

    let err = store
        .update(&ids[0], &patch(json!({"name": "Heat", "isOnline": "yes"})))
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidRecord(_)));
    assert_eq!(store.get(&ids[0]).unwrap(), before);
}

#[test]
fn typed_update_with_unknown_field_fails() {
    let (mut store, ids) = store_of(&["Heat (1995)"]);
    assert!(matches!(
        store.update(&ids[0], &patch(json!({"rating": 5}))),
        Err(StoreError::InvalidRecord(_))
    ));
}

#[test]
fn typed_update_many_toggles_online_flag() {
    let (mut store, ids) = store_of(&["A", "B", "C"]);
    let selection = KeySelection::Keys(vec![ids[0], ids[2]]);
    let updated = store
        .update_many(&selection, &patch(json!({"isOnline": true})))
        .unwrap();
    assert_eq!(updated.len(), 2);
    assert!(store.get(&ids[0]).unwrap().is_online);
    assert!(!store.get(&ids[1]).unwrap().is_online);
    assert!(store.get(&ids[2]).unwrap().is_online);
}

#[test]
fn typed_create_overwrites_placeholder_key() {
    let mut store: KeyedStore<Uuid, Movie> = KeyedStore::new("id");
    let draft = movie("Ran (1985)");
    let placeholder = draft.id;

    let created = store.create(draft, &KeyStrategy::UuidV7).unwrap();
    assert_ne!(created.id, placeholder);
    assert_eq!(created.id.get_version_num(), 7);
    assert_eq!(store.get_all_keys(), vec![created.id]);
}

#[test]
fn typed_defaults_only_fill_absent_fields() {
    // The field table always reports every field, so defaults never apply.
    let config = StoreConfig::new("id").with_default("name", "Unnamed movie");
    let mut store: KeyedStore<Uuid, Movie> = KeyedStore::new(config);
    let created = store.create(movie("Heat"), &KeyStrategy::UuidV4).unwrap();
    assert_eq!(created.name, "Heat");
}
