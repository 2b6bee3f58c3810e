use std::fs;
use std::path::Path;

use clap::Parser;
use memquery_cli::{Args, run};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tempfile::TempDir;

fn write_movies(dir: &TempDir) -> String {
    let path = dir.path().join("movies.json");
    let movies = json!([
        {"id": "1", "name": "Heat (1995)", "isOnline": false},
        {"id": "2", "name": "Alien (1979)", "isOnline": true},
        {"id": "3", "name": "Aliens (1986)", "isOnline": false}
    ]);
    fs::write(&path, movies.to_string()).unwrap();
    path.to_string_lossy().into_owned()
}

fn exec(records: &str, rest: &[&str]) -> anyhow::Result<Value> {
    let mut argv = vec!["memquery", "--records", records];
    argv.extend_from_slice(rest);
    let args = Args::try_parse_from(argv)?;
    let output = run(&args)?;
    Ok(serde_json::from_str(&output)?)
}

fn read_file(path: &str) -> Value {
    serde_json::from_str(&fs::read_to_string(Path::new(path)).unwrap()).unwrap()
}

// ── Reads ────────────────────────────────────────────────────────

#[test]
fn search_without_filter_lists_everything() {
    let dir = TempDir::new().unwrap();
    let path = write_movies(&dir);
    let out = exec(&path, &["search"]).unwrap();
    assert_eq!(out.as_array().unwrap().len(), 3);
}

#[test]
fn search_with_case_insensitive_filter() {
    let dir = TempDir::new().unwrap();
    let path = write_movies(&dir);
    let out = exec(
        &path,
        &["search", "--filter", r#"{"name": {"$includes": "ALIEN", "caseSensitive": false}}"#],
    )
    .unwrap();
    let ids: Vec<&str> = out
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["2", "3"]);
}

#[test]
fn search_with_invalid_filter_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_movies(&dir);
    let err = exec(&path, &["search", "--filter", r#"{"$nor": []}"#]).unwrap_err();
    assert!(format!("{err:#}").contains("unknown combinator"));
}

#[test]
fn get_and_keys() {
    let dir = TempDir::new().unwrap();
    let path = write_movies(&dir);
    assert_eq!(exec(&path, &["get", "2"]).unwrap()["name"], "Alien (1979)");
    assert_eq!(exec(&path, &["keys"]).unwrap(), json!(["1", "2", "3"]));
    assert!(exec(&path, &["get", "9"]).is_err());
}

// ── Writes ───────────────────────────────────────────────────────

#[test]
fn update_persists_merged_record() {
    let dir = TempDir::new().unwrap();
    let path = write_movies(&dir);
    let out = exec(&path, &["update", "3", r#"{"isOnline": true}"#]).unwrap();
    assert_eq!(out, json!({"id": "3", "name": "Aliens (1986)", "isOnline": true}));
    assert_eq!(read_file(&path)[2]["isOnline"], true);
}

#[test]
fn update_rejects_non_object_patch() {
    let dir = TempDir::new().unwrap();
    let path = write_movies(&dir);
    assert!(exec(&path, &["update", "3", "[1, 2]"]).is_err());
}

#[test]
fn add_into_missing_file_creates_it() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("new.json").to_string_lossy().into_owned();
    exec(&path, &["add", r#"{"id": "a", "name": "Ran"}"#]).unwrap();
    assert_eq!(read_file(&path), json!([{"id": "a", "name": "Ran"}]));
}

#[test]
fn add_duplicate_fails_without_touching_file() {
    let dir = TempDir::new().unwrap();
    let path = write_movies(&dir);
    let before = read_file(&path);
    assert!(exec(&path, &["add", r#"{"id": "1"}"#]).is_err());
    assert_eq!(read_file(&path), before);
}

#[test]
fn create_generates_uuid_key() {
    let dir = TempDir::new().unwrap();
    let path = write_movies(&dir);
    let out = exec(&path, &["create", r#"{"name": "Ran"}"#, "--strategy", "uuid_v7"]).unwrap();
    let id = out["id"].as_str().unwrap();
    assert_eq!(id.len(), 36);
    assert_eq!(read_file(&path).as_array().unwrap().len(), 4);
}

#[test]
fn create_rejects_unknown_strategy() {
    let dir = TempDir::new().unwrap();
    let path = write_movies(&dir);
    assert!(exec(&path, &["create", "{}", "--strategy", "counter"]).is_err());
}

#[test]
fn delete_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = write_movies(&dir);
    assert_eq!(exec(&path, &["delete", "1"]).unwrap(), json!(true));
    assert_eq!(exec(&path, &["delete", "1"]).unwrap(), json!(false));
    assert_eq!(read_file(&path).as_array().unwrap().len(), 2);
}

// ── Configuration ────────────────────────────────────────────────

#[test]
fn config_file_sets_key_field_and_defaults() {
    let dir = TempDir::new().unwrap();
    let records = dir.path().join("r.json");
    fs::write(&records, r#"[{"slug": "heat", "name": "Heat"}]"#).unwrap();
    let config = dir.path().join("store.json");
    fs::write(
        &config,
        r#"{"key_field": "slug", "defaults": {"isOnline": false}}"#,
    )
    .unwrap();

    let records = records.to_string_lossy().into_owned();
    let config = config.to_string_lossy().into_owned();
    assert_eq!(
        exec(&records, &["--config", &config, "keys"]).unwrap(),
        json!(["heat"])
    );
    let created = exec(&records, &["--config", &config, "create", r#"{"name": "Ran"}"#]).unwrap();
    assert_eq!(created["isOnline"], false);
}

#[test]
fn key_flag_selects_key_field() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("r.json");
    fs::write(&path, r#"[{"code": "x1"}, {"code": "x0"}]"#).unwrap();
    let path = path.to_string_lossy().into_owned();
    assert_eq!(
        exec(&path, &["--key", "code", "keys"]).unwrap(),
        json!(["x0", "x1"])
    );
}

#[test]
fn duplicate_keys_in_file_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("r.json");
    fs::write(&path, r#"[{"id": "a"}, {"id": "a"}]"#).unwrap();
    let path = path.to_string_lossy().into_owned();
    let err = exec(&path, &["keys"]).unwrap_err();
    assert!(format!("{err:#}").contains("duplicate key"));
}
