//! Argument parsing and command execution for the `memquery` binary.
//!
//! A run loads a JSON array of records into a [`KeyedStore`], performs one
//! command and, for writes, saves the store back to the same file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use memquery_filter::FilterExpr;
use memquery_store::{KeyStrategy, KeyedStore, Patch, StoreConfig};
use serde_json::Value;
use tracing::{debug, info};

/// Records are keyed by strings on the command line.
pub type FileStore = KeyedStore<String, Value>;

#[derive(Parser, Debug)]
#[command(name = "memquery")]
#[command(about = "Query and edit a JSON record file with memquery filter expressions")]
pub struct Args {
    /// JSON file holding an array of records
    #[arg(short, long)]
    pub records: PathBuf,

    /// Field that identifies a record
    #[arg(short, long, default_value = "id")]
    pub key: String,

    /// Store configuration file (JSON); overrides --key
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print records matching a filter expression (all records if omitted)
    Search {
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Print one record
    Get { key: String },
    /// Print every key
    Keys,
    /// Insert a record that carries its own key
    Add { record: String },
    /// Insert a record under a generated key
    Create {
        record: String,
        #[arg(long, default_value = "uuid_v4", value_parser = parse_strategy)]
        strategy: KeyStrategy,
    },
    /// Merge a JSON object into an existing record
    Update { key: String, patch: String },
    /// Remove a record (absent keys are ignored)
    Delete { key: String },
}

fn parse_strategy(s: &str) -> Result<KeyStrategy, String> {
    serde_json::from_value(Value::String(s.to_string()))
        .map_err(|_| format!("unknown key strategy `{s}` (expected uuid_v4 or uuid_v7)"))
}

/// Executes `args` and returns the text to print on stdout.
pub fn run(args: &Args) -> Result<String> {
    let config = load_config(args)?;
    let records = load_records(&args.records)?;
    let mut store = FileStore::with_records(config, records)
        .with_context(|| format!("Failed to load records from {}", args.records.display()))?;
    info!(
        "Loaded {} records keyed by `{}`",
        store.len(),
        store.key_field()
    );

    let output = match &args.command {
        Command::Search { filter } => {
            let found = match filter {
                Some(text) => {
                    let expr: FilterExpr = text.parse().context("Invalid filter expression")?;
                    store.search(&expr)
                }
                None => store.snapshot(),
            };
            debug!("Search matched {} records", found.len());
            Value::from(found)
        }
        Command::Get { key } => store.require(key)?,
        Command::Keys => Value::from(store.get_all_keys()),
        Command::Add { record } => {
            let record = parse_json(record, "record")?;
            let key = store.add(record)?;
            save_records(&args.records, &store)?;
            store.require(&key)?
        }
        Command::Create { record, strategy } => {
            let record = parse_json(record, "record")?;
            let created = store.create(record, strategy)?;
            save_records(&args.records, &store)?;
            created
        }
        Command::Update { key, patch } => {
            let patch = parse_patch(patch)?;
            let updated = store.update(key, &patch)?;
            save_records(&args.records, &store)?;
            updated
        }
        Command::Delete { key } => {
            let removed = store.delete(key);
            if removed {
                save_records(&args.records, &store)?;
            }
            Value::Bool(removed)
        }
    };

    Ok(serde_json::to_string_pretty(&output)?)
}

fn load_config(args: &Args) -> Result<StoreConfig> {
    match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            StoreConfig::from_json(&text)
                .with_context(|| format!("Failed to parse config {}", path.display()))
        }
        None => Ok(StoreConfig::new(args.key.as_str())),
    }
}

/// A missing file is an empty store, so `add`/`create` can start a new file.
fn load_records(path: &Path) -> Result<Vec<Value>> {
    if !path.exists() {
        info!("Records file {} does not exist, starting empty", path.display());
        return Ok(Vec::new());
    }
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read records file {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("Records file {} is not a JSON array", path.display()))
}

fn save_records(path: &Path, store: &FileStore) -> Result<()> {
    let text = serde_json::to_string_pretty(&store.snapshot())?;
    fs::write(path, text)
        .with_context(|| format!("Failed to write records file {}", path.display()))?;
    debug!("Wrote {} records to {}", store.len(), path.display());
    Ok(())
}

fn parse_json(text: &str, what: &str) -> Result<Value> {
    serde_json::from_str(text).with_context(|| format!("Invalid JSON {what}"))
}

fn parse_patch(text: &str) -> Result<Patch> {
    match parse_json(text, "patch")? {
        Value::Object(map) => Ok(map),
        other => bail!("Patch must be a JSON object, got {other}"),
    }
}
