//! Keyed in-memory record store for memquery.
//!
//! Records of one type are held in a mapping from key to record, where the
//! key is read from a designated field (see [`StoreConfig::key_field`]).
//! The store supports point lookups, inserts, shallow-merge updates,
//! idempotent deletes, and [`search`](KeyedStore::search) with a
//! [`FilterExpr`](memquery_filter::FilterExpr).
//!
//! # Architecture
//!
//! - [`KeyedStore`] is a plain single-owner value; every write either fully
//!   applies or leaves the store unchanged
//! - [`SharedStore`] wraps one store in a read/write lock for multi-threaded owners
//! - Keys are never generated implicitly: [`KeyedStore::create`] takes a
//!   [`KeyGenerator`] such as [`KeyStrategy::UuidV7`]

mod config;
mod error;
mod key;
mod record;
mod shared;
mod store;

pub use config::{DuplicatePolicy, StoreConfig};
pub use error::{StoreError, StoreResult};
pub use key::{KeyGenerator, KeySelection, KeyStrategy, RecordKey};
pub use record::StoredRecord;
pub use shared::SharedStore;
pub use store::{KeyedStore, Patch};

pub use memquery_filter::{FilterExpr, Record};
