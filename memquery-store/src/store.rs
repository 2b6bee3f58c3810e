//! The keyed record store.

use std::collections::BTreeMap;

use memquery_filter::{FilterExpr, Predicate, compile, compile_value};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::config::{DuplicatePolicy, StoreConfig};
use crate::key::{KeyGenerator, KeySelection, RecordKey};
use crate::record::StoredRecord;
use crate::{StoreError, StoreResult};

/// A field patch for [`KeyedStore::update`]: present fields replace old values.
pub type Patch = Map<String, Value>;

/// In-memory records addressed by the value of a designated key field.
///
/// Records go in by value and come out as clones, so nothing handed to or
/// returned by the store aliases stored state. Keys iterate in ascending
/// order. A failed write leaves the store untouched.
#[derive(Debug, Clone)]
pub struct KeyedStore<K, R> {
    config: StoreConfig,
    records: BTreeMap<K, R>,
}

impl<K: RecordKey, R: StoredRecord> KeyedStore<K, R> {
    /// Creates an empty store.
    pub fn new(config: impl Into<StoreConfig>) -> Self {
        Self {
            config: config.into(),
            records: BTreeMap::new(),
        }
    }

    /// Creates a store hydrated with `records`.
    pub fn with_records(
        config: impl Into<StoreConfig>,
        records: impl IntoIterator<Item = R>,
    ) -> StoreResult<Self> {
        let mut store = Self::new(config);
        store.hydrate(records)?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn key_field(&self) -> &str {
        &self.config.key_field
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.records.contains_key(key)
    }

    /// Reads the key of `record` from its key field.
    pub fn resolve_key(&self, record: &R) -> StoreResult<K> {
        let field = &self.config.key_field;
        let value = record
            .field(field)
            .ok_or_else(|| StoreError::InvalidRecord(format!("missing key field `{field}`")))?;
        K::from_value(&value).ok_or_else(|| {
            StoreError::InvalidRecord(format!("key field `{field}` has unusable value {value}"))
        })
    }

    // ── Bulk ─────────────────────────────────────────────────────

    /// Replaces the entire contents with `records`.
    ///
    /// With [`DuplicatePolicy::Reject`] a repeated key fails the call and the
    /// previous contents are kept.
    pub fn hydrate(&mut self, records: impl IntoIterator<Item = R>) -> StoreResult<()> {
        let mut next = BTreeMap::new();
        for record in records {
            let key = self.resolve_key(&record)?;
            if next.contains_key(&key) {
                match self.config.on_duplicate {
                    DuplicatePolicy::Reject => {
                        warn!("Rejecting hydration: duplicate key {}", key);
                        return Err(StoreError::DuplicateKey(key.to_string()));
                    }
                    DuplicatePolicy::Overwrite => {
                        warn!("Hydration overwrote duplicate key {}", key);
                    }
                }
            }
            next.insert(key, record);
        }

        debug!("Hydrated store with {} records", next.len());
        self.records = next;
        Ok(())
    }

    /// Clones every stored record, in key order.
    pub fn snapshot(&self) -> Vec<R> {
        self.records.values().cloned().collect()
    }

    // ── Reads ────────────────────────────────────────────────────

    /// Returns a copy of the record stored under `key`.
    pub fn get(&self, key: &K) -> Option<R> {
        self.records.get(key).cloned()
    }

    /// Like [`get`](Self::get) but treats absence as an error.
    pub fn require(&self, key: &K) -> StoreResult<R> {
        self.get(key).ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    /// All current keys in ascending order.
    pub fn get_all_keys(&self) -> Vec<K> {
        self.records.keys().cloned().collect()
    }

    /// Copies of all records matching `expr`.
    pub fn search(&self, expr: &FilterExpr) -> Vec<R> {
        self.search_with(&compile(expr))
    }

    /// Copies of all records matching an already compiled predicate.
    pub fn search_with(&self, predicate: &Predicate) -> Vec<R> {
        predicate.filter(self.records.values()).cloned().collect()
    }

    /// Searches with the JSON wire form. `null` means no filter.
    pub fn search_value(&self, expr: &Value) -> StoreResult<Vec<R>> {
        if expr.is_null() {
            return Ok(self.snapshot());
        }
        let predicate = compile_value(expr)?;
        Ok(self.search_with(&predicate))
    }

    // ── Writes ───────────────────────────────────────────────────

    /// Inserts a new record and returns its key.
    pub fn add(&mut self, record: R) -> StoreResult<K> {
        let key = self.resolve_key(&record)?;
        if self.records.contains_key(&key) {
            warn!("Rejecting add: record {} already exists", key);
            return Err(StoreError::AlreadyExists(key.to_string()));
        }
        self.records.insert(key.clone(), record);
        debug!("Added record {}", key);
        Ok(key)
    }

    /// Fills configured defaults, assigns a generated key and inserts.
    ///
    /// Any key already present in `record` is replaced. Returns a copy of the
    /// stored record.
    pub fn create<G>(&mut self, mut record: R, keys: &G) -> StoreResult<R>
    where
        G: KeyGenerator<K> + ?Sized,
    {
        let key_field = self.config.key_field.clone();
        for (field, value) in &self.config.defaults {
            if *field != key_field && record.field(field).is_none() {
                record
                    .set_field(field, value.clone())
                    .map_err(StoreError::InvalidRecord)?;
            }
        }

        let key = keys.generate();
        record
            .set_field(&key_field, key.to_value())
            .map_err(StoreError::InvalidRecord)?;
        if self.resolve_key(&record)? != key {
            return Err(StoreError::InvalidRecord(format!(
                "generated key {key} does not resolve through `{key_field}`"
            )));
        }
        self.add(record.clone())?;
        Ok(record)
    }

    /// Shallow-merges `patch` into the record under `key` and returns the result.
    ///
    /// The key field may appear in the patch only with its current value.
    pub fn update(&mut self, key: &K, patch: &Patch) -> StoreResult<R> {
        let current = self
            .records
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        let merged = self.merge(key, current, patch)?;
        self.records.insert(key.clone(), merged.clone());
        debug!("Updated record {} ({} fields)", key, patch.len());
        Ok(merged)
    }

    /// Applies the same patch to every selected record, all or nothing.
    pub fn update_many(
        &mut self,
        selection: &KeySelection<K>,
        patch: &Patch,
    ) -> StoreResult<Vec<R>> {
        let keys = match selection {
            KeySelection::All => self.get_all_keys(),
            KeySelection::Keys(keys) => keys.clone(),
        };

        let mut staged = Vec::with_capacity(keys.len());
        for key in keys {
            let current = self
                .records
                .get(&key)
                .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
            let merged = self.merge(&key, current, patch)?;
            staged.push((key, merged));
        }

        let updated: Vec<R> = staged.iter().map(|(_, record)| record.clone()).collect();
        for (key, merged) in staged {
            self.records.insert(key, merged);
        }
        debug!("Updated {} records", updated.len());
        Ok(updated)
    }

    /// Removes the record under `key`. Returns whether one was present.
    pub fn delete(&mut self, key: &K) -> bool {
        let removed = self.records.remove(key).is_some();
        if removed {
            debug!("Deleted record {}", key);
        }
        removed
    }

    fn merge(&self, key: &K, current: &R, patch: &Patch) -> StoreResult<R> {
        let mut merged = current.clone();
        for (field, value) in patch {
            if *field == self.config.key_field {
                if K::from_value(value).as_ref() == Some(key) {
                    continue;
                }
                return Err(self.key_changed(key));
            }
            merged
                .set_field(field, value.clone())
                .map_err(|reason| StoreError::InvalidRecord(format!("{key}: {reason}")))?;
        }

        // A patch of an enclosing object can still move a pointer key field.
        match self.resolve_key(&merged) {
            Ok(resolved) if resolved == *key => Ok(merged),
            _ => Err(self.key_changed(key)),
        }
    }

    fn key_changed(&self, key: &K) -> StoreError {
        let field = &self.config.key_field;
        warn!("Rejecting update of {}: key field `{}` is immutable", key, field);
        StoreError::KeyImmutable {
            key: key.to_string(),
            field: field.clone(),
        }
    }
}
