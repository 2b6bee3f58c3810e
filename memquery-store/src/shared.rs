//! Thread-safe handle around a [`KeyedStore`].
//!
//! One lock guards the whole store: reads share it, writes are exclusive.

use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use memquery_filter::FilterExpr;

use crate::key::{KeySelection, RecordKey};
use crate::record::StoredRecord;
use crate::store::{KeyedStore, Patch};
use crate::StoreResult;

/// Cloneable, lock-guarded access to one store instance.
pub struct SharedStore<K, R> {
    inner: Arc<RwLock<KeyedStore<K, R>>>,
}

impl<K, R> Clone for SharedStore<K, R> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K: RecordKey, R: StoredRecord> SharedStore<K, R> {
    pub fn new(store: KeyedStore<K, R>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    // Store writes never leave partial state, so a poisoned lock still guards
    // a consistent store.
    fn read_guard(&self) -> RwLockReadGuard<'_, KeyedStore<K, R>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, KeyedStore<K, R>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `f` with shared access.
    pub fn read<T>(&self, f: impl FnOnce(&KeyedStore<K, R>) -> T) -> T {
        f(&self.read_guard())
    }

    /// Runs `f` with exclusive access; use this to group several writes.
    pub fn write<T>(&self, f: impl FnOnce(&mut KeyedStore<K, R>) -> T) -> T {
        f(&mut self.write_guard())
    }

    pub fn len(&self) -> usize {
        self.read_guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_guard().is_empty()
    }

    pub fn get(&self, key: &K) -> Option<R> {
        self.read_guard().get(key)
    }

    pub fn get_all_keys(&self) -> Vec<K> {
        self.read_guard().get_all_keys()
    }

    pub fn search(&self, expr: &FilterExpr) -> Vec<R> {
        self.read_guard().search(expr)
    }

    pub fn hydrate(&self, records: impl IntoIterator<Item = R>) -> StoreResult<()> {
        self.write_guard().hydrate(records)
    }

    pub fn add(&self, record: R) -> StoreResult<K> {
        self.write_guard().add(record)
    }

    pub fn update(&self, key: &K, patch: &Patch) -> StoreResult<R> {
        self.write_guard().update(key, patch)
    }

    pub fn update_many(&self, selection: &KeySelection<K>, patch: &Patch) -> StoreResult<Vec<R>> {
        self.write_guard().update_many(selection, patch)
    }

    pub fn delete(&self, key: &K) -> bool {
        self.write_guard().delete(key)
    }
}

impl<K: RecordKey, R: StoredRecord> From<KeyedStore<K, R>> for SharedStore<K, R> {
    fn from(store: KeyedStore<K, R>) -> Self {
        Self::new(store)
    }
}
