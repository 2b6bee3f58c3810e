//! Store configuration.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::StoreResult;

/// Configuration for a [`KeyedStore`](crate::KeyedStore).
///
/// JSON form:
///
/// ```json
/// { "key_field": "id", "on_duplicate": "reject", "defaults": { "isOnline": false } }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Field whose value identifies a record.
    pub key_field: String,
    /// What `hydrate` does when two input records share a key.
    #[serde(default)]
    pub on_duplicate: DuplicatePolicy,
    /// Values `create` fills in for fields the new record lacks.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub defaults: Map<String, Value>,
}

/// Handling of colliding keys during hydration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Fail the whole hydration with `DuplicateKey`.
    #[default]
    Reject,
    /// Later records replace earlier ones.
    Overwrite,
}

impl StoreConfig {
    pub fn new(key_field: impl Into<String>) -> Self {
        Self {
            key_field: key_field.into(),
            on_duplicate: DuplicatePolicy::default(),
            defaults: Map::new(),
        }
    }

    /// Parses a JSON configuration document.
    pub fn from_json(json: &str) -> StoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn with_duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.on_duplicate = policy;
        self
    }

    #[must_use]
    pub fn with_default(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(field.into(), value.into());
        self
    }
}

impl From<&str> for StoreConfig {
    fn from(key_field: &str) -> Self {
        Self::new(key_field)
    }
}
