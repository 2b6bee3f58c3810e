//! Key types, key resolution and key generation.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A value usable as the primary key of a store.
///
/// Keys are read from the record's key field, so each key type knows how to
/// convert from and to the JSON field value.
pub trait RecordKey: Clone + Ord + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Converts a key field value, or `None` if it has the wrong shape.
    fn from_value(value: &Value) -> Option<Self>;

    /// The field value written back into records.
    fn to_value(&self) -> Value;
}

impl RecordKey for String {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_owned)
    }

    fn to_value(&self) -> Value {
        Value::String(self.clone())
    }
}

impl RecordKey for i64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl RecordKey for u64 {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_u64()
    }

    fn to_value(&self) -> Value {
        Value::from(*self)
    }
}

impl RecordKey for Uuid {
    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().and_then(|s| Uuid::parse_str(s).ok())
    }

    fn to_value(&self) -> Value {
        Value::String(self.to_string())
    }
}

/// Produces fresh keys for [`KeyedStore::create`](crate::KeyedStore::create).
///
/// Any `Fn() -> K` closure is a generator, so callers can supply their own
/// sequence without the store holding hidden counters.
pub trait KeyGenerator<K> {
    fn generate(&self) -> K;
}

impl<K, F: Fn() -> K> KeyGenerator<K> for F {
    fn generate(&self) -> K {
        self()
    }
}

/// Built-in UUID key generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    /// Random UUID v4.
    #[default]
    UuidV4,
    /// Time-ordered UUID v7, so generated keys sort by creation time.
    UuidV7,
}

impl KeyStrategy {
    fn uuid(self) -> Uuid {
        match self {
            Self::UuidV4 => Uuid::new_v4(),
            Self::UuidV7 => Uuid::now_v7(),
        }
    }
}

impl KeyGenerator<Uuid> for KeyStrategy {
    fn generate(&self) -> Uuid {
        self.uuid()
    }
}

impl KeyGenerator<String> for KeyStrategy {
    fn generate(&self) -> String {
        self.uuid().to_string()
    }
}

/// Which records a bulk update targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySelection<K> {
    /// Every record currently stored.
    All,
    /// Exactly these keys; each must exist.
    Keys(Vec<K>),
}

impl<K> From<Vec<K>> for KeySelection<K> {
    fn from(keys: Vec<K>) -> Self {
        Self::Keys(keys)
    }
}
