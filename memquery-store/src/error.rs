//! Error types for the keyed store.

use memquery_filter::FilterError;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in store operations.
///
/// A failed operation never leaves a partial mutation behind.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record is stored under the key.
    #[error("record not found: {0}")]
    NotFound(String),

    /// `add` with a key that is already present.
    #[error("record already exists: {0}")]
    AlreadyExists(String),

    /// Two records in one `hydrate` batch share a key.
    #[error("duplicate key in hydration batch: {0}")]
    DuplicateKey(String),

    /// An update tried to change the key field.
    #[error("key field `{field}` of record {key} cannot be changed")]
    KeyImmutable { key: String, field: String },

    /// The record is missing its key or rejected a field value.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// The search expression failed validation.
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Configuration could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
