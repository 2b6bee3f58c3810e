//! Filter expression compiler for memquery.
//!
//! This crate turns a declarative filter expression into a reusable predicate:
//! - [`FilterExpr`] — the expression tree (field criteria, `$and`, `$or`)
//! - [`FieldOp`] — leaf operators (`$match`, `$includes`) applied to one field
//! - [`Predicate`] — the compiled, pure form of an expression
//! - [`Record`] — the capability a record type provides so fields can be read by name
//!
//! The wire form is plain JSON:
//!
//! ```json
//! { "$or": [
//!     { "name": { "$match": "bob" } },
//!     { "$and": [ { "name": { "$match": "alice" } }, { "tags": { "$includes": 1 } } ] }
//! ] }
//! ```
//!
//! Malformed trees are rejected while parsing, so a [`Predicate`] always
//! corresponds to a structurally valid expression.

mod compile;
mod expr;
mod record;
mod value;

pub use compile::{Predicate, compile, compile_value, evaluate};
pub use expr::{FieldCriteria, FieldOp, FilterExpr};
pub use record::{FieldTable, Record};
pub use value::{stringify, values_equal};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, FilterError>;

/// Errors that can occur while building a filter expression.
#[derive(Debug, thiserror::Error)]
pub enum FilterError {
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    #[error("malformed filter JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
