//! Compilation of filter expressions into predicates.
//!
//! Compiling walks the expression once and precomputes everything that does
//! not depend on the record (folded literals, literal text forms). The
//! resulting [`Predicate`] is immutable and can be shared across threads.

use serde_json::Value;

use crate::expr::{FieldCriteria, FieldOp, FilterExpr};
use crate::value::{stringify, values_equal};
use crate::{Record, Result};

/// A compiled filter expression.
#[derive(Debug, Clone)]
pub struct Predicate {
    root: Node,
}

#[derive(Debug, Clone)]
enum Node {
    Field { name: String, test: Test },
    All(Vec<Node>),
    Any(Vec<Node>),
}

#[derive(Debug, Clone)]
enum Test {
    Equals(Value),
    /// `folded` is set only when the literal is a string.
    EqualsIgnoreCase { literal: Value, folded: Option<String> },
    Includes { literal: Value, text: String },
    IncludesIgnoreCase { literal: Value, folded: String },
}

/// Compiles an expression into a reusable predicate.
pub fn compile(expr: &FilterExpr) -> Predicate {
    Predicate {
        root: compile_node(expr),
    }
}

/// Parses the JSON wire form and compiles it.
pub fn compile_value(value: &Value) -> Result<Predicate> {
    FilterExpr::from_value(value).map(|expr| compile(&expr))
}

/// One-shot evaluation of `expr` against `record`.
pub fn evaluate<R: Record + ?Sized>(expr: &FilterExpr, record: &R) -> bool {
    compile(expr).matches(record)
}

impl Predicate {
    /// Returns true if `record` satisfies the expression.
    pub fn matches<R: Record + ?Sized>(&self, record: &R) -> bool {
        self.root.eval(record)
    }

    /// Yields the records that satisfy the expression, in input order.
    pub fn filter<'a, R, I>(&'a self, records: I) -> impl Iterator<Item = &'a R>
    where
        R: Record + 'a,
        I: IntoIterator<Item = &'a R>,
    {
        records.into_iter().filter(move |record| self.matches(*record))
    }
}

impl From<&FilterExpr> for Predicate {
    fn from(expr: &FilterExpr) -> Self {
        compile(expr)
    }
}

fn compile_node(expr: &FilterExpr) -> Node {
    match expr {
        FilterExpr::Fields(criteria) => compile_criteria(criteria),
        FilterExpr::And(children) => Node::All(children.iter().map(compile_node).collect()),
        FilterExpr::Or(children) => Node::Any(children.iter().map(compile_node).collect()),
    }
}

fn compile_criteria(criteria: &FieldCriteria) -> Node {
    Node::All(
        criteria
            .iter()
            .map(|(name, op)| Node::Field {
                name: name.clone(),
                test: compile_op(op),
            })
            .collect(),
    )
}

fn compile_op(op: &FieldOp) -> Test {
    match op {
        FieldOp::Match {
            value,
            case_sensitive: true,
        } => Test::Equals(value.clone()),
        FieldOp::Match {
            value,
            case_sensitive: false,
        } => Test::EqualsIgnoreCase {
            literal: value.clone(),
            folded: value.as_str().map(str::to_lowercase),
        },
        FieldOp::Includes {
            value,
            case_sensitive: true,
        } => Test::Includes {
            literal: value.clone(),
            text: stringify(value),
        },
        FieldOp::Includes {
            value,
            case_sensitive: false,
        } => Test::IncludesIgnoreCase {
            literal: value.clone(),
            folded: stringify(value).to_lowercase(),
        },
    }
}

impl Node {
    fn eval<R: Record + ?Sized>(&self, record: &R) -> bool {
        match self {
            Self::All(nodes) => nodes.iter().all(|node| node.eval(record)),
            Self::Any(nodes) => nodes.iter().any(|node| node.eval(record)),
            Self::Field { name, test } => match record.field(name) {
                Some(value) => test.eval(&value),
                None => false,
            },
        }
    }
}

impl Test {
    fn eval(&self, field: &Value) -> bool {
        match self {
            Self::Equals(literal) => values_equal(field, literal),
            Self::EqualsIgnoreCase { literal, folded } => match (field, folded) {
                (Value::String(s), Some(folded)) => s.to_lowercase() == *folded,
                _ => values_equal(field, literal),
            },
            Self::Includes { literal, text } => match field {
                Value::Array(items) => items.iter().any(|item| values_equal(item, literal)),
                _ => stringify(field).contains(text.as_str()),
            },
            Self::IncludesIgnoreCase { literal, folded } => match field {
                Value::Array(items) => items.iter().any(|item| match item {
                    Value::String(s) => s.to_lowercase().contains(folded.as_str()),
                    _ => values_equal(item, literal),
                }),
                _ => stringify(field).to_lowercase().contains(folded.as_str()),
            },
        }
    }
}
