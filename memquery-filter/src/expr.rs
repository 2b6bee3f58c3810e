//! The filter expression tree and its JSON wire form.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{FilterError, Result};

const MATCH: &str = "$match";
const INCLUDES: &str = "$includes";
const AND: &str = "$and";
const OR: &str = "$or";
const CASE_SENSITIVE: &str = "caseSensitive";

/// A declarative filter over records.
///
/// A node is exactly one of three shapes. Serializes to and from the JSON
/// wire form (`{"field": {"$match": ..}}`, `{"$and": [..]}`, `{"$or": [..]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value", into = "Value")]
pub enum FilterExpr {
    /// Every listed field must satisfy its operator.
    Fields(FieldCriteria),
    /// Matches iff all sub-expressions match. Empty matches everything.
    And(Vec<FilterExpr>),
    /// Matches iff any sub-expression matches. Empty matches nothing.
    Or(Vec<FilterExpr>),
}

/// Field name to operator mapping, combined with logical AND.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldCriteria(BTreeMap<String, FieldOp>);

/// A leaf test applied to a single record field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Field value equals the literal.
    Match { value: Value, case_sensitive: bool },
    /// Field value (or any element, for sequences) contains the literal.
    Includes { value: Value, case_sensitive: bool },
}

impl FilterExpr {
    /// An expression with no criteria; matches every record.
    #[must_use]
    pub fn all() -> Self {
        Self::Fields(FieldCriteria::default())
    }

    /// Conjunction of the given expressions.
    pub fn and(exprs: impl IntoIterator<Item = FilterExpr>) -> Self {
        Self::And(exprs.into_iter().collect())
    }

    /// Disjunction of the given expressions.
    pub fn or(exprs: impl IntoIterator<Item = FilterExpr>) -> Self {
        Self::Or(exprs.into_iter().collect())
    }

    /// Single-field criteria node.
    pub fn field(name: impl Into<String>, op: FieldOp) -> Self {
        Self::Fields(FieldCriteria::new().with(name, op))
    }

    /// Shorthand for a case-sensitive `$match` on one field.
    pub fn matches(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(name, FieldOp::matching(value))
    }

    /// Shorthand for a case-sensitive `$includes` on one field.
    pub fn includes(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::field(name, FieldOp::includes(value))
    }

    /// Parses and validates the JSON wire form.
    ///
    /// The whole tree is checked before anything is returned; an error names
    /// the path of the offending node (e.g. `$.$or[1].name`).
    pub fn from_value(value: &Value) -> Result<Self> {
        parse_node(value, "$")
    }

    /// Renders the JSON wire form. `caseSensitive` is only emitted when false.
    #[must_use]
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        match self {
            Self::Fields(criteria) => {
                for (name, op) in criteria.iter() {
                    map.insert(name.clone(), op.to_value());
                }
            }
            Self::And(children) => {
                map.insert(AND.into(), children.iter().map(Self::to_value).collect());
            }
            Self::Or(children) => {
                map.insert(OR.into(), children.iter().map(Self::to_value).collect());
            }
        }
        Value::Object(map)
    }
}

impl TryFrom<Value> for FilterExpr {
    type Error = FilterError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(&value)
    }
}

impl From<FilterExpr> for Value {
    fn from(expr: FilterExpr) -> Self {
        expr.to_value()
    }
}

impl FromStr for FilterExpr {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(s)?;
        Self::from_value(&value)
    }
}

impl FieldCriteria {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) the operator for `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, op: FieldOp) -> Self {
        self.insert(name, op);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, op: FieldOp) -> Option<FieldOp> {
        self.0.insert(name.into(), op)
    }

    pub fn get(&self, name: &str) -> Option<&FieldOp> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldOp)> {
        self.0.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, FieldOp)> for FieldCriteria {
    fn from_iter<I: IntoIterator<Item = (String, FieldOp)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FieldOp {
    /// Case-sensitive `$match` against `value`.
    pub fn matching(value: impl Into<Value>) -> Self {
        Self::Match {
            value: value.into(),
            case_sensitive: true,
        }
    }

    /// Case-sensitive `$includes` of `value`.
    pub fn includes(value: impl Into<Value>) -> Self {
        Self::Includes {
            value: value.into(),
            case_sensitive: true,
        }
    }

    /// Same operator with case-insensitive comparison.
    #[must_use]
    pub fn case_insensitive(self) -> Self {
        match self {
            Self::Match { value, .. } => Self::Match {
                value,
                case_sensitive: false,
            },
            Self::Includes { value, .. } => Self::Includes {
                value,
                case_sensitive: false,
            },
        }
    }

    #[must_use]
    pub fn literal(&self) -> &Value {
        match self {
            Self::Match { value, .. } | Self::Includes { value, .. } => value,
        }
    }

    #[must_use]
    pub fn is_case_sensitive(&self) -> bool {
        match self {
            Self::Match { case_sensitive, .. } | Self::Includes { case_sensitive, .. } => {
                *case_sensitive
            }
        }
    }

    fn to_value(&self) -> Value {
        let key = match self {
            Self::Match { .. } => MATCH,
            Self::Includes { .. } => INCLUDES,
        };
        let mut map = Map::new();
        map.insert(key.into(), self.literal().clone());
        if !self.is_case_sensitive() {
            map.insert(CASE_SENSITIVE.into(), Value::Bool(false));
        }
        Value::Object(map)
    }
}

// ── Parsing ──────────────────────────────────────────────────────

fn invalid(msg: String) -> FilterError {
    FilterError::InvalidExpression(msg)
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn parse_node(value: &Value, path: &str) -> Result<FilterExpr> {
    let Value::Object(map) = value else {
        return Err(invalid(format!(
            "{path}: expected an object, found {}",
            kind(value)
        )));
    };

    if !map.keys().any(|k| k.starts_with('$')) {
        return parse_criteria(map, path).map(FilterExpr::Fields);
    }

    let (key, children) = match map.iter().next() {
        Some(entry) if map.len() == 1 => entry,
        _ => {
            return Err(invalid(format!(
                "{path}: a combinator cannot be mixed with other keys"
            )));
        }
    };

    let build: fn(Vec<FilterExpr>) -> FilterExpr = match key.as_str() {
        AND => FilterExpr::And,
        OR => FilterExpr::Or,
        other => return Err(invalid(format!("{path}: unknown combinator `{other}`"))),
    };

    let Value::Array(items) = children else {
        return Err(invalid(format!(
            "{path}.{key}: expected an array, found {}",
            kind(children)
        )));
    };

    items
        .iter()
        .enumerate()
        .map(|(i, item)| parse_node(item, &format!("{path}.{key}[{i}]")))
        .collect::<Result<Vec<_>>>()
        .map(build)
}

fn parse_criteria(map: &Map<String, Value>, path: &str) -> Result<FieldCriteria> {
    map.iter()
        .map(|(name, op)| {
            let op = parse_op(op, &format!("{path}.{name}"))?;
            Ok((name.clone(), op))
        })
        .collect()
}

fn parse_op(value: &Value, path: &str) -> Result<FieldOp> {
    let Value::Object(map) = value else {
        return Err(invalid(format!(
            "{path}: expected an operator object, found {}",
            kind(value)
        )));
    };

    if let Some(unknown) = map
        .keys()
        .find(|k| !matches!(k.as_str(), MATCH | INCLUDES | CASE_SENSITIVE))
    {
        return Err(invalid(format!("{path}: unknown operator key `{unknown}`")));
    }

    let case_sensitive = match map.get(CASE_SENSITIVE) {
        None => true,
        Some(Value::Bool(b)) => *b,
        Some(other) => {
            return Err(invalid(format!(
                "{path}.{CASE_SENSITIVE}: expected a boolean, found {}",
                kind(other)
            )));
        }
    };

    match (map.get(MATCH), map.get(INCLUDES)) {
        (Some(value), None) => Ok(FieldOp::Match {
            value: value.clone(),
            case_sensitive,
        }),
        (None, Some(value)) => Ok(FieldOp::Includes {
            value: value.clone(),
            case_sensitive,
        }),
        (Some(_), Some(_)) => Err(invalid(format!(
            "{path}: `{MATCH}` and `{INCLUDES}` cannot be combined in one operator"
        ))),
        (None, None) => Err(invalid(format!(
            "{path}: expected `{MATCH}` or `{INCLUDES}`"
        ))),
    }
}
