//! Field access for records.
//!
//! The compiler never inspects record types directly. Each record type
//! exposes its fields by name through [`Record`]; JSON documents get this for
//! free, typed structs usually delegate to a [`FieldTable`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};

/// A record whose fields can be read by name.
pub trait Record {
    /// Returns the value of `name`, or `None` if the record has no such field.
    fn field(&self, name: &str) -> Option<Cow<'_, Value>>;
}

impl Record for Map<String, Value> {
    /// Names starting with `/` are JSON pointers into nested objects.
    fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
        if name.starts_with('/') {
            let (head, rest) = split_pointer(name);
            let value = self.get(&head)?;
            return match rest {
                Some(rest) => value.pointer(rest).map(Cow::Borrowed),
                None => Some(Cow::Borrowed(value)),
            };
        }
        self.get(name).map(Cow::Borrowed)
    }
}

impl Record for Value {
    fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
        match self {
            Value::Object(map) => map.field(name),
            _ => None,
        }
    }
}

impl<R: Record + ?Sized> Record for &R {
    fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
        (**self).field(name)
    }
}

/// Splits `/a/b/c` into the unescaped first segment and the remaining pointer.
fn split_pointer(pointer: &str) -> (String, Option<&str>) {
    let body = &pointer[1..];
    let (head, rest) = match body.find('/') {
        Some(idx) => (&body[..idx], Some(&body[idx..])),
        None => (body, None),
    };
    (head.replace("~1", "/").replace("~0", "~"), rest)
}

/// Extraction function for one field of `R`.
pub type Accessor<R> = fn(&R) -> Value;

/// A per-type table from field name to extraction function.
///
/// Lets a typed struct implement [`Record`] without reflection:
///
/// ```
/// use std::borrow::Cow;
/// use std::sync::LazyLock;
/// use memquery_filter::{FieldTable, Record};
/// use serde_json::{json, Value};
///
/// struct Movie { id: String, name: String }
///
/// static MOVIE_FIELDS: LazyLock<FieldTable<Movie>> = LazyLock::new(|| {
///     FieldTable::<Movie>::new()
///         .with("id", |m| json!(m.id))
///         .with("name", |m| json!(m.name))
/// });
///
/// impl Record for Movie {
///     fn field(&self, name: &str) -> Option<Cow<'_, Value>> {
///         MOVIE_FIELDS.get(self, name).map(Cow::Owned)
///     }
/// }
///
/// let m = Movie { id: "1".into(), name: "Heat".into() };
/// assert_eq!(m.field("name").as_deref(), Some(&json!("Heat")));
/// assert!(m.field("year").is_none());
/// ```
pub struct FieldTable<R> {
    accessors: HashMap<&'static str, Accessor<R>>,
}

impl<R> FieldTable<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            accessors: HashMap::new(),
        }
    }

    /// Registers the accessor for `name`, replacing any previous one.
    #[must_use]
    pub fn with(mut self, name: &'static str, accessor: Accessor<R>) -> Self {
        self.accessors.insert(name, accessor);
        self
    }

    /// Reads `name` from `record`.
    pub fn get(&self, record: &R, name: &str) -> Option<Value> {
        self.accessors.get(name).map(|accessor| accessor(record))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.accessors.contains_key(name)
    }

    /// Registered field names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.accessors.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl<R> Default for FieldTable<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R> fmt::Debug for FieldTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldTable")
            .field("fields", &self.names())
            .finish()
    }
}
