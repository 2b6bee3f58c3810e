use memquery_filter::Record;
use serde_json::{Map, Value};

/// A record the store can hold and patch.
///
/// Stored records are cloned on every read and write so callers never share
/// state with the store.
pub trait StoredRecord: Record + Clone + Send + Sync + 'static {
    /// Replaces the value of one field.
    /// Return `Err(reason)` if the record type cannot accept it.
    ///
    /// JSON records treat names starting with `/` as pointers and create
    /// missing intermediate objects.
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), String>;
}

impl StoredRecord for Map<String, Value> {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), String> {
        let Some(pointer) = name.strip_prefix('/') else {
            self.insert(name.to_string(), value);
            return Ok(());
        };

        let mut segments = pointer.split('/').map(unescape).peekable();
        let mut map = self;
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                map.insert(segment, value);
                return Ok(());
            }
            let slot = map
                .entry(segment)
                .or_insert_with(|| Value::Object(Map::new()));
            map = match slot {
                Value::Object(inner) => inner,
                _ => return Err(format!("cannot set `{name}`: path crosses a non-object")),
            };
        }
        Err(format!("cannot set empty field name `{name}`"))
    }
}

impl StoredRecord for Value {
    fn set_field(&mut self, name: &str, value: Value) -> Result<(), String> {
        match self {
            Value::Object(map) => map.set_field(name, value),
            _ => Err(format!("cannot set `{name}` on a non-object record")),
        }
    }
}

fn unescape(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pointer_set_creates_nested_objects() {
        let mut record = json!({"n": 1});
        record.set_field("/meta/id", json!("a")).unwrap();
        assert_eq!(record, json!({"n": 1, "meta": {"id": "a"}}));
        assert_eq!(record.field("/meta/id").as_deref(), Some(&json!("a")));
    }

    #[test]
    fn pointer_set_unescapes_segments() {
        let mut record = json!({});
        record.set_field("/a~1b/c~0d", json!(1)).unwrap();
        assert_eq!(record, json!({"a/b": {"c~d": 1}}));
    }

    #[test]
    fn pointer_set_through_scalar_fails() {
        let mut record = json!({"meta": 3});
        assert!(record.set_field("/meta/id", json!("a")).is_err());
        assert_eq!(record, json!({"meta": 3}));
    }
}
