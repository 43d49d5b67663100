use crate::schema::Schema;
use crate::value::{get_or_null, Map, Value};
use std::cmp::Ordering;

/// Ordered sort keys: `"-date title"` or `{"date": -1, "title": 1}`.
/// Object keys apply in the order they were written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortSpec {
    keys: Vec<(String, bool)>,
}

impl SortSpec {
    pub fn asc(mut self, path: impl Into<String>) -> Self {
        self.keys.push((path.into(), false));
        self
    }

    pub fn desc(mut self, path: impl Into<String>) -> Self {
        self.keys.push((path.into(), true));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// `(path, descending)` pairs in priority order.
    pub fn keys(&self) -> &[(String, bool)] {
        &self.keys
    }

    /// Compare two documents key by key using each path's type.
    pub(crate) fn compare(&self, schema: &Schema, a: &Map, b: &Map) -> Ordering {
        for (path, descending) in &self.keys {
            let ty = schema.type_for(path);
            let order = ty.compare(get_or_null(a, path), get_or_null(b, path));
            let order = if *descending { order.reverse() } else { order };
            if order != Ordering::Equal {
                return order;
            }
        }
        Ordering::Equal
    }
}

fn is_descending(direction: &Value) -> bool {
    match direction {
        Value::Number(n) => *n < 0.0,
        Value::String(s) => matches!(s.to_ascii_lowercase().as_str(), "desc" | "descending" | "-1"),
        _ => false,
    }
}

impl From<&str> for SortSpec {
    fn from(spec: &str) -> Self {
        let keys = spec
            .split_whitespace()
            .map(|key| match key.strip_prefix('-') {
                Some(path) => (path.to_string(), true),
                None => (key.trim_start_matches('+').to_string(), false),
            })
            .collect();
        SortSpec { keys }
    }
}

impl From<String> for SortSpec {
    fn from(spec: String) -> Self {
        SortSpec::from(spec.as_str())
    }
}

impl From<Value> for SortSpec {
    fn from(spec: Value) -> Self {
        match spec {
            Value::String(s) => SortSpec::from(s.as_str()),
            Value::Object(map) => SortSpec {
                keys: map
                    .iter()
                    .map(|(path, direction)| (path.clone(), is_descending(direction)))
                    .collect(),
            },
            _ => SortSpec::default(),
        }
    }
}

impl From<serde_json::Value> for SortSpec {
    fn from(spec: serde_json::Value) -> Self {
        SortSpec::from(Value::from(spec))
    }
}
