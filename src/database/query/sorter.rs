use super::{append_query_param, QueryModifier};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

/// The single ordering of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Sorter {
    Key(OrderByKey),
    Child(OrderByChild),
    Value(OrderByValue),
}

impl QueryModifier for Sorter {
    fn modify_uri(&self, uri: Url) -> Url {
        match self {
            Self::Key(sorter) => sorter.modify_uri(uri),
            Self::Child(sorter) => sorter.modify_uri(uri),
            Self::Value(sorter) => sorter.modify_uri(uri),
        }
    }

    fn modify_value(&self, value: Value) -> Value {
        match self {
            Self::Key(sorter) => sorter.modify_value(value),
            Self::Child(sorter) => sorter.modify_value(value),
            Self::Value(sorter) => sorter.modify_value(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderByKey;

impl QueryModifier for OrderByKey {
    fn modify_uri(&self, uri: Url) -> Url {
        append_query_param(uri, "orderBy", "\"$key\"")
    }

    fn modify_value(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut entries: Vec<(String, Value)> = map.into_iter().collect();
                entries.sort_by(|(a, _), (b, _)| compare_keys(a, b));
                Value::Object(entries.into_iter().collect())
            }
            // Array indices are already in key order.
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByChild {
    child_key: String,
}

impl OrderByChild {
    pub fn new(child_key: impl Into<String>) -> Self {
        Self {
            child_key: child_key.into(),
        }
    }

    pub fn child_key(&self) -> &str {
        &self.child_key
    }
}

impl QueryModifier for OrderByChild {
    fn modify_uri(&self, uri: Url) -> Url {
        append_query_param(uri, "orderBy", &format!("\"{}\"", self.child_key))
    }

    fn modify_value(&self, value: Value) -> Value {
        sort_children(value, |a, b| {
            compare_values(
                resolve_child(a, &self.child_key),
                resolve_child(b, &self.child_key),
            )
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderByValue {
    direction: Direction,
}

impl OrderByValue {
    pub fn new(direction: Direction) -> Self {
        Self { direction }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl QueryModifier for OrderByValue {
    fn modify_uri(&self, uri: Url) -> Url {
        append_query_param(uri, "orderBy", "\"$value\"")
    }

    fn modify_value(&self, value: Value) -> Value {
        match self.direction {
            Direction::Ascending => sort_children(value, compare_values),
            Direction::Descending => sort_children(value, |a, b| compare_values(b, a)),
        }
    }
}

/// Stable sort of an object's (or array's) children by their values.
///
/// Arrays come back as objects keyed by their former index, so each child
/// keeps its key. Primitives are returned untouched.
fn sort_children<F>(value: Value, compare: F) -> Value
where
    F: Fn(&Value, &Value) -> Ordering,
{
    let mut entries: Vec<(String, Value)> = match value {
        Value::Object(map) => map.into_iter().collect(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (index.to_string(), item))
            .collect(),
        other => return other,
    };

    entries.sort_by(|(_, a), (_, b)| compare(a, b));

    Value::Object(entries.into_iter().collect::<Map<String, Value>>())
}

static NULL: Value = Value::Null;

/// Looks up a `/`-delimited path inside a child. Missing paths resolve to null.
pub(crate) fn resolve_child<'v>(value: &'v Value, path: &str) -> &'v Value {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
        .unwrap_or(&NULL)
}

/// Keys that are 32-bit integers first in numeric order, then the rest
/// lexicographically.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    match (integer_key(a), integer_key(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

// Only the canonical form counts: no sign other than `-`, no leading zeros.
fn integer_key(key: &str) -> Option<i32> {
    let digits = key.strip_prefix('-').unwrap_or(key);

    let canonical = match digits.as_bytes() {
        [] => false,
        [b'0'] => key == "0",
        [first, rest @ ..] => (b'1'..=b'9').contains(first) && rest.iter().all(u8::is_ascii_digit),
    };

    if canonical {
        key.parse().ok()
    } else {
        None
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) | Value::Object(_) => 5,
    }
}

/// Total order used by the database: null, false, true, numbers, strings,
/// then objects. Objects compare equal to each other and keep their order.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}
