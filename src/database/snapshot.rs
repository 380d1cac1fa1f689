use super::query::sorter::resolve_child;
use super::reference::Reference;
use super::DatabaseError;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// The data at a location, as read at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot<'a> {
    reference: Reference<'a>,
    value: Value,
}

impl<'a> Snapshot<'a> {
    pub(crate) fn new(reference: Reference<'a>, value: Value) -> Self {
        Self { reference, value }
    }

    /// The key of the location, `None` for the root.
    pub fn key(&self) -> Option<&str> {
        self.reference.key()
    }

    pub fn reference(&self) -> &Reference<'a> {
        &self.reference
    }

    /// The part of this snapshot at `path`, a `/`-delimited path relative to
    /// this location. Paths that hold no data give a snapshot that does not exist.
    pub fn child(&self, path: &str) -> Result<Self, DatabaseError> {
        let reference = self.reference.child(path)?;
        let value = resolve_child(&self.value, path).clone();

        Ok(Self::new(reference, value))
    }

    pub fn exists(&self) -> bool {
        !self.value.is_null()
    }

    pub fn has_child(&self, path: &str) -> bool {
        !resolve_child(&self.value, path.trim_matches('/')).is_null()
    }

    pub fn has_children(&self) -> bool {
        self.num_children() > 0
    }

    /// Number of direct children; primitives have none.
    pub fn num_children(&self) -> usize {
        match &self.value {
            Value::Object(map) => map.len(),
            Value::Array(items) => items.len(),
            _ => 0,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn into_value(self) -> Value {
        self.value
    }

    /// Deserializes the data into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, DatabaseError> {
        Ok(serde_json::from_value(self.value.clone())?)
    }
}
