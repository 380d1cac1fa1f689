use super::query::{Direction, Query};
use super::snapshot::Snapshot;
use super::validator::validate_path;
use super::{DatabaseError, FirebaseDatabase};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use url::Url;

/// A location in the database. Paths are validated when the reference is made.
#[derive(Clone)]
pub struct Reference<'a> {
    database: &'a FirebaseDatabase,
    path: String,
}

impl<'a> Reference<'a> {
    pub(crate) fn new(database: &'a FirebaseDatabase, path: &str) -> Result<Self, DatabaseError> {
        let path = path.trim_matches('/');
        validate_path(path)?;

        Ok(Self {
            database,
            path: path.to_string(),
        })
    }

    pub(crate) fn root_of(database: &'a FirebaseDatabase) -> Self {
        Self {
            database,
            path: String::new(),
        }
    }

    pub(crate) fn database(&self) -> &'a FirebaseDatabase {
        self.database
    }

    /// The last segment of the path, `None` for the root.
    pub fn key(&self) -> Option<&str> {
        match self.path.rsplit('/').next() {
            Some("") | None => None,
            key => key,
        }
    }

    /// The path without surrounding slashes; the root is the empty string.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path.is_empty()
    }

    /// The parent location, `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            return None;
        }

        let parent = match self.path.rsplit_once('/') {
            Some((parent, _)) => parent.to_string(),
            None => String::new(),
        };

        Some(Self {
            database: self.database,
            path: parent,
        })
    }

    pub fn root(&self) -> Self {
        Self::root_of(self.database)
    }

    /// A reference to `path` relative to this location.
    pub fn child(&self, path: &str) -> Result<Self, DatabaseError> {
        let path = path.trim_matches('/');

        if self.is_root() {
            return Self::new(self.database, path);
        }

        Self::new(self.database, &format!("{}/{}", self.path, path))
    }

    pub fn uri(&self) -> Url {
        self.database.url(&self.path)
    }

    pub fn query(&self) -> Query<'a> {
        Query::new(self.clone())
    }

    pub async fn get_value(&self) -> Result<Value, DatabaseError> {
        self.database.get(&self.path).await
    }

    pub async fn get_snapshot(&self) -> Result<Snapshot<'a>, DatabaseError> {
        let value = self.get_value().await?;
        Ok(Snapshot::new(self.clone(), value))
    }

    /// The value together with its ETag, for use with [`Reference::set_with_etag`].
    pub async fn get_value_with_etag(&self) -> Result<(Value, String), DatabaseError> {
        self.database.get_with_etag(&self.path).await
    }

    /// The keys of the direct children, fetched without their values.
    ///
    /// Fails with [`DatabaseError::NoChildren`] when the location holds a
    /// primitive or nothing at all.
    pub async fn child_keys(&self) -> Result<Vec<String>, DatabaseError> {
        match self.query().shallow().get_value().await? {
            Value::Object(map) => Ok(map.into_iter().map(|(key, _)| key).collect()),
            Value::Array(items) => Ok((0..items.len()).map(|i| i.to_string()).collect()),
            _ => Err(DatabaseError::NoChildren(self.to_string())),
        }
    }

    /// Replaces the data at this location. Setting `null` removes it.
    pub async fn set<T: Serialize + ?Sized>(&self, value: &T) -> Result<(), DatabaseError> {
        let value = serde_json::to_value(value)?;

        if value.is_null() {
            return self.remove().await;
        }

        self.database.set(&self.path, &value).await?;
        Ok(())
    }

    /// Only writes when the data has not changed since `etag` was read.
    pub async fn set_with_etag<T: Serialize + ?Sized>(
        &self,
        value: &T,
        etag: &str,
    ) -> Result<Value, DatabaseError> {
        self.database.set_with_etag(&self.path, value, etag).await
    }

    /// Adds `value` under a new, server-generated child key and returns the
    /// reference to it.
    pub async fn push<T: Serialize + ?Sized>(&self, value: &T) -> Result<Self, DatabaseError> {
        let key = self.database.push(&self.path, value).await?;
        self.child(&key)
    }

    /// Writes several children at once. Keys may be paths relative to this location.
    pub async fn update(&self, values: &Map<String, Value>) -> Result<(), DatabaseError> {
        self.database.update(&self.path, values).await
    }

    pub async fn remove(&self) -> Result<(), DatabaseError> {
        self.database.remove(&self.path).await
    }

    pub async fn remove_with_etag(&self, etag: &str) -> Result<(), DatabaseError> {
        self.database.remove_with_etag(&self.path, etag).await
    }

    pub fn order_by_child(&self, child_key: impl Into<String>) -> Result<Query<'a>, DatabaseError> {
        self.query().order_by_child(child_key)
    }

    pub fn order_by_key(&self) -> Result<Query<'a>, DatabaseError> {
        self.query().order_by_key()
    }

    pub fn order_by_value(&self, direction: Direction) -> Result<Query<'a>, DatabaseError> {
        self.query().order_by_value(direction)
    }

    pub fn limit_to_first(&self, limit: u32) -> Result<Query<'a>, DatabaseError> {
        self.query().limit_to_first(limit)
    }

    pub fn limit_to_last(&self, limit: u32) -> Result<Query<'a>, DatabaseError> {
        self.query().limit_to_last(limit)
    }

    pub fn start_at(&self, value: impl Into<Value>) -> Result<Query<'a>, DatabaseError> {
        self.query().start_at(value)
    }

    pub fn start_after(&self, value: impl Into<Value>) -> Result<Query<'a>, DatabaseError> {
        self.query().start_after(value)
    }

    pub fn end_at(&self, value: impl Into<Value>) -> Result<Query<'a>, DatabaseError> {
        self.query().end_at(value)
    }

    pub fn end_before(&self, value: impl Into<Value>) -> Result<Query<'a>, DatabaseError> {
        self.query().end_before(value)
    }

    pub fn equal_to(&self, value: impl Into<Value>) -> Result<Query<'a>, DatabaseError> {
        self.query().equal_to(value)
    }

    pub fn shallow(&self) -> Query<'a> {
        self.query().shallow()
    }
}

impl fmt::Debug for Reference<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference").field("path", &self.path).finish()
    }
}

impl fmt::Display for Reference<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}
