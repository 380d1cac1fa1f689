//! Sorting and filtering of Realtime Database locations.
//!
//! A [`Query`] is built by chaining sorters and filters onto a
//! [`Reference`](super::reference::Reference). Each of them is a
//! [`QueryModifier`]: it adds its parameter to the request URI and, where the
//! REST API does not guarantee an order, reorders or trims the returned value.
//!
//! ```rust,no_run
//! # use firebase_rest_sdk::database::FirebaseDatabase;
//! # async fn run(database: FirebaseDatabase) -> Result<(), Box<dyn std::error::Error>> {
//! let dinosaurs = database
//!     .reference("dinosaurs")?
//!     .order_by_child("height")?
//!     .limit_to_first(3)?
//!     .get_value()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod filter;
pub mod sorter;

use super::reference::Reference;
use super::snapshot::Snapshot;
use super::DatabaseError;
use serde_json::Value;
use url::Url;

pub use filter::{
    EndAt, EndBefore, EqualTo, Filter, LimitToFirst, LimitToLast, Shallow, StartAfter, StartAt,
};
pub use sorter::{Direction, OrderByChild, OrderByKey, OrderByValue, Sorter};

/// Something that shapes a query: on the wire through the URI, and locally
/// through the returned value.
pub trait QueryModifier {
    /// Returns `uri` with this modifier's query parameter appended.
    ///
    /// Parameters are appended, never replaced, so applying several modifiers
    /// keeps every one of them in call order.
    fn modify_uri(&self, uri: Url) -> Url;

    fn modify_value(&self, value: Value) -> Value {
        value
    }
}

/// Appends `key=value` to the query string, keeping parameters already present
/// (including ones with the same name).
pub fn append_query_param(mut uri: Url, key: &str, value: &str) -> Url {
    uri.query_pairs_mut().append_pair(key, value);
    uri
}

/// Applies each modifier's URI change in order.
pub fn apply_to_uri<'m, I>(uri: Url, modifiers: I) -> Url
where
    I: IntoIterator<Item = &'m dyn QueryModifier>,
{
    modifiers
        .into_iter()
        .fold(uri, |uri, modifier| modifier.modify_uri(uri))
}

// Connection problems, a missing database and denied access keep their own
// variants. Anything else the server rejects is reported as an unsupported query.
fn query_error(error: DatabaseError) -> DatabaseError {
    match error {
        DatabaseError::Request(e) => {
            DatabaseError::ApiConnectionFailed(reqwest_middleware::Error::Reqwest(e))
        }
        e @ (DatabaseError::DatabaseNotFound(_)
        | DatabaseError::PermissionDenied(_)
        | DatabaseError::ApiConnectionFailed(_)) => e,
        e => DatabaseError::UnsupportedQuery(e.to_string()),
    }
}

/// A sorted and filtered view on a database location.
///
/// Queries are immutable: every builder method returns a new query.
#[derive(Debug, Clone)]
pub struct Query<'a> {
    reference: Reference<'a>,
    sorter: Option<Sorter>,
    filters: Vec<Filter>,
}

impl<'a> Query<'a> {
    pub(crate) fn new(reference: Reference<'a>) -> Self {
        Self {
            reference,
            sorter: None,
            filters: Vec::new(),
        }
    }

    /// The location this query reads from.
    pub fn reference(&self) -> &Reference<'a> {
        &self.reference
    }

    pub fn sorter(&self) -> Option<&Sorter> {
        self.sorter.as_ref()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Orders by the value found at `child_key`, a `/`-delimited path inside each child.
    ///
    /// A query can be ordered only once.
    pub fn order_by_child(self, child_key: impl Into<String>) -> Result<Self, DatabaseError> {
        self.with_sorter(Sorter::Child(OrderByChild::new(child_key)))
    }

    pub fn order_by_key(self) -> Result<Self, DatabaseError> {
        self.with_sorter(Sorter::Key(OrderByKey))
    }

    pub fn order_by_value(self, direction: Direction) -> Result<Self, DatabaseError> {
        self.with_sorter(Sorter::Value(OrderByValue::new(direction)))
    }

    pub fn limit_to_first(self, limit: u32) -> Result<Self, DatabaseError> {
        Ok(self.with_filter(Filter::LimitToFirst(LimitToFirst::new(limit)?)))
    }

    pub fn limit_to_last(self, limit: u32) -> Result<Self, DatabaseError> {
        Ok(self.with_filter(Filter::LimitToLast(LimitToLast::new(limit)?)))
    }

    /// Inclusive starting point.
    pub fn start_at(self, value: impl Into<Value>) -> Result<Self, DatabaseError> {
        Ok(self.with_filter(Filter::StartAt(StartAt::new(value)?)))
    }

    /// Exclusive starting point.
    pub fn start_after(self, value: impl Into<Value>) -> Result<Self, DatabaseError> {
        Ok(self.with_filter(Filter::StartAfter(StartAfter::new(value)?)))
    }

    /// Inclusive ending point.
    pub fn end_at(self, value: impl Into<Value>) -> Result<Self, DatabaseError> {
        Ok(self.with_filter(Filter::EndAt(EndAt::new(value)?)))
    }

    /// Exclusive ending point.
    pub fn end_before(self, value: impl Into<Value>) -> Result<Self, DatabaseError> {
        Ok(self.with_filter(Filter::EndBefore(EndBefore::new(value)?)))
    }

    pub fn equal_to(self, value: impl Into<Value>) -> Result<Self, DatabaseError> {
        Ok(self.with_filter(Filter::EqualTo(EqualTo::new(value)?)))
    }

    /// Truncates every child of an object to `true`; primitives come back as they are.
    pub fn shallow(self) -> Self {
        self.with_filter(Filter::Shallow(Shallow))
    }

    /// The reference URI with the sorter's and then each filter's parameter appended.
    pub fn uri(&self) -> Url {
        let modifiers = self
            .sorter
            .iter()
            .map(|sorter| sorter as &dyn QueryModifier)
            .chain(self.filters.iter().map(|filter| filter as &dyn QueryModifier));

        apply_to_uri(self.reference.uri(), modifiers)
    }

    /// Fetches the data matching this query.
    ///
    /// Rejections by the server other than a missing database, denied access
    /// or a failed connection are reported as [`DatabaseError::UnsupportedQuery`].
    pub async fn get_value(&self) -> Result<Value, DatabaseError> {
        let value = self
            .reference
            .database()
            .get_url(self.uri())
            .await
            .map_err(query_error)?;

        Ok(self.apply_to_value(value))
    }

    /// The data matching this query, as a snapshot of the queried location.
    pub async fn get_snapshot(&self) -> Result<Snapshot<'a>, DatabaseError> {
        let value = self.get_value().await?;
        Ok(Snapshot::new(self.reference.clone(), value))
    }

    /// Sorts and trims an already fetched value the way the server would.
    pub fn apply_to_value(&self, value: Value) -> Value {
        let value = match &self.sorter {
            Some(sorter) => sorter.modify_value(value),
            None => value,
        };

        self.filters
            .iter()
            .fold(value, |value, filter| filter.modify_value(value))
    }

    fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    fn with_sorter(mut self, sorter: Sorter) -> Result<Self, DatabaseError> {
        if self.sorter.is_some() {
            return Err(DatabaseError::UnsupportedQuery(
                "This query is already ordered.".to_string(),
            ));
        }

        self.sorter = Some(sorter);
        Ok(self)
    }
}
