//! Firebase Realtime Database module.
//!
//! Data is read and written through [`Reference`]s, which can be narrowed down
//! with sorted and filtered [`Query`]s. Requests are authenticated either with
//! the service account of a [`FirebaseApp`](crate::FirebaseApp) or with one of
//! the query string methods in [`auth`].

pub mod auth;
pub mod query;
pub mod reference;
pub mod rules;
pub mod snapshot;
pub mod transaction;
pub mod url_builder;
pub mod validator;

#[cfg(test)]
mod tests;

use self::auth::{AuthenticationMethod, RequestAuthentication};
use self::query::Query;
use self::reference::Reference;
use self::rules::RuleSet;
use self::transaction::Transaction;
use self::url_builder::UrlBuilder;
use self::validator::validate_path;
use crate::core::middleware::{JsonSuffix, RequestLogger};
use crate::core::{ApiResponse, ConfigurationError, HttpClientOptions, InvalidArgument};
use reqwest::{Method, StatusCode};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use thiserror::Error;
use tracing::debug;
use url::Url;

const RULES_PATH: &str = ".settings/rules";

/// Errors that can occur during Realtime Database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The request never produced a response.
    #[error("Unable to connect to the API: {0}")]
    ApiConnectionFailed(#[from] reqwest_middleware::Error),
    /// The response body could not be read.
    #[error("HTTP Request failed: {0}")]
    Request(#[from] reqwest::Error),
    /// 401 and 403 responses.
    #[error("{0}")]
    PermissionDenied(String),
    /// A write conditioned on an ETag found different data.
    #[error("{0}")]
    PreconditionFailed(String),
    #[error("{0}")]
    DatabaseNotFound(String),
    #[error("{0}")]
    UnsupportedQuery(String),
    #[error("{0} has no children with keys")]
    NoChildren(String),
    /// A conditional read got a successful response without an `ETag` header.
    #[error("The response for {0} did not contain an ETag")]
    MissingETag(String),
    #[error("The reference {0} has not been snapshotted in this transaction")]
    ReferenceHasNotBeenSnapshotted(String),
    /// A write inside a [`Transaction`] was rejected.
    #[error("{message}")]
    TransactionFailed {
        path: String,
        message: String,
        #[source]
        source: Box<DatabaseError>,
    },
    #[error("API error ({status}): {message}")]
    Api { status: StatusCode, message: String },
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

/// Client for interacting with a Realtime Database.
pub struct FirebaseDatabase {
    client: ClientWithMiddleware,
    urls: UrlBuilder,
}

impl FirebaseDatabase {
    /// Creates a client for the database at `database_url`
    /// (`https://<name>.firebaseio.com` or a regional URL) authenticating every
    /// request with `auth`.
    pub fn new(
        database_url: &str,
        auth: impl AuthenticationMethod + 'static,
        options: &HttpClientOptions,
    ) -> Result<Self, DatabaseError> {
        let urls = UrlBuilder::new(database_url)?;

        let client = ClientBuilder::new(options.build_client()?)
            .with(JsonSuffix)
            .with(RequestAuthentication::new(auth))
            .with(RequestLogger)
            .build();

        Ok(Self::with_client(client, urls))
    }

    /// Uses an already configured client. The client is expected to add the
    /// `.json` suffix ([`JsonSuffix`]) and any authentication itself.
    pub fn with_client(client: ClientWithMiddleware, urls: UrlBuilder) -> Self {
        Self { client, urls }
    }

    /// A reference to the location at `path`, `""` or `"/"` for the root.
    pub fn reference(&self, path: &str) -> Result<Reference<'_>, DatabaseError> {
        Reference::new(self, path)
    }

    pub fn root(&self) -> Reference<'_> {
        Reference::root_of(self)
    }

    /// Starts a query on the location at `path`.
    pub fn query(&self, path: &str) -> Result<Query<'_>, DatabaseError> {
        Ok(self.reference(path)?.query())
    }

    /// Runs `operation` with a fresh [`Transaction`] and returns its result.
    ///
    /// ```rust,no_run
    /// # async fn run(db: firebase_rest_sdk::database::FirebaseDatabase) -> Result<(), firebase_rest_sdk::database::DatabaseError> {
    /// let counter = db.reference("counter")?;
    ///
    /// db.run_transaction(|mut transaction| async move {
    ///     let current = transaction.snapshot(&counter).await?;
    ///     let next = current.value().as_i64().unwrap_or(0) + 1;
    ///     transaction.set(&counter, &next).await
    /// })
    /// .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn run_transaction<'a, F, Fut, T>(&'a self, operation: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(Transaction<'a>) -> Fut,
        Fut: Future<Output = Result<T, DatabaseError>>,
    {
        operation(Transaction::new(self)).await
    }

    pub(crate) fn url(&self, path: &str) -> Url {
        self.urls.url(path)
    }

    pub async fn get(&self, path: &str) -> Result<Value, DatabaseError> {
        let url = self.checked_url(path)?;
        self.get_url(url).await
    }

    pub(crate) async fn get_url(&self, url: Url) -> Result<Value, DatabaseError> {
        debug!(path = url.path(), "reading value");

        let response = self.send(self.client.request(Method::GET, url.clone()), &url).await?;
        Ok(response.json()?)
    }

    /// Returns the value and its ETag.
    pub async fn get_with_etag(&self, path: &str) -> Result<(Value, String), DatabaseError> {
        let url = self.checked_url(path)?;
        let request = self
            .client
            .request(Method::GET, url.clone())
            .header("X-Firebase-ETag", "true");

        let response = self.send(request, &url).await?;
        let etag = response
            .header("ETag")
            .ok_or_else(|| DatabaseError::MissingETag(url.path().to_string()))?
            .to_string();

        Ok((response.json()?, etag))
    }

    /// Writes `value` to `path`, replacing whatever is there, and returns the
    /// written data.
    pub async fn set<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> Result<Value, DatabaseError> {
        let url = self.checked_url(path)?;
        debug!(path, "writing value");

        let response = self
            .send(self.client.request(Method::PUT, url.clone()).json(value), &url)
            .await?;

        Ok(response.json()?)
    }

    /// Like [`FirebaseDatabase::set`], but fails with
    /// [`DatabaseError::PreconditionFailed`] when the stored ETag differs.
    pub async fn set_with_etag<T: Serialize + ?Sized>(
        &self,
        path: &str,
        value: &T,
        etag: &str,
    ) -> Result<Value, DatabaseError> {
        let url = self.checked_url(path)?;
        let request = self
            .client
            .request(Method::PUT, url.clone())
            .header("if-match", etag)
            .json(value);

        let response = self.send(request, &url).await?;
        Ok(response.json()?)
    }

    /// Stores `value` under a new child of `path` and returns the generated key.
    pub async fn push<T: Serialize + ?Sized>(&self, path: &str, value: &T) -> Result<String, DatabaseError> {
        let url = self.checked_url(path)?;
        let response = self
            .send(self.client.request(Method::POST, url.clone()).json(value), &url)
            .await?;

        let pushed: PushResponse = response.json()?;
        debug!(path, key = %pushed.name, "pushed value");

        Ok(pushed.name)
    }

    pub async fn update(&self, path: &str, values: &Map<String, Value>) -> Result<(), DatabaseError> {
        let url = self.checked_url(path)?;
        self.send(self.client.request(Method::PATCH, url.clone()).json(values), &url)
            .await?;

        Ok(())
    }

    pub async fn remove(&self, path: &str) -> Result<(), DatabaseError> {
        let url = self.checked_url(path)?;
        debug!(path, "removing value");

        self.send(self.client.request(Method::DELETE, url.clone()), &url)
            .await?;

        Ok(())
    }

    pub async fn remove_with_etag(&self, path: &str, etag: &str) -> Result<(), DatabaseError> {
        let url = self.checked_url(path)?;
        let request = self
            .client
            .request(Method::DELETE, url.clone())
            .header("if-match", etag);

        self.send(request, &url).await?;
        Ok(())
    }

    pub async fn get_rules(&self) -> Result<RuleSet, DatabaseError> {
        let value = self.get(RULES_PATH).await?;
        Ok(RuleSet::from_value(value))
    }

    pub async fn update_rules(&self, rules: &RuleSet) -> Result<(), DatabaseError> {
        self.set(RULES_PATH, rules.rules()).await?;
        Ok(())
    }

    fn checked_url(&self, path: &str) -> Result<Url, DatabaseError> {
        validate_path(path)?;
        Ok(self.urls.url(path))
    }

    async fn send(&self, request: RequestBuilder, url: &Url) -> Result<ApiResponse, DatabaseError> {
        let response = request.send().await?;
        let response = ApiResponse::from_response(response).await?;

        if response.status().is_success() {
            return Ok(response);
        }

        let message = response.error_reason();

        Err(match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DatabaseError::PermissionDenied(message),
            StatusCode::PRECONDITION_FAILED => DatabaseError::PreconditionFailed(message),
            StatusCode::NOT_FOUND => database_not_found(url),
            status => DatabaseError::Api { status, message },
        })
    }
}

impl fmt::Debug for FirebaseDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirebaseDatabase")
            .field("urls", &self.urls)
            .finish_non_exhaustive()
    }
}

fn database_not_found(url: &Url) -> DatabaseError {
    let host = url.host_str().unwrap_or_default();
    let database_uri = format!("{}://{}", url.scheme(), host);

    let name = host.split('.').next().unwrap_or_default();
    let suggested_uri = database_uri.replacen(name, &format!("{}-default-rtdb", name), 1);

    DatabaseError::DatabaseNotFound(format!(
        "The database at {} could not be found. You can find the correct name at \
         https://console.firebase.google.com/project/_/database. Realtime Databases \
         created since September 2020 carry a '-default-rtdb' suffix, so the name \
         is most likely {}",
        database_uri, suggested_uri
    ))
}
