//! Pieces shared by every service client: error payload parsing, the captured
//! response type, the operation failure carrier and the HTTP middleware stack.

pub mod action;
pub mod middleware;
pub mod options;


use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::borrow::Cow;
use thiserror::Error;

pub use action::{ActionFailed, ApiAction, FailureKind};
pub use options::HttpClientOptions;

/// A caller supplied a value that violates a documented constraint.
///
/// Raised before any request leaves the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct InvalidArgument(pub String);

impl InvalidArgument {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Missing or invalid setup. Never retryable.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("the service account key is missing the project_id")]
    ProjectIdMissing,
    #[error("Unexpected database URL format \"{0}\"")]
    InvalidDatabaseUrl(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("unable to build the HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
    #[error("unable to sign the authentication token: {0}")]
    TokenSigning(#[from] jsonwebtoken::errors::Error),
}

#[derive(Debug, Deserialize)]
pub struct FirebaseErrorDetails {
    pub code: Option<u16>,
    pub message: String,
    pub status: Option<String>,
}

/// The two error body shapes Firebase REST APIs answer with.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum FirebaseErrorResponse {
    Detailed { error: FirebaseErrorDetails },
    Plain { error: String },
}

impl FirebaseErrorResponse {
    pub fn message(&self) -> &str {
        match self {
            Self::Detailed { error } => &error.message,
            Self::Plain { error } => error,
        }
    }
}

/// Extracts the error reason from an API error body, if it has one.
pub fn error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<FirebaseErrorResponse>(body)
        .ok()
        .map(|parsed| parsed.message().to_string())
}

/// A response whose body has been read into memory.
///
/// Failures keep one of these so the caller can inspect what the server sent
/// after the underlying `reqwest::Response` is gone.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub async fn from_response(response: reqwest::Response) -> Result<Self, reqwest::Error> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();

        Ok(Self::new(status, headers, body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    /// The error reason from the body, the raw body when it has none.
    pub fn error_reason(&self) -> String {
        error_message(&self.body).unwrap_or_else(|| self.text().into_owned())
    }
}
