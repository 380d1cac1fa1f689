//! Dispatching of action requests and the failure type every action shares.

use super::{error_message, ApiResponse};
use reqwest::header::{HeaderValue, CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{Method, Request, StatusCode};
use reqwest_middleware::ClientWithMiddleware;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error as StdError;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// An immutable description of one API operation.
pub trait ApiAction: std::fmt::Debug {
    /// Message used when a failed response carries no readable reason.
    const FAILURE_MESSAGE: &'static str;

    /// The message of the failure raised for a non-200 `response`.
    fn failure_message(response: &ApiResponse) -> String {
        error_message(response.body()).unwrap_or_else(|| Self::FAILURE_MESSAGE.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request could not be built from the action.
    InvalidRequest,
    /// The request never produced a response.
    Transport,
    /// The API answered with a status other than 200.
    Http(StatusCode),
    /// The API answered 200 with a body of an unexpected shape.
    Parse,
}

/// Failure of an action, carrying the action and the response that caused it.
///
/// Nothing in this crate retries; the attached context is there so the caller
/// can decide.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ActionFailed<A> {
    message: String,
    kind: FailureKind,
    action: Option<A>,
    response: Option<ApiResponse>,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl<A: ApiAction + Clone> ActionFailed<A> {
    pub fn invalid_request(action: &A, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::InvalidRequest,
            action: Some(action.clone()),
            response: None,
            source: None,
        }
    }

    pub fn transport<E>(action: &A, error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        Self {
            message: format!("{}: {}", A::FAILURE_MESSAGE, error),
            kind: FailureKind::Transport,
            action: Some(action.clone()),
            response: None,
            source: Some(Box::new(error)),
        }
    }

    /// Builds the failure for a non-200 response. Unless the action says
    /// otherwise, the message is `error.message` from the body when present.
    pub fn with_action_and_response(action: &A, response: ApiResponse) -> Self {
        let message = A::failure_message(&response);

        Self {
            message,
            kind: FailureKind::Http(response.status()),
            action: Some(action.clone()),
            response: Some(response),
            source: None,
        }
    }

    pub fn unexpected_response(action: &A, response: ApiResponse, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: FailureKind::Parse,
            action: Some(action.clone()),
            response: Some(response),
            source: None,
        }
    }

    fn with_source<E>(mut self, error: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(error));
        self
    }
}

impl<A> ActionFailed<A> {
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> FailureKind {
        self.kind
    }

    pub fn action(&self) -> Option<&A> {
        self.action.as_ref()
    }

    pub fn response(&self) -> Option<&ApiResponse> {
        self.response.as_ref()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.response.as_ref().map(ApiResponse::status)
    }
}

/// Sends an action's request and returns the response when the API answered 200.
pub(crate) async fn dispatch<A: ApiAction + Clone>(
    client: &ClientWithMiddleware,
    request: Request,
    action: &A,
) -> Result<ApiResponse, ActionFailed<A>> {
    let response = client
        .execute(request)
        .await
        .map_err(|e| ActionFailed::transport(action, e))?;

    let response = ApiResponse::from_response(response)
        .await
        .map_err(|e| ActionFailed::transport(action, e))?;

    if response.status() != StatusCode::OK {
        warn!(status = %response.status(), "{}", A::FAILURE_MESSAGE);
        return Err(ActionFailed::with_action_and_response(action, response));
    }

    debug!(status = %response.status(), "action request succeeded");
    Ok(response)
}

/// Decodes a 200 response body into the action's success type.
pub(crate) fn decode<A, T>(action: &A, response: ApiResponse) -> Result<T, ActionFailed<A>>
where
    A: ApiAction + Clone,
    T: DeserializeOwned,
{
    match response.json::<T>() {
        Ok(value) => Ok(value),
        Err(e) => {
            let message = format!("Unable to parse the response data: {}", e);
            Err(ActionFailed::unexpected_response(action, response, message).with_source(e))
        }
    }
}

/// A request carrying `body` as JSON, with its content type and length set.
pub(crate) fn json_request<T: Serialize + ?Sized>(
    method: Method,
    url: Url,
    body: &T,
) -> Result<Request, serde_json::Error> {
    let body = serde_json::to_vec(body)?;

    let mut request = Request::new(method, url);
    let headers = request.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    *request.body_mut() = Some(body.into());

    Ok(request)
}
