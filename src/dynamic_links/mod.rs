//! Firebase Dynamic Links module.
//!
//! Creates and shortens Dynamic Links and reads their statistics through the
//! Firebase Dynamic Links REST API.

pub mod actions;
pub mod models;

#[cfg(test)]
mod tests;

use self::actions::{
    CreateDynamicLink, FailedToCreateDynamicLink, FailedToGetStatisticsForDynamicLink,
    FailedToShortenLongDynamicLink, GetStatisticsForDynamicLink, ShortenLongDynamicLink,
};
use self::models::{DynamicLink, DynamicLinkStatistics};
use crate::core::action::{decode, dispatch};
use crate::core::{ActionFailed, InvalidArgument};
use reqwest_middleware::ClientWithMiddleware;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

const DYNAMIC_LINKS_V1_API: &str = "https://firebasedynamiclinks.googleapis.com/v1";

#[derive(Error, Debug)]
pub enum DynamicLinksError {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
    #[error(transparent)]
    CreateDynamicLink(#[from] FailedToCreateDynamicLink),
}

/// Client for the Firebase Dynamic Links API.
#[derive(Clone)]
pub struct FirebaseDynamicLinks {
    client: ClientWithMiddleware,
    base_url: String,
    default_domain: Option<String>,
}

impl FirebaseDynamicLinks {
    /// Creates a new client. This is typically called via `FirebaseApp::dynamic_links()`.
    pub fn new(client: ClientWithMiddleware) -> Self {
        Self {
            client,
            base_url: DYNAMIC_LINKS_V1_API.to_string(),
            default_domain: None,
        }
    }

    /// Domain URI prefix used for links created without one.
    pub fn with_default_domain(self, domain: impl Into<String>) -> Self {
        Self {
            default_domain: Some(domain.into()),
            ..self
        }
    }

    #[cfg(test)]
    pub(crate) fn new_with_client(client: ClientWithMiddleware, base_url: String) -> Self {
        Self {
            client,
            base_url,
            default_domain: None,
        }
    }

    pub fn default_domain(&self) -> Option<&str> {
        self.default_domain.as_deref()
    }

    /// Creates a short link for `url` with a 17 character suffix.
    pub async fn create_unguessable_link(&self, url: &str) -> Result<DynamicLink, DynamicLinksError> {
        let action = CreateDynamicLink::for_url(url)?.with_unguessable_suffix();
        Ok(self.create_dynamic_link(action).await?)
    }

    /// Creates a short link for `url` with a suffix as short as possible.
    pub async fn create_short_link(&self, url: &str) -> Result<DynamicLink, DynamicLinksError> {
        let action = CreateDynamicLink::for_url(url)?.with_short_suffix();
        Ok(self.create_dynamic_link(action).await?)
    }

    pub async fn create_dynamic_link(&self, action: CreateDynamicLink) -> Result<DynamicLink, FailedToCreateDynamicLink> {
        let action = self.with_default_domain_applied(action)?;
        let request = action.to_request(&self.base_url)?;
        debug!(suffix = ?action.suffix_option(), "creating dynamic link");

        let response = dispatch(&self.client, request, &action).await?;
        decode(&action, response)
    }

    pub async fn shorten_long_dynamic_link(
        &self,
        action: ShortenLongDynamicLink,
    ) -> Result<DynamicLink, FailedToShortenLongDynamicLink> {
        let request = action.to_request(&self.base_url)?;
        debug!(suffix = ?action.suffix_option(), "shortening long dynamic link");

        let response = dispatch(&self.client, request, &action).await?;
        decode(&action, response)
    }

    pub async fn get_statistics(
        &self,
        action: GetStatisticsForDynamicLink,
    ) -> Result<DynamicLinkStatistics, FailedToGetStatisticsForDynamicLink> {
        let request = action.to_request(&self.base_url)?;
        debug!(duration_days = action.duration_days(), "reading dynamic link statistics");

        let response = dispatch(&self.client, request, &action).await?;
        let raw: Value = decode(&action, response.clone())?;

        DynamicLinkStatistics::from_value(raw).map_err(|e| {
            let message = format!("Unable to parse the response data: {}", e);
            ActionFailed::unexpected_response(&action, response, message)
        })
    }

    fn with_default_domain_applied(&self, action: CreateDynamicLink) -> Result<CreateDynamicLink, FailedToCreateDynamicLink> {
        match &self.default_domain {
            Some(domain) if !action.has_dynamic_link_domain() => action
                .clone()
                .with_dynamic_link_domain(domain)
                .map_err(|e| ActionFailed::invalid_request(&action, e.message())),
            _ => Ok(action),
        }
    }
}
