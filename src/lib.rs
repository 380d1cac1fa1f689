//! Firebase REST client: Realtime Database with token authentication, Auth
//! email action links and Dynamic Links.

#[cfg(feature = "auth")]
pub mod auth;
pub mod core;
#[cfg(feature = "database")]
pub mod database;
#[cfg(feature = "dynamic_links")]
pub mod dynamic_links;

pub use yup_oauth2;

#[cfg(feature = "auth")]
use auth::FirebaseAuth;
use crate::core::middleware::{AuthMiddleware, JsonSuffix, RequestLogger};
use crate::core::{ConfigurationError, HttpClientOptions};
#[cfg(feature = "database")]
use database::{auth::AuthVariableOverride, auth::RequestAuthentication, url_builder::UrlBuilder};
#[cfg(feature = "database")]
use database::{DatabaseError, FirebaseDatabase};
#[cfg(feature = "dynamic_links")]
use dynamic_links::FirebaseDynamicLinks;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use yup_oauth2::ServiceAccountKey;

/// Entry point holding the service account credentials and transport options
/// shared by every service client it builds.
#[derive(Clone)]
pub struct FirebaseApp {
    key: ServiceAccountKey,
    options: HttpClientOptions,
}

impl FirebaseApp {
    pub fn new(service_account_key: ServiceAccountKey) -> Self {
        Self {
            key: service_account_key,
            options: HttpClientOptions::default(),
        }
    }

    pub fn with_http_client_options(self, options: HttpClientOptions) -> Self {
        Self { options, ..self }
    }

    pub fn http_client_options(&self) -> &HttpClientOptions {
        &self.options
    }

    pub fn project_id(&self) -> Result<&str, ConfigurationError> {
        self.key
            .project_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(ConfigurationError::ProjectIdMissing)
    }

    #[cfg(feature = "auth")]
    pub fn auth(&self) -> Result<FirebaseAuth, ConfigurationError> {
        let project_id = self.project_id()?;
        Ok(FirebaseAuth::new(self.oauth_client()?, project_id))
    }

    /// Dynamic Links client; links created without a domain use `default_domain`.
    #[cfg(feature = "dynamic_links")]
    pub fn dynamic_links(&self, default_domain: Option<&str>) -> Result<FirebaseDynamicLinks, ConfigurationError> {
        let links = FirebaseDynamicLinks::new(self.oauth_client()?);

        Ok(match default_domain {
            Some(domain) => links.with_default_domain(domain),
            None => links,
        })
    }

    /// Realtime Database client authenticated as the service account.
    #[cfg(feature = "database")]
    pub fn database(&self, database_url: &str) -> Result<FirebaseDatabase, DatabaseError> {
        let urls = UrlBuilder::new(database_url)?;

        let client = ClientBuilder::new(self.options.build_client()?)
            .with(JsonSuffix)
            .with(AuthMiddleware::new(self.key.clone()))
            .with(RequestLogger)
            .build();

        Ok(FirebaseDatabase::with_client(client, urls))
    }

    /// Realtime Database client whose security rules see `auth` as described
    /// by `auth_override` instead of the service account's full access.
    #[cfg(feature = "database")]
    pub fn database_with_auth_override(
        &self,
        database_url: &str,
        auth_override: AuthVariableOverride,
    ) -> Result<FirebaseDatabase, DatabaseError> {
        let urls = UrlBuilder::new(database_url)?;

        let client = ClientBuilder::new(self.options.build_client()?)
            .with(JsonSuffix)
            .with(AuthMiddleware::new(self.key.clone()))
            .with(RequestAuthentication::new(auth_override))
            .with(RequestLogger)
            .build();

        Ok(FirebaseDatabase::with_client(client, urls))
    }

    #[cfg(any(feature = "auth", feature = "dynamic_links"))]
    fn oauth_client(&self) -> Result<ClientWithMiddleware, ConfigurationError> {
        Ok(ClientBuilder::new(self.options.build_client()?)
            .with(AuthMiddleware::new(self.key.clone()))
            .with(RequestLogger)
            .build())
    }
}
