use http::Extensions;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use reqwest::{header, Request, Response};
use reqwest_middleware::{Middleware, Next};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};
use yup_oauth2::authenticator::Authenticator;
use yup_oauth2::{ServiceAccountAuthenticator, ServiceAccountKey};

// The authenticator type built by ServiceAccountAuthenticator::builder(...).build().await
// with the default hyper-rustls client.
type AuthType = Authenticator<HttpsConnector<HttpConnector>>;

const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/cloud-platform",
    "https://www.googleapis.com/auth/firebase",
    "https://www.googleapis.com/auth/firebase.database",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Attaches a Google OAuth2 access token for the service account to every request.
#[derive(Clone)]
pub struct AuthMiddleware {
    key: ServiceAccountKey,
    authenticator: Arc<OnceCell<AuthType>>,
}

impl AuthMiddleware {
    pub fn new(key: ServiceAccountKey) -> Self {
        Self {
            key,
            authenticator: Arc::new(OnceCell::new()),
        }
    }

    async fn get_token(&self) -> Result<String, anyhow::Error> {
        let auth = self
            .authenticator
            .get_or_try_init(|| async {
                ServiceAccountAuthenticator::builder(self.key.clone())
                    .build()
                    .await
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
            })
            .await?;

        let token = auth.token(SCOPES).await?;

        Ok(token
            .token()
            .ok_or_else(|| anyhow::anyhow!("No token found"))?
            .to_string())
    }
}

#[async_trait::async_trait]
impl Middleware for AuthMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let token = self.get_token().await.map_err(|e| {
            reqwest_middleware::Error::Middleware(anyhow::anyhow!("Failed to get auth token: {}", e))
        })?;

        let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| reqwest_middleware::Error::Middleware(e.into()))?;
        req.headers_mut().insert(header::AUTHORIZATION, value);

        next.run(req, extensions).await
    }
}

/// Makes sure Realtime Database paths end in `.json`, which the REST API requires.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSuffix;

#[async_trait::async_trait]
impl Middleware for JsonSuffix {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let path = format!("/{}", req.url().path().trim_start_matches('/'));

        if !path.ends_with(".json") {
            req.url_mut().set_path(&format!("{}.json", path));
        }

        next.run(req, extensions).await
    }
}

/// Logs each request with its outcome. Query strings are left out since they
/// may carry tokens.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

#[async_trait::async_trait]
impl Middleware for RequestLogger {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let method = req.method().clone();
        let target = format!(
            "{}{}",
            req.url().origin().ascii_serialization(),
            req.url().path()
        );

        let result = next.run(req, extensions).await;

        match &result {
            Ok(response) if response.status().as_u16() >= 400 => {
                warn!(%method, url = %target, status = %response.status(), "request failed");
            }
            Ok(response) => {
                debug!(%method, url = %target, status = %response.status(), "request completed");
            }
            Err(e) => {
                error!(%method, url = %target, error = %e, "request could not be sent");
            }
        }

        result
    }
}
