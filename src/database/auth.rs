//! Ways of authenticating Realtime Database REST requests through the query
//! string.
//!
//! Every method puts its token first in the query and replaces a parameter of
//! the same name; all other parameters are kept as they are.

use crate::core::ConfigurationError;
use chrono::{DateTime, Utc};
use http::Extensions;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use reqwest::{Request, Response};
use reqwest_middleware::{Middleware, Next};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use url::Url;

const TOKEN_LIFETIME_SECONDS: i64 = 3600;

/// Cached tokens are re-signed once they are this close to expiring.
const TOKEN_REFRESH_MARGIN_SECONDS: i64 = 300;

/// Source of the current time used when signing tokens.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Rewrites an outgoing request so that it carries credentials.
pub trait AuthenticationMethod: Send + Sync {
    /// Returns the authenticated request. The given request is consumed, so
    /// nobody can keep using the unauthenticated one.
    fn authenticate_request(&self, request: Request) -> Result<Request, ConfigurationError>;
}

/// Returns `url` with `key=value` as its first query parameter, dropping any
/// earlier `key` parameter and keeping the rest in order.
pub fn with_leading_query_param(mut url: Url, key: &str, value: &str) -> Url {
    let others: Vec<(String, String)> = url
        .query_pairs()
        .into_owned()
        .filter(|(name, _)| name != key)
        .collect();

    url.set_query(None);
    url.query_pairs_mut()
        .append_pair(key, value)
        .extend_pairs(others);

    url
}

fn with_auth_param(mut request: Request, key: &str, value: &str) -> Request {
    let url = with_leading_query_param(request.url().clone(), key, value);
    *request.url_mut() = url;
    request
}

#[derive(Serialize)]
struct LegacyClaims<'a> {
    v: u8,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    d: Option<&'a Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    admin: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    debug: Option<bool>,
}

struct SignedToken {
    token: String,
    expires_at: i64,
}

/// Signs HS256 tokens in the format of the legacy Firebase token generator and
/// keeps the last one until it is about to expire.
#[derive(Clone)]
struct LegacyTokenSigner {
    key: EncodingKey,
    data: Option<Map<String, Value>>,
    admin: bool,
    clock: Clock,
    cached: Arc<Mutex<Option<SignedToken>>>,
}

impl LegacyTokenSigner {
    fn new(database_secret: &str, data: Option<Map<String, Value>>, admin: bool) -> Self {
        Self {
            key: EncodingKey::from_secret(database_secret.as_bytes()),
            data,
            admin,
            clock: Arc::new(Utc::now),
            cached: Arc::new(Mutex::new(None)),
        }
    }

    fn with_clock(self, clock: Clock) -> Self {
        Self {
            clock,
            cached: Arc::new(Mutex::new(None)),
            ..self
        }
    }

    fn token(&self) -> Result<String, ConfigurationError> {
        let now = (self.clock)().timestamp();
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(signed) = cached.as_ref() {
            if now + TOKEN_REFRESH_MARGIN_SECONDS < signed.expires_at {
                return Ok(signed.token.clone());
            }
        }

        let signed = self.sign(now)?;
        let token = signed.token.clone();
        *cached = Some(signed);

        Ok(token)
    }

    fn sign(&self, issued_at: i64) -> Result<SignedToken, ConfigurationError> {
        let expires_at = issued_at + TOKEN_LIFETIME_SECONDS;

        let claims = LegacyClaims {
            v: 0,
            iat: issued_at,
            exp: expires_at,
            d: self.data.as_ref(),
            admin: self.admin.then_some(true),
            debug: self.admin.then_some(true),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.key)?;

        Ok(SignedToken { token, expires_at })
    }
}

fn uid_with_claims(uid: &str, claims: Map<String, Value>) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("uid".to_string(), Value::String(uid.to_string()));

    for (key, value) in claims {
        if value.is_null() || key == "uid" {
            continue;
        }
        data.insert(key, value);
    }

    data
}

/// Full admin access, signed with a legacy database secret.
///
/// Tokens are valid for an hour and are re-signed shortly before they expire,
/// so a long-lived client keeps working.
#[derive(Clone)]
pub struct AdminSecretToken {
    signer: LegacyTokenSigner,
}

impl AdminSecretToken {
    pub fn new(database_secret: &str) -> Self {
        Self {
            signer: LegacyTokenSigner::new(database_secret, None, true),
        }
    }

    /// Uses `clock` instead of the system time when signing.
    pub fn with_clock(self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            signer: self.signer.with_clock(Arc::new(clock)),
        }
    }

    /// The token currently sent with requests, signed on first use.
    pub fn token(&self) -> Result<String, ConfigurationError> {
        self.signer.token()
    }
}

impl AuthenticationMethod for AdminSecretToken {
    fn authenticate_request(&self, request: Request) -> Result<Request, ConfigurationError> {
        Ok(with_auth_param(request, "auth", &self.signer.token()?))
    }
}

/// Acts as the given user, with extra claims available to security rules as
/// `auth.<claim>`. Signed with a legacy database secret.
#[derive(Clone)]
pub struct CustomClaimsToken {
    signer: LegacyTokenSigner,
}

impl CustomClaimsToken {
    /// Claims with a null value are left out.
    pub fn new(database_secret: &str, uid: &str, claims: Map<String, Value>) -> Self {
        let data = uid_with_claims(uid, claims);

        Self {
            signer: LegacyTokenSigner::new(database_secret, Some(data), false),
        }
    }

    pub fn with_clock(self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        Self {
            signer: self.signer.with_clock(Arc::new(clock)),
        }
    }

    pub fn token(&self) -> Result<String, ConfigurationError> {
        self.signer.token()
    }
}

impl AuthenticationMethod for CustomClaimsToken {
    fn authenticate_request(&self, request: Request) -> Result<Request, ConfigurationError> {
        Ok(with_auth_param(request, "auth", &self.signer.token()?))
    }
}

/// An ID token issued to a signed-in user, passed on unchanged.
#[derive(Clone)]
pub struct UserIdToken {
    id_token: String,
}

impl UserIdToken {
    pub fn new(id_token: impl Into<String>) -> Self {
        Self {
            id_token: id_token.into(),
        }
    }
}

impl AuthenticationMethod for UserIdToken {
    fn authenticate_request(&self, request: Request) -> Result<Request, ConfigurationError> {
        Ok(with_auth_param(request, "auth", &self.id_token))
    }
}

/// Narrows the privileges of an already authorized (admin) client to those of
/// the given user, through the `auth_variable_override` parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthVariableOverride {
    encoded: String,
}

impl AuthVariableOverride {
    /// Claims with a null value are left out.
    pub fn new(uid: &str, claims: Map<String, Value>) -> Self {
        let encoded = Value::Object(uid_with_claims(uid, claims)).to_string();

        Self { encoded }
    }

    /// The JSON object sent to the server.
    pub fn encoded(&self) -> &str {
        &self.encoded
    }
}

impl AuthenticationMethod for AuthVariableOverride {
    fn authenticate_request(&self, request: Request) -> Result<Request, ConfigurationError> {
        Ok(with_auth_param(request, "auth_variable_override", &self.encoded))
    }
}

macro_rules! redacted_debug {
    ($($name:ident),*) => {
        $(
            impl fmt::Debug for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_struct(stringify!($name)).finish_non_exhaustive()
                }
            }
        )*
    };
}

redacted_debug!(AdminSecretToken, CustomClaimsToken, UserIdToken);

/// Applies an [`AuthenticationMethod`] to every request sent through the client.
#[derive(Clone)]
pub struct RequestAuthentication {
    method: Arc<dyn AuthenticationMethod>,
}

impl RequestAuthentication {
    pub fn new(method: impl AuthenticationMethod + 'static) -> Self {
        Self {
            method: Arc::new(method),
        }
    }
}

#[async_trait::async_trait]
impl Middleware for RequestAuthentication {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let req = self
            .method
            .authenticate_request(req)
            .map_err(|e| reqwest_middleware::Error::Middleware(anyhow::Error::new(e)))?;
        next.run(req, extensions).await
    }
}
