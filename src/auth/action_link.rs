//! Email action links: password resets, email verification and sign-in links.

use super::action_code_settings::ActionCodeSettings;
use crate::core::action::json_request;
use crate::core::{ActionFailed, ApiAction, InvalidArgument};
use reqwest::header::HeaderValue;
use reqwest::{Method, Request};
use serde_json::{Map, Value};
use url::Url;
use validator::ValidateEmail;

pub type FailedToCreateActionLink = ActionFailed<CreateActionLink>;
pub type FailedToSendActionLink = ActionFailed<SendActionLink>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionLinkType {
    VerifyEmail,
    PasswordReset,
    EmailSignIn,
}

impl ActionLinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VerifyEmail => "VERIFY_EMAIL",
            Self::PasswordReset => "PASSWORD_RESET",
            Self::EmailSignIn => "EMAIL_SIGNIN",
        }
    }
}

/// Asks the API for an action link without sending an email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateActionLink {
    link_type: ActionLinkType,
    email: String,
    settings: ActionCodeSettings,
    tenant_id: Option<String>,
    locale: Option<String>,
}

impl CreateActionLink {
    pub fn new(link_type: ActionLinkType, email: impl Into<String>) -> Result<Self, InvalidArgument> {
        let email = email.into();

        if !email.validate_email() {
            return Err(InvalidArgument::new(format!(
                "The email address '{}' is invalid",
                email
            )));
        }

        Ok(Self {
            link_type,
            email,
            settings: ActionCodeSettings::default(),
            tenant_id: None,
            locale: None,
        })
    }

    pub fn with_settings(self, settings: ActionCodeSettings) -> Self {
        Self { settings, ..self }
    }

    pub fn with_tenant_id(self, tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: Some(tenant_id.into()),
            ..self
        }
    }

    /// Language of the email, sent as `X-Firebase-Locale`.
    pub fn with_locale(self, locale: impl Into<String>) -> Self {
        Self {
            locale: Some(locale.into()),
            ..self
        }
    }

    pub fn link_type(&self) -> ActionLinkType {
        self.link_type
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn settings(&self) -> &ActionCodeSettings {
        &self.settings
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.tenant_id.as_deref()
    }

    pub fn locale(&self) -> Option<&str> {
        self.locale.as_deref()
    }

    /// The `accounts:sendOobCode` request asking for the link to be returned.
    pub fn to_request(&self, project_url: &str) -> Result<Request, FailedToCreateActionLink> {
        let mut body = Map::new();
        body.insert("requestType".into(), self.link_type.as_str().into());
        body.insert("email".into(), self.email.clone().into());
        body.insert("returnOobLink".into(), true.into());
        merge_settings(&mut body, &self.settings);

        let url = oob_code_url(project_url, self.tenant_id())
            .map_err(|e| ActionFailed::invalid_request(self, e))?;

        build_request(url, &body, self.locale())
            .map_err(|message| ActionFailed::invalid_request(self, message))
    }
}

impl ApiAction for CreateActionLink {
    const FAILURE_MESSAGE: &'static str = "Failed to create action link";
}

/// Has Firebase send the action link email itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendActionLink {
    action: CreateActionLink,
    id_token: Option<String>,
}

impl SendActionLink {
    pub fn new(action: CreateActionLink) -> Self {
        Self {
            action,
            id_token: None,
        }
    }

    /// Verification emails are sent on behalf of the user owning the ID token.
    pub fn with_id_token(self, id_token: impl Into<String>) -> Self {
        Self {
            id_token: Some(id_token.into()),
            ..self
        }
    }

    pub fn with_locale(self, locale: impl Into<String>) -> Self {
        Self {
            action: self.action.with_locale(locale),
            ..self
        }
    }

    pub fn link_type(&self) -> ActionLinkType {
        self.action.link_type()
    }

    pub fn email(&self) -> &str {
        self.action.email()
    }

    pub fn settings(&self) -> &ActionCodeSettings {
        self.action.settings()
    }

    pub fn tenant_id(&self) -> Option<&str> {
        self.action.tenant_id()
    }

    pub fn locale(&self) -> Option<&str> {
        self.action.locale()
    }

    pub fn id_token(&self) -> Option<&str> {
        self.id_token.as_deref()
    }

    pub fn to_request(&self, project_url: &str) -> Result<Request, FailedToSendActionLink> {
        let mut body = Map::new();
        body.insert("requestType".into(), self.link_type().as_str().into());
        body.insert("email".into(), self.email().into());
        if let Some(tenant_id) = self.tenant_id() {
            body.insert("tenantId".into(), tenant_id.into());
        }
        merge_settings(&mut body, self.settings());
        if let Some(id_token) = self.id_token() {
            body.insert("idToken".into(), id_token.into());
        }

        let url = oob_code_url(project_url, self.tenant_id())
            .map_err(|e| ActionFailed::invalid_request(self, e))?;

        build_request(url, &body, self.locale())
            .map_err(|message| ActionFailed::invalid_request(self, message))
    }
}

impl ApiAction for SendActionLink {
    const FAILURE_MESSAGE: &'static str = "Failed to send action link";
}

impl From<CreateActionLink> for SendActionLink {
    fn from(action: CreateActionLink) -> Self {
        Self::new(action)
    }
}

// Fields already present take precedence over settings of the same name.
fn merge_settings(body: &mut Map<String, Value>, settings: &ActionCodeSettings) {
    for (key, value) in settings.to_map() {
        body.entry(key).or_insert(value);
    }
}

fn oob_code_url(project_url: &str, tenant_id: Option<&str>) -> Result<Url, String> {
    let project_url = project_url.trim_end_matches('/');

    let url = match tenant_id {
        Some(tenant_id) => format!("{}/tenants/{}/accounts:sendOobCode", project_url, tenant_id),
        None => format!("{}/accounts:sendOobCode", project_url),
    };

    Url::parse(&url).map_err(|e| format!("Invalid action link URL '{}': {}", url, e))
}

fn build_request(url: Url, body: &Map<String, Value>, locale: Option<&str>) -> Result<Request, String> {
    let mut request = json_request(Method::POST, url, body).map_err(|e| e.to_string())?;

    if let Some(locale) = locale {
        let value = HeaderValue::from_str(locale).map_err(|e| format!("Invalid locale '{}': {}", locale, e))?;
        request.headers_mut().insert("x-firebase-locale", value);
    }

    Ok(request)
}
