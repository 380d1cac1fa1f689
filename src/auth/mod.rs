//! Firebase Authentication module.
//!
//! Generates and sends email action links (password reset, email verification
//! and email sign-in) through the Identity Toolkit API.

pub mod action_code_settings;
pub mod action_link;


use self::action_code_settings::ActionCodeSettings;
use self::action_link::{
    ActionLinkType, CreateActionLink, FailedToCreateActionLink, FailedToSendActionLink,
    SendActionLink,
};
use crate::core::action::dispatch;
use crate::core::{ActionFailed, InvalidArgument};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

const IDENTITY_TOOLKIT_API: &str = "https://identitytoolkit.googleapis.com/v1/projects";

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
    #[error(transparent)]
    CreateActionLink(#[from] FailedToCreateActionLink),
    #[error(transparent)]
    SendActionLink(#[from] FailedToSendActionLink),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OobCodeResponse {
    oob_link: Option<String>,
}

#[derive(Clone)]
pub struct FirebaseAuth {
    client: ClientWithMiddleware,
    project_url: String,
}

impl FirebaseAuth {
    pub fn new(client: ClientWithMiddleware, project_id: &str) -> Self {
        Self {
            client,
            project_url: format!("{}/{}", IDENTITY_TOOLKIT_API, project_id),
        }
    }

    /// Sends requests to the Auth emulator at `emulator_host` (`host:port`).
    pub fn new_with_emulator(client: ClientWithMiddleware, emulator_host: &str, project_id: &str) -> Self {
        Self {
            client,
            project_url: format!(
                "http://{}/identitytoolkit.googleapis.com/v1/projects/{}",
                emulator_host, project_id
            ),
        }
    }

    #[cfg(test)]
    pub(crate) fn new_with_client(client: ClientWithMiddleware, project_url: String) -> Self {
        Self { client, project_url }
    }

    /// Returns the action link generated for the action. No email is sent.
    pub async fn create_action_link(&self, action: CreateActionLink) -> Result<String, FailedToCreateActionLink> {
        let request = action.to_request(&self.project_url)?;
        debug!(request_type = action.link_type().as_str(), "creating action link");

        let response = dispatch(&self.client, request, &action).await?;

        let link = match response.json::<OobCodeResponse>() {
            Ok(OobCodeResponse { oob_link: Some(link) }) if !link.is_empty() => link,
            Ok(_) => {
                return Err(ActionFailed::unexpected_response(
                    &action,
                    response,
                    "The response did not contain an action link",
                ))
            }
            Err(e) => {
                let message = format!("Unable to parse the response data: {}", e);
                return Err(ActionFailed::unexpected_response(&action, response, message));
            }
        };

        Ok(link)
    }

    /// Has Firebase email the action link to the user.
    pub async fn send_action_link(&self, action: SendActionLink) -> Result<(), FailedToSendActionLink> {
        let request = action.to_request(&self.project_url)?;
        debug!(request_type = action.link_type().as_str(), "sending action link");

        dispatch(&self.client, request, &action).await?;
        Ok(())
    }

    pub async fn get_email_verification_link(
        &self,
        email: &str,
        settings: Option<ActionCodeSettings>,
        locale: Option<&str>,
    ) -> Result<String, AuthError> {
        self.get_action_link(ActionLinkType::VerifyEmail, email, settings, locale)
            .await
    }

    pub async fn get_password_reset_link(
        &self,
        email: &str,
        settings: Option<ActionCodeSettings>,
        locale: Option<&str>,
    ) -> Result<String, AuthError> {
        self.get_action_link(ActionLinkType::PasswordReset, email, settings, locale)
            .await
    }

    pub async fn get_sign_in_with_email_link(
        &self,
        email: &str,
        settings: Option<ActionCodeSettings>,
        locale: Option<&str>,
    ) -> Result<String, AuthError> {
        self.get_action_link(ActionLinkType::EmailSignIn, email, settings, locale)
            .await
    }

    pub async fn send_email_verification_link(
        &self,
        email: &str,
        settings: Option<ActionCodeSettings>,
        locale: Option<&str>,
    ) -> Result<(), AuthError> {
        self.send_link(ActionLinkType::VerifyEmail, email, settings, locale)
            .await
    }

    pub async fn send_password_reset_link(
        &self,
        email: &str,
        settings: Option<ActionCodeSettings>,
        locale: Option<&str>,
    ) -> Result<(), AuthError> {
        self.send_link(ActionLinkType::PasswordReset, email, settings, locale)
            .await
    }

    pub async fn send_sign_in_with_email_link(
        &self,
        email: &str,
        settings: Option<ActionCodeSettings>,
        locale: Option<&str>,
    ) -> Result<(), AuthError> {
        self.send_link(ActionLinkType::EmailSignIn, email, settings, locale)
            .await
    }

    async fn get_action_link(
        &self,
        link_type: ActionLinkType,
        email: &str,
        settings: Option<ActionCodeSettings>,
        locale: Option<&str>,
    ) -> Result<String, AuthError> {
        let action = new_action(link_type, email, settings, locale)?;
        Ok(self.create_action_link(action).await?)
    }

    async fn send_link(
        &self,
        link_type: ActionLinkType,
        email: &str,
        settings: Option<ActionCodeSettings>,
        locale: Option<&str>,
    ) -> Result<(), AuthError> {
        let action = new_action(link_type, email, settings, locale)?;
        Ok(self.send_action_link(SendActionLink::new(action)).await?)
    }
}

fn new_action(
    link_type: ActionLinkType,
    email: &str,
    settings: Option<ActionCodeSettings>,
    locale: Option<&str>,
) -> Result<CreateActionLink, InvalidArgument> {
    let mut action = CreateActionLink::new(link_type, email)?;

    if let Some(settings) = settings {
        action = action.with_settings(settings);
    }
    if let Some(locale) = locale {
        action = action.with_locale(locale);
    }

    Ok(action)
}
