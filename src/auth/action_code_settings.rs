use crate::core::InvalidArgument;
use serde::Serialize;
use serde_json::{Map, Value};
use url::Url;

/// Where the user lands after following an action link, and which app may
/// handle it.
///
/// See <https://firebase.google.com/docs/auth/admin/email-action-links#action_code_settings>.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionCodeSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    continue_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    can_handle_code_in_app: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dynamic_link_domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    android_package_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    android_minimum_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    android_install_app: Option<bool>,
    #[serde(rename = "iOSBundleId", skip_serializing_if = "Option::is_none")]
    ios_bundle_id: Option<String>,
}

impl ActionCodeSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds settings from loosely typed key/value pairs.
    ///
    /// Keys are matched case-insensitively, `url` is accepted for
    /// `continueUrl`, and null values are skipped.
    pub fn from_map(settings: &Map<String, Value>) -> Result<Self, InvalidArgument> {
        let mut result = Self::default();

        for (key, value) in settings {
            if value.is_null() {
                continue;
            }

            match key.to_lowercase().as_str() {
                "continueurl" | "url" => {
                    result.continue_url = Some(parse_url(key, value)?);
                }
                "handlecodeinapp" | "canhandlecodeinapp" => {
                    result.can_handle_code_in_app = Some(boolean(key, value)?);
                }
                "dynamiclinkdomain" => {
                    result.dynamic_link_domain = Some(parse_url(key, value)?);
                }
                "androidpackagename" => {
                    result.android_package_name = Some(string(key, value)?);
                }
                "androidminimumversion" => {
                    result.android_minimum_version = Some(string(key, value)?);
                }
                "androidinstallapp" => {
                    result.android_install_app = Some(boolean(key, value)?);
                }
                "iosbundleid" => {
                    result.ios_bundle_id = Some(string(key, value)?);
                }
                _ => {
                    return Err(InvalidArgument::new(format!(
                        "Unsupported action code setting '{}'",
                        key
                    )))
                }
            }
        }

        Ok(result)
    }

    pub fn with_continue_url(&self, url: &str) -> Result<Self, InvalidArgument> {
        Ok(Self {
            continue_url: Some(checked_url("continueUrl", url)?),
            ..self.clone()
        })
    }

    pub fn with_handle_code_in_app(&self, value: bool) -> Self {
        Self {
            can_handle_code_in_app: Some(value),
            ..self.clone()
        }
    }

    pub fn with_dynamic_link_domain(&self, domain: &str) -> Result<Self, InvalidArgument> {
        Ok(Self {
            dynamic_link_domain: Some(checked_url("dynamicLinkDomain", domain)?),
            ..self.clone()
        })
    }

    /// `minimum_version` and `install_app` only apply together with a package name.
    pub fn with_android_package(
        &self,
        package_name: impl Into<String>,
        minimum_version: Option<String>,
        install_app: Option<bool>,
    ) -> Self {
        Self {
            android_package_name: Some(package_name.into()),
            android_minimum_version: minimum_version,
            android_install_app: install_app,
            ..self.clone()
        }
    }

    pub fn with_ios_bundle_id(&self, bundle_id: impl Into<String>) -> Self {
        Self {
            ios_bundle_id: Some(bundle_id.into()),
            ..self.clone()
        }
    }

    pub fn continue_url(&self) -> Option<&str> {
        self.continue_url.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// The settings under their REST field names; unset fields are left out.
    pub fn to_map(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn checked_url(key: &str, value: &str) -> Result<String, InvalidArgument> {
    Url::parse(value)
        .map(|_| value.to_string())
        .map_err(|e| InvalidArgument::new(format!("Invalid URL for '{}': {}", key, e)))
}

fn parse_url(key: &str, value: &Value) -> Result<String, InvalidArgument> {
    checked_url(key, &string(key, value)?)
}

fn string(key: &str, value: &Value) -> Result<String, InvalidArgument> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        _ => Err(InvalidArgument::new(format!(
            "The action code setting '{}' must be a string",
            key
        ))),
    }
}

fn boolean(key: &str, value: &Value) -> Result<bool, InvalidArgument> {
    value.as_bool().ok_or_else(|| {
        InvalidArgument::new(format!(
            "The action code setting '{}' must be a boolean",
            key
        ))
    })
}
