use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Security rules of a Realtime Database.
///
/// See <https://firebase.google.com/docs/database/security/quickstart#sample-rules>.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    rules: Value,
}

impl RuleSet {
    /// Wraps `rules` in a top-level `"rules"` key unless it already has one.
    pub fn from_value(rules: Value) -> Self {
        let has_rules_key = rules
            .as_object()
            .map_or(false, |map| map.contains_key("rules"));

        if has_rules_key {
            Self { rules }
        } else {
            Self {
                rules: json!({ "rules": rules }),
            }
        }
    }

    /// Full read and write access for authenticated users.
    pub fn default_rules() -> Self {
        Self::from_value(json!({
            "rules": {
                ".read": "auth != null",
                ".write": "auth != null",
            }
        }))
    }

    /// Anyone can read and write. Meant for prototyping only.
    pub fn public() -> Self {
        Self::from_value(json!({
            "rules": {
                ".read": true,
                ".write": true,
            }
        }))
    }

    /// Only admin access.
    pub fn private() -> Self {
        Self::from_value(json!({
            "rules": {
                ".read": false,
                ".write": false,
            }
        }))
    }

    pub fn rules(&self) -> &Value {
        &self.rules
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::default_rules()
    }
}
