use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// How the path of a short link is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SuffixOption {
    /// A 17 character path, hard to guess.
    #[default]
    Unguessable,
    /// A path as short as the link stays unique, at least 4 characters.
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Suffix {
    pub option: SuffixOption,
}

/// Parameters of the Dynamic Link to create.
///
/// See <https://firebase.google.com/docs/reference/dynamic-links/link-shortener#parameters>.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicLinkInfo {
    /// The deep link the Dynamic Link opens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,

    /// The Dynamic Links URL prefix, e.g. `https://example.page.link`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain_uri_prefix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub analytics_info: Option<AnalyticsInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub android_info: Option<AndroidInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios_info: Option<IosInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub navigation_info: Option<NavigationInfo>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_meta_tag_info: Option<SocialMetaTagInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub google_play_analytics: Option<GooglePlayAnalytics>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub itunes_connect_analytics: Option<ItunesConnectAnalytics>,
}

/// UTM parameters passed on to the Play Store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GooglePlayAnalytics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_medium: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_campaign: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_term: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub utm_content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gclid: Option<String>,
}

/// Analytics parameters passed on to the App Store.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItunesConnectAnalytics {
    /// Affiliate token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub at: Option<String>,
    /// Campaign token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ct: Option<String>,
    /// Media type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mt: Option<String>,
    /// Provider token.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pt: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AndroidInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android_package_name: Option<String>,
    /// Opened instead of the Play Store when the app is not installed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android_fallback_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub android_min_package_version_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IosInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios_bundle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios_fallback_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios_custom_scheme: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios_ipad_fallback_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios_ipad_bundle_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ios_app_store_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationInfo {
    /// Skips the app preview page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_forced_redirect: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialMetaTagInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_image_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkWarning {
    #[serde(default)]
    pub warning_code: String,
    #[serde(default)]
    pub warning_message: String,
}

/// A short Dynamic Link as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicLink {
    pub short_link: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_link: Option<String>,

    #[serde(default, rename = "warning", skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<LinkWarning>,
}

impl DynamicLink {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Scheme and host of the short link, e.g. `https://example.page.link`.
    pub fn domain(&self) -> Option<String> {
        let url = Url::parse(&self.short_link).ok()?;
        Some(format!("{}://{}", url.scheme(), url.host_str()?))
    }

    /// The generated path of the short link, without slashes.
    pub fn suffix(&self) -> Option<String> {
        let url = Url::parse(&self.short_link).ok()?;
        Some(url.path().trim_matches('/').to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    Android,
    Desktop,
    Ios,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    /// Any click on a Dynamic Link, however it is handled.
    Click,
    /// Redirects to an app store or to another destination.
    Redirect,
    /// Actual installs, reported by the Play Store only.
    AppInstall,
    AppFirstOpen,
    AppReOpen,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkEvent {
    pub platform: Platform,
    pub event: EventType,
    /// The API reports counts as strings.
    #[serde(with = "count")]
    pub count: u64,
}

/// Link events that can be narrowed down by platform and type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EventStatistics {
    events: Vec<LinkEvent>,
}

impl EventStatistics {
    pub fn new(events: Vec<LinkEvent>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[LinkEvent] {
        &self.events
    }

    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&LinkEvent) -> bool,
    {
        Self {
            events: self.events.iter().filter(|e| predicate(e)).cloned().collect(),
        }
    }

    pub fn filter_by_platform(&self, platform: Platform) -> Self {
        self.filter(|e| e.platform == platform)
    }

    pub fn filter_by_type(&self, event: EventType) -> Self {
        self.filter(|e| e.event == event)
    }

    pub fn on_android(&self) -> Self {
        self.filter_by_platform(Platform::Android)
    }

    pub fn on_desktop(&self) -> Self {
        self.filter_by_platform(Platform::Desktop)
    }

    pub fn on_ios(&self) -> Self {
        self.filter_by_platform(Platform::Ios)
    }

    pub fn clicks(&self) -> Self {
        self.filter_by_type(EventType::Click)
    }

    pub fn redirects(&self) -> Self {
        self.filter_by_type(EventType::Redirect)
    }

    pub fn app_installs(&self) -> Self {
        self.filter_by_type(EventType::AppInstall)
    }

    pub fn app_first_opens(&self) -> Self {
        self.filter_by_type(EventType::AppFirstOpen)
    }

    pub fn app_re_opens(&self) -> Self {
        self.filter_by_type(EventType::AppReOpen)
    }

    /// Sum of the counts of all events.
    pub fn count(&self) -> u64 {
        self.events.iter().map(|e| e.count).sum()
    }
}

/// Statistics of a Dynamic Link, as returned by `linkStats`.
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicLinkStatistics {
    events: EventStatistics,
    raw: Value,
}

impl DynamicLinkStatistics {
    pub fn from_value(raw: Value) -> Result<Self, serde_json::Error> {
        let events: Vec<LinkEvent> = match raw.get("linkEventStats") {
            Some(stats) => serde_json::from_value(stats.clone())?,
            None => Vec::new(),
        };

        Ok(Self {
            events: EventStatistics::new(events),
            raw,
        })
    }

    pub fn event_statistics(&self) -> &EventStatistics {
        &self.events
    }

    /// The response as sent by the API.
    pub fn raw_data(&self) -> &Value {
        &self.raw
    }
}

mod count {
    use serde::de::{self, Deserializer};
    use serde::{Deserialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(u64),
    }

    pub fn serialize<S: Serializer>(count: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&count.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        match StringOrNumber::deserialize(deserializer)? {
            StringOrNumber::String(s) => s.parse().map_err(de::Error::custom),
            StringOrNumber::Number(n) => Ok(n),
        }
    }
}
