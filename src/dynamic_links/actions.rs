use super::models::{
    AnalyticsInfo, AndroidInfo, DynamicLinkInfo, IosInfo, NavigationInfo, SocialMetaTagInfo,
    Suffix, SuffixOption,
};
use crate::core::action::{json_request, JSON_CONTENT_TYPE};
use crate::core::{error_message, ActionFailed, ApiAction, ApiResponse, InvalidArgument};
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Request, StatusCode};
use serde::Serialize;
use url::Url;

pub type FailedToCreateDynamicLink = ActionFailed<CreateDynamicLink>;
pub type FailedToShortenLongDynamicLink = ActionFailed<ShortenLongDynamicLink>;
pub type FailedToGetStatisticsForDynamicLink = ActionFailed<GetStatisticsForDynamicLink>;

pub const DEFAULT_DURATION_DAYS: u32 = 7;

const MISSING_STATISTICS_PERMISSIONS: &str = "\
Firebase reported missing permissions to access the statistics for the requested \
Dynamic Link. Make sure that the Firebase Dynamic Links API is enabled for your \
project at https://console.cloud.google.com/apis/library/firebasedynamiclinks.googleapis.com \
and that the service account has one of the roles Firebase Admin, \
Firebase Dynamic Links Viewer or Firebase Dynamic Links Admin.";

/// Creates a short link from link parameters.
///
/// Always serializes to an object holding `dynamicLinkInfo` and `suffix`, even
/// when no parameter is set.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDynamicLink {
    dynamic_link_info: DynamicLinkInfo,
    suffix: Suffix,
}

impl CreateDynamicLink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_url(url: &str) -> Result<Self, InvalidArgument> {
        let mut action = Self::default();
        action.dynamic_link_info.link = Some(checked_url("link", url)?);
        Ok(action)
    }

    /// The URL prefix the link is created under, e.g. `https://example.page.link`.
    pub fn with_dynamic_link_domain(mut self, domain: &str) -> Result<Self, InvalidArgument> {
        self.dynamic_link_info.domain_uri_prefix = Some(checked_url("domainUriPrefix", domain)?);
        Ok(self)
    }

    pub fn has_dynamic_link_domain(&self) -> bool {
        self.dynamic_link_info
            .domain_uri_prefix
            .as_deref()
            .is_some_and(|domain| !domain.is_empty())
    }

    pub fn with_analytics_info(mut self, info: AnalyticsInfo) -> Self {
        self.dynamic_link_info.analytics_info = Some(info);
        self
    }

    pub fn with_android_info(mut self, info: AndroidInfo) -> Self {
        self.dynamic_link_info.android_info = Some(info);
        self
    }

    pub fn with_ios_info(mut self, info: IosInfo) -> Self {
        self.dynamic_link_info.ios_info = Some(info);
        self
    }

    pub fn with_navigation_info(mut self, info: NavigationInfo) -> Self {
        self.dynamic_link_info.navigation_info = Some(info);
        self
    }

    pub fn with_social_meta_tag_info(mut self, info: SocialMetaTagInfo) -> Self {
        self.dynamic_link_info.social_meta_tag_info = Some(info);
        self
    }

    pub fn with_unguessable_suffix(mut self) -> Self {
        self.suffix.option = SuffixOption::Unguessable;
        self
    }

    pub fn with_short_suffix(mut self) -> Self {
        self.suffix.option = SuffixOption::Short;
        self
    }

    pub fn dynamic_link_info(&self) -> &DynamicLinkInfo {
        &self.dynamic_link_info
    }

    pub fn suffix_option(&self) -> SuffixOption {
        self.suffix.option
    }

    pub fn to_request(&self, api_url: &str) -> Result<Request, FailedToCreateDynamicLink> {
        let url = short_links_url(api_url).map_err(|e| ActionFailed::invalid_request(self, e))?;

        json_request(Method::POST, url, self).map_err(|e| ActionFailed::invalid_request(self, e.to_string()))
    }
}

impl ApiAction for CreateDynamicLink {
    const FAILURE_MESSAGE: &'static str = "Failed to create dynamic link";
}

/// Shortens a long Dynamic Link, e.g. `https://example.page.link/?link=https://example.com`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortenLongDynamicLink {
    long_dynamic_link: String,
    suffix: Suffix,
}

impl ShortenLongDynamicLink {
    pub fn new(long_dynamic_link: &str) -> Result<Self, InvalidArgument> {
        Ok(Self {
            long_dynamic_link: checked_url("longDynamicLink", long_dynamic_link)?,
            suffix: Suffix::default(),
        })
    }

    pub fn with_unguessable_suffix(mut self) -> Self {
        self.suffix.option = SuffixOption::Unguessable;
        self
    }

    pub fn with_short_suffix(mut self) -> Self {
        self.suffix.option = SuffixOption::Short;
        self
    }

    pub fn long_dynamic_link(&self) -> &str {
        &self.long_dynamic_link
    }

    pub fn suffix_option(&self) -> SuffixOption {
        self.suffix.option
    }

    pub fn to_request(&self, api_url: &str) -> Result<Request, FailedToShortenLongDynamicLink> {
        let url = short_links_url(api_url).map_err(|e| ActionFailed::invalid_request(self, e))?;

        json_request(Method::POST, url, self).map_err(|e| ActionFailed::invalid_request(self, e.to_string()))
    }
}

impl ApiAction for ShortenLongDynamicLink {
    const FAILURE_MESSAGE: &'static str = "Failed to shorten long dynamic link";
}

/// Reads the click and install statistics of a short link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetStatisticsForDynamicLink {
    dynamic_link: String,
    duration_days: u32,
}

impl GetStatisticsForDynamicLink {
    pub fn new(dynamic_link: impl Into<String>) -> Self {
        Self {
            dynamic_link: dynamic_link.into(),
            duration_days: DEFAULT_DURATION_DAYS,
        }
    }

    pub fn with_duration_days(self, duration_days: u32) -> Self {
        Self { duration_days, ..self }
    }

    pub fn dynamic_link(&self) -> &str {
        &self.dynamic_link
    }

    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }

    /// `GET {api_url}/{encoded link}/linkStats?durationDays={n}`
    pub fn to_request(&self, api_url: &str) -> Result<Request, FailedToGetStatisticsForDynamicLink> {
        let url = format!(
            "{}/{}/linkStats",
            api_url.trim_end_matches('/'),
            urlencoding::encode(&self.dynamic_link)
        );
        let mut url = Url::parse(&url)
            .map_err(|e| ActionFailed::invalid_request(self, format!("Invalid statistics URL '{}': {}", url, e)))?;
        url.query_pairs_mut()
            .append_pair("durationDays", &self.duration_days.to_string());

        let mut request = Request::new(Method::GET, url);
        request
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));

        Ok(request)
    }
}

impl ApiAction for GetStatisticsForDynamicLink {
    const FAILURE_MESSAGE: &'static str = "Failed to get statistics for Dynamic Link";

    fn failure_message(response: &ApiResponse) -> String {
        if response.status() == StatusCode::FORBIDDEN {
            return MISSING_STATISTICS_PERMISSIONS.to_string();
        }

        error_message(response.body()).unwrap_or_else(|| Self::FAILURE_MESSAGE.to_string())
    }
}

fn short_links_url(api_url: &str) -> Result<Url, String> {
    let url = format!("{}/shortLinks", api_url.trim_end_matches('/'));
    Url::parse(&url).map_err(|e| format!("Invalid dynamic links URL '{}': {}", url, e))
}

fn checked_url(key: &str, value: &str) -> Result<String, InvalidArgument> {
    Url::parse(value)
        .map(|_| value.to_string())
        .map_err(|e| InvalidArgument::new(format!("Invalid URL for '{}': {}", key, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{CONTENT_LENGTH, HeaderMap};
    use serde_json::{json, Value};

    const API_URL: &str = "https://firebasedynamiclinks.googleapis.com/v1";

    fn body_of(request: &Request) -> Value {
        let bytes = request.body().and_then(|body| body.as_bytes()).unwrap();
        serde_json::from_slice(bytes).unwrap()
    }

    #[test]
    fn empty_action_serializes_to_object() {
        let request = CreateDynamicLink::new().to_request(API_URL).unwrap();

        assert_eq!(request.url().as_str(), "https://firebasedynamiclinks.googleapis.com/v1/shortLinks");
        assert_eq!(
            body_of(&request),
            json!({"dynamicLinkInfo": {}, "suffix": {"option": "UNGUESSABLE"}})
        );
        assert!(request.headers().contains_key(CONTENT_LENGTH));
    }

    #[test]
    fn create_request_with_all_infos() {
        let action = CreateDynamicLink::for_url("https://example.com/page")
            .unwrap()
            .with_dynamic_link_domain("https://example.page.link")
            .unwrap()
            .with_android_info(AndroidInfo {
                android_package_name: Some("com.example.android".into()),
                ..Default::default()
            })
            .with_navigation_info(NavigationInfo {
                enable_forced_redirect: Some(true),
            })
            .with_short_suffix();

        assert!(action.has_dynamic_link_domain());

        let request = action.to_request(API_URL).unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(
            body_of(&request),
            json!({
                "dynamicLinkInfo": {
                    "link": "https://example.com/page",
                    "domainUriPrefix": "https://example.page.link",
                    "androidInfo": {"androidPackageName": "com.example.android"},
                    "navigationInfo": {"enableForcedRedirect": true}
                },
                "suffix": {"option": "SHORT"}
            })
        );
    }

    #[test]
    fn rejects_invalid_urls() {
        assert!(CreateDynamicLink::for_url("not a url").is_err());
        assert!(CreateDynamicLink::new().with_dynamic_link_domain("").is_err());
        assert!(ShortenLongDynamicLink::new("nope").is_err());
    }

    #[test]
    fn shorten_request() {
        let action = ShortenLongDynamicLink::new("https://example.page.link/?link=https://example.com")
            .unwrap()
            .with_short_suffix();

        let request = action.to_request(API_URL).unwrap();
        assert_eq!(
            body_of(&request),
            json!({
                "longDynamicLink": "https://example.page.link/?link=https://example.com",
                "suffix": {"option": "SHORT"}
            })
        );
    }

    #[test]
    fn statistics_request_encodes_the_link() {
        let action = GetStatisticsForDynamicLink::new("https://example.page.link/abc");
        let request = action.to_request(API_URL).unwrap();

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(
            request.url().as_str(),
            "https://firebasedynamiclinks.googleapis.com/v1/https%3A%2F%2Fexample.page.link%2Fabc/linkStats?durationDays=7"
        );
        assert_eq!(request.headers()[CONTENT_TYPE], JSON_CONTENT_TYPE);
        assert!(request.body().is_none());

        let request = action.with_duration_days(30).to_request(API_URL).unwrap();
        assert_eq!(request.url().query(), Some("durationDays=30"));
    }

    #[test]
    fn statistics_forbidden_message_explains_permissions() {
        let forbidden = ApiResponse::new(StatusCode::FORBIDDEN, HeaderMap::new(), "{}");
        assert!(GetStatisticsForDynamicLink::failure_message(&forbidden).contains("missing permissions"));

        let other = ApiResponse::new(StatusCode::BAD_REQUEST, HeaderMap::new(), "");
        assert_eq!(
            GetStatisticsForDynamicLink::failure_message(&other),
            "Failed to get statistics for Dynamic Link"
        );
    }
}
