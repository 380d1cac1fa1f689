use super::*;
use crate::core::FailureKind;
use crate::dynamic_links::models::{EventType, Platform};
use httpmock::prelude::*;
use reqwest::{Client, StatusCode};
use reqwest_middleware::ClientBuilder;
use serde_json::json;

fn dynamic_links(server: &MockServer) -> FirebaseDynamicLinks {
    let client = ClientBuilder::new(Client::new()).build();
    FirebaseDynamicLinks::new_with_client(client, server.url("/v1"))
}

#[tokio::test]
async fn test_create_dynamic_link_applies_default_domain() {
    let server = MockServer::start();
    let links = dynamic_links(&server).with_default_domain("https://example.page.link");

    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/v1/shortLinks")
            .header("content-type", "application/json; charset=UTF-8")
            .json_body(json!({
                "dynamicLinkInfo": {
                    "link": "https://example.com/page",
                    "domainUriPrefix": "https://example.page.link"
                },
                "suffix": {"option": "UNGUESSABLE"}
            }));
        then.status(200).json_body(json!({
            "shortLink": "https://example.page.link/WXYZ",
            "previewLink": "https://example.page.link/WXYZ?d=1"
        }));
    });

    let link = links
        .create_unguessable_link("https://example.com/page")
        .await
        .unwrap();

    assert_eq!(link.short_link, "https://example.page.link/WXYZ");
    assert_eq!(link.preview_link.as_deref(), Some("https://example.page.link/WXYZ?d=1"));
    assert_eq!(link.domain().as_deref(), Some("https://example.page.link"));
    assert_eq!(link.suffix().as_deref(), Some("WXYZ"));
    assert!(!link.has_warnings());

    mock.assert();
}

#[tokio::test]
async fn test_explicit_domain_wins_over_default() {
    let server = MockServer::start();
    let links = dynamic_links(&server).with_default_domain("https://default.page.link");

    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/shortLinks").json_body(json!({
            "dynamicLinkInfo": {
                "link": "https://example.com/page",
                "domainUriPrefix": "https://custom.page.link"
            },
            "suffix": {"option": "SHORT"}
        }));
        then.status(200).json_body(json!({
            "shortLink": "https://custom.page.link/ab",
            "warning": [{"warningCode": "UNRECOGNIZED_PARAM", "warningMessage": "unknown"}]
        }));
    });

    let action = CreateDynamicLink::for_url("https://example.com/page")
        .unwrap()
        .with_dynamic_link_domain("https://custom.page.link")
        .unwrap()
        .with_short_suffix();

    let link = links.create_dynamic_link(action).await.unwrap();
    assert!(link.has_warnings());
    assert_eq!(link.warnings[0].warning_code, "UNRECOGNIZED_PARAM");

    mock.assert();
}

#[tokio::test]
async fn test_create_dynamic_link_failure() {
    let server = MockServer::start();
    let links = dynamic_links(&server);

    server.mock(|when, then| {
        when.method(POST).path("/v1/shortLinks");
        then.status(400)
            .json_body(json!({"error": {"code": 400, "message": "Your project has not configured Dynamic Links.", "status": "INVALID_ARGUMENT"}}));
    });

    let action = CreateDynamicLink::for_url("https://example.com").unwrap();
    let err = links.create_dynamic_link(action.clone()).await.unwrap_err();

    assert_eq!(err.message(), "Your project has not configured Dynamic Links.");
    assert_eq!(err.kind(), FailureKind::Http(StatusCode::BAD_REQUEST));
    assert_eq!(err.action(), Some(&action));
}

#[tokio::test]
async fn test_create_short_link_rejects_invalid_url() {
    let server = MockServer::start();
    let links = dynamic_links(&server);

    let err = links.create_short_link("no url").await.unwrap_err();
    assert!(matches!(err, DynamicLinksError::InvalidArgument(_)));
}

#[tokio::test]
async fn test_shorten_long_dynamic_link() {
    let server = MockServer::start();
    let links = dynamic_links(&server);

    let long_link = "https://example.page.link/?link=https://example.com";

    let mock = server.mock(|when, then| {
        when.method(POST).path("/v1/shortLinks").json_body(json!({
            "longDynamicLink": long_link,
            "suffix": {"option": "UNGUESSABLE"}
        }));
        then.status(200)
            .json_body(json!({"shortLink": "https://example.page.link/short"}));
    });

    let link = links
        .shorten_long_dynamic_link(ShortenLongDynamicLink::new(long_link).unwrap())
        .await
        .unwrap();
    assert_eq!(link.short_link, "https://example.page.link/short");

    mock.assert();
}

#[tokio::test]
async fn test_shorten_with_unexpected_body() {
    let server = MockServer::start();
    let links = dynamic_links(&server);

    server.mock(|when, then| {
        when.method(POST);
        then.status(200).json_body(json!({"unexpected": true}));
    });

    let action = ShortenLongDynamicLink::new("https://example.page.link/?link=https://example.com").unwrap();
    let err = links.shorten_long_dynamic_link(action).await.unwrap_err();

    assert_eq!(err.kind(), FailureKind::Parse);
    assert!(err.message().starts_with("Unable to parse the response data"));
}

#[tokio::test]
async fn test_get_statistics() {
    let server = MockServer::start();
    let links = dynamic_links(&server);

    let mock = server.mock(|when, then| {
        when.method(GET)
            .path_includes("/linkStats")
            .query_param("durationDays", "14");
        then.status(200).json_body(json!({
            "linkEventStats": [
                {"platform": "ANDROID", "count": "12", "event": "CLICK"},
                {"platform": "IOS", "count": "3", "event": "CLICK"},
                {"platform": "ANDROID", "count": "4", "event": "APP_INSTALL"},
                {"platform": "DESKTOP", "count": "5", "event": "REDIRECT"}
            ]
        }));
    });

    let action = GetStatisticsForDynamicLink::new("https://example.page.link/abc").with_duration_days(14);
    let stats = links.get_statistics(action).await.unwrap();
    let events = stats.event_statistics();

    assert_eq!(events.count(), 24);
    assert_eq!(events.clicks().count(), 15);
    assert_eq!(events.on_android().count(), 16);
    assert_eq!(events.on_android().clicks().count(), 12);
    assert_eq!(events.app_installs().count(), 4);
    assert_eq!(events.on_desktop().redirects().count(), 5);
    assert_eq!(events.app_re_opens().count(), 0);
    assert_eq!(events.filter_by_platform(Platform::Ios).events()[0].event, EventType::Click);
    assert!(stats.raw_data().get("linkEventStats").is_some());

    mock.assert();
}

#[tokio::test]
async fn test_get_statistics_without_events() {
    let server = MockServer::start();
    let links = dynamic_links(&server);

    server.mock(|when, then| {
        when.method(GET);
        then.status(200).json_body(json!({}));
    });

    let stats = links
        .get_statistics(GetStatisticsForDynamicLink::new("https://example.page.link/abc"))
        .await
        .unwrap();

    assert_eq!(stats.event_statistics().count(), 0);
    assert!(stats.event_statistics().events().is_empty());
}

#[tokio::test]
async fn test_get_statistics_forbidden() {
    let server = MockServer::start();
    let links = dynamic_links(&server);

    server.mock(|when, then| {
        when.method(GET);
        then.status(403).json_body(json!({"error": {"message": "denied"}}));
    });

    let err = links
        .get_statistics(GetStatisticsForDynamicLink::new("https://example.page.link/abc"))
        .await
        .unwrap_err();

    assert!(err.message().contains("missing permissions"));
    assert_eq!(err.status(), Some(StatusCode::FORBIDDEN));
    assert!(err.action().is_some());
}
