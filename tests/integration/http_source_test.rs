// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

use serde_json::json;
use versionwatch::domain::models::site::Site;
use versionwatch::domain::models::version::DiffKind;
use versionwatch::domain::repositories::change_source::ChangeSource;
use versionwatch::engines::http_source::HttpChangeSource;
use versionwatch::utils::errors::SourceError;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::support::{listing, TOKEN};

async fn source(server: &MockServer) -> HttpChangeSource {
    HttpChangeSource::new(&format!("{}/api", server.uri()), TOKEN, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn test_listing_follows_next_link_with_bearer_auth() {
    let server = MockServer::start().await;
    let next = format!("{}/api/sites/page/2", server.uri());

    Mock::given(method("GET"))
        .and(path("/api/sites"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            json!([
                { "id": "s1", "name": "EPA - epa.gov", "url": "https://epa.gov" },
                { "id": "s2", "name": "NOAA - noaa.gov", "url": "https://noaa.gov" }
            ]),
            Some(next.clone()),
        )))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/sites/page/2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            json!([{ "id": "s3", "name": "DOE", "url": "https://doe.gov",
                     "last_change_date": "2020-01-02T00:00:00Z" }]),
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let source = source(&server).await;
    let first = source.list_sites(None).await.unwrap();
    assert_eq!(first.records.len(), 2);
    assert_eq!(first.next.as_deref(), Some(next.as_str()));

    let second = source.list_sites(first.next.as_deref()).await.unwrap();
    assert_eq!(second.records[0].id, "s3");
    assert!(second.records[0].last_change_date.is_some());
    assert!(second.next.is_none());
}

#[tokio::test]
async fn test_relative_next_link_resolves_against_base() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sites"))
        .and(query_param("page", "2"))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            json!([{ "id": "s3", "name": "DOE", "url": "https://doe.gov" }]),
            None,
        )))
        .expect(1)
        .mount(&server)
        .await;

    let source = source(&server).await;
    let second = source.list_sites(Some("/api/sites?page=2")).await.unwrap();

    assert_eq!(second.records[0].id, "s3");
    assert!(second.next.is_none());
}

#[tokio::test]
async fn test_pages_carry_site_id_and_hint() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sites/s1/pages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(listing(
            json!([{ "id": "p1", "url": "https://epa.gov/air", "total_versions": 0,
                     "tags": ["site:Air"] }]),
            None,
        )))
        .mount(&server)
        .await;

    let site = Site {
        id: "s1".to_string(),
        name: "EPA - epa.gov".to_string(),
        url: "https://epa.gov".to_string(),
        last_change_date: None,
    };
    let pages = source(&server).await.list_pages(&site, None).await.unwrap();

    assert_eq!(pages.records[0].site_id, "s1");
    assert!(pages.records[0].is_known_empty());
    assert_eq!(pages.records[0].tags, vec!["site:Air"]);
}

#[tokio::test]
async fn test_missing_resources_map_to_gone() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/content/deleted"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/content/purged"))
        .respond_with(ResponseTemplate::new(410))
        .mount(&server)
        .await;

    let source = source(&server).await;
    let deleted = source
        .fetch_content(&format!("{}/content/deleted", server.uri()))
        .await;
    let purged = source
        .fetch_content(&format!("{}/content/purged", server.uri()))
        .await;

    assert!(deleted.unwrap_err().is_gone());
    assert!(purged.unwrap_err().is_gone());
}

#[tokio::test]
async fn test_server_errors_are_retryable_client_errors_are_not() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/content/busy"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/content/forbidden"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let source = source(&server).await;
    let busy = source
        .fetch_content(&format!("{}/content/busy", server.uri()))
        .await
        .unwrap_err();
    let forbidden = source
        .fetch_content(&format!("{}/content/forbidden", server.uri()))
        .await
        .unwrap_err();

    assert!(matches!(busy, SourceError::Status { status: 503, .. }));
    assert!(busy.is_retryable());
    assert!(!forbidden.is_retryable());
}

#[tokio::test]
async fn test_text_diff_requests_text_format() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/diff/v1"))
        .and(query_param("format", "text"))
        .respond_with(ResponseTemplate::new(200).set_body_string("only text"))
        .expect(1)
        .mount(&server)
        .await;

    let body = source(&server)
        .await
        .fetch_diff(&format!("{}/diff/v1", server.uri()), DiffKind::Text)
        .await
        .unwrap();

    assert_eq!(&body[..], b"only text");
}

#[tokio::test]
async fn test_malformed_listing_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/sites"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let result = source(&server).await.list_sites(None).await;

    assert!(matches!(result, Err(SourceError::Decode(_))));
}
