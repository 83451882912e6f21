//! Integration tests for HttpAuthority
//!
//! These tests run the client against a local wiremock server and check the
//! request shapes, response decoding and timeout behavior.

use std::time::Duration;

use doorlock_core::{CardId, ChangeMarker};
use doorlock_network::{Authority, AuthorityConfig, AuthorityError, Endpoint, HttpAuthority};
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn authority_for(server: &MockServer) -> HttpAuthority {
    HttpAuthority::new(AuthorityConfig {
        base_url: server.uri(),
        api_key: "door-key".to_string(),
        request_timeout: Duration::from_millis(500),
        seen_timeout: Duration::from_millis(200),
    })
    .unwrap()
}

#[tokio::test]
async fn test_fetch_change_marker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "member_count": 312,
            "last_card_change": "2024-05-01T18:22:09.123Z",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let marker = authority_for(&server).fetch_change_marker().await.unwrap();

    assert_eq!(marker, ChangeMarker::new("2024-05-01T18:22:09.123Z"));
}

#[tokio::test]
async fn test_fetch_change_marker_missing_field() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/stats/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"member_count": 312})))
        .mount(&server)
        .await;

    let err = authority_for(&server)
        .fetch_change_marker()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AuthorityError::MissingField {
            field: "last_card_change",
            ..
        }
    ));
}

#[tokio::test]
async fn test_fetch_directory_sends_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/door/"))
        .and(header("Authorization", "Bearer door-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "0000000001": "Ada L.",
            "0000000002": "Grace H.",
        })))
        .expect(1)
        .mount(&server)
        .await;

    let directory = authority_for(&server).fetch_directory().await.unwrap();

    assert_eq!(directory.len(), 2);
    assert_eq!(
        directory.holder(&CardId::new("0000000001").unwrap()),
        Some("Ada L.")
    );
}

#[tokio::test]
async fn test_fetch_directory_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/door/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let err = authority_for(&server).fetch_directory().await.unwrap_err();

    assert!(matches!(
        err,
        AuthorityError::Status {
            endpoint: Endpoint::Door,
            status: 401
        }
    ));
}

#[tokio::test]
async fn test_fetch_directory_invalid_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/door/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = authority_for(&server).fetch_directory().await.unwrap_err();

    assert!(matches!(
        err,
        AuthorityError::Decode {
            endpoint: Endpoint::Door,
            ..
        }
    ));
}

#[tokio::test]
async fn test_mark_seen_posts_card() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/door/0000000001/seen/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    authority_for(&server)
        .mark_seen(&CardId::new("0000000001").unwrap())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_mark_seen_uses_its_own_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/door/0000000001/seen/"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(350)))
        .mount(&server)
        .await;

    // 350ms is within the 500ms request timeout but past the 200ms seen timeout.
    let err = authority_for(&server)
        .mark_seen(&CardId::new("0000000001").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AuthorityError::Timeout {
            endpoint: Endpoint::Seen,
            ..
        }
    ));
}

#[tokio::test]
async fn test_unreachable_authority() {
    let authority = HttpAuthority::new(AuthorityConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        request_timeout: Duration::from_millis(500),
        ..AuthorityConfig::default()
    })
    .unwrap();

    let err = authority.fetch_change_marker().await.unwrap_err();

    assert_eq!(err.endpoint(), Some(Endpoint::Stats));
}
