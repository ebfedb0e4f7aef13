//! Integration tests for the API client against a mock service.
//!
//! Every test uses a zero minimum delay and a one-millisecond jitter unit so
//! retries complete immediately.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use archiver_core::api::{CaptureScope, CapturedExchange};
use archiver_core::{ApiError, DownloadOutcome, Endpoint, GroupsClient, Session, SessionCookie};
use serde_json::{Value, json};
use wiremock::matchers::{header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const GROUP: &str = "testgroup";

fn session(server: &MockServer, max_retries: u32) -> Session {
    Session::new(GROUP)
        .with_base_uri(server.uri())
        .with_web_root(server.uri())
        .with_calendar_root(server.uri())
        .with_max_retries(max_retries)
        .with_jitter_unit(Duration::from_millis(1))
        .with_rng_seed(7)
}

fn client(server: &MockServer, max_retries: u32) -> GroupsClient {
    GroupsClient::new(session(server, max_retries)).expect("client builds")
}

fn envelope(data: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "ygData": data, "ygPerms": {} }))
}

fn messages_path() -> String {
    format!("/v1/groups/{GROUP}/messages")
}

// ==================== Classification Tests ====================

#[tokio::test]
async fn test_get_json_unwraps_envelope_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .and(query_param("count", "50"))
        .respond_with(envelope(json!({ "messages": [], "lastRecordId": 12 })))
        .expect(1)
        .mount(&server)
        .await;

    let data = client(&server, 3)
        .get_json(Endpoint::Messages, &[], &[("count", "50".to_string())])
        .await
        .unwrap();

    assert_eq!(data["lastRecordId"], 12);
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    for status in [401u16, 403] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(messages_path()))
            .respond_with(ResponseTemplate::new(status))
            .expect(1)
            .mount(&server)
            .await;

        let err = client(&server, 5)
            .get_json(Endpoint::Messages, &[], &[])
            .await
            .unwrap_err();

        match err {
            ApiError::Unauthorized { status: got, .. } => assert_eq!(got, status),
            other => panic!("Expected Unauthorized, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v1/groups/{GROUP}/messages/9/raw")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 5)
        .get_json(Endpoint::Messages, &["9", "raw"], &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::NotFound { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_redirect_is_not_authenticated_and_not_followed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(307).insert_header("Location", "/login"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server, 5)
        .get_json(Endpoint::Messages, &[], &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::NotAuthenticated { .. }), "got {err:?}");
}

// ==================== Retry Tests ====================

#[tokio::test]
async fn test_server_errors_retried_until_success() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(envelope(json!({ "lastRecordId": 3 })))
        .expect(1)
        .mount(&server)
        .await;

    let data = client(&server, 5)
        .get_json(Endpoint::Messages, &[], &[])
        .await
        .unwrap();

    assert_eq!(data["lastRecordId"], 3);
}

#[tokio::test]
async fn test_persistent_server_error_exhausts_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;

    let err = client(&server, 4)
        .get_json(Endpoint::Messages, &[], &[("count", "10".to_string())])
        .await
        .unwrap_err();

    match err {
        ApiError::RetriesExhausted { uri, attempts, last } => {
            assert_eq!(attempts, 4);
            assert!(uri.contains("count=10"), "uri {uri}");
            assert_eq!(last.uri(), Some(uri.as_str()));
            assert!(
                matches!(*last, ApiError::Recoverable { status: 503, .. }),
                "last was {last:?}"
            );
        }
        other => panic!("Expected RetriesExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn test_placeholder_sized_body_is_retried() {
    let server = MockServer::start().await;
    let placeholder = vec![b'x'; 64];
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(placeholder))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(envelope(json!({ "messages": [{ "messageId": 1 }], "lastRecordId": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let data = client(&server, 3)
        .get_json(Endpoint::Messages, &[], &[])
        .await
        .unwrap();

    assert_eq!(data["messages"][0]["messageId"], 1);
}

#[tokio::test]
async fn test_truncated_json_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ygData": {"messages": [{"messa"#))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(envelope(json!({ "lastRecordId": 8 })))
        .mount(&server)
        .await;

    let data = client(&server, 3)
        .get_json(Endpoint::Messages, &[], &[])
        .await
        .unwrap();

    assert_eq!(data["lastRecordId"], 8);
}

#[tokio::test]
async fn test_missing_data_payload_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ygError": { "errorCode": 1101, "errorMessage": "group is closed for maintenance" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 3)
        .get_json(Endpoint::Messages, &[], &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::MalformedEnvelope { .. }), "got {err:?}");
}

// ==================== Endpoint Tests ====================

#[tokio::test]
async fn test_unknown_endpoint_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = client(&server, 3)
        .get_json_by_name("admin", &[], &[])
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::UnknownEndpoint { .. }), "got {err:?}");
}

#[tokio::test]
async fn test_endpoint_by_name_uses_v2_for_files() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/v2/groups/{GROUP}/files")))
        .and(query_param("sfpath", "/docs"))
        .respond_with(envelope(json!({ "dirEntries": [], "total": 0 })))
        .expect(1)
        .mount(&server)
        .await;

    let data = client(&server, 3)
        .get_json_by_name("files", &[], &[("sfpath", "/docs".to_string())])
        .await
        .unwrap();

    assert_eq!(data["total"], 0);
}

// ==================== Session Tests ====================

#[tokio::test]
async fn test_session_cookies_referer_and_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .and(header_regex("cookie", "T=t-value"))
        .and(header_regex("cookie", "Y=y-value"))
        .and(header("referer", server.uri().as_str()))
        .and(header("user-agent", "Mozilla/5.0 (archiver test)"))
        .respond_with(envelope(json!({ "lastRecordId": 1 })))
        .expect(1)
        .mount(&server)
        .await;

    let session = session(&server, 1)
        .with_cookie(SessionCookie::new("T", "t-value"))
        .with_cookie(SessionCookie::new("Y", "y-value"))
        .with_header("User-Agent", "Mozilla/5.0 (archiver test)");
    let client = GroupsClient::new(session).unwrap();

    let result = client.get_json(Endpoint::Messages, &[], &[]).await;
    assert!(result.is_ok(), "request should carry session: {result:?}");
}

#[test]
fn test_session_cookie_debug_is_redacted() {
    let cookie = SessionCookie::new("T", "secret-token-value");
    let debug = format!("{cookie:?}");
    assert!(!debug.contains("secret-token-value"));
    assert!(debug.contains("REDACTED"));
}

// ==================== Download Tests ====================

#[tokio::test]
async fn test_download_file_writes_body_to_sink() {
    let server = MockServer::start().await;
    let body = b"%PDF-1.4 a small but definitely not placeholder sized attachment body for testing".to_vec();
    Mock::given(method("GET"))
        .and(path("/attachments/report.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let mut sink = Vec::new();
    let outcome = client(&server, 3)
        .download_file(&format!("{}/attachments/report.pdf", server.uri()), &mut sink)
        .await
        .unwrap();

    assert_eq!(outcome, DownloadOutcome::Written(body.len() as u64));
    assert_eq!(sink, body);
}

#[tokio::test]
async fn test_download_follows_asset_redirects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/photo/or.jpg"))
        .respond_with(ResponseTemplate::new(302).insert_header("Location", "/cdn/or.jpg"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/cdn/or.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"JPEG".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let mut sink = Vec::new();
    let outcome = client(&server, 3)
        .download_file(&format!("{}/photo/or.jpg", server.uri()), &mut sink)
        .await
        .unwrap();

    assert_eq!(outcome, DownloadOutcome::Written(4));
    assert_eq!(sink, b"JPEG");
}

#[tokio::test]
async fn test_download_malware_rejection_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/tool.exe"))
        .respond_with(
            ResponseTemplate::new(400)
                .set_body_string("This file has been flagged as malware and cannot be downloaded"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut sink = Vec::new();
    let outcome = client(&server, 5)
        .download_file(&format!("{}/files/tool.exe", server.uri()), &mut sink)
        .await
        .unwrap();

    assert_eq!(outcome, DownloadOutcome::RejectedByOrigin);
    assert!(sink.is_empty(), "nothing should be written for a rejected file");
}

#[tokio::test]
async fn test_download_plain_bad_request_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/broken.bin"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
        .expect(2)
        .mount(&server)
        .await;

    let mut sink = Vec::new();
    let err = client(&server, 2)
        .download_file(&format!("{}/files/broken.bin", server.uri()), &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::RetriesExhausted { attempts: 2, .. }), "got {err:?}");
    assert!(sink.is_empty());
}

// ==================== Capture Tests ====================

#[derive(Debug, Default)]
struct Recorder {
    exchanges: Mutex<Vec<(String, u16, usize)>>,
}

impl CaptureScope for Recorder {
    fn record(&self, exchange: &CapturedExchange<'_>) {
        self.exchanges.lock().unwrap().push((
            exchange.uri.to_string(),
            exchange.status,
            exchange.body.len(),
        ));
    }
}

#[tokio::test]
async fn test_capture_scope_sees_every_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(envelope(json!({ "lastRecordId": 1 })))
        .mount(&server)
        .await;

    let recorder = Arc::new(Recorder::default());
    let client = GroupsClient::with_capture(session(&server, 3), recorder.clone()).unwrap();
    client
        .get_json(Endpoint::Messages, &[], &[("count", "10".to_string())])
        .await
        .unwrap();

    let exchanges = recorder.exchanges.lock().unwrap();
    assert_eq!(exchanges.len(), 2);
    assert_eq!(exchanges[0].1, 502);
    assert_eq!(exchanges[1].1, 200);
    assert!(exchanges[1].0.contains("count=10"), "uri was {}", exchanges[1].0);
    assert!(exchanges[1].2 > 0);
}
