#![allow(clippy::unwrap_used)]
// Integration tests for `SadisClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use olt_sadis::{Error, SadisClient};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, SadisClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = SadisClient::with_client(reqwest::Client::new(), base_url);
    (server, client)
}

// ── Lookup tests ────────────────────────────────────────────────────

#[tokio::test]
async fn test_subscriber_found() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/subscribers/BRCM12345678"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "BRCM12345678",
            "cTag": 999,
            "sTag": 111,
            "nasPortId": "PON 1/1",
            "circuitId": "CIR-PON 1/1",
            "hardwareIdentifier": "aa:bb:cc:dd:ee:ff",
            "upstreamBandwidthProfile": "High-Speed-Internet"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let entry = client.subscriber("BRCM12345678").await.unwrap().unwrap();
    assert_eq!(entry.c_tag, Some(999));
    assert_eq!(entry.s_tag, Some(111));
    assert_eq!(entry.nas_port_id.as_deref(), Some("PON 1/1"));
    assert_eq!(entry.circuit_id.as_deref(), Some("CIR-PON 1/1"));
    assert_eq!(
        entry.upstream_bandwidth_profile.as_deref(),
        Some("High-Speed-Internet")
    );
}

#[tokio::test]
async fn test_subscriber_not_found_is_none() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/subscribers/UNKNOWN"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let entry = client.subscriber("UNKNOWN").await.unwrap();
    assert!(entry.is_none());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/subscribers/BRCM12345678"))
        .respond_with(ResponseTemplate::new(503).set_body_string("cache warming"))
        .mount(&server)
        .await;

    let result = client.subscriber("BRCM12345678").await;
    assert!(
        matches!(
            result,
            Err(Error::Directory { status: 503, ref message }) if message == "cache warming"
        ),
        "expected Directory error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/subscribers/BRCM12345678"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let result = client.subscriber("BRCM12345678").await;
    assert!(
        matches!(result, Err(Error::Deserialization { .. })),
        "expected Deserialization error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_unreachable_directory_is_transport_error() {
    // Port 9 (discard) on localhost is expected to refuse connections.
    let client = SadisClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:9/").unwrap(),
    );

    let err = client.subscriber("BRCM12345678").await.unwrap_err();
    assert!(err.is_transport(), "expected transport error, got: {err:?}");
}
