//! `HttpTransport` against a local one-shot HTTP listener.

use places_anchors::error::TransportError;
use places_anchors::places::{HttpTransport, PlacesTransport, SearchQuery};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Accepts one connection, records the raw request, answers with `status` and `body`.
async fn serve_once(status: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let url = format!("http://{addr}/v1/places:searchText");

    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.expect("accept");
        let mut raw = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await.expect("read");
            if n == 0 {
                break;
            }
            raw.extend_from_slice(&chunk[..n]);
            if request_complete(&raw) {
                break;
            }
        }

        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.expect("write");
        let _ = stream.shutdown().await;
        String::from_utf8(raw).expect("utf8 request")
    });

    (url, handle)
}

fn request_complete(raw: &[u8]) -> bool {
    let Some(end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
        return false;
    };
    let head = String::from_utf8_lossy(&raw[..end]).to_ascii_lowercase();
    let length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    raw.len() >= end + 4 + length
}

/// Direct client; a proxy from the environment must not intercept loopback.
fn transport() -> HttpTransport {
    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("client");
    HttpTransport::from_client(client)
}

fn split_request(raw: &str) -> (String, String) {
    let (head, body) = raw.split_once("\r\n\r\n").expect("header terminator");
    (head.to_ascii_lowercase(), body.to_string())
}

#[tokio::test]
async fn sends_headers_and_json_body() {
    let reply = r#"{"places":[{"displayName":{"text":"Library"},"location":{"latitude":37.7,"longitude":-122.4}}]}"#;
    let (url, server) = serve_once("200 OK", reply).await;

    let query = SearchQuery::new(r#"Joe's "Best" Cafe"#, 37.7793, -122.4193);
    let request = query.to_request(&url, "wire-key");
    let transport = transport();

    let outcome = transport.send(request).await.unwrap();
    assert_eq!(outcome.status, 200);
    assert!(outcome.is_success());
    assert_eq!(outcome.body, reply);

    let (head, body) = split_request(&server.await.unwrap());
    assert!(head.starts_with("post /v1/places:searchtext http/1.1"), "{head}");
    assert!(head.contains("\r\nx-goog-api-key: wire-key"), "{head}");
    assert!(
        head.contains("\r\nx-goog-fieldmask: places.displayname,places.location"),
        "{head}"
    );
    assert!(head.contains("\r\ncontent-type: application/json"), "{head}");

    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["textQuery"], r#"Joe's "Best" Cafe"#);
    assert_eq!(body["locationBias"]["circle"]["center"]["latitude"], 37.7793);
    assert_eq!(body["locationBias"]["circle"]["radius"], 10_000.0);
}

#[tokio::test]
async fn error_status_is_an_outcome_not_a_transport_error() {
    let reply = r#"{"error":{"code":403,"message":"API key not valid.","status":"PERMISSION_DENIED"}}"#;
    let (url, server) = serve_once("403 Forbidden", reply).await;

    let request = SearchQuery::new("q", 0.0, 0.0).to_request(&url, "bad-key");
    let outcome = transport().send(request).await.unwrap();

    assert_eq!(outcome.status, 403);
    assert!(!outcome.is_success());
    assert_eq!(outcome.body, reply);
    server.await.unwrap();
}

#[tokio::test]
async fn refused_connection_is_a_request_error() {
    // Bind to learn a free port, then close it so nothing is listening.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let url = format!("http://{addr}/v1/places:searchText");
    let request = SearchQuery::new("q", 0.0, 0.0).to_request(&url, "key");
    let err = transport().send(request).await.unwrap_err();

    assert!(matches!(err, TransportError::Request(_)), "{err:?}");
}

#[tokio::test]
async fn session_over_http_caches_results() {
    use places_anchors::config::PlacesConfig;
    use places_anchors::places::{CompletionOutcome, SearchSession};
    use places_anchors::scene::{Anchor, GeoOrigin, SceneDocument};

    let reply = r#"{"places":[{"displayName":{"text":"Library","languageCode":"en"},"location":{"latitude":37.7,"longitude":-122.4}}]}"#;
    let (url, server) = serve_once("200 OK", reply).await;

    let config = PlacesConfig {
        api_key: "wire-key".into(),
        endpoint: url,
        ..Default::default()
    };
    let mut session = SearchSession::new(config, transport()).unwrap();
    let scene = SceneDocument::new(
        vec![GeoOrigin::new("Origin", 37.7793, -122.4193)],
        vec![Anchor::new("Anchor", 37.7793, -122.4193)],
    );

    session.start_search(&scene).unwrap();
    let outcome = session.wait_for_completion().await.unwrap();
    assert!(matches!(outcome, CompletionOutcome::Succeeded { count: 1, .. }));

    let results = session.last_results().unwrap();
    assert_eq!(results[0].display_name, "Library");
    assert_eq!(results[0].language_code, "en");

    let (_, body) = split_request(&server.await.unwrap());
    assert!(body.contains("San Francisco Public Library"));
}
