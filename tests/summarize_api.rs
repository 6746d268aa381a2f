use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use smart_summary::client::{ByteStream, ClientError, ProviderClient};
use smart_summary::model::GenerateRequest;
use smart_summary::options::{HttpTransport, SummaryOptions, TransportOptions};
use smart_summary::providers::BackendClient;
use smart_summary::server::{build_router, AppState};

/// Upstream that replays canned byte chunks and counts calls.
#[derive(Clone, Default)]
struct ScriptedClient {
    chunks: Vec<&'static str>,
    calls: Arc<AtomicUsize>,
    seen_content: Arc<std::sync::Mutex<Option<String>>>,
}

impl ScriptedClient {
    fn new(chunks: Vec<&'static str>) -> Self {
        Self {
            chunks,
            ..Self::default()
        }
    }
}

#[async_trait]
impl ProviderClient for ScriptedClient {
    async fn open_stream(
        &self,
        request: &GenerateRequest,
        _authorization: Option<&str>,
    ) -> Result<ByteStream, ClientError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_content.lock().unwrap() = Some(request.params.content.clone());
        let items: Vec<Result<Bytes, ClientError>> = self
            .chunks
            .iter()
            .map(|c| Ok(Bytes::from_static(c.as_bytes())))
            .collect();
        Ok(futures::stream::iter(items).boxed())
    }
}

/// POST `body` to `/api/summarize` and return (status, headers, body text).
async fn post_summarize(app: axum::Router, body: &str) -> (StatusCode, HeaderMap, String) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/summarize")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let resp = app.oneshot(request).await.unwrap();
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8_lossy(&body).into_owned())
}

fn backend_app(base_url: String) -> axum::Router {
    let client = BackendClient::new(TransportOptions::new(HttpTransport::new(base_url))).unwrap();
    build_router(AppState::new(client, SummaryOptions::default()))
}

#[tokio::test]
async fn streams_plain_text_summary() {
    let client = ScriptedClient::new(vec![
        "data: {\"chu",
        "nk\":\"Hello \"}\n",
        "data: {\"chunk\":\"world\"}\n",
        "data: [DONE]\n",
    ]);
    let app = build_router(AppState::new(client.clone(), SummaryOptions::default()));

    let (status, headers, text) =
        post_summarize(app, r#"{"content":"  A long article.  "}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "text/plain; charset=utf-8");
    assert_eq!(headers["cache-control"], "no-cache");
    assert_eq!(text, "Hello world");
    assert_eq!(
        client.seen_content.lock().unwrap().as_deref(),
        Some("A long article.")
    );
}

#[tokio::test]
async fn blank_content_never_reaches_upstream() {
    let client = ScriptedClient::new(vec!["data: [DONE]\n"]);

    for body in [
        r#"{"content":""}"#,
        r#"{"content":"   \n\t"}"#,
        "{}",
        r#"{"content":null}"#,
        r#"{"content":42}"#,
        r#"{"content":{"text":"nested"}}"#,
    ] {
        let app = build_router(AppState::new(client.clone(), SummaryOptions::default()));
        let (status, _, text) = post_summarize(app, body).await;

        assert_eq!(status, StatusCode::BAD_REQUEST, "body {body}");
        let json: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json, json!({ "error": "No content provided" }));
    }

    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let client = ScriptedClient::new(vec![]);
    let app = build_router(AppState::new(client.clone(), SummaryOptions::default()));

    let (status, _, text) = post_summarize(app, "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let json: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["error"], "Invalid request body");
    assert_eq!(client.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn mid_stream_error_ends_body_with_json() {
    let client = ScriptedClient::new(vec![
        "data: {\"chunk\":\"Partial \"}\n",
        "event: error\ndata: {\"error\":\"rate_limited\"}\n",
        "data: {\"chunk\":\"never\"}\n",
    ]);
    let app = build_router(AppState::new(client, SummaryOptions::default()));

    let (status, _, text) = post_summarize(app, r#"{"content":"text"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, r#"Partial {"error":"rate_limited"}"#);
}

#[tokio::test]
async fn relays_real_upstream_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            "data: {\"chunk\":\"Short \"}\n\ndata: {\"chunk\":\"summary.\"}\n\nevent: end\ndata: {}\n\n",
            "text/event-stream",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let (status, _, text) = post_summarize(backend_app(server.uri()), r#"{"content":"text"}"#).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(text, "Short summary.");
}

#[tokio::test]
async fn upstream_status_is_propagated() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ai/generate"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Invalid authentication credentials"))
        .mount(&server)
        .await;

    let (status, _, text) = post_summarize(backend_app(server.uri()), r#"{"content":"text"}"#).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let json: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        json,
        json!({
            "error": "Failed to generate summary",
            "details": "Invalid authentication credentials"
        })
    );
}

#[tokio::test]
async fn unreachable_upstream_is_internal_error() {
    let (status, _, text) =
        post_summarize(backend_app("http://127.0.0.1:1".to_string()), r#"{"content":"text"}"#).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(json["error"], "Failed to reach summary service");
    assert!(json["details"].is_string());
}

#[tokio::test]
async fn health_and_root() {
    let app = build_router(AppState::new(ScriptedClient::default(), SummaryOptions::default()));

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert_eq!(serde_json::from_slice::<Value>(&body).unwrap(), json!({ "status": "healthy" }));

    let resp = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn shutdown_cancels_in_flight_relay() {
    let client = ScriptedClient::new(vec!["data: {\"chunk\":\"first\"}\n"]);
    // Upstream that stays open after the first chunk.
    struct Hanging(ScriptedClient);

    #[async_trait]
    impl ProviderClient for Hanging {
        async fn open_stream(
            &self,
            request: &GenerateRequest,
            authorization: Option<&str>,
        ) -> Result<ByteStream, ClientError> {
            let head = self.0.open_stream(request, authorization).await?;
            Ok(head.chain(futures::stream::pending()).boxed())
        }
    }

    let state = AppState::new(Hanging(client), SummaryOptions::default());
    let shutdown = state.shutdown.clone();
    let app = build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/api/summarize")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"content":"text"}"#))
        .unwrap();
    let resp = app.oneshot(request).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let mut body = resp.into_body().into_data_stream();
    let first = body.next().await.unwrap().unwrap();
    assert_eq!(&first[..], b"first");

    shutdown.cancel();
    assert!(body.next().await.is_none());
}
