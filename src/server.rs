//! HTTP surface of the relay.
//!
//! `POST /api/summarize` takes `{"content": "..."}` and answers with one of:
//!
//! - `200 text/plain`: the summary, streamed as raw text. If the upstream
//!   fails after streaming has started, the body ends with a JSON error object
//!   such as `{"error":"rate_limited"}` instead of more text. The status cannot
//!   change once bytes are sent, so consumers that care must check whether the
//!   tail of the body parses as a JSON object with an `error` field.
//! - `400` with `{"error":"No content provided"}` for blank content.
//! - the upstream's own status with
//!   `{"error":"Failed to generate summary","details":"<upstream body>"}`.
//! - `500` with `{"error":"Failed to reach summary service","details":"..."}`
//!   when the upstream cannot be contacted.

use std::convert::Infallible;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::{json, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::client::{ClientError, ProviderClient};
use crate::model::{ErrorBody, GenerateRequest, SummarizeRequest};
use crate::options::SummaryOptions;
use crate::relay::relay;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub client: Arc<dyn ProviderClient>,
    pub options: SummaryOptions,
    /// Parent of every session's cancellation token.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(client: impl ProviderClient + 'static, options: SummaryOptions) -> Self {
        Self {
            client: Arc::new(client),
            options,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Errors answered before any summary bytes are sent.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No content provided")]
    NoContent,

    #[error("Invalid request body: {0}")]
    InvalidBody(String),

    #[error(transparent)]
    Upstream(#[from] ClientError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NoContent => (StatusCode::BAD_REQUEST, ErrorBody::new("No content provided")),
            ApiError::InvalidBody(details) => (
                StatusCode::BAD_REQUEST,
                ErrorBody::new("Invalid request body").with_details(details),
            ),
            ApiError::Upstream(ClientError::UpstreamStatus { status, body }) => (
                status,
                ErrorBody::new("Failed to generate summary").with_details(body),
            ),
            ApiError::Upstream(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorBody::new("Failed to reach summary service").with_details(err.to_string()),
            ),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/summarize", post(summarize))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// `GET /`
pub async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to Smart Summary API" }))
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// `POST /api/summarize`: stream a summary of the posted content.
pub async fn summarize(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload.map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))?;
    let content = request.trimmed_content().ok_or(ApiError::NoContent)?;

    let generate = GenerateRequest::streaming(
        &state.options.model_type,
        content,
        &state.options.instruction,
    );
    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());

    let upstream = state
        .client
        .open_stream(&generate, authorization)
        .await
        .inspect_err(|err| warn!(error = %err, "could not open upstream stream"))?;

    info!(content_len = content.len(), "relaying summary stream");

    // The session task is detached; it ends on its own or when the body is dropped.
    let (outbound, _session) = relay(
        upstream,
        state.options.outbound_buffer,
        state.shutdown.child_token(),
    );

    let body = Body::from_stream(outbound.map(Ok::<_, Infallible>));
    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (CACHE_CONTROL, "no-cache"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        body,
    )
        .into_response())
}
