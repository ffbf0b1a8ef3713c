//! HTTP surface: scollector ingestion and Prometheus scrape endpoints.

use crate::core::config::HEALTH_PATH;
use crate::core::{DataPoint, ExporterError, METRICS_PATH};
use crate::export::{Exporter, EXPOSITION_CONTENT_TYPE};
use crate::receiver::decode::{decode_batch, is_gzip_encoding, is_json_content_type};
use crate::receiver::Ingestor;
use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use bytes::Bytes;
use std::sync::Arc;
use std::time::SystemTime;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Shared state of the HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub ingestor: Arc<Ingestor>,
    pub exporter: Arc<Exporter>,
    pub max_body_bytes: usize,
    pub max_decoded_bytes: usize,
}

/// Create the router serving the ingestion path, `/metrics` and `/health`.
pub fn create_http_router(state: HttpState, put_path: &str) -> Router {
    Router::new()
        // Every method is routed so non-POST requests get a readable 405
        .route(put_path, any(handle_put))
        .route(METRICS_PATH, get(handle_metrics))
        .route(HEALTH_PATH, get(health_check))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Handle an OpenTSDB `/api/put` batch.
async fn handle_put(
    State(state): State<HttpState>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Result<StatusCode, HttpError> {
    let batch = match read_put_request(&state, &method, &headers, body).await {
        Ok(batch) => batch,
        Err(e) => {
            tracing::error!(category = e.category(), "{}", e);
            state.ingestor.monitor().record_rejection();
            return Err(e.into());
        },
    };

    state.ingestor.ingest(batch).await;
    Ok(StatusCode::NO_CONTENT)
}

/// Validate the request head, then read and decode the body.
///
/// The body is only read once method and content type are accepted.
async fn read_put_request(
    state: &HttpState,
    method: &Method,
    headers: &HeaderMap,
    body: Body,
) -> crate::core::Result<Vec<DataPoint>> {
    if method != Method::POST {
        return Err(ExporterError::MethodNotAllowed);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());
    if !is_json_content_type(content_type) {
        return Err(ExporterError::UnsupportedContentType(
            content_type.unwrap_or_default().to_string(),
        ));
    }

    let gzip = is_gzip_encoding(
        headers
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok()),
    );

    let limit = state.max_body_bytes;
    let declared = headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(ExporterError::PayloadTooLarge(limit));
    }
    // A failed read means the limit was hit or the client went away
    let body: Bytes = to_bytes(body, limit)
        .await
        .map_err(|_| ExporterError::PayloadTooLarge(limit))?;

    tracing::debug!(bytes = body.len(), gzip, "Received put request");
    let max_decoded_bytes = state.max_decoded_bytes;
    tokio::task::spawn_blocking(move || decode_batch(&body, gzip, max_decoded_bytes)).await?
}

/// Serve a scrape.
async fn handle_metrics(State(state): State<HttpState>) -> impl IntoResponse {
    let body = state.exporter.scrape(SystemTime::now());
    ([(header::CONTENT_TYPE, EXPOSITION_CONTENT_TYPE)], body)
}

/// Health check endpoint.
async fn health_check(State(state): State<HttpState>) -> impl IntoResponse {
    let store = state.ingestor.store();
    Json(serde_json::json!({
        "status": "ok",
        "series": store.len(),
        "types": store.type_count(),
        "ingest": state.ingestor.monitor().stats(),
    }))
}

/// HTTP-specific error type.
#[derive(Debug)]
pub enum HttpError {
    MethodNotAllowed(String),
    PayloadTooLarge(String),
    BadRequest(String),
    Internal(String),
}

impl From<ExporterError> for HttpError {
    fn from(err: ExporterError) -> Self {
        match err {
            e @ ExporterError::MethodNotAllowed => HttpError::MethodNotAllowed(e.to_string()),
            e @ ExporterError::PayloadTooLarge(_) => HttpError::PayloadTooLarge(e.to_string()),
            e if e.is_client_error() => HttpError::BadRequest(e.to_string()),
            e => HttpError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            HttpError::MethodNotAllowed(msg) => (StatusCode::METHOD_NOT_ALLOWED, msg),
            HttpError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
            HttpError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            HttpError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let mut response = (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("{}\n", message),
        )
            .into_response();
        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, header::HeaderValue::from_static("POST"));
        }
        response
    }
}

impl std::fmt::Display for HttpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpError::MethodNotAllowed(msg) => write!(f, "Method Not Allowed: {}", msg),
            HttpError::PayloadTooLarge(msg) => write!(f, "Payload Too Large: {}", msg),
            HttpError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            HttpError::Internal(msg) => write!(f, "Internal Error: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {}
