// ============================================================================
// Gateway Middleware
// ============================================================================
//
// - Access token presence check and caller context propagation
// - Admission gate for mutating operations
// - CORS and browser noise (OPTIONS, favicon)
//
// ============================================================================

use crate::context::AppContext;
use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rulegate_error::AppError;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Identity of the caller, forwarded to the backend on every call
#[derive(Clone, Debug)]
pub struct CallerContext {
    pub token: String,
    pub request_id: Option<String>,
}

/// Extract the usable part of a raw token header value.
///
/// Browsers sometimes append cookie attributes, only the part before the
/// first `;` is the token. Empty and `undefined` mean no token.
pub fn normalize_token(raw: &str) -> Option<&str> {
    let token = raw.split(';').next().unwrap_or_default().trim();
    if token.is_empty() || token == "undefined" {
        None
    } else {
        Some(token)
    }
}

/// Access token check
///
/// Rejects requests without a token. On success the token and a request id
/// are stored as a [`CallerContext`] extension for the handlers.
pub async fn access_token(
    State(state): State<Arc<AppContext>>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    let token = request
        .headers()
        .get(&state.token_header)
        .and_then(|v| v.to_str().ok())
        .and_then(normalize_token)
        .map(str::to_string);

    let Some(token) = token else {
        tracing::debug!(path = %path, "Request without access token");
        return AppError::TokenMissing.into_response();
    };

    // Keep an upstream request id, otherwise start a new trace
    let request_id = request
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    request.extensions_mut().insert(CallerContext {
        token,
        request_id: Some(request_id),
    });

    next.run(request).await
}

/// Admission gate
///
/// The rest of the pipeline for this request becomes the continuation. For
/// mutating operations it runs serialized, in arrival order, possibly driven
/// by another request's task.
pub async fn admission_gate(
    State(state): State<Arc<AppContext>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match state.gate.wrap(&path, next.run(request)).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Mutating request not served");
            AppError::from(e).into_response()
        }
    }
}

/// Answer `OPTIONS` and `/favicon.ico` with an empty 200
pub async fn browser_noise(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS || request.uri().path() == "/favicon.ico" {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

/// CORS for the rule console front-end
pub fn cors_layer(token_header: &HeaderName) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([
            Method::PUT,
            Method::POST,
            Method::GET,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::CONTENT_LENGTH,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
            HeaderName::from_static("x-requested-with"),
            HeaderName::from_static("token"),
            HeaderName::from_static("timestamp"),
            HeaderName::from_static("source"),
            token_header.clone(),
        ])
}
