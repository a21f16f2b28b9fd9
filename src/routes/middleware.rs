use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::admission::operation_of;
use crate::gateway::middleware::REQUEST_ID_HEADER;

/// Request logging middleware
///
/// Runs inside the access token check and the admission gate: the request id
/// is set, and the duration covers only the handler's own work.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let request_id = req
        .headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    tracing::debug!(
        method = %method,
        path = %path,
        operation = operation_of(&path),
        request_id = %request_id,
        "Incoming request"
    );

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        request_id = %request_id,
        status = %response.status().as_u16(),
        duration_ms = start.elapsed().as_millis() as u64,
        "Request completed"
    );

    response
}
