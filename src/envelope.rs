use axum::Json;
use axum::response::{IntoResponse, Response};
use rulegate_error::CODE_OK;
use serde::Serialize;

/// Success body in the `{status, code, message, data}` envelope shared with
/// the error responses
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub status: u8,
    pub code: i64,
    pub message: String,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: 1,
            code: CODE_OK,
            message: "ok".to_string(),
            data,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        Json(self).into_response()
    }
}
