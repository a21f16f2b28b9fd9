use axum::{
    http::{HeaderValue, StatusCode, header::RETRY_AFTER},
    response::IntoResponse,
};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

// Envelope codes understood by the rule console front-end
pub const CODE_OK: i64 = 200;
pub const CODE_TOKEN_MISSING: i64 = 302;
pub const CODE_NOT_FOUND: i64 = 404;
pub const CODE_INTERNAL: i64 = 500;
pub const CODE_INVALID_REQUEST: i64 = 2099;
pub const CODE_BACKEND_FAILURE: i64 = 2301;
pub const CODE_GATE_BUSY: i64 = 2503;

/// Gateway error type
///
/// Every variant renders as the standard `{status, code, message, data}`
/// envelope so that clients only ever have to parse one response shape.
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Request Errors =====
    #[error("Access token missing")]
    TokenMissing,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Route not found: {0}")]
    NotFound(String),

    // ===== Backend Errors =====
    /// The backend answered, but with a non-200 envelope code.
    #[error("Backend rejected request ({code}): {message}")]
    BackendRejected { code: i64, message: String },

    #[error("Backend transport error: {0}")]
    BackendTransport(String),

    #[error("Backend response could not be decoded: {0}")]
    BackendDecode(String),

    /// The service locator returned no address for the service.
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    // ===== Admission Errors =====
    /// A mutating request could not enter the admission gate in time.
    #[error("Admission gate busy after waiting {waited_ms}ms")]
    GateBusy { waited_ms: u64 },

    // ===== Internal Errors =====
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Unknown error: {0}")]
    Unknown(#[from] anyhow::Error),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Console clients detect an expired login from the envelope code alone
            AppError::TokenMissing => StatusCode::OK,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // The backend's own verdict travels in the envelope, the HTTP exchange succeeded
            AppError::BackendRejected { .. } => StatusCode::OK,
            AppError::BackendTransport(_)
            | AppError::BackendDecode(_)
            | AppError::ServiceUnavailable(_) => StatusCode::BAD_GATEWAY,
            AppError::GateBusy { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) | AppError::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the envelope code for programmatic error handling
    pub fn error_code(&self) -> i64 {
        match self {
            AppError::TokenMissing => CODE_TOKEN_MISSING,
            AppError::InvalidRequest(_) => CODE_INVALID_REQUEST,
            AppError::NotFound(_) => CODE_NOT_FOUND,
            AppError::BackendRejected { code, .. } => *code,
            AppError::BackendTransport(_)
            | AppError::BackendDecode(_)
            | AppError::ServiceUnavailable(_) => CODE_BACKEND_FAILURE,
            AppError::GateBusy { .. } => CODE_GATE_BUSY,
            AppError::Internal(_) | AppError::Unknown(_) => CODE_INTERNAL,
        }
    }

    /// Get a user-friendly error message (without sensitive details)
    pub fn user_message(&self) -> String {
        match self {
            AppError::TokenMissing => "access token missing, please log in again".to_string(),
            AppError::InvalidRequest(msg) => format!("invalid request: {}", msg),
            AppError::NotFound(_) => "Page Not Found".to_string(),
            AppError::BackendRejected { message, .. } => message.clone(),
            AppError::BackendTransport(_) | AppError::BackendDecode(_) => {
                "data query failed".to_string()
            }
            AppError::ServiceUnavailable(service) => format!("service unavailable: {}", service),
            AppError::GateBusy { .. } => {
                "service busy, another change is in progress, please retry".to_string()
            }
            AppError::Internal(_) | AppError::Unknown(_) => "Internal server error".to_string(),
        }
    }

    /// Whether the client may retry the same request unchanged
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            AppError::GateBusy { .. } | AppError::ServiceUnavailable(_)
        )
    }

    /// Log this error with appropriate level and context
    pub fn log(&self) {
        let status = self.status_code();
        let code = self.error_code();

        if status.is_server_error() {
            tracing::error!(
                error = %self,
                error_code = code,
                status = %status.as_u16(),
                "Server error occurred"
            );
        } else if matches!(self, AppError::BackendRejected { .. }) {
            tracing::info!(
                error = %self,
                error_code = code,
                "Backend rejected request"
            );
        } else {
            tracing::debug!(
                error = %self,
                error_code = code,
                "Client error occurred"
            );
        }
    }

    /// The envelope body rendered for this error
    pub fn envelope(&self) -> serde_json::Value {
        json!({
            "status": 0,
            "code": self.error_code(),
            "message": self.user_message(),
            "data": {},
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        self.log();

        let status = self.status_code();
        let body = self.envelope();

        let mut response = (status, axum::Json(body)).into_response();
        if self.is_retriable() {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static("1"));
        }
        response
    }
}

// ============================================================================
// Helper functions for creating common errors
// ============================================================================

impl AppError {
    /// Create an invalid request error
    pub fn invalid_request(msg: impl Into<String>) -> Self {
        AppError::InvalidRequest(msg.into())
    }

    /// Create a backend rejection carrying the backend's own code
    pub fn backend_rejected(code: i64, message: impl Into<String>) -> Self {
        AppError::BackendRejected {
            code,
            message: message.into(),
        }
    }

    /// Create a backend transport error
    pub fn backend_transport(msg: impl Into<String>) -> Self {
        AppError::BackendTransport(msg.into())
    }

    /// Create a backend decode error
    pub fn backend_decode(msg: impl Into<String>) -> Self {
        AppError::BackendDecode(msg.into())
    }

    /// Create a service unavailable error
    pub fn service_unavailable(service: impl Into<String>) -> Self {
        AppError::ServiceUnavailable(service.into())
    }

    /// Create an internal server error
    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}
