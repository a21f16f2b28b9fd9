// ============================================================================
// Repository Routes
// ============================================================================
//
// Endpoints:
// - POST /v1/repos/list/query - List rule repositories
// - POST /v1/repos/attributes/list/query - List repository attributes
// - POST /v1/repos/dimensions/list/query - List repository dimensions
//
// ============================================================================

use axum::extract::State;
use rulegate_error::AppResult;
use serde_json::Value;
use std::sync::Arc;

use crate::context::AppContext;
use crate::envelope::ApiResponse;
use crate::routes::extractors::{Caller, JsonBody};
use crate::routes::forward::{REPO_ATTRIBUTE_QUERY, REPO_DIMENSION_QUERY, REPO_QUERY, forward};

pub async fn list(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse<Value>> {
    forward(&ctx, &REPO_QUERY, &caller, body).await
}

pub async fn attributes(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse<Value>> {
    forward(&ctx, &REPO_ATTRIBUTE_QUERY, &caller, body).await
}

pub async fn dimensions(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse<Value>> {
    forward(&ctx, &REPO_DIMENSION_QUERY, &caller, body).await
}
