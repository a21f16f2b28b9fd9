// ============================================================================
// Rule Routes
// ============================================================================
//
// Endpoints:
// - POST /v1/rules/add-batch - Add a batch of rules (serialized)
// - POST /v1/rules/query - Query rules of a repository
// - POST /v1/rules/attributes/query - Query rule attribute definitions
// - POST /v1/rules/regex/query - Query rules by regular expression
// - POST /v1/rules/delete - Delete rules (serialized)
//
// ============================================================================

use axum::extract::State;
use rulegate_error::AppResult;
use serde_json::Value;
use std::sync::Arc;

use crate::context::AppContext;
use crate::envelope::ApiResponse;
use crate::routes::extractors::{Caller, JsonBody};
use crate::routes::forward::{
    RULE_ADD_BATCH, RULE_ATTRIBUTE_QUERY, RULE_DELETE, RULE_QUERY, RULE_REGEX_QUERY, forward,
};

/// POST /v1/rules/add-batch
pub async fn add_batch(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse<Value>> {
    forward(&ctx, &RULE_ADD_BATCH, &caller, body).await
}

/// POST /v1/rules/query
pub async fn query(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse<Value>> {
    forward(&ctx, &RULE_QUERY, &caller, body).await
}

/// POST /v1/rules/attributes/query
///
/// The backend exposes attribute definitions over GET, the body fields
/// become query parameters.
pub async fn attribute_query(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse<Value>> {
    forward(&ctx, &RULE_ATTRIBUTE_QUERY, &caller, body).await
}

/// POST /v1/rules/regex/query
pub async fn regex_query(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse<Value>> {
    forward(&ctx, &RULE_REGEX_QUERY, &caller, body).await
}

/// POST /v1/rules/delete
pub async fn delete(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse<Value>> {
    forward(&ctx, &RULE_DELETE, &caller, body).await
}
