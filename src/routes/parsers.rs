// ============================================================================
// Parser Routes
// ============================================================================
//
// Endpoints:
// - POST /v1/parsers/delete - Delete a parser (serialized)
//
// ============================================================================

use axum::extract::State;
use rulegate_error::AppResult;
use serde_json::Value;
use std::sync::Arc;

use crate::context::AppContext;
use crate::envelope::ApiResponse;
use crate::routes::extractors::{Caller, JsonBody};
use crate::routes::forward::{PARSER_DELETE, forward};

pub async fn delete(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse<Value>> {
    forward(&ctx, &PARSER_DELETE, &caller, body).await
}
