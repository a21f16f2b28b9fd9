// ============================================================================
// Tag Routes
// ============================================================================
//
// Endpoints:
// - POST /v1/tags/query - Query tag values
// - POST /v1/tags/delete - Delete tag values (serialized)
// - POST /v1/tags/export - Export the rules and tags of a repository
//
// ============================================================================

use axum::extract::State;
use rulegate_error::AppResult;
use serde_json::Value;
use std::sync::Arc;

use crate::context::AppContext;
use crate::envelope::ApiResponse;
use crate::routes::export::{ExportRequest, TagExport, export_tags};
use crate::routes::extractors::{Caller, JsonBody};
use crate::routes::forward::{TAG_DELETE, TAG_QUERY, forward};

pub async fn query(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse<Value>> {
    forward(&ctx, &TAG_QUERY, &caller, body).await
}

pub async fn delete(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse<Value>> {
    forward(&ctx, &TAG_DELETE, &caller, body).await
}

pub async fn export(
    State(ctx): State<Arc<AppContext>>,
    Caller(caller): Caller,
    JsonBody(body): JsonBody,
) -> AppResult<ApiResponse<TagExport>> {
    let request = ExportRequest::parse(body)?;
    tracing::info!(
        repo_type = request.repo_type,
        repo_id = request.repo_id,
        request_id = caller.request_id.as_deref().unwrap_or_default(),
        "Exporting repository tags"
    );

    let document = export_tags(&ctx.repo, &caller, &request).await?;
    Ok(ApiResponse::ok(document))
}
