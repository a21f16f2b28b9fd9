// ============================================================================
// Axum Extractors
// ============================================================================
//
// - Caller: the CallerContext stored by the access token middleware
// - JsonBody: any JSON request body, rejected with the envelope error format
//
// ============================================================================

use axum::{
    Json, async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::request::Parts,
};
use rulegate_error::AppError;
use serde_json::Value;

use crate::gateway::CallerContext;

/// Caller identity set by [`crate::gateway::middleware::access_token`]
#[derive(Debug, Clone)]
pub struct Caller(pub CallerContext);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerContext>()
            .cloned()
            .map(Caller)
            .ok_or(AppError::TokenMissing)
    }
}

/// Opaque JSON request body
#[derive(Debug)]
pub struct JsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::invalid_request(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}
