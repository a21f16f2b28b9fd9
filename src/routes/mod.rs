// ============================================================================
// Axum Routes Module
// ============================================================================
//
// Structure:
// - mod.rs: Router assembly and middleware ordering
// - forward.rs: Operation table and backend forwarding
// - export.rs: Tag export aggregation
// - rules.rs, tags.rs, parsers.rs, repos.rs: Business endpoints
// - health.rs: Liveness probe
// - extractors.rs: Caller and JSON body extractors
// - middleware.rs: Request logging
//
// ============================================================================

pub mod export;
pub mod extractors;
pub mod forward;
mod health;
mod middleware;
mod parsers;
mod repos;
mod rules;
mod tags;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Uri,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
};
use rulegate_config::MAX_REQUEST_BODY_SIZE;
use rulegate_error::AppError;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::gateway::middleware::{access_token, admission_gate, browser_noise, cors_layer};

/// Create the main application router with all routes
pub fn create_router(app_context: Arc<AppContext>) -> Router {
    // Business routes: token required, mutating operations go through the gate
    let business = Router::new()
        .route("/rules/add-batch", post(rules::add_batch))
        .route("/rules/query", post(rules::query))
        .route("/rules/attributes/query", post(rules::attribute_query))
        .route("/rules/regex/query", post(rules::regex_query))
        .route("/rules/delete", post(rules::delete))
        .route("/tags/query", post(tags::query))
        .route("/tags/delete", post(tags::delete))
        .route("/tags/export", post(tags::export))
        .route("/parsers/delete", post(parsers::delete))
        .route("/repos/list/query", post(repos::list))
        .route("/repos/attributes/list/query", post(repos::attributes))
        .route("/repos/dimensions/list/query", post(repos::dimensions))
        // Last added runs first: token check, then the admission gate
        .route_layer(from_fn(middleware::request_logging))
        .route_layer(from_fn_with_state(app_context.clone(), admission_gate))
        .route_layer(from_fn_with_state(app_context.clone(), access_token));

    Router::new()
        .route("/v1/ping", get(health::ping))
        .nest("/v1", business)
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                // Tracing layer (outermost - runs first)
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&app_context.token_header))
                .layer(from_fn(browser_noise))
                .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_SIZE))
                .into_inner(),
        )
        .with_state(app_context)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
