// ============================================================================
// Liveness Routes
// ============================================================================
//
// Endpoints:
// - GET /v1/ping - Liveness probe, no access token required
//
// ============================================================================

use crate::envelope::ApiResponse;

/// GET /v1/ping
pub async fn ping() -> ApiResponse<&'static str> {
    ApiResponse::ok("ping success to rulegate")
}
