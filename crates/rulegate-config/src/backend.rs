// ============================================================================
// Backend RPC Configuration
// ============================================================================

use crate::constants::{DEFAULT_BACKEND_SERVICE, DEFAULT_BACKEND_TIMEOUT_SECS};

/// Backend RPC client configuration
#[derive(Clone, Debug)]
pub struct BackendConfig {
    /// Per-call timeout for backend requests (seconds)
    pub timeout_secs: u64,
    /// Service name of the rule-management backend, as known to the locator
    pub service_name: String,
}

impl BackendConfig {
    pub(crate) fn from_env() -> Self {
        Self {
            timeout_secs: std::env::var("BACKEND_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS),
            service_name: std::env::var("BACKEND_SERVICE")
                .unwrap_or_else(|_| DEFAULT_BACKEND_SERVICE.to_string()),
        }
    }
}
