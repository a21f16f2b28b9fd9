// ============================================================================
// Rulegate Config - Centralized configuration management
// ============================================================================
//
// Configuration for the rule gateway, loaded from environment variables
// (and an optional .env file) with sensible defaults.
//
// ============================================================================

mod admission;
mod backend;
mod constants;
mod locator;
mod logging;

// Re-export all public types
pub use admission::AdmissionConfig;
pub use backend::BackendConfig;
pub use constants::MAX_REQUEST_BODY_SIZE;
pub use locator::{LocatorConfig, parse_service_addrs};
pub use logging::{LogFormat, LoggingConfig};

use anyhow::Result;
use constants::*;

/// Main configuration structure for the gateway
#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub bind_address: String,
    pub rust_log: String,

    /// Header carrying the caller's access token
    pub token_header: String,

    // Sub-configurations
    pub logging: LoggingConfig,
    pub admission: AdmissionConfig,
    pub locator: LocatorConfig,
    pub backend: BackendConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        // Load sub-configurations
        let logging = LoggingConfig::from_env();
        let admission = AdmissionConfig::from_env();
        let locator = LocatorConfig::from_env()?;
        let backend = BackendConfig::from_env();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let host = std::env::var("BIND_HOST").unwrap_or_else(|_| DEFAULT_BIND_HOST.to_string());

        if !locator.services.contains_key(&backend.service_name) {
            tracing::warn!(
                service = %backend.service_name,
                "Backend service has no configured address, every backend call will fail"
            );
        }

        Ok(Self {
            port,
            bind_address: format!("{}:{}", host, port),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            token_header: std::env::var("TOKEN_HEADER")
                .unwrap_or_else(|_| "x-access-token".to_string())
                .to_ascii_lowercase(),
            logging,
            admission,
            locator,
            backend,
        })
    }
}
