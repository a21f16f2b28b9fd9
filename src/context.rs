use crate::admission::AdmissionGate;
use crate::gateway::{BackendClient, RepoServiceClient, ServiceResolver};
use anyhow::{Context, Result};
use axum::http::HeaderName;
use axum::response::Response;
use rulegate_config::Config;
use std::sync::Arc;

/// Application context containing shared dependencies
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Header carrying the caller's access token, parsed once at startup
    pub token_header: HeaderName,
    /// Serialization point for mutating operations, one per process
    pub gate: Arc<AdmissionGate<Response>>,
    pub repo: Arc<RepoServiceClient>,
}

impl AppContext {
    /// Build the context around an explicit backend transport
    pub fn new(config: Arc<Config>, backend: Arc<dyn BackendClient>) -> Result<Self> {
        let token_header = HeaderName::try_from(config.token_header.as_str())
            .with_context(|| format!("Invalid TOKEN_HEADER '{}'", config.token_header))?;

        let resolver = ServiceResolver::from_config(&config.locator);
        let repo = RepoServiceClient::new(
            backend,
            resolver,
            config.backend.service_name.clone(),
            token_header.clone(),
        );

        Ok(Self {
            gate: Arc::new(AdmissionGate::from_config(&config.admission)),
            token_header,
            repo: Arc::new(repo),
            config,
        })
    }
}
