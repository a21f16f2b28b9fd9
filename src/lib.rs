// ============================================================================
// rulegate
// ============================================================================
//
// JSON API gateway in front of the rule repository backend. Reads are
// forwarded with full concurrency; mutating operations pass one at a time,
// in arrival order, through the admission gate.
//
// ============================================================================

pub mod admission;
pub mod context;
pub mod envelope;
pub mod gateway;
pub mod routes;

use anyhow::{Context, Result};
use rulegate_config::{Config, LogFormat};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use context::AppContext;
use gateway::ReqwestBackend;

/// Initialize the global tracing subscriber
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.rust_log.clone()));
    let registry = tracing_subscriber::registry().with(filter);

    match config.logging.format {
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.logging.with_target),
            )
            .init(),
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(config.logging.with_target))
            .init(),
    }
}

/// Serve the gateway on `listener` until Ctrl-C
pub async fn serve(listener: TcpListener, app_context: Arc<AppContext>) -> Result<()> {
    let app = routes::create_router(app_context);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")
}

/// Build the production context and run the gateway
pub async fn run(config: Config) -> Result<()> {
    let config = Arc::new(config);

    info!("=== Rule Gateway Starting ===");
    info!("Bind address: {}", config.bind_address);
    info!("Backend service: {}", config.backend.service_name);
    info!(
        "Mutating operations: {}",
        config.admission.mutating_operations.join(", ")
    );
    match config.admission.acquire_timeout {
        Some(limit) => info!("Admission acquire timeout: {}ms", limit.as_millis()),
        None => info!("Admission acquire timeout: unbounded"),
    }

    let backend = Arc::new(ReqwestBackend::new(config.backend.timeout_secs)?);
    let app_context = Arc::new(AppContext::new(config.clone(), backend)?);

    let listener = TcpListener::bind(&config.bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_address))?;
    info!("Rule gateway listening on {}", config.bind_address);

    serve(listener, app_context).await?;

    info!("Rule gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        // Without a signal handler, keep serving
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
