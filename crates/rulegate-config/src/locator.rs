// ============================================================================
// Service Locator Configuration
// ============================================================================

use crate::constants::{DEFAULT_LOCATOR_RETRY_ATTEMPTS, DEFAULT_LOCATOR_RETRY_DELAY_MS};
use anyhow::Result;
use std::collections::BTreeMap;
use std::time::Duration;

/// Service locator configuration
#[derive(Clone, Debug)]
pub struct LocatorConfig {
    /// Known instances per service name, e.g. `repo-service -> [10.0.0.5:8000]`
    pub services: BTreeMap<String, Vec<String>>,
    /// Number of lookups before degrading to an empty address
    pub retry_attempts: u32,
    /// Sleep between lookups
    pub retry_delay: Duration,
}

impl LocatorConfig {
    pub(crate) fn from_env() -> Result<Self> {
        let services = match std::env::var("SERVICE_ADDRS") {
            Ok(raw) => parse_service_addrs(&raw)?,
            Err(_) => BTreeMap::new(),
        };

        Ok(Self {
            services,
            retry_attempts: std::env::var("LOCATOR_RETRY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &u32| *n > 0)
                .unwrap_or(DEFAULT_LOCATOR_RETRY_ATTEMPTS),
            retry_delay: Duration::from_millis(
                std::env::var("LOCATOR_RETRY_DELAY_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_LOCATOR_RETRY_DELAY_MS),
            ),
        })
    }
}

/// Parse `name=host:port,host:port;name=host:port` into a service table.
pub fn parse_service_addrs(raw: &str) -> Result<BTreeMap<String, Vec<String>>> {
    let mut services = BTreeMap::new();

    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((name, addrs)) = entry.split_once('=') else {
            anyhow::bail!("SERVICE_ADDRS entry '{}' is missing '='", entry);
        };
        let name = name.trim();
        if name.is_empty() {
            anyhow::bail!("SERVICE_ADDRS entry '{}' has an empty service name", entry);
        }

        let addrs: Vec<String> = addrs
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect();

        services
            .entry(name.to_string())
            .or_insert_with(Vec::new)
            .extend(addrs);
    }

    Ok(services)
}
