// ============================================================================
// Admission Gate Configuration
// ============================================================================

use crate::constants::DEFAULT_MUTATING_OPERATIONS;
use std::time::Duration;

/// Admission gate configuration
#[derive(Clone, Debug)]
pub struct AdmissionConfig {
    /// Trailing path segments that mark a request as mutating
    pub mutating_operations: Vec<String>,
    /// Bounded wait for the admission lock; `None` waits forever
    pub acquire_timeout: Option<Duration>,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            mutating_operations: DEFAULT_MUTATING_OPERATIONS
                .iter()
                .map(|op| op.to_string())
                .collect(),
            acquire_timeout: None,
        }
    }
}

impl AdmissionConfig {
    pub(crate) fn from_env() -> Self {
        let defaults = Self::default();

        // Extra operations extend the built-in table, they never replace it
        let mut mutating_operations = defaults.mutating_operations;
        if let Ok(extra) = std::env::var("ADMISSION_MUTATING_OPERATIONS") {
            for op in extra.split(',').map(str::trim).filter(|op| !op.is_empty()) {
                if !mutating_operations.iter().any(|known| known == op) {
                    mutating_operations.push(op.to_string());
                }
            }
        }

        let acquire_timeout = std::env::var("ADMISSION_ACQUIRE_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .map(Duration::from_millis);

        Self {
            mutating_operations,
            acquire_timeout,
        }
    }
}
