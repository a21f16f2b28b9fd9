// ============================================================================
// Service Locator
// ============================================================================
//
// Resolves a logical service name ("repo-service") to one instance address.
// Lookups that come back empty are retried a bounded number of times; after
// that the caller gets an empty address and must treat the service as
// unavailable.
//
// ============================================================================

use rulegate_config::LocatorConfig;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Service registry abstraction
pub trait ServiceLocator: Send + Sync {
    /// One lookup. `None` when no instance is currently registered.
    fn lookup(&self, service_name: &str) -> Option<String>;
}

/// Fixed instance table from config, round-robin across instances
pub struct StaticServiceLocator {
    services: BTreeMap<String, Vec<String>>,
    cursor: AtomicUsize,
}

impl StaticServiceLocator {
    pub fn new(services: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            services,
            cursor: AtomicUsize::new(0),
        }
    }
}

impl ServiceLocator for StaticServiceLocator {
    fn lookup(&self, service_name: &str) -> Option<String> {
        let instances = self.services.get(service_name)?;
        if instances.is_empty() {
            return None;
        }
        let next = self.cursor.fetch_add(1, Ordering::Relaxed);
        Some(instances[next % instances.len()].clone())
    }
}

/// Locator plus the retry policy applied on every resolution
#[derive(Clone)]
pub struct ServiceResolver {
    locator: Arc<dyn ServiceLocator>,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl ServiceResolver {
    pub fn new(locator: Arc<dyn ServiceLocator>, retry_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            locator,
            retry_attempts: retry_attempts.max(1),
            retry_delay,
        }
    }

    pub fn from_config(config: &LocatorConfig) -> Self {
        Self::new(
            Arc::new(StaticServiceLocator::new(config.services.clone())),
            config.retry_attempts,
            config.retry_delay,
        )
    }

    /// Resolve `service_name`, sleeping `retry_delay` between failed lookups.
    ///
    /// Returns an empty string once every attempt has failed.
    pub async fn resolve(&self, service_name: &str) -> String {
        for attempt in 1..=self.retry_attempts {
            if let Some(address) = self.locator.lookup(service_name)
                && !address.is_empty()
            {
                return address;
            }

            tracing::error!(
                service = service_name,
                attempt = attempt,
                max_attempts = self.retry_attempts,
                "Service lookup failed"
            );
            if attempt < self.retry_attempts {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        String::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn table(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
        entries
            .iter()
            .map(|(name, addrs)| {
                (
                    name.to_string(),
                    addrs.iter().map(|a| a.to_string()).collect(),
                )
            })
            .collect()
    }

    /// Fails a fixed number of lookups before answering
    struct FlakyLocator {
        failures_left: AtomicU32,
        calls: AtomicU32,
    }

    impl ServiceLocator for FlakyLocator {
        fn lookup(&self, _service_name: &str) -> Option<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                None
            } else {
                Some("10.0.0.9:8000".to_string())
            }
        }
    }

    #[test]
    fn test_static_locator_round_robin() {
        let locator = StaticServiceLocator::new(table(&[(
            "repo-service",
            &["10.0.0.1:8000", "10.0.0.2:8000"],
        )]));

        assert_eq!(locator.lookup("repo-service").unwrap(), "10.0.0.1:8000");
        assert_eq!(locator.lookup("repo-service").unwrap(), "10.0.0.2:8000");
        assert_eq!(locator.lookup("repo-service").unwrap(), "10.0.0.1:8000");
        assert!(locator.lookup("tag-service").is_none());
    }

    #[tokio::test]
    async fn test_resolve_retries_then_succeeds() {
        let locator = Arc::new(FlakyLocator {
            failures_left: AtomicU32::new(1),
            calls: AtomicU32::new(0),
        });
        let resolver = ServiceResolver::new(locator.clone(), 2, Duration::from_millis(5));

        assert_eq!(resolver.resolve("repo-service").await, "10.0.0.9:8000");
        assert_eq!(locator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_resolve_degrades_to_empty_address() {
        let locator = Arc::new(FlakyLocator {
            failures_left: AtomicU32::new(u32::MAX),
            calls: AtomicU32::new(0),
        });
        let resolver = ServiceResolver::new(locator.clone(), 2, Duration::from_millis(5));

        assert_eq!(resolver.resolve("repo-service").await, "");
        assert_eq!(locator.calls.load(Ordering::SeqCst), 2);
    }
}
