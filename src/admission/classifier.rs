// ============================================================================
// Request Classifier
// ============================================================================
//
// Decides whether a request must pass through the admission gate.
// The decision is a lookup of the operation (the trailing path segment)
// in a policy table. The HTTP verb is never consulted: every endpoint of
// the rule API is POST regardless of what it does.
//
// ============================================================================

use rulegate_config::AdmissionConfig;
use std::collections::HashSet;

/// Outcome of classifying a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Write-style operation, serialized through the gate
    Mutating,
    /// Everything else, runs with full concurrency
    ReadOnly,
}

/// Policy table of mutating operations
#[derive(Debug, Clone)]
pub struct RequestClassifier {
    mutating: HashSet<String>,
}

impl Default for RequestClassifier {
    fn default() -> Self {
        Self::from_config(&AdmissionConfig::default())
    }
}

impl RequestClassifier {
    pub fn new<I, S>(mutating_operations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            mutating: mutating_operations.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::new(config.mutating_operations.iter().cloned())
    }

    /// Classify an operation identifier. Total: unknown operations are read-only.
    pub fn classify(&self, operation: &str) -> RequestClass {
        if self.mutating.contains(operation) {
            RequestClass::Mutating
        } else {
            RequestClass::ReadOnly
        }
    }

    /// Classify a request path by its trailing segment
    pub fn classify_path(&self, path: &str) -> RequestClass {
        self.classify(operation_of(path))
    }

    pub fn is_mutating(&self, path: &str) -> bool {
        self.classify_path(path) == RequestClass::Mutating
    }
}

/// Extract the operation identifier from a request path or URI.
///
/// `/v1/rules/delete?x=1` and `/v1/rules/delete/` both yield `delete`.
pub fn operation_of(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
}
