// ============================================================================
// Configuration Constants
// ============================================================================

// Default port values
pub(crate) const DEFAULT_PORT: u16 = 8000;
pub(crate) const DEFAULT_BIND_HOST: &str = "0.0.0.0";

// Mutating operations (trailing path segment) serialized by the admission gate
pub(crate) const DEFAULT_MUTATING_OPERATIONS: &[&str] = &["delete", "add-batch"];

// Service locator: two lookups one second apart, then give up with an empty address
pub(crate) const DEFAULT_LOCATOR_RETRY_ATTEMPTS: u32 = 2;
pub(crate) const DEFAULT_LOCATOR_RETRY_DELAY_MS: u64 = 1000;

// Backend RPC
pub(crate) const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 20;
pub(crate) const DEFAULT_BACKEND_SERVICE: &str = "repo-service";

// Request limits (in bytes)
pub const MAX_REQUEST_BODY_SIZE: usize = 2 * 1024 * 1024; // 2 MB - rule batches can be large
