// ============================================================================
// Gateway plumbing
// ============================================================================
//
// Everything between the HTTP edge and the rule repository backend:
// - Token check, request ids and the admission gate (middleware)
// - Service address resolution with bounded retries (discovery)
// - Backend transport and envelope decoding (service_client)
//
// ============================================================================

pub mod discovery;
pub mod middleware;
pub mod service_client;

pub use discovery::{ServiceLocator, ServiceResolver, StaticServiceLocator};
pub use middleware::CallerContext;
pub use service_client::{BackendClient, BackendEnvelope, RepoServiceClient, ReqwestBackend};
