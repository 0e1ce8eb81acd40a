// * Engine
// * Async orchestration around the synchronous refinery: URL handling,
// * thin-content detection, shared rate limits, bounded retry, the registry
// * and profile collaborators, and the batch orchestrator.

pub mod density;
pub mod fingerprint;
pub mod normalization;
pub mod orchestrator;
pub mod profile_discoverer;
pub mod rate_limiter;
pub mod registry_reconciler;
pub mod retry;

// * Re-exports for convenient access
pub use orchestrator::{Collaborators, ObservedContacts, Orchestrator};
pub use profile_discoverer::{ProfileDiscoverer, ProfileDiscovery};
pub use rate_limiter::{CollaboratorLimiter, SharedLimiters};
pub use registry_reconciler::{RegistryReconciler, RegistryReconciliation};
pub use retry::RetryPolicy;
