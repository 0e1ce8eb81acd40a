// * Collaborator rate limiting
// * One GCRA limiter per outbound collaborator, shared by every worker so that
// * concurrent jobs draw from a single quota.

use crate::config::OrchestrationConfig;
use governor::{Quota, RateLimiter as GovernorLimiter};
use nonzero_ext::nonzero;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

type DirectLimiter =
    GovernorLimiter<governor::state::NotKeyed, governor::state::InMemoryState, governor::clock::DefaultClock>;

// * Enforces a fixed minimum delay between calls to one collaborator
pub struct CollaboratorLimiter {
    name: &'static str,
    min_delay: Duration,
    limiter: Option<DirectLimiter>,
}

impl CollaboratorLimiter {
    /// A zero delay disables limiting
    pub fn new(name: &'static str, min_delay: Duration) -> Self {
        // * Burst of one: every call after the first waits a full period
        let limiter = Quota::with_period(min_delay)
            .map(|quota| quota.allow_burst(nonzero!(1u32)))
            .map(GovernorLimiter::direct);

        Self {
            name,
            min_delay,
            limiter,
        }
    }

    pub fn unlimited(name: &'static str) -> Self {
        Self::new(name, Duration::ZERO)
    }

    // * Checks the limiter without waiting
    pub fn check(&self) -> bool {
        self.limiter.as_ref().map_or(true, |l| l.check().is_ok())
    }

    // * Waits until the next call is allowed
    pub async fn wait(&self) {
        if let Some(limiter) = &self.limiter {
            if limiter.check().is_err() {
                debug!(collaborator = self.name, "Waiting for rate limit");
                limiter.until_ready().await;
            }
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn min_delay(&self) -> Duration {
        self.min_delay
    }
}

/// Limiters for every rate-limited collaborator, injected into workers
#[derive(Clone)]
pub struct SharedLimiters {
    pub registry: Arc<CollaboratorLimiter>,
    pub search: Arc<CollaboratorLimiter>,
}

impl SharedLimiters {
    pub fn from_config(config: &OrchestrationConfig) -> Self {
        Self {
            registry: Arc::new(CollaboratorLimiter::new(
                "registry",
                Duration::from_millis(config.registry_min_delay_ms),
            )),
            search: Arc::new(CollaboratorLimiter::new(
                "profile_search",
                Duration::from_millis(config.search_min_delay_ms),
            )),
        }
    }

    pub fn unlimited() -> Self {
        Self {
            registry: Arc::new(CollaboratorLimiter::unlimited("registry")),
            search: Arc::new(CollaboratorLimiter::unlimited("profile_search")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_delay_never_blocks() {
        let limiter = CollaboratorLimiter::unlimited("registry");
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(limiter.check());
    }

    #[test]
    fn test_second_call_is_held_back() {
        let limiter = CollaboratorLimiter::new("registry", Duration::from_secs(60));
        assert!(limiter.check());
        assert!(!limiter.check());
    }

    #[tokio::test]
    async fn test_wait_passes_when_quota_available() {
        let limiter = CollaboratorLimiter::new("profile_search", Duration::from_millis(10));
        limiter.wait().await;
        limiter.wait().await;
        assert_eq!(limiter.min_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_shared_limiters_from_config() {
        let limiters = SharedLimiters::from_config(&OrchestrationConfig::default());
        assert_eq!(limiters.registry.name(), "registry");
        assert!(limiters.search.min_delay() > Duration::ZERO);
    }
}
