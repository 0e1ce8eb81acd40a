// * Bounded retry for transient network errors
// * Exponential backoff capped by attempt count; permanent errors and empty
// * content are returned immediately.

use crate::engine::rate_limiter::CollaboratorLimiter;
use crate::network::{AsyncResult, Lookup, NetworkError};
use crate::ops::telemetry;
use backoff::ExponentialBackoffBuilder;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::warn;

// * Upper bound on a single backoff wait
const MAX_INTERVAL: Duration = Duration::from_secs(5);

/// Retry policy for one kind of call
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    /// Single attempt, no retry
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Runs `operation` until it succeeds, fails permanently, or the attempt
/// budget is spent. The last error is returned.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, label: &str, mut operation: F) -> Result<T, NetworkError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, NetworkError>>,
{
    let attempts = AtomicU32::new(0);
    let backoff = ExponentialBackoffBuilder::new()
        .with_initial_interval(policy.initial_backoff.max(Duration::from_millis(1)))
        .with_max_interval(MAX_INTERVAL)
        .with_randomization_factor(0.0)
        .with_max_elapsed_time(None)
        .build();

    backoff::future::retry(backoff, || {
        let attempt = attempts.fetch_add(1, Ordering::Relaxed) + 1;
        let call = operation();
        async move {
            match call.await {
                Ok(value) => Ok(value),
                Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                    warn!(call = label, attempt, error = %e, "Transient failure, retrying");
                    Err(backoff::Error::transient(e))
                }
                Err(e) => Err(backoff::Error::permanent(e)),
            }
        }
    })
    .await
}

/// One guarded collaborator call: waits for the shared limiter before every
/// attempt, bounds each attempt by `timeout`, retries transient failures and
/// converts the result at the boundary
pub async fn collaborator_call<T, F>(
    limiter: &CollaboratorLimiter,
    timeout: Duration,
    policy: RetryPolicy,
    call: F,
) -> Lookup<T>
where
    F: Fn() -> AsyncResult<T>,
{
    let call = &call;
    let result = with_retry(policy, limiter.name(), || async move {
        limiter.wait().await;
        match tokio::time::timeout(timeout, call()).await {
            Ok(result) => result,
            Err(_) => Err(NetworkError::Timeout(timeout)),
        }
    })
    .await;

    let lookup = match result {
        Ok(value) => Lookup::Found(value),
        Err(e) => Lookup::from_error(&e),
    };
    let outcome = match &lookup {
        Lookup::Found(_) => "ok",
        Lookup::NotFound => "not_found",
        Lookup::Transient(_) => "transient",
        Lookup::Rejected(_) => "rejected",
    };
    telemetry::record_collaborator_call(limiter.name(), outcome);
    lookup
}
