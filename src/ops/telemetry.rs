// * Telemetry - JSON Logging and Prometheus Metrics
// * Structured logging plus the counters that make false-positive floods visible.

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_counter, CounterVec, Encoder, HistogramVec,
    IntCounter, TextEncoder,
};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

lazy_static! {
    // * Name candidates produced by the extractor, before validation
    pub static ref CANDIDATES_SEEN_TOTAL: IntCounter = register_int_counter!(
        "prospect_candidates_seen_total",
        "Name candidates produced by extraction"
    ).unwrap();

    // * Validator rejections by reason
    pub static ref CANDIDATES_REJECTED_TOTAL: CounterVec = register_counter_vec!(
        "prospect_candidates_rejected_total",
        "Name candidates rejected by semantic validation",
        &["reason"]
    ).unwrap();

    // * Published records by quality tier
    pub static ref RECORDS_PUBLISHED_TOTAL: CounterVec = register_counter_vec!(
        "prospect_records_published_total",
        "Executive records published by quality tier",
        &["tier"]
    ).unwrap();

    // * Records dropped at publication for a missing attribution or an unobserved value
    pub static ref INVARIANT_VIOLATIONS_TOTAL: IntCounter = register_int_counter!(
        "prospect_invariant_violations_total",
        "Records dropped by the publication guard"
    ).unwrap();

    // * Jobs by terminal state
    pub static ref JOBS_TOTAL: CounterVec = register_counter_vec!(
        "prospect_jobs_total",
        "Company jobs by terminal state",
        &["state"]
    ).unwrap();

    // * Outbound collaborator calls
    pub static ref COLLABORATOR_CALLS_TOTAL: CounterVec = register_counter_vec!(
        "prospect_collaborator_calls_total",
        "Collaborator calls by collaborator and outcome",
        &["collaborator", "outcome"]
    ).unwrap();

    // * Wall-clock time per job
    pub static ref JOB_DURATION_SECONDS: HistogramVec = register_histogram_vec!(
        "prospect_job_duration_seconds",
        "Company job duration in seconds",
        &["state"],
        vec![0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0]
    ).unwrap();
}

/// Initializes the tracing subscriber with JSON formatting
///
/// # Example
/// ```ignore
/// use prospect_flow::ops::telemetry;
///
/// telemetry::init_tracing();
/// tracing::info!(company = "Andrew Riley Heating", "Processing company");
/// ```
pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Initializes JSON tracing with a default level, overridable via RUST_LOG
pub fn init_tracing_with_level(level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // * try_init: a second initialization (tests, embedding) is not an error
    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_writer(std::io::stderr))
        .try_init();
}

/// Initializes tracing with pretty formatting (for development)
pub fn init_tracing_pretty() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().pretty().with_writer(std::io::stderr))
        .try_init();
}

/// Returns the current metrics in the Prometheus text format
pub fn get_metrics_string() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

pub fn record_candidates_seen(count: usize) {
    CANDIDATES_SEEN_TOTAL.inc_by(count as u64);
}

pub fn record_rejection(reason: &str) {
    CANDIDATES_REJECTED_TOTAL.with_label_values(&[reason]).inc();
}

pub fn record_published(tier: &str) {
    RECORDS_PUBLISHED_TOTAL.with_label_values(&[tier]).inc();
}

pub fn record_invariant_violation() {
    INVARIANT_VIOLATIONS_TOTAL.inc();
}

/// Records a terminal job state and how long the job took
pub fn record_job(state: &str, seconds: f64) {
    JOBS_TOTAL.with_label_values(&[state]).inc();
    JOB_DURATION_SECONDS.with_label_values(&[state]).observe(seconds);
}

/// Outcome is one of "ok", "not_found" or "transient"
pub fn record_collaborator_call(collaborator: &str, outcome: &str) {
    COLLABORATOR_CALLS_TOTAL
        .with_label_values(&[collaborator, outcome])
        .inc();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_increment() {
        let before = CANDIDATES_SEEN_TOTAL.get();
        record_candidates_seen(3);
        assert!(CANDIDATES_SEEN_TOTAL.get() >= before + 3);

        let rejected = CANDIDATES_REJECTED_TOTAL.with_label_values(&["service_term"]).get();
        record_rejection("service_term");
        assert!(CANDIDATES_REJECTED_TOTAL.with_label_values(&["service_term"]).get() >= rejected + 1.0);
    }

    #[test]
    fn test_get_metrics_string() {
        record_published("HIGH");
        record_job("COMPLETED", 1.5);
        record_collaborator_call("registry", "ok");
        let metrics = get_metrics_string();
        assert!(metrics.contains("prospect_records_published_total"));
        assert!(metrics.contains("prospect_collaborator_calls_total"));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_tracing();
        init_tracing_pretty();
    }
}
