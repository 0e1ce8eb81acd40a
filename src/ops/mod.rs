// * Operations
// * Structured logging, Prometheus counters and alerting.

pub mod alerting;
pub mod telemetry;

// * Re-exports for convenient access
pub use alerting::{
    Alert, AlertConfig, AlertHandler, AlertManager, AlertSeverity, AlertType, LoggingHandler, RecordingHandler,
};
pub use telemetry::{get_metrics_string, init_tracing, init_tracing_pretty, init_tracing_with_level};
