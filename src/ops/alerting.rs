// * Alerting - SEV-1 and SEV-3 Alert Conditions
// * SEV-1: a record reached publication with an unattributed or unobserved contact.
// * SEV-3: a single company floods the output, or a collaborator keeps failing.

use crate::config::FloodConfig;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

// * Collaborator degradation: transient-failure ratio over a minimum sample
const SEV3_DEGRADED_FAILURE_RATIO: f64 = 0.5;
const SEV3_DEGRADED_MIN_CALLS: u64 = 10;
const ALERT_COOLDOWN_SECONDS: u64 = 300;

/// Alert severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlertSeverity {
    /// Critical alert requiring immediate action
    Sev1,
    /// Warning level alert for monitoring
    Sev3,
    /// Informational alert
    Info,
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertSeverity::Sev1 => write!(f, "SEV-1"),
            AlertSeverity::Sev3 => write!(f, "SEV-3"),
            AlertSeverity::Info => write!(f, "INFO"),
        }
    }
}

/// Alert types; the cooldown is tracked per type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AlertType {
    /// Publication guard dropped a record
    InvariantViolation,
    /// One company published implausibly many records
    FalsePositiveFlood(String),
    /// A collaborator's transient failures crossed the threshold
    CollaboratorDegraded(String),
    Custom(String),
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertType::InvariantViolation => write!(f, "INVARIANT_VIOLATION"),
            AlertType::FalsePositiveFlood(_) => write!(f, "FALSE_POSITIVE_FLOOD"),
            AlertType::CollaboratorDegraded(_) => write!(f, "COLLABORATOR_DEGRADED"),
            AlertType::Custom(name) => write!(f, "CUSTOM_{}", name.to_uppercase()),
        }
    }
}

/// An alert event
#[derive(Debug, Clone)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub alert_type: AlertType,
    pub message: String,
    pub context: HashMap<String, String>,
    pub timestamp: Instant,
    pub id: u64,
}

impl Alert {
    pub fn new(severity: AlertSeverity, alert_type: AlertType, message: impl Into<String>) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self {
            severity,
            alert_type,
            message: message.into(),
            context: HashMap::new(),
            timestamp: Instant::now(),
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Logs the alert using tracing
    pub fn log(&self) {
        let mut pairs: Vec<String> = self.context.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
        pairs.sort();
        let context_str = pairs.join(", ");

        match self.severity {
            AlertSeverity::Sev1 => tracing::error!(
                alert_id = self.id,
                severity = %self.severity,
                alert_type = %self.alert_type,
                context = context_str,
                "ALERT: {}", self.message
            ),
            AlertSeverity::Sev3 => tracing::warn!(
                alert_id = self.id,
                severity = %self.severity,
                alert_type = %self.alert_type,
                context = context_str,
                "ALERT: {}", self.message
            ),
            AlertSeverity::Info => tracing::info!(
                alert_id = self.id,
                severity = %self.severity,
                alert_type = %self.alert_type,
                context = context_str,
                "ALERT: {}", self.message
            ),
        }
    }
}

/// Trait for alert handlers
pub trait AlertHandler: Send + Sync {
    fn handle(&self, alert: &Alert);
}

/// Default logging handler
#[derive(Debug, Default)]
pub struct LoggingHandler;

impl AlertHandler for LoggingHandler {
    fn handle(&self, alert: &Alert) {
        alert.log();
    }
}

/// Keeps every dispatched alert; handy for tests and batch summaries
#[derive(Debug, Default)]
pub struct RecordingHandler {
    alerts: Mutex<Vec<Alert>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts.lock().map(|a| a.clone()).unwrap_or_default()
    }
}

impl AlertHandler for RecordingHandler {
    fn handle(&self, alert: &Alert) {
        if let Ok(mut alerts) = self.alerts.lock() {
            alerts.push(alert.clone());
        }
    }
}

/// Configuration for the alert manager
#[derive(Debug, Clone)]
pub struct AlertConfig {
    pub flood: FloodConfig,
    /// Transient-failure ratio that marks a collaborator as degraded
    pub degraded_failure_ratio: f64,
    /// Calls required before the ratio is judged
    pub degraded_min_calls: u64,
    /// Cooldown period before re-firing the same alert
    pub alert_cooldown_seconds: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            flood: FloodConfig::default(),
            degraded_failure_ratio: SEV3_DEGRADED_FAILURE_RATIO,
            degraded_min_calls: SEV3_DEGRADED_MIN_CALLS,
            alert_cooldown_seconds: ALERT_COOLDOWN_SECONDS,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CollaboratorStats {
    calls: u64,
    transient_failures: u64,
}

/// Alert manager for the discovery pipeline
pub struct AlertManager {
    handlers: Vec<Arc<dyn AlertHandler>>,
    active_alerts: RwLock<HashMap<AlertType, Alert>>,
    collaborators: RwLock<HashMap<String, CollaboratorStats>>,
    config: AlertConfig,
}

impl std::fmt::Debug for AlertManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertManager")
            .field("handler_count", &self.handlers.len())
            .field("config", &self.config)
            .finish()
    }
}

impl AlertManager {
    pub fn new() -> Self {
        Self::with_config(AlertConfig::default())
    }

    pub fn with_config(config: AlertConfig) -> Self {
        Self {
            handlers: vec![Arc::new(LoggingHandler)],
            active_alerts: RwLock::new(HashMap::new()),
            collaborators: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn add_handler(&mut self, handler: Arc<dyn AlertHandler>) {
        self.handlers.push(handler);
    }

    /// Fires the SEV-1 for a record dropped by the publication guard
    pub fn invariant_violation(&self, company: &str, record_name: &str, detail: &str) {
        let alert = Alert::new(
            AlertSeverity::Sev1,
            AlertType::InvariantViolation,
            format!("Dropped record '{}' for {}: {}", record_name, company, detail),
        )
        .with_context("company", company)
        .with_context("record", record_name);

        // ! Every violation is dispatched; the cooldown would hide repeats
        self.dispatch(alert);
    }

    /// Checks a finished job for a false-positive flood
    pub fn check_flood(&self, company: &str, published: usize, candidates_seen: usize) {
        let flood = &self.config.flood;
        let ratio = if candidates_seen == 0 {
            0.0
        } else {
            published as f64 / candidates_seen as f64
        };

        let too_many = published > flood.max_records_per_company;
        let too_dense = candidates_seen >= flood.min_candidates && ratio > flood.max_publish_ratio;
        if !(too_many || too_dense) {
            return;
        }

        let alert = Alert::new(
            AlertSeverity::Sev3,
            AlertType::FalsePositiveFlood(company.to_string()),
            format!(
                "{} published {} records from {} candidates ({:.1}%)",
                company,
                published,
                candidates_seen,
                ratio * 100.0
            ),
        )
        .with_context("company", company)
        .with_context("published", published.to_string())
        .with_context("candidates_seen", candidates_seen.to_string());

        self.fire_alert(alert);
    }

    /// Records one collaborator call; `transient` marks a timeout or outage
    pub fn record_collaborator(&self, collaborator: &str, transient: bool) {
        let stats = {
            let Ok(mut all) = self.collaborators.write() else {
                return;
            };
            let stats = all.entry(collaborator.to_string()).or_default();
            stats.calls += 1;
            if transient {
                stats.transient_failures += 1;
            }
            *stats
        };

        if stats.calls < self.config.degraded_min_calls {
            return;
        }
        let ratio = stats.transient_failures as f64 / stats.calls as f64;
        if ratio > self.config.degraded_failure_ratio {
            let alert = Alert::new(
                AlertSeverity::Sev3,
                AlertType::CollaboratorDegraded(collaborator.to_string()),
                format!(
                    "Collaborator {} failing ({:.1}% of {} calls)",
                    collaborator,
                    ratio * 100.0,
                    stats.calls
                ),
            )
            .with_context("collaborator", collaborator)
            .with_context("failure_ratio", format!("{:.4}", ratio));

            self.fire_alert(alert);
        }
    }

    /// Fires an alert unless the same type fired within the cooldown
    pub fn fire_alert(&self, alert: Alert) {
        {
            let Ok(active) = self.active_alerts.read() else {
                return;
            };
            if let Some(existing) = active.get(&alert.alert_type) {
                if existing.timestamp.elapsed() < Duration::from_secs(self.config.alert_cooldown_seconds) {
                    return;
                }
            }
        }
        self.dispatch(alert);
    }

    fn dispatch(&self, alert: Alert) {
        if let Ok(mut active) = self.active_alerts.write() {
            // * Expired entries no longer suppress anything
            let cooldown = Duration::from_secs(self.config.alert_cooldown_seconds);
            active.retain(|_, existing| existing.timestamp.elapsed() < cooldown);
            active.insert(alert.alert_type.clone(), alert.clone());
        }
        for handler in &self.handlers {
            handler.handle(&alert);
        }
    }

    pub fn active_alert_count(&self) -> usize {
        self.active_alerts.read().map(|a| a.len()).unwrap_or(0)
    }

    pub fn clear_alerts(&self) {
        if let Ok(mut active) = self.active_alerts.write() {
            active.clear();
        }
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording(config: AlertConfig) -> (AlertManager, Arc<RecordingHandler>) {
        let recorder = Arc::new(RecordingHandler::new());
        let mut manager = AlertManager::with_config(config);
        manager.add_handler(recorder.clone());
        (manager, recorder)
    }

    #[test]
    fn test_alert_display() {
        assert_eq!(format!("{}", AlertSeverity::Sev1), "SEV-1");
        assert_eq!(format!("{}", AlertType::FalsePositiveFlood("x".into())), "FALSE_POSITIVE_FLOOD");
        assert_eq!(format!("{}", AlertType::Custom("test".to_string())), "CUSTOM_TEST");
    }

    #[test]
    fn test_invariant_violation_always_dispatched() {
        let (manager, recorder) = recording(AlertConfig::default());
        manager.invariant_violation("Riley Heating", "Andrew Riley", "email not observed");
        manager.invariant_violation("Riley Heating", "Sarah Jones", "email not observed");

        let alerts = recorder.alerts();
        assert_eq!(alerts.len(), 2);
        assert!(alerts.iter().all(|a| a.severity == AlertSeverity::Sev1));
    }

    #[test]
    fn test_flood_by_record_count() {
        let (manager, recorder) = recording(AlertConfig::default());
        manager.check_flood("Quiet Ltd", 2, 10);
        assert!(recorder.alerts().is_empty());

        manager.check_flood("Noisy Ltd", 40, 400);
        let alerts = recorder.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, AlertSeverity::Sev3);
        assert_eq!(alerts[0].context.get("published"), Some(&"40".to_string()));
    }

    #[test]
    fn test_flood_by_ratio_needs_sample() {
        let (manager, recorder) = recording(AlertConfig::default());
        // * 4 of 5 is dense but below the minimum sample
        manager.check_flood("Small Ltd", 4, 5);
        assert!(recorder.alerts().is_empty());

        manager.check_flood("Dense Ltd", 12, 20);
        assert_eq!(recorder.alerts().len(), 1);
    }

    #[test]
    fn test_degraded_collaborator() {
        let (manager, recorder) = recording(AlertConfig::default());
        for _ in 0..9 {
            manager.record_collaborator("registry", true);
        }
        assert!(recorder.alerts().is_empty());

        manager.record_collaborator("registry", true);
        assert_eq!(recorder.alerts().len(), 1);

        // * Cooldown suppresses the repeat
        manager.record_collaborator("registry", true);
        assert_eq!(recorder.alerts().len(), 1);
    }

    #[test]
    fn test_healthy_collaborator_is_quiet() {
        let (manager, recorder) = recording(AlertConfig::default());
        for i in 0..20 {
            manager.record_collaborator("profile_search", i % 5 == 0);
        }
        assert!(recorder.alerts().is_empty());
        assert_eq!(manager.active_alert_count(), 0);
    }

    #[test]
    fn test_expired_flood_alerts_are_pruned() {
        let (manager, recorder) = recording(AlertConfig {
            alert_cooldown_seconds: 0,
            ..Default::default()
        });
        for company in ["Noisy Ltd", "Louder Ltd", "Loudest Ltd", "Booming Ltd"] {
            manager.check_flood(company, 40, 400);
        }
        assert_eq!(recorder.alerts().len(), 4);
        assert_eq!(manager.active_alert_count(), 1);

        let (manager, _) = recording(AlertConfig::default());
        manager.check_flood("Noisy Ltd", 40, 400);
        manager.check_flood("Louder Ltd", 40, 400);
        assert_eq!(manager.active_alert_count(), 2);
    }

    #[test]
    fn test_clear_alerts() {
        let manager = AlertManager::new();
        manager.fire_alert(Alert::new(AlertSeverity::Info, AlertType::Custom("x".into()), "hello"));
        assert_eq!(manager.active_alert_count(), 1);
        manager.clear_alerts();
        assert_eq!(manager.active_alert_count(), 0);
    }
}
