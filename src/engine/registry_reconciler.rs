// * Registry reconciliation
// * Looks the company up in the official registry and turns its current
// * officers into observations with maximum name trust. Officer records are
// * authoritative for existence and title, never for contact details.

use crate::config::OrchestrationConfig;
use crate::engine::rate_limiter::CollaboratorLimiter;
use crate::engine::retry::{collaborator_call, RetryPolicy};
use crate::network::{Lookup, OfficerRecord, RegistryQuery, RegistryResponse, RegistrySearch};
use crate::persistence::schema::{
    Candidate, ContactBundle, ContextWindow, DiscoverySource, ExecutiveObservation, PageType, PatternId,
    RegistryOutcome, RelevanceSignals, Span, ValidatedName,
};
use crate::refinery::Refinery;
use std::sync::Arc;
use std::time::Duration;
use strsim::jaro_winkler;
use tracing::{debug, info, warn};

// * Tokens ignored when comparing company names
const LEGAL_TOKENS: &[&str] = &[
    "ltd", "limited", "llp", "plc", "co", "company", "the", "and", "&", "uk", "group", "holdings",
];

// * Statuses that mean the company no longer trades
const CLOSED_STATUSES: &[&str] = &[
    "dissolved",
    "liquidation",
    "converted-closed",
    "closed",
    "insolvency-proceedings",
];

/// Result of one registry reconciliation
#[derive(Debug, Clone, Default)]
pub struct RegistryReconciliation {
    pub outcome: RegistryOutcome,
    pub observations: Vec<ExecutiveObservation>,
    /// Registry id of the matched company
    pub company_id: Option<String>,
    pub note: Option<String>,
}

impl RegistryReconciliation {
    fn without_match(outcome: RegistryOutcome, note: impl Into<String>) -> Self {
        Self {
            outcome,
            note: Some(note.into()),
            ..Default::default()
        }
    }
}

/// Lower-cased company name without legal-form tokens
pub fn comparable_company_name(name: &str) -> String {
    name.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '&')
        .filter(|t| !t.is_empty() && !LEGAL_TOKENS.contains(t))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Similarity of two company names in [0, 1]
pub fn company_similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (comparable_company_name(a), comparable_company_name(b));
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    jaro_winkler(&a, &b)
}

fn is_closed(status: &str) -> bool {
    let status = status.to_lowercase();
    CLOSED_STATUSES.iter().any(|s| status.contains(s))
}

// * Corporate officers (a company acting as director or secretary) are not people
fn is_corporate(officer: &OfficerRecord) -> bool {
    officer.role.to_lowercase().starts_with("corporate")
        || officer
            .officer_name
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .any(|t| matches!(t, "ltd" | "limited" | "llp" | "plc"))
}

pub struct RegistryReconciler {
    registry: Arc<dyn RegistrySearch>,
    limiter: Arc<CollaboratorLimiter>,
    timeout: Duration,
    retry: RetryPolicy,
    match_threshold: f64,
}

impl RegistryReconciler {
    pub fn new(registry: Arc<dyn RegistrySearch>, limiter: Arc<CollaboratorLimiter>, config: &OrchestrationConfig) -> Self {
        Self {
            registry,
            limiter,
            timeout: config.collaborator_timeout(),
            retry: RetryPolicy::new(
                config.max_fetch_attempts,
                Duration::from_millis(config.retry_initial_backoff_ms),
            ),
            match_threshold: config.company_match_threshold,
        }
    }

    /// Queries the registry and maps the matched company's current officers.
    /// Never fails: no match and outages are reported through the outcome.
    pub async fn reconcile(
        &self,
        company_name: &str,
        company_id: Option<&str>,
        refinery: &Refinery,
    ) -> RegistryReconciliation {
        let query = RegistryQuery {
            company_name: company_name.to_string(),
            company_id: company_id.map(str::to_string),
        };

        let registry = &self.registry;
        let lookup = collaborator_call(&self.limiter, self.timeout, self.retry, || registry.search(&query)).await;

        let officers = match lookup {
            Lookup::Found(RegistryResponse::Found(officers)) => officers,
            Lookup::Found(RegistryResponse::NotFound) | Lookup::NotFound => {
                debug!(company = company_name, "No registry entry");
                return RegistryReconciliation::without_match(RegistryOutcome::NotFound, "registry: no matching company");
            }
            Lookup::Transient(reason) => {
                warn!(company = company_name, reason = %reason, "Registry unavailable");
                return RegistryReconciliation::without_match(
                    RegistryOutcome::Unavailable,
                    format!("registry unavailable: {}", reason),
                );
            }
            Lookup::Rejected(reason) => {
                warn!(company = company_name, reason = %reason, "Registry rejected the request");
                return RegistryReconciliation::without_match(
                    RegistryOutcome::Rejected,
                    format!("registry rejected request: {}", reason),
                );
            }
        };

        let Some((matched_id, status)) = self.select_company(&officers, company_name, company_id) else {
            return RegistryReconciliation::without_match(
                RegistryOutcome::NotFound,
                "registry: no company close enough to the trading name",
            );
        };
        if is_closed(&status) {
            return RegistryReconciliation::without_match(
                RegistryOutcome::NotFound,
                format!("registry: company {} is {}", matched_id, status),
            );
        }

        let observations: Vec<ExecutiveObservation> = officers
            .iter()
            .filter(|o| o.company_id == matched_id && !o.resigned && !is_corporate(o))
            .filter_map(|o| officer_observation(o, refinery))
            .collect();

        if observations.is_empty() {
            return RegistryReconciliation::without_match(
                RegistryOutcome::NotFound,
                format!("registry: company {} has no current officers", matched_id),
            );
        }

        info!(
            company = company_name,
            registry_id = %matched_id,
            officers = observations.len(),
            "Registry matched"
        );
        RegistryReconciliation {
            outcome: RegistryOutcome::Matched,
            observations,
            company_id: Some(matched_id),
            note: None,
        }
    }

    /// Picks the company the officers are taken from: the known id when given,
    /// otherwise the closest name at or above the match threshold
    fn select_company(
        &self,
        officers: &[OfficerRecord],
        company_name: &str,
        company_id: Option<&str>,
    ) -> Option<(String, String)> {
        if let Some(id) = company_id {
            return officers
                .iter()
                .find(|o| o.company_id.eq_ignore_ascii_case(id))
                .map(|o| (o.company_id.clone(), o.company_status.clone()));
        }

        let mut best: Option<(f64, &OfficerRecord)> = None;
        for officer in officers {
            let score = company_similarity(company_name, &officer.company_name);
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, officer));
            }
        }

        match best {
            Some((score, officer)) if score >= self.match_threshold => {
                debug!(
                    company = company_name,
                    registry_name = %officer.company_name,
                    score,
                    "Registry company selected"
                );
                Some((officer.company_id.clone(), officer.company_status.clone()))
            }
            _ => None,
        }
    }
}

/// Maps an officer to the same observation shape the website produces
fn officer_observation(officer: &OfficerRecord, refinery: &Refinery) -> Option<ExecutiveObservation> {
    let normalized = refinery.normalize_registry_name(&officer.officer_name);
    if normalized.split_whitespace().count() < 2 {
        return None;
    }

    let name = ValidatedName {
        candidate: Candidate {
            text: officer.officer_name.clone(),
            span: Span::new(0, officer.officer_name.len()),
            context: ContextWindow::default(),
            source_url: format!("registry:{}", officer.company_id),
            page_type: PageType::Unknown,
            pattern: PatternId::Registry,
        },
        validity: 1.0,
        normalized,
    };
    let (title, tier) = refinery.classify_role(&officer.role);

    Some(ExecutiveObservation {
        executive: refinery.titled(name, title, tier),
        contacts: ContactBundle::default(),
        source: DiscoverySource::Registry,
        relevance: RelevanceSignals::default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::network::memory::{MemoryRegistry, ScriptedFailure};
    use crate::refinery::Lexicon;

    fn officer(name: &str, role: &str, company: &str, status: &str) -> OfficerRecord {
        OfficerRecord {
            officer_name: name.to_string(),
            role: role.to_string(),
            company_id: "05123456".to_string(),
            company_name: company.to_string(),
            company_status: status.to_string(),
            resigned: false,
        }
    }

    fn refinery() -> Refinery {
        Refinery::new(Arc::new(Lexicon::builtin()), &PipelineConfig::default())
    }

    fn reconciler(registry: MemoryRegistry) -> RegistryReconciler {
        let config = OrchestrationConfig {
            retry_initial_backoff_ms: 10,
            ..Default::default()
        };
        RegistryReconciler::new(
            Arc::new(registry),
            Arc::new(CollaboratorLimiter::unlimited("registry")),
            &config,
        )
    }

    #[test]
    fn test_company_similarity_ignores_legal_form() {
        assert_eq!(comparable_company_name("Andrew Riley Heating Ltd."), "andrew riley heating");
        assert!(company_similarity("Andrew Riley Heating", "ANDREW RILEY HEATING LIMITED") > 0.99);
        assert!(company_similarity("Andrew Riley Heating", "Riley Logistics PLC") < 0.88);
        assert_eq!(company_similarity("Ltd", "Andrew Riley Heating"), 0.0);
    }

    #[tokio::test]
    async fn test_current_officers_become_observations() {
        let mut resigned = officer("JONES, Sarah", "secretary", "ANDREW RILEY HEATING LTD", "active");
        resigned.resigned = true;
        let registry = MemoryRegistry::found(vec![
            officer("RILEY, Andrew James", "director", "ANDREW RILEY HEATING LTD", "active"),
            resigned,
            officer("RILEY HOLDINGS LIMITED", "corporate-director", "ANDREW RILEY HEATING LTD", "active"),
        ]);

        let result = reconciler(registry)
            .reconcile("Andrew Riley Heating", None, &refinery())
            .await;

        assert_eq!(result.outcome, RegistryOutcome::Matched);
        assert_eq!(result.company_id.as_deref(), Some("05123456"));
        assert_eq!(result.observations.len(), 1);

        let observation = &result.observations[0];
        assert_eq!(observation.source, DiscoverySource::Registry);
        assert_eq!(observation.executive.name.normalized, "Andrew James Riley");
        assert_eq!(observation.merge_key(), "andrew riley");
        assert_eq!(observation.executive.name.validity, 1.0);
        assert!(observation.contacts.is_empty());
    }

    #[tokio::test]
    async fn test_unrelated_company_is_not_a_match() {
        let registry = MemoryRegistry::found(vec![officer("SMITH, John", "director", "SMITH LOGISTICS LTD", "active")]);
        let result = reconciler(registry)
            .reconcile("Andrew Riley Heating", None, &refinery())
            .await;
        assert_eq!(result.outcome, RegistryOutcome::NotFound);
        assert!(result.observations.is_empty());
    }

    #[tokio::test]
    async fn test_known_id_skips_name_matching() {
        let registry = MemoryRegistry::found(vec![officer("SMITH, John", "director", "ARH SERVICES LTD", "active")]);
        let result = reconciler(registry)
            .reconcile("Andrew Riley Heating", Some("05123456"), &refinery())
            .await;
        assert_eq!(result.outcome, RegistryOutcome::Matched);
        assert_eq!(result.observations[0].executive.name.normalized, "John Smith");
    }

    #[tokio::test]
    async fn test_dissolved_company_is_not_found() {
        let registry = MemoryRegistry::found(vec![officer(
            "RILEY, Andrew",
            "director",
            "ANDREW RILEY HEATING LTD",
            "dissolved",
        )]);
        let result = reconciler(registry)
            .reconcile("Andrew Riley Heating", None, &refinery())
            .await;
        assert_eq!(result.outcome, RegistryOutcome::NotFound);
        assert!(result.note.unwrap().contains("dissolved"));
    }

    #[tokio::test]
    async fn test_not_found_is_normal() {
        let result = reconciler(MemoryRegistry::not_found())
            .reconcile("Sole Trader Plumbing", None, &refinery())
            .await;
        assert_eq!(result.outcome, RegistryOutcome::NotFound);
    }

    #[tokio::test(start_paused = true)]
    async fn test_outage_is_retried_then_reported() {
        let registry = Arc::new(MemoryRegistry::failing(ScriptedFailure::Unavailable));
        let config = OrchestrationConfig {
            max_fetch_attempts: 2,
            retry_initial_backoff_ms: 10,
            ..Default::default()
        };
        let reconciler = RegistryReconciler::new(
            registry.clone(),
            Arc::new(CollaboratorLimiter::unlimited("registry")),
            &config,
        );

        let result = reconciler.reconcile("Andrew Riley Heating", None, &refinery()).await;
        assert_eq!(result.outcome, RegistryOutcome::Unavailable);
        assert_eq!(registry.calls(), 2);
    }

    #[tokio::test]
    async fn test_registry_refusal_is_not_retried_or_reported_as_outage() {
        let registry = Arc::new(MemoryRegistry::failing(ScriptedFailure::Status(403)));
        let config = OrchestrationConfig {
            max_fetch_attempts: 3,
            retry_initial_backoff_ms: 10,
            ..Default::default()
        };
        let reconciler = RegistryReconciler::new(
            registry.clone(),
            Arc::new(CollaboratorLimiter::unlimited("registry")),
            &config,
        );

        let result = reconciler.reconcile("Andrew Riley Heating", None, &refinery()).await;
        assert_eq!(result.outcome, RegistryOutcome::Rejected);
        assert!(result.note.as_deref().is_some_and(|n| n.contains("HTTP 403")));
        assert_eq!(registry.calls(), 1);
    }
}
