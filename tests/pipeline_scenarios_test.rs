use prospect_flow::config::PipelineConfig;
use prospect_flow::engine::{Collaborators, Orchestrator, SharedLimiters};
use prospect_flow::network::memory::{MemoryFetcher, MemoryProfileSearch, MemoryRegistry, ScriptedFailure};
use prospect_flow::network::OfficerRecord;
use prospect_flow::persistence::schema::{
    AttributionMethod, CompanyJob, DiscoverySource, ExecutiveRecord, JobState, QualityTier, RegistryOutcome,
};
use prospect_flow::refinery::Lexicon;
use std::sync::Arc;
use std::time::Duration;

// * Test Suite for end-to-end company jobs against in-memory collaborators

const HOME: &str = "https://andrewrileyheating.co.uk/";
const CONTACT_LINE: &str = "Contact: Andrew Riley, admin@andrewrileyheating.co.uk, 01214397129";

fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.orchestration.retry_initial_backoff_ms = 10;
    config
}

fn orchestrator_with(config: PipelineConfig, fetcher: MemoryFetcher, registry: MemoryRegistry) -> Orchestrator {
    let collaborators = Collaborators {
        fetcher: Arc::new(fetcher),
        registry: Arc::new(registry),
        profiles: Arc::new(MemoryProfileSearch::new()),
    };
    Orchestrator::with_limiters(
        config,
        Arc::new(Lexicon::builtin()),
        collaborators,
        SharedLimiters::unlimited(),
    )
}

fn orchestrator(fetcher: MemoryFetcher, registry: MemoryRegistry) -> Orchestrator {
    orchestrator_with(config(), fetcher, registry)
}

fn riley_officer() -> OfficerRecord {
    OfficerRecord {
        officer_name: "RILEY, Andrew".to_string(),
        role: "director".to_string(),
        company_id: "05123456".to_string(),
        company_name: "ANDREW RILEY HEATING LTD".to_string(),
        company_status: "active".to_string(),
        resigned: false,
    }
}

fn job() -> CompanyJob {
    CompanyJob::new("Andrew Riley Heating", HOME)
}

fn only_record(job: &CompanyJob) -> &ExecutiveRecord {
    assert_eq!(job.records.len(), 1, "records: {:?}", job.records);
    &job.records[0]
}

#[tokio::test]
async fn test_contact_line_publishes_one_attributed_record() {
    let fetcher = MemoryFetcher::new().with_text(HOME, CONTACT_LINE);
    let job = orchestrator(fetcher, MemoryRegistry::not_found()).run_job(job()).await;

    assert_eq!(job.state, JobState::Completed);
    let record = only_record(&job);
    assert_eq!(record.canonical_name, "Andrew Riley");
    assert_eq!(record.contacts.email.as_ref().unwrap().method, AttributionMethod::Direct);
    assert_eq!(record.contacts.phone.as_ref().unwrap().method, AttributionMethod::Proximity);
    assert!(record.confidence >= 0.70, "confidence {}", record.confidence);
    assert!(matches!(record.quality_tier, QualityTier::High | QualityTier::Premium));
    assert_eq!(record.sources, vec![DiscoverySource::Website]);
    assert_eq!(job.diagnostics.invariant_violations, 0);
}

#[tokio::test]
async fn test_service_banner_publishes_nothing() {
    let fetcher = MemoryFetcher::new().with_text(HOME, "Emergency Plumbing Services — Call Now — Opening Hours");
    let job = orchestrator(fetcher, MemoryRegistry::not_found()).run_job(job()).await;

    assert_eq!(job.state, JobState::Partial);
    assert!(job.records.is_empty());
    assert!(job.diagnostics.candidates_seen > 0);
    assert_eq!(job.diagnostics.candidates_published, 0);
    assert_eq!(job.diagnostics.candidates_rejected, job.diagnostics.candidates_seen);
    assert!(job.diagnostics.rejections_by_reason.contains_key("service_term"));
}

#[tokio::test]
async fn test_failed_fetch_with_registry_officer_completes() {
    let fetcher = MemoryFetcher::new().with_failure(HOME, ScriptedFailure::Timeout);
    let job = orchestrator(fetcher, MemoryRegistry::found(vec![riley_officer()]))
        .run_job(job())
        .await;

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.diagnostics.pages_fetched, 0);
    assert_eq!(job.diagnostics.registry_outcome, RegistryOutcome::Matched);
    assert_eq!(job.registry_id.as_deref(), Some("05123456"));
    let record = only_record(&job);
    assert_eq!(record.canonical_name, "Andrew Riley");
    assert_eq!(record.title, "Director");
    assert_eq!(record.sources, vec![DiscoverySource::Registry]);
    assert!(record.contacts.is_empty());
}

#[tokio::test]
async fn test_registry_agreement_raises_confidence() {
    let website_only = orchestrator(
        MemoryFetcher::new().with_text(HOME, CONTACT_LINE),
        MemoryRegistry::not_found(),
    )
    .run_job(job())
    .await;
    let registry_only = orchestrator(
        MemoryFetcher::new().with_failure(HOME, ScriptedFailure::Status(404)),
        MemoryRegistry::found(vec![riley_officer()]),
    )
    .run_job(job())
    .await;
    let both = orchestrator(
        MemoryFetcher::new().with_text(HOME, CONTACT_LINE),
        MemoryRegistry::found(vec![riley_officer()]),
    )
    .run_job(job())
    .await;

    let combined = only_record(&both);
    assert!(combined.confidence > only_record(&website_only).confidence);
    assert!(combined.confidence > only_record(&registry_only).confidence);
    assert_eq!(combined.title, "Director");
    assert!(combined.sources.contains(&DiscoverySource::Website));
    assert!(combined.sources.contains(&DiscoverySource::Registry));
    assert!(combined.contacts.email.is_some());
}

#[tokio::test]
async fn test_registry_agreement_counts_above_the_registry_floor() {
    const DESIGN_HOME: &str = "https://sarahjonesdesign.co.uk/";
    let secretary = || {
        MemoryRegistry::found(vec![OfficerRecord {
            officer_name: "JONES, Sarah".to_string(),
            role: "secretary".to_string(),
            company_id: "07654321".to_string(),
            company_name: "SARAH JONES DESIGN LTD".to_string(),
            company_status: "active".to_string(),
            resigned: false,
        }])
    };
    let design_job = || CompanyJob::new("Sarah Jones Design", DESIGN_HOME);
    let sarah = |job: &CompanyJob| -> ExecutiveRecord {
        job.records
            .iter()
            .find(|r| r.canonical_name == "Sarah Jones")
            .cloned()
            .unwrap_or_else(|| panic!("no Sarah Jones in {:?}", job.records))
    };

    let registry_only = orchestrator(
        MemoryFetcher::new().with_failure(DESIGN_HOME, ScriptedFailure::Status(404)),
        secretary(),
    )
    .run_job(design_job())
    .await;
    let both = orchestrator(
        MemoryFetcher::new().with_text(DESIGN_HOME, "Our office is run by Sarah Jones."),
        secretary(),
    )
    .run_job(design_job())
    .await;

    let alone = sarah(&registry_only);
    let combined = sarah(&both);
    assert_eq!(combined.title, "Secretary");
    assert!(combined.contacts.is_empty());
    assert!(
        combined.confidence > alone.confidence,
        "{} vs {}",
        combined.confidence,
        alone.confidence
    );
}

#[tokio::test]
async fn test_empty_home_page_without_registry_match_fails() {
    let fetcher = MemoryFetcher::new().with_text(HOME, "");
    let job = orchestrator(fetcher, MemoryRegistry::not_found()).run_job(job()).await;

    assert_eq!(job.state, JobState::Failed);
    assert!(job.records.is_empty());
}

#[tokio::test]
async fn test_identical_inputs_give_identical_records() {
    let run = || async {
        orchestrator(
            MemoryFetcher::new().with_text(HOME, CONTACT_LINE),
            MemoryRegistry::found(vec![riley_officer()]),
        )
        .run_job(job())
        .await
    };
    let first = run().await;
    let second = run().await;

    let summary = |job: &CompanyJob| -> Vec<(String, String, f64)> {
        job.records
            .iter()
            .map(|r| (r.canonical_name.clone(), r.title.clone(), r.confidence))
            .collect()
    };
    assert!(!first.records.is_empty());
    assert_eq!(summary(&first), summary(&second));
    assert_eq!(first.records[0].id, second.records[0].id);
}

#[tokio::test]
async fn test_registry_outage_does_not_fail_the_job() {
    let fetcher = MemoryFetcher::new().with_text(HOME, CONTACT_LINE);
    let registry = MemoryRegistry::failing(ScriptedFailure::Unavailable);
    let job = orchestrator(fetcher, registry).run_job(job()).await;

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.diagnostics.registry_outcome, RegistryOutcome::Unavailable);
    assert_eq!(only_record(&job).sources, vec![DiscoverySource::Website]);
}

#[tokio::test(start_paused = true)]
async fn test_job_deadline_yields_partial() {
    let mut config = config();
    config.orchestration.job_timeout_ms = 1_000;
    let fetcher = MemoryFetcher::new()
        .with_text(HOME, CONTACT_LINE)
        .with_latency(Duration::from_secs(10));

    let job = orchestrator_with(config, fetcher, MemoryRegistry::not_found())
        .run_job(job())
        .await;

    assert_eq!(job.state, JobState::Partial);
    assert!(job.diagnostics.timed_out);
    assert!(job.records.is_empty());
    assert!(job
        .diagnostics
        .notes
        .iter()
        .any(|n| n.starts_with("job timed out")));
}

#[tokio::test]
async fn test_flaky_home_page_is_retried() {
    let fetcher = MemoryFetcher::new().with_text(HOME, CONTACT_LINE).with_flaky(HOME, 1);
    let job = orchestrator(fetcher, MemoryRegistry::not_found()).run_job(job()).await;

    assert_eq!(job.state, JobState::Completed);
    assert_eq!(job.diagnostics.pages_fetched, 1);
}
