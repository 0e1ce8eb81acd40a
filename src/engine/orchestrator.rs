// * Batch orchestrator and per-job state machine
// * PENDING -> FETCHING -> EXTRACTING -> RECONCILING -> SCORING -> COMPLETED | PARTIAL | FAILED
// * Jobs run on a bounded worker pool; inside a job, sub-page fetches run
// * concurrently and the registry and profile lookups run side by side.
// * Every failure below the job is converted into "no signal"; a batch always
// * returns one terminal job per input.

use crate::config::PipelineConfig;
use crate::engine::density::is_thin;
use crate::engine::fingerprint::compute_page_fingerprint;
use crate::engine::normalization::{conventional_subpages, discover_subpages, normalize_url};
use crate::engine::profile_discoverer::ProfileDiscoverer;
use crate::engine::rate_limiter::SharedLimiters;
use crate::engine::registry_reconciler::RegistryReconciler;
use crate::engine::retry::{with_retry, RetryPolicy};
use crate::network::{FetchedPage, NetworkError, PageFetcher, ProfileSearch, RegistrySearch};
use crate::ops::alerting::{AlertConfig, AlertManager};
use crate::ops::telemetry;
use crate::persistence::confidence::ConfidenceScorer;
use crate::persistence::dedup::ExecutiveMerger;
use crate::persistence::schema::{
    CompanyJob, ContactKind, ExecutiveObservation, ExecutiveRecord, JobError, JobState, RegistryOutcome,
};
use crate::refinery::regex_extractor::{contact_key, is_profile_url};
use crate::refinery::{CompanyContext, Lexicon, Refinery};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// External collaborators a job talks to
#[derive(Clone)]
pub struct Collaborators {
    pub fetcher: Arc<dyn PageFetcher>,
    pub registry: Arc<dyn RegistrySearch>,
    pub profiles: Arc<dyn ProfileSearch>,
}

/// Every contact value seen in page content or returned by a collaborator
/// during one job. Published contacts must come from here.
#[derive(Debug, Default)]
pub struct ObservedContacts {
    keys: HashSet<String>,
}

impl ObservedContacts {
    pub fn record(&mut self, kind: ContactKind, value: &str) {
        self.keys.insert(format!("{:?}:{}", kind, contact_key(kind, value)));
    }

    pub fn contains(&self, kind: ContactKind, value: &str) -> bool {
        self.keys.contains(&format!("{:?}:{}", kind, contact_key(kind, value)))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Publication guard: every contact field must carry an observed value,
    /// and profile fields must be real profile URLs
    pub fn check(&self, record: &ExecutiveRecord) -> Result<(), String> {
        for (kind, contact) in record.contacts.iter() {
            if contact.value.trim().is_empty() {
                return Err(format!("{:?} field is empty", kind));
            }
            if kind == ContactKind::Profile && !is_profile_url(&contact.value) {
                return Err(format!("profile '{}' is not a profile URL", contact.value));
            }
            if !self.contains(kind, &contact.value) {
                return Err(format!(
                    "{:?} '{}' ({}) was never observed",
                    kind,
                    contact.value,
                    contact.method.as_str()
                ));
            }
        }
        Ok(())
    }
}

// * A fetched page plus whether the rendering fallback produced it
struct Fetched {
    page: FetchedPage,
    rendered: bool,
}

/// Mutable state of one running job; survives a job timeout
struct JobWork {
    job: CompanyJob,
    company: CompanyContext,
    pages: Vec<FetchedPage>,
    fingerprints: HashSet<u64>,
    observations: Vec<ExecutiveObservation>,
    observed: ObservedContacts,
}

impl JobWork {
    fn new(job: CompanyJob) -> Self {
        let company = CompanyContext::new(job.company_name.clone(), job.domain());
        Self {
            job,
            company,
            pages: Vec::new(),
            fingerprints: HashSet::new(),
            observations: Vec::new(),
            observed: ObservedContacts::default(),
        }
    }
}

fn looks_like_html(page: &FetchedPage) -> bool {
    match page.content_type.as_deref() {
        Some(ct) => ct.to_lowercase().contains("html"),
        None => page.body.trim_start().starts_with('<'),
    }
}

/// Runs company jobs end to end
///
/// # Example
/// ```ignore
/// use prospect_flow::engine::orchestrator::{Collaborators, Orchestrator};
///
/// let orchestrator = Orchestrator::new(config, Arc::new(Lexicon::builtin()), collaborators);
/// let jobs = orchestrator.run_batch(jobs, 3).await;
/// for job in &jobs {
///     println!("{}: {} ({} records)", job.company_name, job.state, job.records.len());
/// }
/// ```
pub struct Orchestrator {
    config: PipelineConfig,
    refinery: Arc<Refinery>,
    collaborators: Collaborators,
    reconciler: RegistryReconciler,
    discoverer: ProfileDiscoverer,
    scorer: ConfidenceScorer,
    alerts: Arc<AlertManager>,
}

impl Orchestrator {
    pub fn new(config: PipelineConfig, lexicon: Arc<Lexicon>, collaborators: Collaborators) -> Self {
        let limiters = SharedLimiters::from_config(&config.orchestration);
        Self::with_limiters(config, lexicon, collaborators, limiters)
    }

    /// Builds an orchestrator drawing from externally owned rate limiters, so
    /// several orchestrators can share one outbound quota
    pub fn with_limiters(
        config: PipelineConfig,
        lexicon: Arc<Lexicon>,
        collaborators: Collaborators,
        limiters: SharedLimiters,
    ) -> Self {
        let refinery = Arc::new(Refinery::new(lexicon, &config));
        let reconciler = RegistryReconciler::new(
            collaborators.registry.clone(),
            limiters.registry.clone(),
            &config.orchestration,
        );
        let discoverer = ProfileDiscoverer::new(collaborators.profiles.clone(), limiters.search.clone(), &config);
        let scorer = ConfidenceScorer::new(config.scoring.clone());
        let alerts = AlertManager::with_config(AlertConfig {
            flood: config.flood.clone(),
            ..Default::default()
        });
        Self {
            config,
            refinery,
            collaborators,
            reconciler,
            discoverer,
            scorer,
            alerts: Arc::new(alerts),
        }
    }

    pub fn with_alerts(mut self, alerts: Arc<AlertManager>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn refinery(&self) -> &Refinery {
        &self.refinery
    }

    /// Processes every job with at most `concurrency` in flight. Results keep
    /// the input order.
    pub async fn run_batch(&self, jobs: Vec<CompanyJob>, concurrency: usize) -> Vec<CompanyJob> {
        let concurrency = concurrency.max(1);
        let total = jobs.len();
        info!(jobs = total, concurrency, "Batch started");

        let finished: Vec<CompanyJob> = stream::iter(jobs)
            .map(|job| self.run_job(job))
            .buffered(concurrency)
            .collect()
            .await;

        let completed = finished.iter().filter(|j| j.state == JobState::Completed).count();
        let published: usize = finished.iter().map(|j| j.records.len()).sum();
        info!(jobs = total, completed, published, "Batch finished");
        finished
    }

    /// Drives one job to a terminal state under the per-job deadline
    pub async fn run_job(&self, job: CompanyJob) -> CompanyJob {
        if job.state != JobState::Pending {
            warn!(company = %job.company_name, state = %job.state, "Job is not pending, skipping");
            return job;
        }

        let started = Instant::now();
        let job_timeout = self.config.orchestration.job_timeout();
        let mut work = JobWork::new(job);

        let interrupted = match tokio::time::timeout(job_timeout, self.drive(&mut work)).await {
            Ok(Ok(())) => false,
            Ok(Err(e)) => {
                error!(company = %work.job.company_name, error = %e, "Job state machine error");
                work.job.diagnostics.note(e.to_string());
                true
            }
            Err(_) => {
                warn!(
                    company = %work.job.company_name,
                    state = %work.job.state,
                    timeout_ms = job_timeout.as_millis() as u64,
                    "Job deadline expired"
                );
                work.job.diagnostics.timed_out = true;
                work.job
                    .diagnostics
                    .note(format!("job timed out during {}", work.job.state));
                true
            }
        };

        self.publish(&mut work);
        self.conclude(&mut work, interrupted);

        let job = work.job;
        telemetry::record_job(job.state.as_str(), started.elapsed().as_secs_f64());
        info!(
            company = %job.company_name,
            state = %job.state,
            candidates_seen = job.diagnostics.candidates_seen,
            rejected = job.diagnostics.candidates_rejected,
            published = job.diagnostics.candidates_published,
            "Job finished"
        );
        job
    }

    async fn drive(&self, work: &mut JobWork) -> Result<(), JobError> {
        work.job.transition(JobState::Fetching)?;
        self.fetch_stage(work).await;

        if work.pages.is_empty() {
            // * No content at all: the registry is the only remaining signal
            work.job.transition(JobState::Reconciling)?;
        } else {
            work.job.transition(JobState::Extracting)?;
            self.extract_stage(work);
            work.job.transition(JobState::Reconciling)?;
        }

        self.reconcile_stage(work).await;
        work.job.transition(JobState::Scoring)?;
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Fetching
    // ---------------------------------------------------------------------

    fn fetch_policy(&self) -> RetryPolicy {
        let o = &self.config.orchestration;
        RetryPolicy::new(o.max_fetch_attempts, Duration::from_millis(o.retry_initial_backoff_ms))
    }

    /// Plain fetch with retry and a per-attempt timeout; a thin result is
    /// re-fetched through the rendering fallback when one is available
    async fn fetch_page(&self, url: &str) -> Result<Fetched, NetworkError> {
        let fetcher = &self.collaborators.fetcher;
        let timeout = self.config.orchestration.page_timeout();

        let page = with_retry(self.fetch_policy(), "fetch", || async move {
            match tokio::time::timeout(timeout, fetcher.fetch(url)).await {
                Ok(result) => result,
                Err(_) => Err(NetworkError::Timeout(timeout)),
            }
        })
        .await?;

        if fetcher.supports_render() && is_thin(&page.body, page.content_type.as_deref()) {
            match tokio::time::timeout(timeout, fetcher.render(url)).await {
                Ok(Ok(rendered)) if !rendered.body.trim().is_empty() => {
                    debug!(url, "Thin page replaced by rendered content");
                    return Ok(Fetched {
                        page: rendered,
                        rendered: true,
                    });
                }
                Ok(Err(e)) => debug!(url, error = %e, "Render fallback failed"),
                _ => debug!(url, "Render fallback produced nothing"),
            }
        }

        Ok(Fetched { page, rendered: false })
    }

    fn accept_page(work: &mut JobWork, fetched: Fetched) {
        let diagnostics = &mut work.job.diagnostics;
        diagnostics.pages_fetched += 1;
        if fetched.rendered {
            diagnostics.pages_rendered += 1;
        }

        let page = fetched.page;
        if page.body.trim().is_empty() {
            diagnostics.note(format!("empty content: {}", page.url));
            return;
        }
        if !work.fingerprints.insert(compute_page_fingerprint(&page.body)) {
            debug!(url = %page.url, "Duplicate page body skipped");
            return;
        }
        work.pages.push(page);
    }

    async fn fetch_stage(&self, work: &mut JobWork) {
        let max_subpages = self.config.orchestration.max_subpages;
        let root = normalize_url(&work.job.url, &work.job.url).unwrap_or_else(|| work.job.url.clone());

        work.job.diagnostics.pages_attempted += 1;
        let home = match self.fetch_page(&root).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(company = %work.job.company_name, url = %root, error = %e, "Home page fetch failed");
                work.job.diagnostics.note(format!("fetch failed: {}: {}", root, e));
                return;
            }
        };

        let subpages = if looks_like_html(&home.page) {
            let linked = discover_subpages(&home.page.body, &root, max_subpages);
            if linked.is_empty() {
                conventional_subpages(&root, max_subpages)
            } else {
                linked
            }
        } else {
            Vec::new()
        };
        Self::accept_page(work, home);

        if subpages.is_empty() {
            return;
        }
        debug!(company = %work.job.company_name, subpages = subpages.len(), "Fetching sub-pages");
        work.job.diagnostics.pages_attempted += subpages.len();

        let results = join_all(subpages.iter().map(|url| self.fetch_page(url))).await;
        for (url, result) in subpages.iter().zip(results) {
            match result {
                Ok(fetched) => Self::accept_page(work, fetched),
                Err(e) if e.is_not_found() => debug!(url = %url, "Sub-page not found"),
                Err(e) => {
                    warn!(url = %url, error = %e, "Sub-page fetch failed");
                    work.job.diagnostics.note(format!("fetch failed: {}: {}", url, e));
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Extracting
    // ---------------------------------------------------------------------

    fn extract_stage(&self, work: &mut JobWork) {
        let mut seen = 0;
        for page in &work.pages {
            let analysis = self
                .refinery
                .process(&page.url, &page.body, page.content_type.as_deref(), &work.company);

            let diagnostics = &mut work.job.diagnostics;
            diagnostics.candidates_seen += analysis.candidates_seen;
            diagnostics.candidates_accepted += analysis.candidates_accepted();
            diagnostics.contacts_found += analysis.contacts.len();
            diagnostics.contacts_unattributed += analysis.unattributed_contacts;
            for rejection in &analysis.rejections {
                debug!(
                    candidate = %rejection.candidate.text,
                    reason = %rejection.reason,
                    score = rejection.score,
                    "Candidate rejected"
                );
                diagnostics.record_rejection(rejection.reason);
                telemetry::record_rejection(rejection.reason.as_str());
            }

            for mention in &analysis.contacts {
                work.observed.record(mention.kind, &mention.value);
            }
            seen += analysis.candidates_seen;
            work.observations.extend(analysis.observations);
        }
        telemetry::record_candidates_seen(seen);
    }

    // ---------------------------------------------------------------------
    // Reconciling
    // ---------------------------------------------------------------------

    async fn reconcile_stage(&self, work: &mut JobWork) {
        let (registry, profiles) = tokio::join!(
            self.reconciler.reconcile(
                &work.job.company_name,
                work.job.registry_id.as_deref(),
                &self.refinery
            ),
            self.discoverer.discover(&work.observations, &work.job.company_name),
        );

        let diagnostics = &mut work.job.diagnostics;
        diagnostics.registry_outcome = registry.outcome;
        diagnostics.registry_officers = registry.observations.len();
        if let Some(note) = registry.note {
            diagnostics.note(note);
        }
        if work.job.registry_id.is_none() {
            work.job.registry_id = registry.company_id;
        }
        self.alerts
            .record_collaborator("registry", registry.outcome == RegistryOutcome::Unavailable);

        diagnostics.profile_lookups += profiles.lookups;
        diagnostics.profile_lookup_failures += profiles.failures;
        for i in 0..profiles.lookups {
            self.alerts.record_collaborator("profile_search", i < profiles.failures);
        }
        for url in &profiles.returned {
            work.observed.record(ContactKind::Profile, url);
        }

        work.observations.extend(registry.observations);
        work.observations.extend(profiles.observations);
    }

    // ---------------------------------------------------------------------
    // Scoring
    // ---------------------------------------------------------------------

    /// Merges, scores and guards whatever signals the job collected
    fn publish(&self, work: &mut JobWork) {
        let mut merger = ExecutiveMerger::new();
        let merged = merger.merge(std::mem::take(&mut work.observations));
        let publication = self.scorer.publish(&work.job.url, merged);
        work.job.diagnostics.records_below_threshold = publication.below_threshold;

        let mut records = Vec::with_capacity(publication.records.len());
        for record in publication.records {
            match work.observed.check(&record) {
                Ok(()) => records.push(record),
                Err(detail) => {
                    // ! Fatal to the record only
                    error!(
                        company = %work.job.company_name,
                        record = %record.canonical_name,
                        detail = %detail,
                        "Invariant violation: record dropped"
                    );
                    work.job.diagnostics.invariant_violations += 1;
                    telemetry::record_invariant_violation();
                    self.alerts
                        .invariant_violation(&work.job.company_name, &record.canonical_name, &detail);
                }
            }
        }

        for record in &records {
            telemetry::record_published(record.quality_tier.as_str());
        }
        work.job.diagnostics.candidates_published = records.len();
        self.alerts
            .check_flood(&work.job.company_name, records.len(), work.job.diagnostics.candidates_seen);
        work.job.records = records;
    }

    /// Picks the terminal state
    fn conclude(&self, work: &mut JobWork, interrupted: bool) {
        let job = &mut work.job;
        let terminal = if interrupted || job.state != JobState::Scoring {
            JobState::Partial
        } else if !job.records.is_empty() {
            JobState::Completed
        } else if work.pages.is_empty() && job.diagnostics.registry_outcome != RegistryOutcome::Matched {
            JobState::Failed
        } else {
            JobState::Partial
        };

        if let Err(e) = job.transition(terminal) {
            // * Only reachable if the job is already terminal
            error!(company = %job.company_name, error = %e, "Could not conclude job");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::memory::{MemoryFetcher, MemoryProfileSearch, MemoryRegistry, ScriptedFailure};
    use crate::network::OfficerRecord;
    use crate::persistence::schema::{
        AttributedContact, AttributionMethod, ContactBundle, DiscoverySource, QualityTier, SeniorityTier,
    };

    const HOME: &str = "https://andrewrileyheating.co.uk/";

    fn orchestrator(fetcher: MemoryFetcher, registry: MemoryRegistry) -> Orchestrator {
        let collaborators = Collaborators {
            fetcher: Arc::new(fetcher),
            registry: Arc::new(registry),
            profiles: Arc::new(MemoryProfileSearch::new()),
        };
        let mut config = PipelineConfig::default();
        config.orchestration.retry_initial_backoff_ms = 10;
        Orchestrator::with_limiters(
            config,
            Arc::new(Lexicon::builtin()),
            collaborators,
            SharedLimiters::unlimited(),
        )
    }

    fn record_with(kind: ContactKind, value: &str) -> ExecutiveRecord {
        let mut contacts = ContactBundle::default();
        contacts.offer(
            kind,
            AttributedContact {
                value: value.to_string(),
                method: AttributionMethod::Proximity,
                confidence: 0.6,
                source_url: HOME.to_string(),
            },
        );
        ExecutiveRecord {
            id: "0".to_string(),
            canonical_name: "Andrew Riley".to_string(),
            title: "Director".to_string(),
            tier: SeniorityTier::Tier2,
            contacts,
            confidence: 0.8,
            quality_tier: QualityTier::High,
            sources: vec![DiscoverySource::Website],
            provenance_timestamp: 0,
        }
    }

    #[test]
    fn test_guard_rejects_unobserved_values() {
        let mut observed = ObservedContacts::default();
        observed.record(ContactKind::Email, "Admin@AndrewRileyHeating.co.uk");
        assert!(observed.check(&record_with(ContactKind::Email, "admin@andrewrileyheating.co.uk")).is_ok());
        assert!(observed.check(&record_with(ContactKind::Email, "andrew@andrewrileyheating.co.uk")).is_err());
        assert!(observed
            .check(&record_with(ContactKind::Profile, "https://www.linkedin.com/in/andrew-riley"))
            .is_err());
        assert!(observed.check(&record_with(ContactKind::Phone, "")).is_err());
    }

    #[tokio::test]
    async fn test_contact_line_completes() {
        let fetcher = MemoryFetcher::new().with_text(
            HOME,
            "Contact: Andrew Riley, admin@andrewrileyheating.co.uk, 01214397129",
        );
        let job = orchestrator(fetcher, MemoryRegistry::not_found())
            .run_job(CompanyJob::new("Andrew Riley Heating", HOME))
            .await;

        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.records.len(), 1);
        assert_eq!(job.diagnostics.pages_fetched, 1);
        assert_eq!(job.diagnostics.registry_outcome, RegistryOutcome::NotFound);
        assert_eq!(job.diagnostics.invariant_violations, 0);
    }

    #[tokio::test]
    async fn test_nothing_fetchable_and_no_registry_fails() {
        let fetcher = MemoryFetcher::new().with_failure(HOME, ScriptedFailure::Status(403));
        let job = orchestrator(fetcher, MemoryRegistry::not_found())
            .run_job(CompanyJob::new("Andrew Riley Heating", HOME))
            .await;

        assert_eq!(job.state, JobState::Failed);
        assert!(job.records.is_empty());
        assert_eq!(job.diagnostics.pages_fetched, 0);
        assert!(job.diagnostics.notes.iter().any(|n| n.starts_with("fetch failed")));
    }

    #[tokio::test]
    async fn test_empty_page_and_no_registry_fails() {
        let fetcher = MemoryFetcher::new().with_text(HOME, "");
        let job = orchestrator(fetcher, MemoryRegistry::not_found())
            .run_job(CompanyJob::new("Andrew Riley Heating", HOME))
            .await;

        assert_eq!(job.state, JobState::Failed);
        assert!(job.records.is_empty());
        assert_eq!(job.diagnostics.pages_fetched, 1);
        assert!(job.diagnostics.notes.iter().any(|n| n.starts_with("empty content")));
    }

    #[tokio::test]
    async fn test_registry_only_completes() {
        let fetcher = MemoryFetcher::new().with_failure(HOME, ScriptedFailure::Status(404));
        let registry = MemoryRegistry::found(vec![OfficerRecord {
            officer_name: "RILEY, Andrew James".to_string(),
            role: "director".to_string(),
            company_id: "05123456".to_string(),
            company_name: "ANDREW RILEY HEATING LTD".to_string(),
            company_status: "active".to_string(),
            resigned: false,
        }]);
        let job = orchestrator(fetcher, registry)
            .run_job(CompanyJob::new("Andrew Riley Heating", HOME))
            .await;

        assert_eq!(job.state, JobState::Completed);
        assert_eq!(job.records.len(), 1);
        assert_eq!(job.records[0].sources, vec![DiscoverySource::Registry]);
    }

    #[tokio::test]
    async fn test_subpages_fetched_from_home_links() {
        let home = r#"<html><body>
            <nav><a href="/meet-the-team">Meet the team</a><a href="/contact">Contact</a></nav>
            <p>Family-run heating engineers serving Birmingham since 1998.</p>
        </body></html>"#;
        let team = r#"<html><body><h2>Andrew Riley</h2><p>Managing Director</p></body></html>"#;
        let fetcher = MemoryFetcher::new()
            .with_html(HOME, home)
            .with_html("https://andrewrileyheating.co.uk/meet-the-team", team);

        let job = orchestrator(fetcher, MemoryRegistry::not_found())
            .run_job(CompanyJob::new("Andrew Riley Heating", HOME))
            .await;

        assert_eq!(job.diagnostics.pages_attempted, 3);
        assert_eq!(job.diagnostics.pages_fetched, 2);
        assert!(job.diagnostics.candidates_seen > 0);
    }

    #[tokio::test]
    async fn test_non_pending_job_is_returned_untouched() {
        let mut job = CompanyJob::new("Andrew Riley Heating", HOME);
        job.state = JobState::Completed;
        let out = orchestrator(MemoryFetcher::new(), MemoryRegistry::not_found())
            .run_job(job.clone())
            .await;
        assert_eq!(out, job);
    }
}
