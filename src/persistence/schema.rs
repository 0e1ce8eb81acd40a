// * Data model for executive discovery
// * Candidates flow through validation, titling and attribution before being
// * merged into published ExecutiveRecords owned by a CompanyJob.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// Title used when no role phrase is found near a name
pub const UNKNOWN_TITLE: &str = "Unknown";

/// Kind of page a candidate was found on, inferred from the URL path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    Home,
    About,
    Team,
    Contact,
    Unknown,
}

impl PageType {
    /// Infers the page type from a URL's path
    pub fn from_url(page_url: &str) -> Self {
        let Ok(parsed) = url::Url::parse(page_url) else {
            return PageType::Unknown;
        };
        let path = parsed.path().to_lowercase();
        let trimmed = path.trim_matches('/');

        if trimmed.is_empty() || trimmed == "index.html" || trimmed == "index.php" {
            return PageType::Home;
        }
        if ["team", "people", "staff", "leadership", "management", "directors"]
            .iter()
            .any(|k| trimmed.contains(k))
        {
            return PageType::Team;
        }
        if trimmed.contains("about") || trimmed.contains("who-we-are") {
            return PageType::About;
        }
        if trimmed.contains("contact") {
            return PageType::Contact;
        }
        PageType::Unknown
    }

    /// Team and about pages are where decision-makers are usually listed
    pub fn is_people_page(&self) -> bool {
        matches!(self, PageType::Team | PageType::About)
    }
}

/// Extraction strategy that produced a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternId {
    CapitalizedSequence,
    Prefixed,
    Structural,
    EmailCompletion,
    Registry,
}

impl PatternId {
    /// Per-strategy trust multiplier applied to the name signal
    pub fn trust(&self, page_type: PageType) -> f64 {
        match self {
            PatternId::Registry => 1.0,
            PatternId::Structural if page_type.is_people_page() => 1.0,
            PatternId::Structural => 0.85,
            PatternId::Prefixed => 0.95,
            PatternId::CapitalizedSequence => 0.90,
            PatternId::EmailCompletion => 0.80,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PatternId::CapitalizedSequence => "capitalized_sequence",
            PatternId::Prefixed => "prefixed",
            PatternId::Structural => "structural",
            PatternId::EmailCompletion => "email_completion",
            PatternId::Registry => "registry",
        }
    }
}

/// Byte offsets into a page's linear text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Character gap between two spans (0 when they overlap)
    pub fn distance_to(&self, other: &Span) -> usize {
        if self.overlaps(other) {
            0
        } else if self.end <= other.start {
            other.start - self.end
        } else {
            self.start - other.end
        }
    }
}

/// Fixed-width token window around a candidate
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    /// Tokens preceding the candidate, nearest last
    pub before: Vec<String>,
    /// Tokens following the candidate, nearest first
    pub after: Vec<String>,
}

impl ContextWindow {
    pub fn joined(&self) -> String {
        let mut parts = self.before.clone();
        parts.extend(self.after.iter().cloned());
        parts.join(" ")
    }
}

/// A span of text hypothesized to be a person's name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub span: Span,
    pub context: ContextWindow,
    pub source_url: String,
    pub page_type: PageType,
    pub pattern: PatternId,
}

/// Why a candidate was rejected by the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    ServiceTerm,
    PlaceName,
    NotCapitalized,
    Blacklist,
    NotInReference,
    LowScore,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::ServiceTerm => "service_term",
            RejectionReason::PlaceName => "place_name",
            RejectionReason::NotCapitalized => "not_capitalized",
            RejectionReason::Blacklist => "blacklist",
            RejectionReason::NotInReference => "not_in_reference",
            RejectionReason::LowScore => "low_score",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic record for a rejected candidate; never propagated further
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub candidate: Candidate,
    pub reason: RejectionReason,
    pub score: f64,
}

/// A candidate accepted by semantic validation, with canonical casing applied
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedName {
    pub candidate: Candidate,
    pub validity: f64,
    pub normalized: String,
}

impl ValidatedName {
    pub fn tokens(&self) -> Vec<&str> {
        self.normalized.split_whitespace().collect()
    }

    pub fn first_name(&self) -> &str {
        self.normalized.split_whitespace().next().unwrap_or("")
    }

    pub fn last_name(&self) -> &str {
        self.normalized.split_whitespace().last().unwrap_or("")
    }

    /// Key used to group observations of the same person
    pub fn merge_key(&self) -> String {
        merge_key(&self.normalized)
    }
}

/// First and last token of a normalized name, lowercased
pub fn merge_key(normalized: &str) -> String {
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    match tokens.as_slice() {
        [] => String::new(),
        [only] => only.to_lowercase(),
        [first, .., last] => format!("{} {}", first, last).to_lowercase(),
    }
}

/// Coarse rank of a title
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SeniorityTier {
    #[serde(rename = "tier_1")]
    Tier1,
    #[serde(rename = "tier_2")]
    Tier2,
    #[serde(rename = "tier_3")]
    Tier3,
}

/// A validated name with an inferred business title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitledExecutive {
    pub name: ValidatedName,
    pub title: String,
    pub tier: SeniorityTier,
    /// How close the title phrase was to the name (0 when unknown)
    pub title_confidence: f64,
}

impl TitledExecutive {
    pub fn has_known_title(&self) -> bool {
        self.title != UNKNOWN_TITLE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactKind {
    Email,
    Phone,
    Profile,
}

/// How a contact detail was linked to a specific person
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionMethod {
    Direct,
    Signature,
    Proximity,
    Registry,
    Search,
}

impl AttributionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttributionMethod::Direct => "direct",
            AttributionMethod::Signature => "signature",
            AttributionMethod::Proximity => "proximity",
            AttributionMethod::Registry => "registry",
            AttributionMethod::Search => "search",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributedContact {
    pub value: String,
    pub method: AttributionMethod,
    pub confidence: f64,
    pub source_url: String,
}

/// Zero or more attributed contact fields for one person
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactBundle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<AttributedContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<AttributedContact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<AttributedContact>,
}

impl ContactBundle {
    pub fn get(&self, kind: ContactKind) -> Option<&AttributedContact> {
        match kind {
            ContactKind::Email => self.email.as_ref(),
            ContactKind::Phone => self.phone.as_ref(),
            ContactKind::Profile => self.profile.as_ref(),
        }
    }

    fn slot(&mut self, kind: ContactKind) -> &mut Option<AttributedContact> {
        match kind {
            ContactKind::Email => &mut self.email,
            ContactKind::Phone => &mut self.phone,
            ContactKind::Profile => &mut self.profile,
        }
    }

    /// Stores the contact unless an equal-or-higher confidence one is already held.
    /// Returns true if the slot changed.
    pub fn offer(&mut self, kind: ContactKind, contact: AttributedContact) -> bool {
        let slot = self.slot(kind);
        match slot {
            Some(existing) if existing.confidence >= contact.confidence => false,
            _ => {
                *slot = Some(contact);
                true
            }
        }
    }

    /// Folds every field of `other` into this bundle
    pub fn absorb(&mut self, other: &ContactBundle) {
        for (kind, contact) in other.iter() {
            self.offer(kind, contact.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (ContactKind, &AttributedContact)> {
        [
            (ContactKind::Email, self.email.as_ref()),
            (ContactKind::Phone, self.phone.as_ref()),
            (ContactKind::Profile, self.profile.as_ref()),
        ]
        .into_iter()
        .filter_map(|(kind, c)| c.map(|c| (kind, c)))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Origin of an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Website,
    Registry,
    ProfileSearch,
}

/// Signals used to judge whether a name is a decision-maker rather than a
/// customer or testimonial mention
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelevanceSignals {
    pub page_type: PageType,
    /// Review/testimonial language near the name
    pub testimonial_context: bool,
    /// The name appears in the company's domain or trading name
    pub eponymous: bool,
    /// An attributed email is on the company's own domain
    pub company_domain_email: bool,
}

impl Default for RelevanceSignals {
    fn default() -> Self {
        Self {
            page_type: PageType::Unknown,
            testimonial_context: false,
            eponymous: false,
            company_domain_email: false,
        }
    }
}

/// One sighting of a person from one source, pre-merge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveObservation {
    pub executive: TitledExecutive,
    pub contacts: ContactBundle,
    pub source: DiscoverySource,
    pub relevance: RelevanceSignals,
}

impl ExecutiveObservation {
    pub fn merge_key(&self) -> String {
        self.executive.name.merge_key()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityTier {
    Premium,
    High,
    Medium,
    Low,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Premium => "PREMIUM",
            QualityTier::High => "HIGH",
            QualityTier::Medium => "MEDIUM",
            QualityTier::Low => "LOW",
        }
    }
}

/// One physical person associated with one company; immutable once emitted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutiveRecord {
    pub id: String,
    pub canonical_name: String,
    pub title: String,
    pub tier: SeniorityTier,
    pub contacts: ContactBundle,
    pub confidence: f64,
    pub quality_tier: QualityTier,
    pub sources: Vec<DiscoverySource>,
    pub provenance_timestamp: u64,
}

/// Per-job lifecycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Pending,
    Fetching,
    Extracting,
    Reconciling,
    Scoring,
    Completed,
    Partial,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Completed | JobState::Partial | JobState::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "PENDING",
            JobState::Fetching => "FETCHING",
            JobState::Extracting => "EXTRACTING",
            JobState::Reconciling => "RECONCILING",
            JobState::Scoring => "SCORING",
            JobState::Completed => "COMPLETED",
            JobState::Partial => "PARTIAL",
            JobState::Failed => "FAILED",
        }
    }

    /// Legal forward transitions. Any live state may drop to PARTIAL when the
    /// job deadline expires.
    pub fn can_transition_to(&self, next: JobState) -> bool {
        use JobState::*;
        match (*self, next) {
            (Pending, Fetching) => true,
            (Fetching, Extracting) => true,
            // * Nothing fetched: skip straight to the registry
            (Fetching, Reconciling) => true,
            (Extracting, Reconciling) => true,
            (Reconciling, Scoring) => true,
            (Scoring, Completed) | (Scoring, Partial) | (Scoring, Failed) => true,
            (from, Partial) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum JobError {
    #[error("Illegal job transition {from} -> {to}")]
    InvalidTransition { from: JobState, to: JobState },
}

/// Outcome of the registry lookup, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryOutcome {
    #[default]
    NotAttempted,
    Matched,
    NotFound,
    Unavailable,
    Rejected,
}

/// Counters explaining what happened to a job's candidates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub pages_attempted: usize,
    pub pages_fetched: usize,
    pub pages_rendered: usize,
    pub candidates_seen: usize,
    pub candidates_rejected: usize,
    pub rejections_by_reason: BTreeMap<String, usize>,
    pub candidates_accepted: usize,
    pub contacts_found: usize,
    pub contacts_unattributed: usize,
    pub registry_outcome: RegistryOutcome,
    pub registry_officers: usize,
    pub profile_lookups: usize,
    pub profile_lookup_failures: usize,
    pub records_below_threshold: usize,
    pub invariant_violations: usize,
    pub candidates_published: usize,
    pub timed_out: bool,
    pub notes: Vec<String>,
}

impl Diagnostics {
    pub fn record_rejection(&mut self, reason: RejectionReason) {
        self.candidates_rejected += 1;
        *self
            .rejections_by_reason
            .entry(reason.as_str().to_string())
            .or_default() += 1;
    }

    pub fn note(&mut self, message: impl Into<String>) {
        self.notes.push(message.into());
    }
}

/// One company to process; owns the records it produces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyJob {
    pub company_name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_id: Option<String>,
    #[serde(default = "pending_state")]
    pub state: JobState,
    #[serde(default)]
    pub records: Vec<ExecutiveRecord>,
    #[serde(default)]
    pub diagnostics: Diagnostics,
}

fn pending_state() -> JobState {
    JobState::Pending
}

impl CompanyJob {
    pub fn new(company_name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            company_name: company_name.into(),
            url: url.into(),
            registry_id: None,
            state: JobState::Pending,
            records: Vec::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn with_registry_id(mut self, registry_id: impl Into<String>) -> Self {
        self.registry_id = Some(registry_id.into());
        self
    }

    /// Moves the job to `next`, refusing illegal transitions
    pub fn transition(&mut self, next: JobState) -> Result<(), JobError> {
        if !self.state.can_transition_to(next) {
            return Err(JobError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(company = %self.company_name, from = %self.state, to = %next, "Job state change");
        self.state = next;
        Ok(())
    }

    /// Registrable domain of the company URL, without a leading "www."
    pub fn domain(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_lowercase()))
    }
}

pub fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contact(value: &str, method: AttributionMethod, confidence: f64) -> AttributedContact {
        AttributedContact {
            value: value.to_string(),
            method,
            confidence,
            source_url: "https://example.co.uk/".to_string(),
        }
    }

    #[test]
    fn test_page_type_inference() {
        assert_eq!(PageType::from_url("https://example.co.uk/"), PageType::Home);
        assert_eq!(PageType::from_url("https://example.co.uk/about-us"), PageType::About);
        assert_eq!(PageType::from_url("https://example.co.uk/our-team/"), PageType::Team);
        assert_eq!(PageType::from_url("https://example.co.uk/contact"), PageType::Contact);
        assert_eq!(PageType::from_url("https://example.co.uk/services/boilers"), PageType::Unknown);
        assert_eq!(PageType::from_url("not a url"), PageType::Unknown);
    }

    #[test]
    fn test_span_distance() {
        let a = Span::new(0, 10);
        let b = Span::new(15, 20);
        assert_eq!(a.distance_to(&b), 5);
        assert_eq!(b.distance_to(&a), 5);
        assert_eq!(a.distance_to(&Span::new(5, 12)), 0);
        assert!(Span::new(0, 20).contains(&Span::new(3, 8)));
    }

    #[test]
    fn test_merge_key_drops_middle_names() {
        assert_eq!(merge_key("Andrew James Riley"), "andrew riley");
        assert_eq!(merge_key("Andrew Riley"), "andrew riley");
        assert_eq!(merge_key(""), "");
    }

    #[test]
    fn test_bundle_never_downgrades() {
        let mut bundle = ContactBundle::default();
        assert!(bundle.offer(ContactKind::Email, contact("a@x.co.uk", AttributionMethod::Direct, 0.95)));
        assert!(!bundle.offer(ContactKind::Email, contact("b@x.co.uk", AttributionMethod::Proximity, 0.6)));
        assert_eq!(bundle.email.as_ref().unwrap().value, "a@x.co.uk");

        assert!(bundle.offer(ContactKind::Phone, contact("0121", AttributionMethod::Proximity, 0.6)));
        assert_eq!(bundle.len(), 2);
    }

    #[test]
    fn test_job_state_machine() {
        let mut job = CompanyJob::new("Riley Heating", "https://www.andrewrileyheating.co.uk/");
        assert!(job.transition(JobState::Extracting).is_err());
        job.transition(JobState::Fetching).unwrap();
        job.transition(JobState::Reconciling).unwrap();
        job.transition(JobState::Scoring).unwrap();
        job.transition(JobState::Completed).unwrap();
        assert!(job.state.is_terminal());
        assert_eq!(
            job.transition(JobState::Partial),
            Err(JobError::InvalidTransition {
                from: JobState::Completed,
                to: JobState::Partial
            })
        );
    }

    #[test]
    fn test_timeout_drop_to_partial_from_live_state() {
        assert!(JobState::Fetching.can_transition_to(JobState::Partial));
        assert!(JobState::Reconciling.can_transition_to(JobState::Partial));
        assert!(!JobState::Fetching.can_transition_to(JobState::Completed));
    }

    #[test]
    fn test_domain_strips_www() {
        let job = CompanyJob::new("Riley", "https://www.andrewrileyheating.co.uk/");
        assert_eq!(job.domain().as_deref(), Some("andrewrileyheating.co.uk"));
    }

    #[test]
    fn test_state_serializes_uppercase() {
        let json = serde_json::to_string(&JobState::Partial).unwrap();
        assert_eq!(json, "\"PARTIAL\"");
        let tier = serde_json::to_string(&SeniorityTier::Tier1).unwrap();
        assert_eq!(tier, "\"tier_1\"");
    }
}
