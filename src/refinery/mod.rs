// * The Refinery (per-page extraction pipeline)
// * Turns one cleaned page into executive observations: contact patterns,
// * name candidates, validation, title classification and attribution.
// * Everything here is synchronous and free of I/O.

pub mod contact_attributor;
pub mod content_cleaner;
pub mod lexicon;
pub mod name_extractor;
pub mod name_validator;
pub mod regex_extractor;
pub mod title_classifier;

// * Re-exports for convenient access
pub use contact_attributor::{AttributionOutcome, ContactAttributor};
pub use content_cleaner::{clean_page, BlockKind, CleanerConfig, ContentCleaner, PageContent, TextBlock};
pub use lexicon::{Lexicon, LexiconError, LexiconExtension};
pub use name_extractor::{NameExtractor, STRATEGIES};
pub use name_validator::{normalize_registry_name, NameValidator, Verdict};
pub use regex_extractor::{contact_key, ContactMention, ExtractorConfig, RegexExtractor};
pub use title_classifier::TitleClassifier;

use crate::config::PipelineConfig;
use crate::persistence::schema::{
    DiscoverySource, ExecutiveObservation, PageType, Rejection, RelevanceSignals, SeniorityTier,
    TitledExecutive, ValidatedName,
};
use serde::Serialize;
use std::sync::Arc;

// * Context tokens either side of a name scanned for testimonial language
const TESTIMONIAL_WINDOW: usize = 12;

// * Shortest surname that counts as appearing in a domain or trading name
const EPONYMOUS_MIN_LEN: usize = 3;

/// Company identity needed for relevance signals
#[derive(Debug, Clone, Default)]
pub struct CompanyContext {
    pub name: String,
    /// Registrable host without "www.", e.g. "andrewrileyheating.co.uk"
    pub domain: Option<String>,
}

impl CompanyContext {
    pub fn new(name: impl Into<String>, domain: Option<String>) -> Self {
        Self {
            name: name.into(),
            domain: domain.map(|d| d.trim_start_matches("www.").to_lowercase()),
        }
    }

    /// True when the surname shows up in the domain label or the trading name
    fn is_eponymous(&self, surname: &str) -> bool {
        let surname = surname.to_lowercase();
        if surname.chars().count() < EPONYMOUS_MIN_LEN {
            return false;
        }
        let in_domain = self
            .domain
            .as_deref()
            .and_then(|d| d.split('.').next())
            .is_some_and(|label| label.contains(&surname));
        let in_name = self
            .name
            .split(|c: char| !c.is_alphanumeric())
            .any(|t| t.to_lowercase() == surname);
        in_domain || in_name
    }

    fn owns_email(&self, email: &str) -> bool {
        let Some(domain) = self.domain.as_deref() else {
            return false;
        };
        let Some((_, host)) = email.rsplit_once('@') else {
            return false;
        };
        let host = host.to_lowercase();
        host == domain || host.ends_with(&format!(".{}", domain))
    }
}

/// Everything learned from one page
#[derive(Debug, Clone, Serialize)]
pub struct PageAnalysis {
    pub url: String,
    pub page_type: PageType,
    pub observations: Vec<ExecutiveObservation>,
    #[serde(skip)]
    pub rejections: Vec<Rejection>,
    /// Every contact mention on the page, attributed or not
    pub contacts: Vec<ContactMention>,
    pub candidates_seen: usize,
    pub unattributed_contacts: usize,
}

impl PageAnalysis {
    pub fn candidates_accepted(&self) -> usize {
        self.observations.len()
    }
}

/// The per-page pipeline
///
/// # Example
/// ```ignore
/// use prospect_flow::refinery::{CompanyContext, Refinery};
///
/// let refinery = Refinery::new(Arc::new(Lexicon::builtin()), &PipelineConfig::default());
/// let page = refinery.clean("https://andrewrileyheating.co.uk/", html, Some("text/html"));
/// let analysis = refinery.analyze(&page, &company);
///
/// println!("People found: {}", analysis.observations.len());
/// ```
pub struct Refinery {
    lexicon: Arc<Lexicon>,
    cleaner: ContentCleaner,
    extractor: RegexExtractor,
    names: NameExtractor,
    validator: NameValidator,
    titles: TitleClassifier,
    attributor: ContactAttributor,
}

impl Refinery {
    pub fn new(lexicon: Arc<Lexicon>, config: &PipelineConfig) -> Self {
        Self {
            lexicon,
            cleaner: ContentCleaner::new(),
            extractor: RegexExtractor::new(),
            names: NameExtractor::new(config.validation.context_tokens, config.attribution.proximity_radius),
            validator: NameValidator::new(config.validation.acceptance_threshold),
            titles: TitleClassifier::new(config.validation.title_max_distance),
            attributor: ContactAttributor::new(config.attribution.clone()),
        }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    /// Converts a fetched body into page content
    pub fn clean(&self, url: &str, body: &str, content_type: Option<&str>) -> PageContent {
        self.cleaner.clean(url, body, content_type)
    }

    /// Runs the page through the full pipeline
    ///
    /// # Pipeline Steps:
    /// 1. Extract contact mentions (emails, phones, profile URLs)
    /// 2. Extract name candidates with every strategy
    /// 3. Validate candidates, keeping rejections for diagnostics
    /// 4. Resolve overlapping accepted names
    /// 5. Attribute contacts to names
    /// 6. Classify titles and compute relevance signals
    pub fn analyze(&self, page: &PageContent, company: &CompanyContext) -> PageAnalysis {
        let lexicon = self.lexicon.as_ref();

        // * Step 1
        let contacts = self.extractor.extract(&page.text);

        // * Step 2
        let candidates = self.names.extract(page, &contacts, lexicon);
        let candidates_seen = candidates.len();

        // * Step 3
        let mut accepted = Vec::new();
        let mut rejections = Vec::new();
        for candidate in candidates {
            match self.validator.validate(candidate, lexicon) {
                Verdict::Accepted(name) => accepted.push(name),
                Verdict::Rejected(rejection) => rejections.push(rejection),
            }
        }

        // * Step 4
        let names = resolve_overlaps(accepted);

        // * Step 5
        let outcome = self.attributor.attribute(page, &names, &contacts, lexicon);

        // * Step 6
        let observations: Vec<ExecutiveObservation> = names
            .into_iter()
            .zip(outcome.bundles)
            .map(|(name, contacts)| {
                let testimonial_context = near_testimonial(&name, lexicon);
                let eponymous = company.is_eponymous(name.last_name());
                let company_domain_email = contacts.email.as_ref().is_some_and(|e| company.owns_email(&e.value));
                ExecutiveObservation {
                    executive: self.titles.classify(name, lexicon),
                    contacts,
                    source: DiscoverySource::Website,
                    relevance: RelevanceSignals {
                        page_type: page.page_type,
                        testimonial_context,
                        eponymous,
                        company_domain_email,
                    },
                }
            })
            .collect();

        tracing::debug!(
            url = %page.url,
            candidates = candidates_seen,
            accepted = observations.len(),
            rejected = rejections.len(),
            contacts = contacts.len(),
            "Page analyzed"
        );

        PageAnalysis {
            url: page.url.clone(),
            page_type: page.page_type,
            observations,
            rejections,
            unattributed_contacts: outcome.unattributed.len(),
            contacts,
            candidates_seen,
        }
    }

    /// Cleans and analyzes in one call
    pub fn process(&self, url: &str, body: &str, content_type: Option<&str>, company: &CompanyContext) -> PageAnalysis {
        let page = self.clean(url, body, content_type);
        self.analyze(&page, company)
    }

    /// Registry officer name in canonical order and casing
    pub fn normalize_registry_name(&self, raw: &str) -> String {
        normalize_registry_name(raw, &self.lexicon)
    }

    /// Registry role mapped onto the title ladder
    pub fn classify_role(&self, role: &str) -> (String, SeniorityTier) {
        self.titles.classify_role(role, &self.lexicon)
    }

    /// Wraps a name that did not come from page text (registry, search) as a titled executive
    pub fn titled(&self, name: ValidatedName, title: String, tier: SeniorityTier) -> TitledExecutive {
        TitledExecutive {
            name,
            title,
            tier,
            title_confidence: 1.0,
        }
    }
}

/// Keeps the best of any overlapping accepted names: highest validity times
/// pattern trust, then the longest span, then the earliest
fn resolve_overlaps(mut names: Vec<ValidatedName>) -> Vec<ValidatedName> {
    let strength = |n: &ValidatedName| n.validity * n.candidate.pattern.trust(n.candidate.page_type);
    names.sort_by(|a, b| {
        strength(b)
            .total_cmp(&strength(a))
            .then(b.candidate.span.len().cmp(&a.candidate.span.len()))
            .then(a.candidate.span.start.cmp(&b.candidate.span.start))
    });

    let mut kept: Vec<ValidatedName> = Vec::new();
    for name in names {
        if !kept.iter().any(|k| k.candidate.span.overlaps(&name.candidate.span)) {
            kept.push(name);
        }
    }
    kept.sort_by_key(|n| (n.candidate.span.start, n.candidate.span.end));
    kept
}

fn near_testimonial(name: &ValidatedName, lexicon: &Lexicon) -> bool {
    let before = &name.candidate.context.before;
    let after = &name.candidate.context.after;
    before
        .iter()
        .rev()
        .take(TESTIMONIAL_WINDOW)
        .chain(after.iter().take(TESTIMONIAL_WINDOW))
        .any(|t| lexicon.is_testimonial_marker(t))
}
