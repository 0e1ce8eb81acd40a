// * Profile discovery
// * Looks up professional-network profiles for website names that have none.
// * A profile is only attached when a collaborator actually returned it; a URL
// * is never built from a name.

use crate::config::PipelineConfig;
use crate::engine::rate_limiter::CollaboratorLimiter;
use crate::engine::retry::{collaborator_call, RetryPolicy};
use crate::network::{EmployeeListing, Lookup, ProfileSearch};
use crate::persistence::schema::{
    merge_key, AttributedContact, AttributionMethod, ContactBundle, ContactKind, DiscoverySource,
    ExecutiveObservation,
};
use crate::refinery::regex_extractor::{canonical_profile_url, is_profile_url, profile_slug};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Profiles found for one company, plus everything the collaborator returned
#[derive(Debug, Clone, Default)]
pub struct ProfileDiscovery {
    pub observations: Vec<ExecutiveObservation>,
    /// Canonical URLs returned by the collaborator, matched or not
    pub returned: Vec<String>,
    pub lookups: usize,
    pub failures: usize,
}

/// Search query restricted to profile pages
pub fn build_query(name: &str, company: &str) -> String {
    format!("site:linkedin.com/in \"{}\" \"{}\"", name, company)
}

/// Canonical form of a returned URL, or None when it is not a profile link
fn canonical_if_profile(url: &str) -> Option<String> {
    if !url.to_lowercase().contains("linkedin.com/in/") {
        return None;
    }
    let canonical = canonical_profile_url(url);
    is_profile_url(&canonical).then_some(canonical)
}

fn slug_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// True when the profile slug carries both the first and the last name
pub fn slug_matches(profile_url: &str, first_name: &str, last_name: &str) -> bool {
    let Some(slug) = profile_slug(profile_url) else {
        return false;
    };
    let slug: String = slug.chars().filter(|c| c.is_alphanumeric()).collect();
    let (first, last) = (slug_token(first_name), slug_token(last_name));
    !first.is_empty() && !last.is_empty() && slug.contains(&first) && slug.contains(&last)
}

pub struct ProfileDiscoverer {
    search: Arc<dyn ProfileSearch>,
    limiter: Arc<CollaboratorLimiter>,
    timeout: Duration,
    retry: RetryPolicy,
    max_lookups: usize,
    search_confidence: f64,
}

impl ProfileDiscoverer {
    pub fn new(search: Arc<dyn ProfileSearch>, limiter: Arc<CollaboratorLimiter>, config: &PipelineConfig) -> Self {
        let orchestration = &config.orchestration;
        Self {
            search,
            limiter,
            timeout: orchestration.collaborator_timeout(),
            retry: RetryPolicy::new(
                orchestration.max_fetch_attempts,
                Duration::from_millis(orchestration.retry_initial_backoff_ms),
            ),
            max_lookups: orchestration.max_profile_lookups,
            search_confidence: config.attribution.search_confidence,
        }
    }

    /// Website names worth a lookup: full names, not testimonial mentions, and
    /// no profile already observed in page content. One per merge key.
    fn targets<'a>(&self, observations: &'a [ExecutiveObservation]) -> Vec<&'a ExecutiveObservation> {
        let with_profile: HashSet<String> = observations
            .iter()
            .filter(|o| o.contacts.profile.is_some())
            .map(|o| o.merge_key())
            .collect();

        let mut seen = HashSet::new();
        observations
            .iter()
            .filter(|o| o.source == DiscoverySource::Website)
            .filter(|o| !o.relevance.testimonial_context && o.executive.name.tokens().len() >= 2)
            .filter(|o| !with_profile.contains(&o.merge_key()))
            .filter(|o| seen.insert(o.merge_key()))
            .take(self.max_lookups)
            .collect()
    }

    fn found_profile(&self, target: &ExecutiveObservation, url: String) -> ExecutiveObservation {
        let mut contacts = ContactBundle::default();
        contacts.offer(
            ContactKind::Profile,
            AttributedContact {
                value: url.clone(),
                method: AttributionMethod::Search,
                confidence: self.search_confidence,
                source_url: url,
            },
        );
        ExecutiveObservation {
            executive: target.executive.clone(),
            contacts,
            source: DiscoverySource::ProfileSearch,
            relevance: target.relevance,
        }
    }

    /// Searches by name and company, then falls back to the company's employee
    /// list for names the search did not resolve
    pub async fn discover(&self, observations: &[ExecutiveObservation], company: &str) -> ProfileDiscovery {
        let mut discovery = ProfileDiscovery::default();
        let targets = self.targets(observations);
        if targets.is_empty() {
            return discovery;
        }

        let search = &self.search;
        let mut unresolved = Vec::new();
        for target in targets {
            let name = &target.executive.name;
            let query = build_query(&name.normalized, company);
            discovery.lookups += 1;

            match collaborator_call(&self.limiter, self.timeout, self.retry, || search.search(&query)).await {
                Lookup::Found(urls) => {
                    let urls: Vec<String> = urls.iter().filter_map(|u| canonical_if_profile(u)).collect();
                    let hit = urls
                        .iter()
                        .find(|u| slug_matches(u, name.first_name(), name.last_name()))
                        .cloned();
                    discovery.returned.extend(urls);
                    match hit {
                        Some(url) => {
                            debug!(name = %name.normalized, profile = %url, "Profile found");
                            discovery.observations.push(self.found_profile(target, url));
                        }
                        None => unresolved.push(target),
                    }
                }
                Lookup::NotFound => unresolved.push(target),
                Lookup::Transient(reason) | Lookup::Rejected(reason) => {
                    warn!(name = %name.normalized, reason = %reason, "Profile search failed");
                    discovery.failures += 1;
                    unresolved.push(target);
                }
            }
        }

        if !unresolved.is_empty() {
            self.cross_reference(&unresolved, company, &mut discovery).await;
        }
        discovery
    }

    // * One employee-list call per company covers every unresolved name
    async fn cross_reference(&self, unresolved: &[&ExecutiveObservation], company: &str, discovery: &mut ProfileDiscovery) {
        let search = &self.search;
        discovery.lookups += 1;
        let employees: Vec<EmployeeListing> =
            match collaborator_call(&self.limiter, self.timeout, self.retry, || search.employees(company)).await {
                Lookup::Found(employees) => employees,
                Lookup::NotFound => return,
                Lookup::Transient(reason) | Lookup::Rejected(reason) => {
                    warn!(company, reason = %reason, "Employee list unavailable");
                    discovery.failures += 1;
                    return;
                }
            };

        for target in unresolved {
            let key = target.merge_key();
            let listed = employees.iter().find(|e| merge_key(e.name.trim()) == key);
            if let Some(listing) = listed {
                if let Some(url) = canonical_if_profile(&listing.profile_url) {
                    discovery.returned.push(url.clone());
                    discovery.observations.push(self.found_profile(target, url));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::memory::{MemoryProfileSearch, ScriptedFailure};
    use crate::persistence::schema::{
        Candidate, ContextWindow, PageType, PatternId, RelevanceSignals, SeniorityTier, Span, TitledExecutive,
        ValidatedName,
    };

    fn website(name: &str) -> ExecutiveObservation {
        ExecutiveObservation {
            executive: TitledExecutive {
                name: ValidatedName {
                    candidate: Candidate {
                        text: name.to_string(),
                        span: Span::new(0, name.len()),
                        context: ContextWindow::default(),
                        source_url: "https://andrewrileyheating.co.uk/team".to_string(),
                        page_type: PageType::Team,
                        pattern: PatternId::Structural,
                    },
                    validity: 0.9,
                    normalized: name.to_string(),
                },
                title: "Managing Director".to_string(),
                tier: SeniorityTier::Tier1,
                title_confidence: 1.0,
            },
            contacts: ContactBundle::default(),
            source: DiscoverySource::Website,
            relevance: RelevanceSignals {
                page_type: PageType::Team,
                ..Default::default()
            },
        }
    }

    fn discoverer(search: MemoryProfileSearch) -> ProfileDiscoverer {
        ProfileDiscoverer::new(
            Arc::new(search),
            Arc::new(CollaboratorLimiter::unlimited("profile_search")),
            &PipelineConfig::default(),
        )
    }

    #[test]
    fn test_slug_matches() {
        assert!(slug_matches("https://www.linkedin.com/in/andrew-riley-4b2a1", "Andrew", "Riley"));
        assert!(slug_matches("https://www.linkedin.com/in/siobhanobrien", "Siobhan", "O'Brien"));
        assert!(!slug_matches("https://www.linkedin.com/in/andrew-smith", "Andrew", "Riley"));
        assert!(!slug_matches("https://example.com/andrew-riley", "Andrew", "Riley"));
    }

    #[tokio::test]
    async fn test_search_result_attached_with_search_method() {
        let query = build_query("Andrew Riley", "Andrew Riley Heating");
        let search = MemoryProfileSearch::new().with_results(
            &query,
            &[
                "https://www.linkedin.com/in/andy-smith",
                "https://uk.linkedin.com/in/andrew-riley-4b2a1/",
            ],
        );
        let result = discoverer(search)
            .discover(&[website("Andrew Riley")], "Andrew Riley Heating")
            .await;

        assert_eq!(result.observations.len(), 1);
        let profile = result.observations[0].contacts.profile.as_ref().unwrap();
        assert_eq!(profile.value, "https://www.linkedin.com/in/andrew-riley-4b2a1");
        assert_eq!(profile.method, AttributionMethod::Search);
        assert_eq!(result.observations[0].source, DiscoverySource::ProfileSearch);
        assert_eq!(result.returned.len(), 2);
    }

    #[test]
    fn test_non_profile_links_are_dropped() {
        assert_eq!(canonical_if_profile("https://andrewrileyheating.co.uk/team"), None);
        assert_eq!(canonical_if_profile("https://www.linkedin.com/in/"), None);
        assert_eq!(
            canonical_if_profile("http://uk.linkedin.com/in/Andrew-Riley?trk=x"),
            Some("https://www.linkedin.com/in/andrew-riley".to_string())
        );
    }

    #[tokio::test]
    async fn test_no_result_leaves_profile_empty() {
        let search = MemoryProfileSearch::new();
        let result = discoverer(search)
            .discover(&[website("Andrew Riley")], "Andrew Riley Heating")
            .await;
        assert!(result.observations.is_empty());
        // * Name search plus the employee-list fallback
        assert_eq!(result.lookups, 2);
        assert_eq!(result.failures, 0);
    }

    #[tokio::test]
    async fn test_employee_list_fallback() {
        let search = MemoryProfileSearch::new().with_employees(
            "Andrew Riley Heating",
            vec![EmployeeListing {
                name: "Sarah Jones".to_string(),
                profile_url: "https://www.linkedin.com/in/sarahjones".to_string(),
            }],
        );
        let result = discoverer(search)
            .discover(&[website("Sarah Jones"), website("Andrew Riley")], "Andrew Riley Heating")
            .await;
        assert_eq!(result.observations.len(), 1);
        assert_eq!(result.observations[0].executive.name.normalized, "Sarah Jones");
    }

    #[tokio::test]
    async fn test_skips_names_with_observed_profile_and_testimonials() {
        let mut linked = website("Andrew Riley");
        linked.contacts.offer(
            ContactKind::Profile,
            AttributedContact {
                value: "https://www.linkedin.com/in/andrew-riley".to_string(),
                method: AttributionMethod::Direct,
                confidence: 0.95,
                source_url: "https://andrewrileyheating.co.uk/team".to_string(),
            },
        );
        let mut reviewer = website("Mary Clarke");
        reviewer.relevance.testimonial_context = true;

        let search = Arc::new(MemoryProfileSearch::new());
        let discoverer = ProfileDiscoverer::new(
            search.clone(),
            Arc::new(CollaboratorLimiter::unlimited("profile_search")),
            &PipelineConfig::default(),
        );
        let result = discoverer
            .discover(&[linked, website("Andrew Riley"), reviewer], "Andrew Riley Heating")
            .await;
        assert_eq!(result.lookups, 0);
        assert_eq!(search.calls(), 0);
    }

    #[tokio::test]
    async fn test_failures_counted_never_fabricated() {
        let mut config = PipelineConfig::default();
        config.orchestration.max_fetch_attempts = 1;
        let discoverer = ProfileDiscoverer::new(
            Arc::new(MemoryProfileSearch::failing(ScriptedFailure::Unavailable)),
            Arc::new(CollaboratorLimiter::unlimited("profile_search")),
            &config,
        );
        let result = discoverer
            .discover(&[website("Andrew Riley")], "Andrew Riley Heating")
            .await;
        assert!(result.observations.is_empty());
        assert!(result.returned.is_empty());
        assert_eq!(result.failures, 2);
    }
}
