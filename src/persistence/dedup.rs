// * Executive deduplication and merging
// * Groups observations of the same person within one company by merge key,
// * folds initial-only forms ("J. McManus") into a unique full form, then merges
// * titles, contacts and sources per group.

use crate::persistence::schema::{
    merge_key, ContactBundle, DiscoverySource, ExecutiveObservation, SeniorityTier, UNKNOWN_TITLE,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

/// One person after merging every observation of them
#[derive(Debug, Clone, PartialEq)]
pub struct MergedExecutive {
    pub key: String,
    pub canonical_name: String,
    pub title: String,
    pub tier: SeniorityTier,
    pub title_confidence: f64,
    pub contacts: ContactBundle,
    pub sources: BTreeSet<DiscoverySource>,
    pub observations: Vec<ExecutiveObservation>,
}

impl MergedExecutive {
    pub fn has_source(&self, source: DiscoverySource) -> bool {
        self.sources.contains(&source)
    }

    /// Distinct pages the person was seen on
    pub fn website_pages(&self) -> usize {
        self.observations
            .iter()
            .filter(|o| o.source == DiscoverySource::Website)
            .map(|o| o.executive.name.candidate.source_url.as_str())
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Statistics from one merge pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeStats {
    pub observations: usize,
    pub groups: usize,
    pub initials_folded: usize,
}

/// Merges observations into one entry per person
#[derive(Debug, Default)]
pub struct ExecutiveMerger {
    stats: MergeStats,
}

/// First token is a bare initial ("J" or "J.")
fn initial_of(normalized: &str) -> Option<char> {
    let first = normalized.split_whitespace().next()?.trim_end_matches('.');
    let mut chars = first.chars();
    let initial = chars.next()?;
    chars.next().is_none().then(|| initial.to_ascii_lowercase())
}

fn surname_of(key: &str) -> &str {
    key.rsplit(' ').next().unwrap_or(key)
}

impl ExecutiveMerger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &MergeStats {
        &self.stats
    }

    /// Groups and merges. Output order is deterministic for a given input.
    pub fn merge(&mut self, observations: Vec<ExecutiveObservation>) -> Vec<MergedExecutive> {
        self.stats.observations += observations.len();

        let mut groups: BTreeMap<String, Vec<ExecutiveObservation>> = BTreeMap::new();
        let mut initials: Vec<ExecutiveObservation> = Vec::new();
        for observation in observations {
            if initial_of(&observation.executive.name.normalized).is_some() {
                initials.push(observation);
            } else {
                groups.entry(observation.merge_key()).or_default().push(observation);
            }
        }

        for observation in initials {
            let key = merge_key(&observation.executive.name.normalized);
            let target = initial_of(&observation.executive.name.normalized).and_then(|initial| {
                let surname = surname_of(&key);
                let mut matches = groups
                    .keys()
                    .filter(|k| surname_of(k) == surname && k.starts_with(initial) && k.contains(' '));
                match (matches.next(), matches.next()) {
                    (Some(only), None) => Some(only.clone()),
                    _ => None,
                }
            });

            match target {
                Some(full) => {
                    tracing::debug!(initial_form = %observation.executive.name.normalized, merged_into = %full, "Initial folded into full name");
                    self.stats.initials_folded += 1;
                    groups.entry(full).or_default().push(observation);
                }
                None => groups.entry(key).or_default().push(observation),
            }
        }

        self.stats.groups += groups.len();
        groups.into_iter().map(|(key, group)| merge_group(key, group)).collect()
    }
}

fn merge_group(key: String, observations: Vec<ExecutiveObservation>) -> MergedExecutive {
    let mut contacts = ContactBundle::default();
    let mut sources = BTreeSet::new();
    for observation in &observations {
        contacts.absorb(&observation.contacts);
        sources.insert(observation.source);
    }

    let titled = observations
        .iter()
        .filter(|o| o.executive.has_known_title())
        .max_by(|a, b| compare_titles(a, b));
    let (title, tier, title_confidence) = match titled {
        Some(o) => (o.executive.title.clone(), o.executive.tier, o.executive.title_confidence),
        None => (UNKNOWN_TITLE.to_string(), SeniorityTier::Tier3, 0.0),
    };

    MergedExecutive {
        canonical_name: canonical_name(&observations),
        key,
        title,
        tier,
        title_confidence,
        contacts,
        sources,
        observations,
    }
}

/// Higher title confidence wins; at equal confidence the registry title wins,
/// then the more senior tier
fn compare_titles(a: &ExecutiveObservation, b: &ExecutiveObservation) -> Ordering {
    let from_registry = |o: &ExecutiveObservation| o.source == DiscoverySource::Registry;
    a.executive
        .title_confidence
        .total_cmp(&b.executive.title_confidence)
        .then(from_registry(a).cmp(&from_registry(b)))
        .then(b.executive.tier.cmp(&a.executive.tier))
        .then(b.executive.title.cmp(&a.executive.title))
}

/// Registry spelling first, then the fullest full-form name, then the strongest
/// extraction signal, then alphabetical
fn canonical_name(observations: &[ExecutiveObservation]) -> String {
    if let Some(registry) = observations
        .iter()
        .filter(|o| o.source == DiscoverySource::Registry)
        .map(|o| &o.executive.name.normalized)
        .min()
    {
        return registry.clone();
    }

    let signal = |o: &ExecutiveObservation| {
        let name = &o.executive.name;
        name.validity * name.candidate.pattern.trust(name.candidate.page_type)
    };
    observations
        .iter()
        .max_by(|a, b| {
            let (na, nb) = (&a.executive.name.normalized, &b.executive.name.normalized);
            initial_of(nb)
                .is_some()
                .cmp(&initial_of(na).is_some())
                .then(na.split_whitespace().count().cmp(&nb.split_whitespace().count()))
                .then(signal(a).total_cmp(&signal(b)))
                .then(nb.cmp(na))
        })
        .map(|o| o.executive.name.normalized.clone())
        .unwrap_or_default()
}
