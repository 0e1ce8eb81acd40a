// * Confidence scoring
// * Weighted sum of five signals per merged executive, clamped to [0, 1] and
// * bucketed into quality tiers. Registry-backed people get a confidence floor.

use crate::config::ScoringConfig;
use crate::engine::fingerprint::record_id;
use crate::persistence::dedup::MergedExecutive;
use crate::persistence::schema::{
    current_timestamp, ContactBundle, DiscoverySource, ExecutiveObservation, ExecutiveRecord, PageType, QualityTier,
    SeniorityTier, UNKNOWN_TITLE,
};
use serde::Serialize;

// * Contact strength: best confidence scaled by how many fields are filled
const CONTACT_BASE: f64 = 0.70;
const CONTACT_PER_EXTRA_FIELD: f64 = 0.15;

// * Title strength per seniority tier, and for an unknown title
const TIER1_STRENGTH: f64 = 1.0;
const TIER2_STRENGTH: f64 = 0.8;
const TIER3_STRENGTH: f64 = 0.55;
const UNKNOWN_TITLE_STRENGTH: f64 = 0.3;

// * Source agreement
const SOURCE_WEBSITE: f64 = 0.5;
const SOURCE_WEBSITE_REPEATED: f64 = 0.6;
const SOURCE_REGISTRY: f64 = 0.7;
const SOURCE_PROFILE: f64 = 0.3;
const SOURCE_WEBSITE_PROFILE: f64 = 0.7;
const SOURCE_REGISTRY_PROFILE: f64 = 0.85;
const SOURCE_WEBSITE_REGISTRY: f64 = 1.0;

// * Share of the remaining headroom granted when website and registry agree,
// * applied after the registry floor
const CROSS_SOURCE_HEADROOM: f64 = 0.2;

// * Relevance adjustments
const RELEVANCE_EPONYMOUS: f64 = 0.25;
const RELEVANCE_COMPANY_EMAIL: f64 = 0.15;
const RELEVANCE_TESTIMONIAL: f64 = -0.45;

/// Breakdown of score components for debugging
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub name_validity: f64,
    pub contact: f64,
    pub title: f64,
    pub sources: f64,
    pub relevance: f64,
    pub weighted: f64,
    pub registry_floor_applied: bool,
    pub cross_source_applied: bool,
    pub final_score: f64,
}

/// Records that made the cut plus how many did not
#[derive(Debug, Clone, Default)]
pub struct Publication {
    pub records: Vec<ExecutiveRecord>,
    pub below_threshold: usize,
}

/// Scores merged executives and decides publication
#[derive(Debug, Clone)]
pub struct ConfidenceScorer {
    config: ScoringConfig,
}

impl ConfidenceScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn score(&self, merged: &MergedExecutive) -> ScoreBreakdown {
        let c = &self.config;
        let mut breakdown = ScoreBreakdown {
            name_validity: name_signal(&merged.observations),
            contact: contact_strength(&merged.contacts),
            title: title_strength(merged.tier, merged.title_confidence, merged.title != UNKNOWN_TITLE),
            sources: source_agreement(merged),
            relevance: merged
                .observations
                .iter()
                .map(relevance_score)
                .fold(0.0, f64::max),
            ..Default::default()
        };

        breakdown.weighted = (breakdown.name_validity * c.weight_name_validity
            + breakdown.contact * c.weight_contact
            + breakdown.title * c.weight_title
            + breakdown.sources * c.weight_sources
            + breakdown.relevance * c.weight_relevance)
            .clamp(0.0, 1.0);

        breakdown.final_score = breakdown.weighted;
        if merged.has_source(DiscoverySource::Registry) && breakdown.weighted < c.registry_floor {
            breakdown.final_score = c.registry_floor;
            breakdown.registry_floor_applied = true;
        }
        if merged.has_source(DiscoverySource::Website) && merged.has_source(DiscoverySource::Registry) {
            breakdown.final_score += (1.0 - breakdown.final_score) * CROSS_SOURCE_HEADROOM;
            breakdown.cross_source_applied = true;
        }
        breakdown.final_score = breakdown.final_score.clamp(0.0, 1.0);
        breakdown
    }

    /// Tier for a score, or None when it falls below the publish threshold
    pub fn tier_for(&self, score: f64) -> Option<QualityTier> {
        let c = &self.config;
        if score < c.publish_threshold {
            None
        } else if score >= c.tier_premium {
            Some(QualityTier::Premium)
        } else if score >= c.tier_high {
            Some(QualityTier::High)
        } else if score >= c.tier_medium {
            Some(QualityTier::Medium)
        } else {
            Some(QualityTier::Low)
        }
    }

    /// Scores every merged executive and keeps those at or above the publish
    /// threshold, best first
    pub fn publish(&self, company_url: &str, merged: Vec<MergedExecutive>) -> Publication {
        let mut publication = Publication::default();
        let timestamp = current_timestamp();

        for executive in merged {
            let breakdown = self.score(&executive);
            let Some(quality_tier) = self.tier_for(breakdown.final_score) else {
                tracing::debug!(
                    name = %executive.canonical_name,
                    score = breakdown.final_score,
                    "Below publish threshold"
                );
                publication.below_threshold += 1;
                continue;
            };

            tracing::debug!(
                name = %executive.canonical_name,
                score = breakdown.final_score,
                tier = quality_tier.as_str(),
                "Executive scored"
            );
            publication.records.push(ExecutiveRecord {
                id: record_id(company_url, &executive.key),
                canonical_name: executive.canonical_name,
                title: executive.title,
                tier: executive.tier,
                contacts: executive.contacts,
                confidence: breakdown.final_score,
                quality_tier,
                sources: executive.sources.into_iter().collect(),
                provenance_timestamp: timestamp,
            });
        }

        publication.records.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.canonical_name.cmp(&b.canonical_name))
        });
        publication
    }
}

impl Default for ConfidenceScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}

/// Best validity times pattern trust across observations
pub fn name_signal(observations: &[ExecutiveObservation]) -> f64 {
    observations
        .iter()
        .map(|o| {
            let name = &o.executive.name;
            name.validity * name.candidate.pattern.trust(name.candidate.page_type)
        })
        .fold(0.0, f64::max)
}

pub fn contact_strength(contacts: &ContactBundle) -> f64 {
    let best = contacts.iter().map(|(_, c)| c.confidence).fold(0.0, f64::max);
    match contacts.len() {
        0 => 0.0,
        n => (best * (CONTACT_BASE + CONTACT_PER_EXTRA_FIELD * (n - 1) as f64)).min(1.0),
    }
}

pub fn title_strength(tier: SeniorityTier, title_confidence: f64, known: bool) -> f64 {
    if !known {
        return UNKNOWN_TITLE_STRENGTH;
    }
    let base = match tier {
        SeniorityTier::Tier1 => TIER1_STRENGTH,
        SeniorityTier::Tier2 => TIER2_STRENGTH,
        SeniorityTier::Tier3 => TIER3_STRENGTH,
    };
    (base * title_confidence).max(UNKNOWN_TITLE_STRENGTH)
}

pub fn source_agreement(merged: &MergedExecutive) -> f64 {
    let website = merged.has_source(DiscoverySource::Website);
    let registry = merged.has_source(DiscoverySource::Registry);
    let profile = merged.has_source(DiscoverySource::ProfileSearch);

    match (website, registry, profile) {
        (true, true, _) => SOURCE_WEBSITE_REGISTRY,
        (false, true, true) => SOURCE_REGISTRY_PROFILE,
        (false, true, false) => SOURCE_REGISTRY,
        (true, false, true) => SOURCE_WEBSITE_PROFILE,
        (true, false, false) if merged.website_pages() > 1 => SOURCE_WEBSITE_REPEATED,
        (true, false, false) => SOURCE_WEBSITE,
        (false, false, true) => SOURCE_PROFILE,
        (false, false, false) => 0.0,
    }
}

/// How plausible it is that this sighting is a decision-maker rather than a
/// customer or passing mention
pub fn relevance_score(observation: &ExecutiveObservation) -> f64 {
    if observation.source == DiscoverySource::Registry {
        return 1.0;
    }

    let signals = &observation.relevance;
    let mut score = match signals.page_type {
        PageType::Team => 0.9,
        PageType::About => 0.85,
        PageType::Contact => 0.75,
        PageType::Home => 0.65,
        PageType::Unknown => 0.55,
    };
    if signals.eponymous {
        score += RELEVANCE_EPONYMOUS;
    }
    if signals.company_domain_email {
        score += RELEVANCE_COMPANY_EMAIL;
    }
    if signals.testimonial_context {
        score += RELEVANCE_TESTIMONIAL;
    }
    score.clamp(0.0, 1.0)
}
