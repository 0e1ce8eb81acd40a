// * Runtime pipeline configuration
// * Every tunable threshold is exposed here; defaults come from `constants`.

use super::constants::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Name validation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum validity score for a candidate to be accepted
    pub acceptance_threshold: f64,
    /// Tokens captured on each side of a candidate
    pub context_tokens: usize,
    pub title_max_distance: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: ACCEPTANCE_THRESHOLD,
            context_tokens: CONTEXT_TOKENS,
            title_max_distance: TITLE_MAX_DISTANCE,
        }
    }
}

/// Contact attribution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributionConfig {
    pub proximity_radius: usize,
    pub signature_window: usize,
    pub direct_gap_max: usize,
    pub direct_confidence: f64,
    pub signature_confidence: f64,
    pub proximity_confidence_near: f64,
    pub proximity_confidence_far: f64,
    pub search_confidence: f64,
    pub local_part_bonus: f64,
    /// Contacts attributed below this confidence are discarded
    pub min_confidence: f64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            proximity_radius: PROXIMITY_RADIUS_CHARS,
            signature_window: SIGNATURE_WINDOW_CHARS,
            direct_gap_max: DIRECT_GAP_MAX_CHARS,
            direct_confidence: DIRECT_CONFIDENCE,
            signature_confidence: SIGNATURE_CONFIDENCE,
            proximity_confidence_near: PROXIMITY_CONFIDENCE_NEAR,
            proximity_confidence_far: PROXIMITY_CONFIDENCE_FAR,
            search_confidence: SEARCH_CONFIDENCE,
            local_part_bonus: LOCAL_PART_BONUS,
            min_confidence: MIN_ATTRIBUTION_CONFIDENCE,
        }
    }
}

/// Confidence scoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub weight_name_validity: f64,
    pub weight_contact: f64,
    pub weight_title: f64,
    pub weight_sources: f64,
    pub weight_relevance: f64,
    pub tier_premium: f64,
    pub tier_high: f64,
    pub tier_medium: f64,
    pub registry_floor: f64,
    /// Records below this confidence are never published
    pub publish_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            weight_name_validity: WEIGHT_NAME_VALIDITY,
            weight_contact: WEIGHT_CONTACT,
            weight_title: WEIGHT_TITLE,
            weight_sources: WEIGHT_SOURCES,
            weight_relevance: WEIGHT_RELEVANCE,
            tier_premium: TIER_PREMIUM,
            tier_high: TIER_HIGH,
            tier_medium: TIER_MEDIUM,
            registry_floor: REGISTRY_CONFIDENCE_FLOOR,
            publish_threshold: TIER_MEDIUM,
        }
    }
}

impl ScoringConfig {
    pub fn weight_sum(&self) -> f64 {
        self.weight_name_validity
            + self.weight_contact
            + self.weight_title
            + self.weight_sources
            + self.weight_relevance
    }
}

/// Batch orchestration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    pub concurrency: usize,
    pub page_timeout_ms: u64,
    pub collaborator_timeout_ms: u64,
    pub job_timeout_ms: u64,
    pub max_fetch_attempts: u32,
    pub retry_initial_backoff_ms: u64,
    pub max_subpages: usize,
    /// Profile searches issued per company
    pub max_profile_lookups: usize,
    pub registry_min_delay_ms: u64,
    pub search_min_delay_ms: u64,
    pub company_match_threshold: f64,
}

impl Default for OrchestrationConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            page_timeout_ms: PAGE_TIMEOUT_MS,
            collaborator_timeout_ms: COLLABORATOR_TIMEOUT_MS,
            job_timeout_ms: JOB_TIMEOUT_MS,
            max_fetch_attempts: MAX_FETCH_ATTEMPTS,
            retry_initial_backoff_ms: RETRY_INITIAL_BACKOFF_MS,
            max_subpages: MAX_SUBPAGES,
            max_profile_lookups: MAX_PROFILE_LOOKUPS,
            registry_min_delay_ms: REGISTRY_MIN_DELAY_MS,
            search_min_delay_ms: SEARCH_MIN_DELAY_MS,
            company_match_threshold: COMPANY_MATCH_THRESHOLD,
        }
    }
}

impl OrchestrationConfig {
    pub fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    pub fn collaborator_timeout(&self) -> Duration {
        Duration::from_millis(self.collaborator_timeout_ms)
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_millis(self.job_timeout_ms)
    }
}

/// Alert thresholds for false-positive floods
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FloodConfig {
    pub max_records_per_company: usize,
    pub max_publish_ratio: f64,
    pub min_candidates: usize,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            max_records_per_company: FLOOD_MAX_RECORDS_PER_COMPANY,
            max_publish_ratio: FLOOD_MAX_PUBLISH_RATIO,
            min_candidates: FLOOD_MIN_CANDIDATES,
        }
    }
}

/// Top-level configuration for the discovery pipeline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub validation: ValidationConfig,
    pub attribution: AttributionConfig,
    pub scoring: ScoringConfig,
    pub orchestration: OrchestrationConfig,
    pub flood: FloodConfig,
}

impl PipelineConfig {
    /// Parses and validates a JSON document; missing fields take defaults
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit_values = [
            ("validation.acceptance_threshold", self.validation.acceptance_threshold),
            ("attribution.direct_confidence", self.attribution.direct_confidence),
            ("attribution.signature_confidence", self.attribution.signature_confidence),
            ("attribution.proximity_confidence_near", self.attribution.proximity_confidence_near),
            ("attribution.proximity_confidence_far", self.attribution.proximity_confidence_far),
            ("attribution.search_confidence", self.attribution.search_confidence),
            ("attribution.min_confidence", self.attribution.min_confidence),
            ("scoring.tier_premium", self.scoring.tier_premium),
            ("scoring.tier_high", self.scoring.tier_high),
            ("scoring.tier_medium", self.scoring.tier_medium),
            ("scoring.registry_floor", self.scoring.registry_floor),
            ("scoring.publish_threshold", self.scoring.publish_threshold),
            ("orchestration.company_match_threshold", self.orchestration.company_match_threshold),
        ];
        for (name, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{} must be within [0, 1], got {}", name, value)));
            }
        }

        let scoring = &self.scoring;
        if !(scoring.tier_premium >= scoring.tier_high && scoring.tier_high >= scoring.tier_medium) {
            return Err(ConfigError::Invalid(
                "quality tier thresholds must be monotonic (premium >= high >= medium)".to_string(),
            ));
        }
        if (scoring.weight_sum() - 1.0).abs() > 0.01 {
            return Err(ConfigError::Invalid(format!(
                "scoring weights must sum to 1.0, got {:.3}",
                scoring.weight_sum()
            )));
        }

        let attribution = &self.attribution;
        if !(attribution.direct_confidence >= attribution.signature_confidence
            && attribution.signature_confidence >= attribution.proximity_confidence_near)
        {
            return Err(ConfigError::Invalid(
                "attribution confidences must satisfy direct >= signature >= proximity".to_string(),
            ));
        }

        if self.orchestration.concurrency == 0 {
            return Err(ConfigError::Invalid("orchestration.concurrency must be at least 1".to_string()));
        }
        if self.orchestration.max_fetch_attempts == 0 {
            return Err(ConfigError::Invalid("orchestration.max_fetch_attempts must be at least 1".to_string()));
        }

        Ok(())
    }
}
