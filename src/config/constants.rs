// * Configuration Constants
// * Central location for default thresholds, weights and timeouts.
// * Every value here is a default for a field of `PipelineConfig`.

// * Semantic validation
pub const ACCEPTANCE_THRESHOLD: f64 = 0.55;

// * Context window captured around each candidate, in tokens per side
pub const CONTEXT_TOKENS: usize = 40;

// * Title phrases further than this many tokens from a name are ignored
pub const TITLE_MAX_DISTANCE: usize = 12;

// * Contact attribution radii, in characters
pub const PROXIMITY_RADIUS_CHARS: usize = 300;
pub const SIGNATURE_WINDOW_CHARS: usize = 160;
pub const DIRECT_GAP_MAX_CHARS: usize = 48;

// * Attribution confidences (direct > signature > proximity)
pub const DIRECT_CONFIDENCE: f64 = 0.95;
pub const SIGNATURE_CONFIDENCE: f64 = 0.85;
pub const PROXIMITY_CONFIDENCE_NEAR: f64 = 0.70;
pub const PROXIMITY_CONFIDENCE_FAR: f64 = 0.50;
pub const SEARCH_CONFIDENCE: f64 = 0.60;
pub const LOCAL_PART_BONUS: f64 = 0.10;
pub const MIN_ATTRIBUTION_CONFIDENCE: f64 = 0.50;

// * Confidence scorer weights (sum to 1.0)
pub const WEIGHT_NAME_VALIDITY: f64 = 0.25;
pub const WEIGHT_CONTACT: f64 = 0.20;
pub const WEIGHT_TITLE: f64 = 0.15;
pub const WEIGHT_SOURCES: f64 = 0.20;
pub const WEIGHT_RELEVANCE: f64 = 0.20;

// * Quality tier thresholds (monotonic)
pub const TIER_PREMIUM: f64 = 0.85;
pub const TIER_HIGH: f64 = 0.70;
pub const TIER_MEDIUM: f64 = 0.50;

// * Registry-sourced names never score below this
pub const REGISTRY_CONFIDENCE_FLOOR: f64 = 0.75;

// * Orchestration
pub const DEFAULT_CONCURRENCY: usize = 3;
pub const PAGE_TIMEOUT_MS: u64 = 20_000;
pub const COLLABORATOR_TIMEOUT_MS: u64 = 15_000;
pub const JOB_TIMEOUT_MS: u64 = 120_000;
pub const MAX_FETCH_ATTEMPTS: u32 = 2;
pub const RETRY_INITIAL_BACKOFF_MS: u64 = 250;
pub const MAX_SUBPAGES: usize = 4;
pub const MAX_PROFILE_LOOKUPS: usize = 5;

// * Minimum delay between outbound collaborator calls
pub const REGISTRY_MIN_DELAY_MS: u64 = 500;
pub const SEARCH_MIN_DELAY_MS: u64 = 1_000;

// * Company-name similarity required to accept a registry match
pub const COMPANY_MATCH_THRESHOLD: f64 = 0.88;

// * Alerting
pub const FLOOD_MAX_RECORDS_PER_COMPANY: usize = 15;
pub const FLOOD_MAX_PUBLISH_RATIO: f64 = 0.5;
pub const FLOOD_MIN_CANDIDATES: usize = 20;
