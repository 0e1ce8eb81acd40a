pub mod constants;
pub mod settings;

pub use settings::{
    AttributionConfig, ConfigError, FloodConfig, OrchestrationConfig, PipelineConfig, ScoringConfig,
    ValidationConfig,
};
