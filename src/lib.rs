// * Prospect-Flow
// * Executive discovery for small-company websites: extracts person names,
// * validates them, attaches contact details with an explicit attribution
// * method, reconciles with the company registry and publishes scored records.

pub mod config;
pub mod engine;
pub mod network;
pub mod ops;
pub mod persistence;
pub mod refinery;

pub use config::PipelineConfig;
pub use engine::{Collaborators, Orchestrator};
pub use persistence::schema::{CompanyJob, ExecutiveRecord, JobState};
pub use refinery::Lexicon;
