// * Persistence
// * The data model, the deduplicator/merger, the confidence scorer and the
// * per-company report writer.

pub mod confidence;
pub mod dedup;
pub mod report;
pub mod schema;

// * Re-exports for convenient access
pub use confidence::{ConfidenceScorer, Publication, ScoreBreakdown};
pub use dedup::{ExecutiveMerger, MergeStats, MergedExecutive};
pub use report::{CompanyReport, ReportCounts, ReportError, ReportWriter};
pub use schema::{
    AttributedContact, AttributionMethod, CompanyJob, ContactBundle, ContactKind, Diagnostics, DiscoverySource,
    ExecutiveObservation, ExecutiveRecord, JobError, JobState, QualityTier, RegistryOutcome, SeniorityTier,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_merge_publishes_nothing() {
        let mut merger = ExecutiveMerger::new();
        let merged = merger.merge(Vec::new());
        assert!(merged.is_empty());

        let publication = ConfidenceScorer::default().publish("https://example.co.uk/", merged);
        assert!(publication.records.is_empty());
        assert_eq!(publication.below_threshold, 0);
    }

    #[test]
    fn test_report_for_fresh_job() {
        let job = CompanyJob::new("Example Ltd", "https://example.co.uk/");
        let report = CompanyReport::from_job(&job);
        assert_eq!(report.state, JobState::Pending);
        assert_eq!(report.counts.candidates_published, 0);
    }
}
