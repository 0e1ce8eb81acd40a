// * Per-company report output
// * One JSON object per line: company identity, published records with their
// * per-field attribution, terminal state and diagnostic counts.

use crate::persistence::schema::{CompanyJob, Diagnostics, ExecutiveRecord, JobState};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Report I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Report serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The headline counts, repeated at the top level so a reader can spot a
/// flood without opening the diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportCounts {
    pub candidates_seen: usize,
    pub candidates_rejected: usize,
    pub candidates_published: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyReport {
    pub company_name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registry_id: Option<String>,
    pub state: JobState,
    pub counts: ReportCounts,
    pub records: Vec<ExecutiveRecord>,
    pub diagnostics: Diagnostics,
}

impl CompanyReport {
    pub fn from_job(job: &CompanyJob) -> Self {
        let d = &job.diagnostics;
        Self {
            company_name: job.company_name.clone(),
            url: job.url.clone(),
            registry_id: job.registry_id.clone(),
            state: job.state,
            counts: ReportCounts {
                candidates_seen: d.candidates_seen,
                candidates_rejected: d.candidates_rejected,
                candidates_published: job.records.len(),
            },
            records: job.records.clone(),
            diagnostics: d.clone(),
        }
    }

    pub fn to_json_line(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Writes reports as JSON lines
pub struct ReportWriter<W: Write> {
    out: W,
    written: usize,
}

impl ReportWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn write_job(&mut self, job: &CompanyJob) -> Result<(), ReportError> {
        self.write(&CompanyReport::from_job(job))
    }

    pub fn write(&mut self, report: &CompanyReport) -> Result<(), ReportError> {
        serde_json::to_writer(&mut self.out, report)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flushes and returns the underlying writer
    pub fn finish(mut self) -> Result<W, ReportError> {
        self.out.flush()?;
        Ok(self.out)
    }
}
