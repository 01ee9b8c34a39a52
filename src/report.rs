use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::PreconditionError;
use crate::jobs::MalformedLine;
use crate::outcome::{Status, TransferResult};

pub const SUMMARY_FILE: &str = "migration-summary.json";

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Every outcome of a run, in job-list order.
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunReport {
    pub operation: String,
    pub results: Vec<TransferResult>,
    pub malformed: Vec<MalformedLine>,
}

#[derive(Serialize)]
struct Summary<'a> {
    #[serde(flatten)]
    report: &'a RunReport,
    counts: StatusCounts,
}

impl RunReport {
    pub fn new(operation: impl Into<String>) -> Self {
        RunReport {
            operation: operation.into(),
            ..RunReport::default()
        }
    }

    pub fn record(&mut self, result: TransferResult) {
        self.results.push(result);
    }

    pub fn record_malformed(&mut self, line: MalformedLine) {
        self.malformed.push(line);
    }

    pub fn count(&self, status: Status) -> usize {
        self.results
            .iter()
            .filter(|result| result.status == status)
            .count()
    }

    pub fn counts(&self) -> StatusCounts {
        StatusCounts {
            succeeded: self.count(Status::Success),
            failed: self.count(Status::Failure),
            skipped: self.count(Status::Skipped),
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &TransferResult> {
        self.results
            .iter()
            .filter(|result| result.status == Status::Failure)
    }

    /// Writes the JSON summary into `folder`, creating it when missing.
    pub fn write_summary(&self, folder: &Path) -> Result<PathBuf, PreconditionError> {
        let output_error = |source| PreconditionError::OutputFolder {
            path: folder.to_path_buf(),
            source,
        };

        prepare_output_folder(folder)?;

        let summary = Summary {
            report: self,
            counts: self.counts(),
        };
        let json = serde_json::to_string_pretty(&summary).map_err(|error| output_error(error.into()))?;

        let path = folder.join(SUMMARY_FILE);
        fs::write(&path, json).map_err(output_error)?;

        Ok(path)
    }
}

/// Creates `folder` if needed. Runs before any job so a bad path costs nothing.
pub fn prepare_output_folder(folder: &Path) -> Result<(), PreconditionError> {
    fs::create_dir_all(folder).map_err(|source| PreconditionError::OutputFolder {
        path: folder.to_path_buf(),
        source,
    })
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts = self.counts();
        writeln!(
            f,
            "{}: {} jobs, {} succeeded, {} failed, {} skipped",
            self.operation,
            self.results.len(),
            counts.succeeded,
            counts.failed,
            counts.skipped
        )?;

        if counts.failed > 0 {
            writeln!(f, "failures:")?;
            for result in self.failures() {
                writeln!(f, "  {} [{}] {}", result.job, result.stage, result.detail)?;
            }
        }

        if !self.malformed.is_empty() {
            writeln!(f, "skipped invalid lines:")?;
            for line in &self.malformed {
                writeln!(f, "  line {}: {}", line.line_number, line.line)?;
            }
        }

        Ok(())
    }
}
