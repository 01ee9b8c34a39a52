use std::fmt;

use serde::Serialize;

use crate::jobs::JobRecord;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    EnsureTarget,
    Clone,
    Push,
    Cleanup,
    TransferOwnership,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::EnsureTarget => "ensure-target",
            Stage::Clone => "clone",
            Stage::Push => "push",
            Stage::Cleanup => "cleanup",
            Stage::TransferOwnership => "transfer-ownership",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Failure,
    Skipped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Success => "success",
            Status::Failure => "failure",
            Status::Skipped => "skipped",
        };
        f.write_str(label)
    }
}

/// Final outcome of one job. `stage` is the last stage reached.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransferResult {
    pub job: JobRecord,
    pub stage: Stage,
    pub status: Status,
    pub detail: String,
}

impl TransferResult {
    pub fn success(job: JobRecord, stage: Stage, detail: impl Into<String>) -> Self {
        TransferResult {
            job,
            stage,
            status: Status::Success,
            detail: detail.into(),
        }
    }

    pub fn failure(job: JobRecord, stage: Stage, detail: impl Into<String>) -> Self {
        TransferResult {
            job,
            stage,
            status: Status::Failure,
            detail: detail.into(),
        }
    }

    pub fn skipped(job: JobRecord, stage: Stage, detail: impl Into<String>) -> Self {
        TransferResult {
            job,
            stage,
            status: Status::Skipped,
            detail: detail.into(),
        }
    }
}
