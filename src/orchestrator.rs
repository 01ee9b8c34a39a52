//! Drives job lists through the remote client and the mirror executor.
//!
//! Each job ends in exactly one [`TransferResult`]; nothing that happens inside
//! one job, panics included, keeps the next job from running.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use async_trait::async_trait;
use futures::FutureExt;
use reqwest::Url;
use tracing::{debug, error, info, warn};

use crate::cli::{RepositoryOptions, RepositoryRef};
use crate::credentials::CredentialContext;
use crate::error::describe;
use crate::jobs::{JobListError, JobRecord};
use crate::mirror::{authenticated_url, MirrorExecutor, Vcs};
use crate::outcome::{Stage, Status, TransferResult};
use crate::provider::Provider;
use crate::report::RunReport;

const CREATION_QUEUED: u16 = 202;

/// One list-driven operation.
#[async_trait]
pub trait JobHandler: Send + Sync {
    fn operation(&self) -> &'static str;

    /// Stage recorded when `handle` panics.
    fn entry_stage(&self) -> Stage;

    async fn handle(&self, job: &JobRecord) -> TransferResult;
}

/// Runs `jobs` in order and collects their outcomes.
///
/// Malformed lines are logged and kept in the report; a read error stops the
/// list but keeps everything recorded so far.
pub async fn run_jobs<H, I>(handler: &H, jobs: I) -> RunReport
where
    H: JobHandler + ?Sized,
    I: IntoIterator<Item = Result<JobRecord, JobListError>>,
{
    let operation = handler.operation();
    let mut report = RunReport::new(operation);

    for item in jobs {
        let job = match item {
            Ok(job) => job,
            Err(JobListError::Malformed(line)) => {
                warn!(line_number = line.line_number, line = %line.line, "skipping invalid line");
                report.record_malformed(line);
                continue;
            }
            Err(error) => {
                error!(error = %describe(error), "stopping early, job list could not be read");
                break;
            }
        };

        info!(operation, %job, "starting job");
        let result = match AssertUnwindSafe(handler.handle(&job)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => TransferResult::failure(
                job.clone(),
                handler.entry_stage(),
                format!("job panicked: {}", panic_message(panic.as_ref())),
            ),
        };

        match result.status {
            Status::Failure => warn!(
                operation,
                job = %result.job,
                stage = %result.stage,
                detail = %result.detail,
                "job failed"
            ),
            status => info!(operation, job = %result.job, %status, detail = %result.detail, "job finished"),
        }
        report.record(result);
    }

    report
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JobState {
    Pending,
    EnsuringTarget,
    Transferring,
    Done,
    Failed,
}

fn transition(job: &JobRecord, from: JobState, to: JobState) {
    debug!(%job, ?from, ?to, "job state");
}

/// Mirror migration: make sure the target exists, then push the full history.
pub struct Migrator<P, V> {
    target: P,
    executor: MirrorExecutor<V>,
    credentials: CredentialContext,
    source_git: Url,
    target_git: Url,
    options: RepositoryOptions,
}

impl<P: Provider, V: Vcs> Migrator<P, V> {
    pub fn new(
        target: P,
        executor: MirrorExecutor<V>,
        credentials: CredentialContext,
        source_git: Url,
        target_git: Url,
        options: RepositoryOptions,
    ) -> Self {
        Migrator {
            target,
            executor,
            credentials,
            source_git,
            target_git,
            options,
        }
    }

    async fn ensure_target(&self, target: &RepositoryRef) -> Result<(), String> {
        let exists = self
            .target
            .repository_exists(target)
            .await
            .map_err(|error| format!("target lookup failed: {}", describe(error)))?;

        if exists {
            debug!(repository = %target, "target already exists");
            return Ok(());
        }

        match self.target.create_repository(target, &self.options).await {
            Ok(()) => info!(repository = %target, "created target repository"),
            // Queued creation is good enough; the push lands once it completes.
            Err(error) if error.status() == Some(CREATION_QUEUED) => {
                info!(repository = %target, "target repository creation accepted")
            }
            Err(error) => return Err(format!("target creation failed: {}", describe(error))),
        }

        Ok(())
    }

    fn remote_urls(&self, job: &JobRecord) -> Result<(Url, Url), String> {
        let source = authenticated_url(&self.source_git, &job.source, &self.credentials.source)?;
        let target = authenticated_url(&self.target_git, &job.target, &self.credentials.target)?;

        Ok((source, target))
    }

    fn failed(&self, job: &JobRecord, from: JobState, stage: Stage, detail: &str) -> TransferResult {
        transition(job, from, JobState::Failed);
        TransferResult::failure(job.clone(), stage, self.credentials.redact(detail))
    }
}

#[async_trait]
impl<P: Provider, V: Vcs> JobHandler for Migrator<P, V> {
    fn operation(&self) -> &'static str {
        "migrate"
    }

    fn entry_stage(&self) -> Stage {
        Stage::EnsureTarget
    }

    async fn handle(&self, job: &JobRecord) -> TransferResult {
        transition(job, JobState::Pending, JobState::EnsuringTarget);
        if let Err(detail) = self.ensure_target(&job.target).await {
            return self.failed(job, JobState::EnsuringTarget, Stage::EnsureTarget, &detail);
        }

        transition(job, JobState::EnsuringTarget, JobState::Transferring);
        let (source, target) = match self.remote_urls(job) {
            Ok(urls) => urls,
            Err(detail) => return self.failed(job, JobState::Transferring, Stage::Clone, &detail),
        };

        match self.executor.transfer(&source, &target).await {
            Ok(()) => {
                transition(job, JobState::Transferring, JobState::Done);
                TransferResult::success(
                    job.clone(),
                    Stage::Cleanup,
                    format!("mirrored {} to {}", job.source, job.target),
                )
            }
            Err(error) => {
                let stage = error.stage();
                self.failed(job, JobState::Transferring, stage, &describe(error))
            }
        }
    }
}

/// Platform-side ownership transfer of `job.source` to `job.target`.
pub struct OwnershipTransfer<P> {
    source: P,
}

impl<P: Provider> OwnershipTransfer<P> {
    pub fn new(source: P) -> Self {
        OwnershipTransfer { source }
    }
}

#[async_trait]
impl<P: Provider> JobHandler for OwnershipTransfer<P> {
    fn operation(&self) -> &'static str {
        "transfer-ownership"
    }

    fn entry_stage(&self) -> Stage {
        Stage::TransferOwnership
    }

    async fn handle(&self, job: &JobRecord) -> TransferResult {
        match self.source.transfer_ownership(&job.source, &job.target).await {
            Ok(()) => TransferResult::success(
                job.clone(),
                Stage::TransferOwnership,
                format!("transfer to {} accepted", job.target),
            ),
            Err(error) => TransferResult::failure(
                job.clone(),
                Stage::TransferOwnership,
                format!("transfer failed: {}", describe(error)),
            ),
        }
    }
}

/// Creates `job.target` unless it already exists.
pub struct RepositoryCreator<P> {
    provider: P,
    options: RepositoryOptions,
}

impl<P: Provider> RepositoryCreator<P> {
    pub fn new(provider: P, options: RepositoryOptions) -> Self {
        RepositoryCreator { provider, options }
    }
}

#[async_trait]
impl<P: Provider> JobHandler for RepositoryCreator<P> {
    fn operation(&self) -> &'static str {
        "create-from-list"
    }

    fn entry_stage(&self) -> Stage {
        Stage::EnsureTarget
    }

    async fn handle(&self, job: &JobRecord) -> TransferResult {
        match self.provider.repository_exists(&job.target).await {
            Ok(true) => {
                return TransferResult::skipped(job.clone(), Stage::EnsureTarget, "already exists")
            }
            Ok(false) => {}
            Err(error) => {
                return TransferResult::failure(
                    job.clone(),
                    Stage::EnsureTarget,
                    format!("target lookup failed: {}", describe(error)),
                )
            }
        }

        match self.provider.create_repository(&job.target, &self.options).await {
            Ok(()) => TransferResult::success(
                job.clone(),
                Stage::EnsureTarget,
                format!("created {}", job.target),
            ),
            Err(error) => TransferResult::failure(
                job.clone(),
                Stage::EnsureTarget,
                format!("target creation failed: {}", describe(error)),
            ),
        }
    }
}
