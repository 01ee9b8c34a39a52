use std::path::PathBuf;

use thiserror::Error;

use crate::outcome::Stage;

/// Problems that stop a run before its first job.
#[derive(Debug, Error)]
pub enum PreconditionError {
    #[error("job list file not found: {0}")]
    JobFileMissing(PathBuf),

    #[error("could not open job list `{path}`")]
    JobFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("environment variable `{0}` is not set or empty")]
    MissingCredential(String),

    #[error("could not read config `{path}`")]
    ConfigUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config `{path}`: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("invalid {field} `{value}`")]
    InvalidSetting { field: &'static str, value: String },

    #[error("could not create output folder `{path}`")]
    OutputFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A remote platform call that did not produce the expected answer.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("access token is not a valid header value")]
    InvalidToken,
}

impl RemoteError {
    pub fn status(&self) -> Option<u16> {
        match self {
            RemoteError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A version-control subprocess that could not be started or exited non-zero.
#[derive(Debug, Error)]
#[error("`{command}` failed ({}): {output}", exit_label(.code))]
pub struct CommandFailure {
    pub command: String,
    pub code: Option<i32>,
    pub output: String,
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "no exit code".to_string(),
    }
}

#[derive(Debug, Error)]
pub enum TransferStageError {
    #[error("{stage} failed")]
    Command {
        stage: Stage,
        #[source]
        failure: CommandFailure,
    },

    #[error("{stage} failed: could not clear scratch workspace `{path}`")]
    Workspace {
        stage: Stage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A failed transfer whose workspace could not be removed either.
    #[error("scratch workspace `{path}` was left behind ({cleanup})")]
    LeftBehind {
        #[source]
        failure: Box<TransferStageError>,
        path: PathBuf,
        cleanup: std::io::Error,
    },
}

impl TransferStageError {
    pub fn stage(&self) -> Stage {
        match self {
            TransferStageError::Command { stage, .. } | TransferStageError::Workspace { stage, .. } => {
                *stage
            }
            TransferStageError::LeftBehind { failure, .. } => failure.stage(),
        }
    }
}

/// One line naming `error` and every cause below it.
pub fn describe<E>(error: E) -> String
where
    E: std::error::Error + Send + Sync + 'static,
{
    format!("{:#}", anyhow::Error::new(error))
}
