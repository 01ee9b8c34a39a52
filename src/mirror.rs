//! Full-history transfer between two git remotes through a scratch workspace.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use reqwest::Url;
use tokio::process::Command;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::cli::RepositoryRef;
use crate::credentials::Secret;
use crate::error::{CommandFailure, TransferStageError};
use crate::outcome::Stage;

pub const DEFAULT_WORKSPACE: &str = "temp_repo";

/// The version-control operations a mirror transfer needs.
#[async_trait]
pub trait Vcs: Send + Sync {
    /// Replicates every ref of `source` into a new bare repository at `destination`.
    async fn mirror_clone(&self, source: &Url, destination: &Path) -> Result<(), CommandFailure>;

    async fn set_remote_url(&self, repository: &Path, remote: &str, url: &Url) -> Result<(), CommandFailure>;

    /// Makes the remote's ref set an exact copy of the local one.
    async fn mirror_push(&self, repository: &Path) -> Result<(), CommandFailure>;
}

/// [`Vcs`] that shells out to the `git` binary.
#[derive(Clone, Debug)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        GitCli::new("git")
    }
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        GitCli {
            program: program.into(),
        }
    }

    /// `label` is what diagnostics show; it never contains remote urls.
    async fn run(&self, label: &str, args: &[&str], current_dir: Option<&Path>) -> Result<(), CommandFailure> {
        let mut command = Command::new(&self.program);
        command.args(args).env("GIT_TERMINAL_PROMPT", "0");
        if let Some(dir) = current_dir {
            command.current_dir(dir);
        }
        debug!(command = label, dir = ?current_dir, "running git");

        let output = command.output().await.map_err(|error| CommandFailure {
            command: label.to_string(),
            code: None,
            output: error.to_string(),
        })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let diagnostic = if stderr.is_empty() {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        } else {
            stderr
        };

        Err(CommandFailure {
            command: label.to_string(),
            code: output.status.code(),
            output: diagnostic,
        })
    }
}

#[async_trait]
impl Vcs for GitCli {
    async fn mirror_clone(&self, source: &Url, destination: &Path) -> Result<(), CommandFailure> {
        let destination = destination.to_string_lossy();
        self.run(
            "git clone --mirror",
            &["clone", "--mirror", source.as_str(), destination.as_ref()],
            None,
        )
        .await
    }

    async fn set_remote_url(&self, repository: &Path, remote: &str, url: &Url) -> Result<(), CommandFailure> {
        self.run(
            "git remote set-url",
            &["remote", "set-url", remote, url.as_str()],
            Some(repository),
        )
        .await
    }

    async fn mirror_push(&self, repository: &Path) -> Result<(), CommandFailure> {
        self.run("git push --mirror", &["push", "--mirror"], Some(repository))
            .await
    }
}

/// Builds `https://<token>@host/owner/name.git` under `git_url`.
pub fn authenticated_url(git_url: &Url, repository: &RepositoryRef, token: &Secret) -> Result<Url, String> {
    let mut url = git_url.clone();
    url.set_username(token.expose())
        .map_err(|_| format!("`{git_url}` cannot carry credentials"))?;
    url.path_segments_mut()
        .map_err(|_| format!("`{git_url}` cannot be a base url"))?
        .pop_if_empty()
        .push(&repository.owner)
        .push(&format!("{}.git", repository.name));

    Ok(url)
}

/// Removes `path` and everything below it, clearing read-only bits first.
pub fn force_remove(path: &Path) -> io::Result<()> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(error) => return Err(error),
    };

    if !metadata.is_dir() {
        return fs::remove_file(path);
    }

    for entry in WalkDir::new(path) {
        let entry = entry.map_err(io::Error::other)?;
        if entry.path_is_symlink() {
            continue;
        }
        make_writable(entry.path())?;
    }

    fs::remove_dir_all(path)
}

fn make_writable(path: &Path) -> io::Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    if !permissions.readonly() {
        return Ok(());
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        permissions.set_mode(permissions.mode() | 0o200);
    }
    #[cfg(not(unix))]
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);

    fs::set_permissions(path, permissions)
}

/// Exclusive use of a scratch directory for one job.
///
/// A stale directory is removed on acquisition. The directory is removed again
/// by [`ScratchWorkspace::release`], or on drop if release was never reached.
#[derive(Debug)]
pub struct ScratchWorkspace {
    path: PathBuf,
    released: bool,
}

impl ScratchWorkspace {
    pub fn acquire(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        force_remove(&path)?;

        Ok(ScratchWorkspace {
            path,
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        force_remove(&self.path)
    }
}

impl Drop for ScratchWorkspace {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        if let Err(error) = force_remove(&self.path) {
            warn!(path = %self.path.display(), %error, "could not remove scratch workspace");
        }
    }
}

/// Runs clone, repoint and push for one job, then always clears the workspace.
///
/// Two executors must not share a workspace path concurrently.
#[derive(Clone, Debug)]
pub struct MirrorExecutor<V> {
    vcs: V,
    workspace: PathBuf,
}

impl<V: Vcs> MirrorExecutor<V> {
    pub fn new(vcs: V, workspace: impl Into<PathBuf>) -> Self {
        MirrorExecutor {
            vcs,
            workspace: workspace.into(),
        }
    }

    pub async fn transfer(&self, source: &Url, target: &Url) -> Result<(), TransferStageError> {
        let workspace =
            ScratchWorkspace::acquire(&self.workspace).map_err(|source| TransferStageError::Workspace {
                stage: Stage::Clone,
                path: self.workspace.clone(),
                source,
            })?;

        let mirrored = self.mirror(workspace.path(), source, target).await;
        let released = workspace.release();

        match (mirrored, released) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(source)) => Err(TransferStageError::Workspace {
                stage: Stage::Cleanup,
                path: self.workspace.clone(),
                source,
            }),
            (Err(failure), Ok(())) => Err(failure),
            (Err(failure), Err(cleanup)) => {
                warn!(path = %self.workspace.display(), %cleanup, "scratch workspace left behind after failed transfer");
                Err(TransferStageError::LeftBehind {
                    failure: Box::new(failure),
                    path: self.workspace.clone(),
                    cleanup,
                })
            }
        }
    }

    async fn mirror(&self, workspace: &Path, source: &Url, target: &Url) -> Result<(), TransferStageError> {
        self.vcs
            .mirror_clone(source, workspace)
            .await
            .map_err(|failure| TransferStageError::Command {
                stage: Stage::Clone,
                failure,
            })?;

        self.vcs
            .set_remote_url(workspace, "origin", target)
            .await
            .map_err(|failure| TransferStageError::Command {
                stage: Stage::Push,
                failure,
            })?;

        self.vcs
            .mirror_push(workspace)
            .await
            .map_err(|failure| TransferStageError::Command {
                stage: Stage::Push,
                failure,
            })
    }
}
