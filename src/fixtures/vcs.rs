use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::Url;

use crate::error::CommandFailure;
use crate::mirror::Vcs;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VcsCall {
    Clone { source: Url, destination: PathBuf },
    SetRemote { repository: PathBuf, remote: String, url: Url },
    Push { repository: PathBuf },
}

#[derive(Clone, Debug)]
struct Failure {
    matching: Option<String>,
    message: String,
}

impl Failure {
    fn applies_to(&self, url: &Url) -> bool {
        match &self.matching {
            Some(name) => url.path().ends_with(&format!("/{name}.git")),
            None => true,
        }
    }
}

/// Records git operations and fakes a bare repository on disk.
///
/// A successful clone leaves read-only object files behind, the way git does,
/// so cleanup paths get exercised.
#[derive(Clone, Debug, Default)]
pub struct FakeVcs {
    calls: Arc<Mutex<Vec<VcsCall>>>,
    remote: Arc<Mutex<Option<Url>>>,
    clone_failure: Option<Failure>,
    push_failure: Option<Failure>,
}

impl FakeVcs {
    pub fn fail_clone(mut self, message: &str) -> Self {
        self.clone_failure = Some(Failure {
            matching: None,
            message: message.to_string(),
        });
        self
    }

    /// Fails clones whose source url names repository `name`.
    pub fn fail_clone_of(mut self, name: &str, message: &str) -> Self {
        self.clone_failure = Some(Failure {
            matching: Some(name.to_string()),
            message: message.to_string(),
        });
        self
    }

    pub fn fail_push(mut self, message: &str) -> Self {
        self.push_failure = Some(Failure {
            matching: None,
            message: message.to_string(),
        });
        self
    }

    /// Fails pushes whose target url names repository `name`.
    pub fn fail_push_to(mut self, name: &str, message: &str) -> Self {
        self.push_failure = Some(Failure {
            matching: Some(name.to_string()),
            message: message.to_string(),
        });
        self
    }

    pub fn calls(&self) -> Vec<VcsCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clone_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, VcsCall::Clone { .. }))
            .count()
    }

    fn record(&self, call: VcsCall) {
        self.calls.lock().unwrap().push(call);
    }
}

fn failure(command: &str, message: &str) -> CommandFailure {
    CommandFailure {
        command: command.to_string(),
        code: Some(128),
        output: message.to_string(),
    }
}

fn fake_bare_repository(destination: &Path) -> std::io::Result<()> {
    let pack = destination.join("objects").join("pack");
    fs::create_dir_all(&pack)?;
    fs::write(destination.join("HEAD"), "ref: refs/heads/main\n")?;

    let object = pack.join("pack-0001.pack");
    fs::write(&object, b"PACK")?;
    let mut permissions = fs::metadata(&object)?.permissions();
    permissions.set_readonly(true);
    fs::set_permissions(&object, permissions)
}

#[async_trait]
impl Vcs for FakeVcs {
    async fn mirror_clone(&self, source: &Url, destination: &Path) -> Result<(), CommandFailure> {
        self.record(VcsCall::Clone {
            source: source.clone(),
            destination: destination.to_path_buf(),
        });

        if let Some(configured) = self.clone_failure.as_ref().filter(|f| f.applies_to(source)) {
            return Err(failure("git clone --mirror", &configured.message));
        }

        if destination.exists() {
            return Err(failure(
                "git clone --mirror",
                &format!(
                    "fatal: destination path '{}' already exists",
                    destination.display()
                ),
            ));
        }

        fake_bare_repository(destination)
            .map_err(|error| failure("git clone --mirror", &error.to_string()))
    }

    async fn set_remote_url(&self, repository: &Path, remote: &str, url: &Url) -> Result<(), CommandFailure> {
        self.record(VcsCall::SetRemote {
            repository: repository.to_path_buf(),
            remote: remote.to_string(),
            url: url.clone(),
        });
        *self.remote.lock().unwrap() = Some(url.clone());

        Ok(())
    }

    async fn mirror_push(&self, repository: &Path) -> Result<(), CommandFailure> {
        self.record(VcsCall::Push {
            repository: repository.to_path_buf(),
        });

        let remote = self.remote.lock().unwrap().clone();
        let rejected = match (&self.push_failure, &remote) {
            (Some(f), Some(url)) => f.applies_to(url).then(|| f.message.clone()),
            (Some(f), None) => Some(f.message.clone()),
            (None, _) => None,
        };

        match rejected {
            Some(message) => Err(failure("git push --mirror", &message)),
            None => Ok(()),
        }
    }
}
