use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::cli::{RepositoryOptions, RepositoryRef};
use crate::error::RemoteError;
use crate::provider::Provider;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProviderCall {
    Exists(RepositoryRef),
    Create(RepositoryRef, RepositoryOptions),
    Transfer(RepositoryRef, RepositoryRef),
    Invite(String, String),
    CreateTeam(String, String),
    AddToTeam(String, String, String),
}

#[derive(Debug, Default)]
struct State {
    existing: HashSet<RepositoryRef>,
    create_status: HashMap<RepositoryRef, u16>,
    transfer_status: HashMap<RepositoryRef, u16>,
    exists_status: HashMap<RepositoryRef, u16>,
    panic_on_exists: HashSet<RepositoryRef>,
    calls: Vec<ProviderCall>,
}

/// In-memory platform. Unknown repositories do not exist; every call succeeds
/// unless a status was configured for it.
#[derive(Clone, Debug, Default)]
pub struct FakeProvider {
    state: Arc<Mutex<State>>,
}

fn rejected(status: u16) -> RemoteError {
    RemoteError::Status {
        status,
        body: format!("{{\"message\":\"fake status {status}\"}}"),
    }
}

impl FakeProvider {
    pub fn with_existing(self, repository: RepositoryRef) -> Self {
        self.state.lock().unwrap().existing.insert(repository);
        self
    }

    pub fn with_create_status(self, repository: RepositoryRef, status: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .create_status
            .insert(repository, status);
        self
    }

    pub fn with_transfer_status(self, repository: RepositoryRef, status: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .transfer_status
            .insert(repository, status);
        self
    }

    pub fn with_exists_status(self, repository: RepositoryRef, status: u16) -> Self {
        self.state
            .lock()
            .unwrap()
            .exists_status
            .insert(repository, status);
        self
    }

    pub fn panicking_on(self, repository: RepositoryRef) -> Self {
        self.state
            .lock()
            .unwrap()
            .panic_on_exists
            .insert(repository);
        self
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn created(&self) -> Vec<RepositoryRef> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                ProviderCall::Create(repository, _) => Some(repository),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: ProviderCall) {
        self.state.lock().unwrap().calls.push(call);
    }
}

#[async_trait]
impl Provider for FakeProvider {
    async fn repository_exists(&self, repository: &RepositoryRef) -> Result<bool, RemoteError> {
        self.record(ProviderCall::Exists(repository.clone()));
        let state = self.state.lock().unwrap();

        if state.panic_on_exists.contains(repository) {
            drop(state);
            panic!("lookup of {repository} blew up");
        }

        match state.exists_status.get(repository) {
            Some(status) => Err(rejected(*status)),
            None => Ok(state.existing.contains(repository)),
        }
    }

    async fn create_repository(
        &self,
        repository: &RepositoryRef,
        options: &RepositoryOptions,
    ) -> Result<(), RemoteError> {
        self.record(ProviderCall::Create(repository.clone(), options.clone()));
        let mut state = self.state.lock().unwrap();

        match state.create_status.get(repository) {
            Some(status) if *status != 201 => Err(rejected(*status)),
            _ => {
                state.existing.insert(repository.clone());
                Ok(())
            }
        }
    }

    async fn transfer_ownership(
        &self,
        repository: &RepositoryRef,
        new_location: &RepositoryRef,
    ) -> Result<(), RemoteError> {
        self.record(ProviderCall::Transfer(
            repository.clone(),
            new_location.clone(),
        ));
        let state = self.state.lock().unwrap();

        match state.transfer_status.get(repository) {
            Some(status) if ![201, 202].contains(status) => Err(rejected(*status)),
            _ => Ok(()),
        }
    }

    async fn invite_user(&self, org: &str, username: &str) -> Result<(), RemoteError> {
        self.record(ProviderCall::Invite(org.to_string(), username.to_string()));
        Ok(())
    }

    async fn create_team(&self, org: &str, team: &str) -> Result<String, RemoteError> {
        self.record(ProviderCall::CreateTeam(org.to_string(), team.to_string()));
        Ok(team.to_lowercase().replace(' ', "-"))
    }

    async fn add_user_to_team(
        &self,
        org: &str,
        team_slug: &str,
        username: &str,
    ) -> Result<(), RemoteError> {
        self.record(ProviderCall::AddToTeam(
            org.to_string(),
            team_slug.to_string(),
            username.to_string(),
        ));
        Ok(())
    }
}
