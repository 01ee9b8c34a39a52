use async_trait::async_trait;

use crate::cli::{RepositoryOptions, RepositoryRef};
use crate::error::RemoteError;

/// Remote operations against a hosting platform.
///
/// Nothing here is idempotent: callers check state (e.g. `repository_exists`)
/// before mutating it.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn repository_exists(&self, repository: &RepositoryRef) -> Result<bool, RemoteError>;

    async fn create_repository(
        &self,
        repository: &RepositoryRef,
        options: &RepositoryOptions,
    ) -> Result<(), RemoteError>;

    /// Success means the platform accepted the transfer, which completes asynchronously.
    async fn transfer_ownership(
        &self,
        repository: &RepositoryRef,
        new_location: &RepositoryRef,
    ) -> Result<(), RemoteError>;

    async fn invite_user(&self, org: &str, username: &str) -> Result<(), RemoteError>;

    /// Returns the slug of the new team.
    async fn create_team(&self, org: &str, team: &str) -> Result<String, RemoteError>;

    async fn add_user_to_team(
        &self,
        org: &str,
        team_slug: &str,
        username: &str,
    ) -> Result<(), RemoteError>;
}
