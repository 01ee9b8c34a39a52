use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cli::{RepositoryOptions, RepositoryRef};
use crate::credentials::Secret;
use crate::error::RemoteError;
use crate::provider::Provider;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";
const API_VERSION_HEADER: &str = "x-github-api-version";

/// [`Provider`] backed by the GitHub REST API (github.com or an enterprise server).
#[derive(Clone, Debug)]
pub struct GithubProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct CreateRepositoryBody<'a> {
    name: &'a str,
    #[serde(flatten)]
    options: &'a RepositoryOptions,
}

#[derive(Serialize)]
struct TransferBody<'a> {
    new_owner: &'a str,
    new_name: &'a str,
}

#[derive(Serialize)]
struct InvitationBody {
    invitee_id: u64,
    role: &'static str,
}

#[derive(Serialize)]
struct TeamBody<'a> {
    name: &'a str,
    privacy: &'static str,
}

#[derive(Deserialize)]
struct User {
    id: u64,
}

#[derive(Deserialize)]
struct Team {
    slug: String,
}

impl GithubProvider {
    pub fn configure_provider(api_url: &reqwest::Url, token: &Secret) -> Result<Self, RemoteError> {
        let mut authorization = HeaderValue::from_str(&format!("token {}", token.expose()))
            .map_err(|_| RemoteError::InvalidToken)?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, authorization);
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(API_VERSION_HEADER, HeaderValue::from_static(GITHUB_API_VERSION));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("ghmigrate/", env!("CARGO_PKG_VERSION"))),
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(GithubProvider {
            client,
            base_url: api_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

async fn expect_status(response: Response, accepted: &[StatusCode]) -> Result<Response, RemoteError> {
    if accepted.contains(&response.status()) {
        return Ok(response);
    }

    Err(unexpected(response).await)
}

async fn unexpected(response: Response) -> RemoteError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    RemoteError::Status { status, body }
}

#[async_trait]
impl Provider for GithubProvider {
    async fn repository_exists(&self, repository: &RepositoryRef) -> Result<bool, RemoteError> {
        let url = self.url(&format!("repos/{}/{}", repository.owner, repository.name));
        debug!(%url, "checking repository");

        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(unexpected(response).await),
        }
    }

    async fn create_repository(
        &self,
        repository: &RepositoryRef,
        options: &RepositoryOptions,
    ) -> Result<(), RemoteError> {
        let url = self.url(&format!("orgs/{}/repos", repository.owner));
        debug!(%url, repository = %repository, "creating repository");

        let body = CreateRepositoryBody {
            name: &repository.name,
            options,
        };
        let response = self.client.post(&url).json(&body).send().await?;
        expect_status(response, &[StatusCode::CREATED]).await?;

        Ok(())
    }

    async fn transfer_ownership(
        &self,
        repository: &RepositoryRef,
        new_location: &RepositoryRef,
    ) -> Result<(), RemoteError> {
        let url = self.url(&format!(
            "repos/{}/{}/transfer",
            repository.owner, repository.name
        ));
        debug!(%url, to = %new_location, "requesting transfer");

        let body = TransferBody {
            new_owner: &new_location.owner,
            new_name: &new_location.name,
        };
        let response = self.client.post(&url).json(&body).send().await?;
        expect_status(response, &[StatusCode::CREATED, StatusCode::ACCEPTED]).await?;

        Ok(())
    }

    async fn invite_user(&self, org: &str, username: &str) -> Result<(), RemoteError> {
        let user_url = self.url(&format!("users/{username}"));
        debug!(url = %user_url, "looking up user");

        let response = self.client.get(&user_url).send().await?;
        let user: User = expect_status(response, &[StatusCode::OK])
            .await?
            .json()
            .await
            .map_err(|error| RemoteError::Decode(error.to_string()))?;

        let url = self.url(&format!("orgs/{org}/invitations"));
        let body = InvitationBody {
            invitee_id: user.id,
            role: "direct_member",
        };
        let response = self.client.post(&url).json(&body).send().await?;
        expect_status(response, &[StatusCode::CREATED, StatusCode::NO_CONTENT]).await?;

        Ok(())
    }

    async fn create_team(&self, org: &str, team: &str) -> Result<String, RemoteError> {
        let url = self.url(&format!("orgs/{org}/teams"));
        debug!(%url, team, "creating team");

        let body = TeamBody {
            name: team,
            privacy: "closed",
        };
        let response = self.client.post(&url).json(&body).send().await?;
        let team: Team = expect_status(response, &[StatusCode::CREATED])
            .await?
            .json()
            .await
            .map_err(|error| RemoteError::Decode(error.to_string()))?;

        Ok(team.slug)
    }

    async fn add_user_to_team(
        &self,
        org: &str,
        team_slug: &str,
        username: &str,
    ) -> Result<(), RemoteError> {
        let url = self.url(&format!("orgs/{org}/teams/{team_slug}/memberships/{username}"));
        debug!(%url, "adding team member");

        let response = self.client.put(&url).send().await?;
        expect_status(response, &[StatusCode::OK, StatusCode::CREATED]).await?;

        Ok(())
    }
}
