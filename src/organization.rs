use tracing::info;

use crate::error::RemoteError;
use crate::provider::Provider;

pub async fn invite_member<P: Provider + ?Sized>(
    provider: &P,
    org: &str,
    username: &str,
) -> Result<(), RemoteError> {
    provider.invite_user(org, username).await?;
    info!(org, username, "invited user to organization");

    Ok(())
}

/// Creates a closed team and adds `username` to it. Returns the team slug.
pub async fn create_team_with_member<P: Provider + ?Sized>(
    provider: &P,
    org: &str,
    team: &str,
    username: &str,
) -> Result<String, RemoteError> {
    let slug = provider.create_team(org, team).await?;
    info!(org, team, slug = %slug, "created team");

    provider.add_user_to_team(org, &slug, username).await?;
    info!(org, team = %slug, username, "added user to team");

    Ok(slug)
}
