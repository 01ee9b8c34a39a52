pub mod common;
pub mod parser;
pub mod reader;

pub use common::*;
pub use parser::{Overrides, ParsedConfig};

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use parser::parse_config;
use reader::read_config_file;
use tracing::error;

use crate::credentials::{CredentialContext, DEFAULT_SOURCE_TOKEN_ENV, DEFAULT_TARGET_TOKEN_ENV};
use crate::error::describe;
use crate::github_provider::GithubProvider;
use crate::jobs::{is_identifier, JobGrammar, JobReader};
use crate::mirror::{GitCli, MirrorExecutor, Vcs};
use crate::orchestrator::{run_jobs, Migrator, OwnershipTransfer, RepositoryCreator};
use crate::organization;
use crate::report::{prepare_output_folder, RunReport};

#[derive(Parser)]
#[command(name = "ghmigrate", version, about = "Move repositories between GitHub organizations")]
pub struct Args {
    /// Optional YAML file with endpoints, workspace and repository defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Mirror every repository in the job list into its target.
    Migrate(MigrateArgs),
    /// Ask the platform to transfer each listed repository to its new owner.
    TransferOwnership(TransferArgs),
    /// Create each listed repository unless it already exists.
    CreateFromList(CreateArgs),
    /// Invite a user into an organization.
    InviteUser(InviteArgs),
    /// Create a closed team and add a user to it.
    CreateTeam(TeamArgs),
}

#[derive(ClapArgs)]
pub struct MigrateArgs {
    /// Lines of `org/repo::org/repo`, or `org/repo` together with a target org.
    #[arg(short = 'f', long)]
    job_file: PathBuf,

    #[arg(short, long, default_value = DEFAULT_SOURCE_TOKEN_ENV)]
    source_token_env: String,

    #[arg(short, long, default_value = DEFAULT_TARGET_TOKEN_ENV)]
    target_token_env: String,

    /// Owner for single `org/repo` lines.
    #[arg(long)]
    target_org: Option<String>,

    /// Scratch directory used for each clone.
    #[arg(long)]
    workspace: Option<PathBuf>,

    #[arg(long, value_enum)]
    visibility: Option<Visibility>,
}

#[derive(ClapArgs)]
pub struct TransferArgs {
    /// Lines of `org/repo::new-owner/new-name`.
    #[arg(short = 'f', long)]
    job_file: PathBuf,

    #[arg(short, long)]
    source_token_env: String,
}

#[derive(ClapArgs)]
pub struct CreateArgs {
    /// Lines of `org/repo`.
    #[arg(short = 'f', long)]
    job_file: PathBuf,

    #[arg(short, long)]
    source_token_env: String,

    /// Where the JSON run summary is written.
    #[arg(short, long, default_value = "./output")]
    output_folder: PathBuf,

    /// Create every repository under this owner instead of the listed one.
    #[arg(long)]
    target_org: Option<String>,

    #[arg(long, value_enum)]
    visibility: Option<Visibility>,
}

#[derive(ClapArgs)]
pub struct InviteArgs {
    #[arg(long, value_parser = identifier)]
    org: String,

    #[arg(long, value_parser = identifier)]
    username: String,

    #[arg(long, default_value = DEFAULT_SOURCE_TOKEN_ENV)]
    token_env: String,
}

#[derive(ClapArgs)]
pub struct TeamArgs {
    #[arg(long, value_parser = identifier)]
    org: String,

    #[arg(long)]
    team: String,

    #[arg(long, value_parser = identifier)]
    username: String,

    #[arg(long, default_value = DEFAULT_SOURCE_TOKEN_ENV)]
    token_env: String,
}

fn identifier(value: &str) -> Result<String, String> {
    if is_identifier(value) {
        Ok(value.to_string())
    } else {
        Err(format!("`{value}` is not a valid name"))
    }
}

pub async fn run() -> Result<ExitCode> {
    execute(Args::parse()).await
}

/// Runs one command. Errors are fatal preconditions; job failures only show up
/// in the printed summary.
pub async fn execute(args: Args) -> Result<ExitCode> {
    let settings = load_settings(args.config.as_deref())?;

    match args.command {
        Command::Migrate(command) => {
            let settings = settings.apply(Overrides {
                workspace: command.workspace,
                target_org: command.target_org,
                visibility: command.visibility,
            })?;
            let credentials =
                CredentialContext::from_env(&command.source_token_env, &command.target_token_env)?;

            let report = migrate(&settings, credentials, &command.job_file, GitCli::default()).await?;
            println!("{report}");
        }
        Command::TransferOwnership(command) => {
            let credentials = CredentialContext::single_from_env(&command.source_token_env)?;

            let report = transfer_ownership(&settings, &credentials, &command.job_file).await?;
            println!("{report}");
        }
        Command::CreateFromList(command) => {
            let settings = settings.apply(Overrides {
                target_org: command.target_org,
                visibility: command.visibility,
                ..Overrides::default()
            })?;
            let credentials = CredentialContext::single_from_env(&command.source_token_env)?;

            let report =
                create_from_list(&settings, &credentials, &command.job_file, &command.output_folder).await?;
            println!("{report}");
            let summary = report
                .write_summary(&command.output_folder)
                .context("could not write run summary")?;
            println!("summary written to {}", summary.display());
        }
        Command::InviteUser(command) => {
            let credentials = CredentialContext::single_from_env(&command.token_env)?;
            let provider = GithubProvider::configure_provider(&settings.source.api_url, &credentials.source)?;

            if let Err(error) = organization::invite_member(&provider, &command.org, &command.username).await {
                error!(error = %describe(error), org = %command.org, username = %command.username, "invitation failed");
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::CreateTeam(command) => {
            let credentials = CredentialContext::single_from_env(&command.token_env)?;
            let provider = GithubProvider::configure_provider(&settings.source.api_url, &credentials.source)?;

            if let Err(error) =
                organization::create_team_with_member(&provider, &command.org, &command.team, &command.username)
                    .await
            {
                error!(error = %describe(error), org = %command.org, team = %command.team, "team setup failed");
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

pub fn load_settings(path: Option<&Path>) -> Result<ParsedConfig> {
    let config = match path {
        Some(path) => read_config_file(path)?,
        None => reader::Config::default(),
    };

    Ok(parse_config(config)?)
}

/// Mirrors every job into the target side. `vcs` performs the git work.
pub async fn migrate<V: Vcs>(
    settings: &ParsedConfig,
    credentials: CredentialContext,
    job_file: &Path,
    vcs: V,
) -> Result<RunReport> {
    let grammar = match &settings.target_org {
        Some(owner) => JobGrammar::Mixed {
            target_owner: owner.clone(),
        },
        None => JobGrammar::Pair,
    };
    let jobs = JobReader::open(job_file, grammar)?;

    let target = GithubProvider::configure_provider(&settings.target.api_url, &credentials.target)
        .context("could not set up the target client")?;
    let migrator = Migrator::new(
        target,
        MirrorExecutor::new(vcs, &settings.workspace),
        credentials,
        settings.source.git_url.clone(),
        settings.target.git_url.clone(),
        settings.repository_options(RepositoryOptions::mirror_target()),
    );

    Ok(run_jobs(&migrator, jobs).await)
}

pub async fn transfer_ownership(
    settings: &ParsedConfig,
    credentials: &CredentialContext,
    job_file: &Path,
) -> Result<RunReport> {
    let jobs = JobReader::open(job_file, JobGrammar::Pair)?;

    let source = GithubProvider::configure_provider(&settings.source.api_url, &credentials.source)
        .context("could not set up the source client")?;

    Ok(run_jobs(&OwnershipTransfer::new(source), jobs).await)
}

/// Creates every listed repository. `output_folder` is prepared up front so the
/// summary has somewhere to go once repositories exist.
pub async fn create_from_list(
    settings: &ParsedConfig,
    credentials: &CredentialContext,
    job_file: &Path,
    output_folder: &Path,
) -> Result<RunReport> {
    let jobs = JobReader::open(
        job_file,
        JobGrammar::Single {
            target_owner: settings.target_org.clone(),
        },
    )?;
    prepare_output_folder(output_folder)?;

    let provider = GithubProvider::configure_provider(&settings.source.api_url, &credentials.source)
        .context("could not set up the source client")?;
    let creator = RepositoryCreator::new(provider, settings.repository_options(RepositoryOptions::default()));

    Ok(run_jobs(&creator, jobs).await)
}
