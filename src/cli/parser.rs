use std::path::PathBuf;

use reqwest::Url;

use super::common::{Endpoint, RepositoryOptions, Visibility, DEFAULT_API_URL, DEFAULT_GIT_URL};
use super::reader::{self, EndpointConfig};
use crate::error::PreconditionError;
use crate::jobs::is_identifier;
use crate::mirror::DEFAULT_WORKSPACE;

/// Run settings after defaults, the config file and command-line flags are merged.
#[derive(Clone, Debug, PartialEq)]
pub struct ParsedConfig {
    pub source: Endpoint,
    pub target: Endpoint,
    pub workspace: PathBuf,
    pub target_org: Option<String>,
    pub visibility: Option<Visibility>,
    pub auto_init: Option<bool>,
}

impl Default for ParsedConfig {
    fn default() -> Self {
        ParsedConfig {
            source: Endpoint::default(),
            target: Endpoint::default(),
            workspace: PathBuf::from(DEFAULT_WORKSPACE),
            target_org: None,
            visibility: None,
            auto_init: None,
        }
    }
}

/// Flags that take precedence over the config file.
#[derive(Clone, Debug, Default)]
pub struct Overrides {
    pub workspace: Option<PathBuf>,
    pub target_org: Option<String>,
    pub visibility: Option<Visibility>,
}

impl ParsedConfig {
    pub fn apply(mut self, overrides: Overrides) -> Result<Self, PreconditionError> {
        if let Some(workspace) = overrides.workspace {
            self.workspace = workspace;
        }
        if let Some(target_org) = overrides.target_org {
            self.target_org = Some(validate_org(target_org)?);
        }
        if let Some(visibility) = overrides.visibility {
            self.visibility = Some(visibility);
        }

        Ok(self)
    }

    /// `base` with the configured visibility and auto-init applied on top.
    pub fn repository_options(&self, base: RepositoryOptions) -> RepositoryOptions {
        let mut options = match self.visibility {
            Some(visibility) => base.with_visibility(visibility),
            None => base,
        };
        if let Some(auto_init) = self.auto_init {
            options.auto_init = auto_init;
        }

        options
    }
}

pub fn parse_config(config: reader::Config) -> Result<ParsedConfig, PreconditionError> {
    let defaults = ParsedConfig::default();
    let repository = config.repository.unwrap_or_default();

    Ok(ParsedConfig {
        source: parse_endpoint(config.source, "source.api_url", "source.git_url")?,
        target: parse_endpoint(config.target, "target.api_url", "target.git_url")?,
        workspace: config.workspace.unwrap_or(defaults.workspace),
        target_org: config.target_org.map(validate_org).transpose()?,
        visibility: repository.visibility,
        auto_init: repository.auto_init,
    })
}

fn parse_endpoint(
    config: Option<EndpointConfig>,
    api_field: &'static str,
    git_field: &'static str,
) -> Result<Endpoint, PreconditionError> {
    let config = config.unwrap_or_default();

    Ok(Endpoint {
        api_url: parse_url(config.api_url.as_deref().unwrap_or(DEFAULT_API_URL), api_field)?,
        git_url: parse_url(config.git_url.as_deref().unwrap_or(DEFAULT_GIT_URL), git_field)?,
    })
}

fn parse_url(value: &str, field: &'static str) -> Result<Url, PreconditionError> {
    let invalid = || PreconditionError::InvalidSetting {
        field,
        value: value.to_string(),
    };

    let url = Url::parse(value).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(invalid());
    }

    Ok(url)
}

fn validate_org(value: String) -> Result<String, PreconditionError> {
    if is_identifier(&value) {
        Ok(value)
    } else {
        Err(PreconditionError::InvalidSetting {
            field: "target_org",
            value,
        })
    }
}
