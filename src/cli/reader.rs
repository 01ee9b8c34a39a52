use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::common::Visibility;
use crate::error::PreconditionError;

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    pub api_url: Option<String>,
    pub git_url: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    pub visibility: Option<Visibility>,
    pub auto_init: Option<bool>,
}

/// Optional YAML run configuration. Every key may be omitted.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub source: Option<EndpointConfig>,
    pub target: Option<EndpointConfig>,
    pub workspace: Option<PathBuf>,
    pub target_org: Option<String>,
    pub repository: Option<RepositoryConfig>,
}

pub fn read_config(config: &str) -> Result<Config, serde_yaml::Error> {
    // An empty document deserializes to unit, not to a mapping.
    if config.trim().is_empty() {
        return Ok(Config::default());
    }

    serde_yaml::from_str(config)
}

pub fn read_config_file(path: &Path) -> Result<Config, PreconditionError> {
    let content =
        std::fs::read_to_string(path).map_err(|source| PreconditionError::ConfigUnreadable {
            path: path.to_path_buf(),
            source,
        })?;

    read_config(&content).map_err(|source| PreconditionError::ConfigInvalid {
        path: path.to_path_buf(),
        reason: source.to_string(),
    })
}
