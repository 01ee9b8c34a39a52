use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepositoryRef {
    pub owner: String,
    pub name: String,
}

impl RepositoryRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        RepositoryRef {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
    Internal,
}

/// Settings sent along with a repository creation request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RepositoryOptions {
    pub private: bool,
    pub visibility: Visibility,
    pub auto_init: bool,
}

impl RepositoryOptions {
    /// Mirror targets stay private and empty so the first push defines every ref.
    pub fn mirror_target() -> Self {
        RepositoryOptions {
            private: true,
            visibility: Visibility::Private,
            auto_init: false,
        }
    }

    pub fn with_visibility(mut self, visibility: Visibility) -> Self {
        self.private = visibility != Visibility::Public;
        self.visibility = visibility;
        self
    }
}

impl Default for RepositoryOptions {
    fn default() -> Self {
        RepositoryOptions {
            private: false,
            visibility: Visibility::Public,
            auto_init: true,
        }
    }
}

/// Where one side of a migration lives: its REST API root and its git host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub api_url: reqwest::Url,
    pub git_url: reqwest::Url,
}

pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_GIT_URL: &str = "https://github.com";

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint {
            api_url: reqwest::Url::parse(DEFAULT_API_URL).expect("default api url is valid"),
            git_url: reqwest::Url::parse(DEFAULT_GIT_URL).expect("default git url is valid"),
        }
    }
}
