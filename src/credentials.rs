use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::PreconditionError;

pub const DEFAULT_SOURCE_TOKEN_ENV: &str = "PAT_SOURCE";
pub const DEFAULT_TARGET_TOKEN_ENV: &str = "PAT_TARGET";

const REDACTED: &str = "***";
pub const MIN_BARE_TOKEN_LEN: usize = 8;

fn userinfo() -> &'static Regex {
    static USERINFO: OnceLock<Regex> = OnceLock::new();
    USERINFO.get_or_init(|| Regex::new(r"://[^/@\s]+@").expect("userinfo pattern"))
}

/// An access token. Formatting never reveals the value.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({REDACTED})")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(REDACTED)
    }
}

/// Tokens for both sides of a run, resolved once at startup.
#[derive(Clone, Debug)]
pub struct CredentialContext {
    pub source: Secret,
    pub target: Secret,
}

impl CredentialContext {
    pub fn new(source: Secret, target: Secret) -> Self {
        CredentialContext { source, target }
    }

    pub fn from_env(source_env: &str, target_env: &str) -> Result<Self, PreconditionError> {
        Self::resolve(source_env, target_env, |name| std::env::var(name).ok())
    }

    /// Commands that only talk to one organisation use the same token on both sides.
    pub fn single_from_env(env: &str) -> Result<Self, PreconditionError> {
        Self::from_env(env, env)
    }

    pub fn resolve<F>(source_env: &str, target_env: &str, lookup: F) -> Result<Self, PreconditionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let fetch = |name: &str| {
            lookup(name)
                .filter(|value| !value.trim().is_empty())
                .map(Secret::new)
                .ok_or_else(|| PreconditionError::MissingCredential(name.to_string()))
        };

        Ok(CredentialContext {
            source: fetch(source_env)?,
            target: fetch(target_env)?,
        })
    }

    /// Masks url credentials and any stray token, e.g. in git output that echoes a remote.
    ///
    /// Tokens shorter than [`MIN_BARE_TOKEN_LEN`] are only masked inside urls.
    pub fn redact(&self, text: &str) -> String {
        let masked = userinfo().replace_all(text, format!("://{REDACTED}@").as_str());

        [&self.source, &self.target]
            .into_iter()
            .map(Secret::expose)
            .filter(|token| token.len() >= MIN_BARE_TOKEN_LEN)
            .fold(masked.into_owned(), |acc, token| acc.replace(token, REDACTED))
    }
}
