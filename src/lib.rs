pub mod cli;
pub mod credentials;
pub mod error;
pub mod fixtures;
pub mod github_provider;
pub mod jobs;
pub mod mirror;
pub mod orchestrator;
pub mod organization;
pub mod outcome;
pub mod provider;
pub mod report;
