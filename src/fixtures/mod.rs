//! Fakes and builders shared by unit and integration tests.

pub mod jobs;
pub mod provider;
pub mod vcs;
