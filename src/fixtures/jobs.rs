use crate::cli::RepositoryRef;
use crate::jobs::JobRecord;

/// `job("acme/widgets", "beta/widgets")`
pub fn job(source: &str, target: &str) -> JobRecord {
    JobRecord::new(repository(source), repository(target))
}

pub fn repository(value: &str) -> RepositoryRef {
    let (owner, name) = value
        .split_once('/')
        .unwrap_or_else(|| panic!("`{value}` is not owner/name"));

    RepositoryRef::new(owner, name)
}
