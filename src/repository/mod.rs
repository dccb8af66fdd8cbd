use crate::store::{ContentStore, CreateRepositoryOptions, RepositoryInfo, StoreError};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Invalid repository name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("Invalid organization name '{0}'")]
    InvalidOrganization(String),

    #[error("Default branch must not be empty")]
    EmptyDefaultBranch,

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,100}$").expect("valid name pattern"));

/// Validate a repository or organization name the way forges do
pub fn validate_repository_name(name: &str) -> Result<(), &'static str> {
    if !NAME_PATTERN.is_match(name) {
        return Err("use 1-100 letters, digits, '.', '_' or '-'");
    }
    if name == "." || name == ".." {
        return Err("reserved name");
    }
    if name.to_ascii_lowercase().ends_with(".git") {
        return Err("must not end with .git");
    }
    Ok(())
}

/// Validate options and create the repository on the forge
pub async fn create_repository(
    store: &dyn ContentStore,
    options: &CreateRepositoryOptions,
) -> Result<RepositoryInfo, RepositoryError> {
    validate_repository_name(&options.name).map_err(|reason| RepositoryError::InvalidName {
        name: options.name.clone(),
        reason,
    })?;
    if let Some(org) = &options.organization {
        if validate_repository_name(org).is_err() {
            return Err(RepositoryError::InvalidOrganization(org.clone()));
        }
    }
    if options.default_branch.trim().is_empty() {
        return Err(RepositoryError::EmptyDefaultBranch);
    }

    let repository = store.create_repository(options).await?;
    info!(repository = %repository.full_name, "Created repository");
    Ok(repository)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_repository_name("notes").is_ok());
        assert!(validate_repository_name("my-repo_2.0").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(validate_repository_name("").is_err());
        assert!(validate_repository_name("has space").is_err());
        assert!(validate_repository_name("..").is_err());
        assert!(validate_repository_name("mirror.git").is_err());
        assert!(validate_repository_name(&"a".repeat(101)).is_err());
    }
}
