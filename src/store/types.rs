use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Owner/name pair addressing a repository on a forge instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoRef {
    pub owner: String,
    pub repo: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// The currently stored version of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteSnapshot {
    pub path: String,
    pub version_token: String,
    pub content: Vec<u8>,
}

/// Kind of a single change inside a combined commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchChangeKind {
    Create,
    Update,
    Delete,
}

/// One element of a combined-commit request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchChange {
    pub path: String,
    pub kind: BatchChangeKind,
    pub content: Option<Vec<u8>>,
    pub version_token: Option<String>,
}

/// Options for creating a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRepositoryOptions {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default = "default_auto_init")]
    pub auto_init: bool,
    #[serde(default = "default_branch")]
    pub default_branch: String,
    /// Create under this organization instead of the authenticated user
    #[serde(default)]
    pub organization: Option<String>,
}

fn default_auto_init() -> bool {
    true
}

fn default_branch() -> String {
    crate::utils::DEFAULT_BRANCH.to_string()
}

/// Repository as reported by the forge after creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryInfo {
    pub full_name: String,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub clone_url: Option<String>,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
