mod http;
mod memory;
mod types;

pub use http::{ForgeClient, ForgeClientOptions};
pub use memory::{MemoryStore, StoreCall};
pub use types::{
    BatchChange, BatchChangeKind, CreateRepositoryOptions, RemoteSnapshot, RepoRef,
    RepositoryInfo,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Version conflict ({status}): {body}")]
    Conflict { status: u16, body: String },

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Remote file-contents API of a forge instance.
///
/// `fetch` reports an absent path as `Ok(None)`; every other failure is an
/// error. Write calls return `Ok(())` once the forge has accepted the commit.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn fetch(
        &self,
        repo: &RepoRef,
        path: &str,
        reference: &str,
    ) -> Result<Option<RemoteSnapshot>, StoreError>;

    async fn create(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        message: &str,
        branch: &str,
    ) -> Result<(), StoreError>;

    async fn update(
        &self,
        repo: &RepoRef,
        path: &str,
        content: &[u8],
        message: &str,
        branch: &str,
        version_token: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn delete(
        &self,
        repo: &RepoRef,
        path: &str,
        message: &str,
        branch: &str,
        version_token: Option<&str>,
    ) -> Result<(), StoreError>;

    async fn batch_commit(
        &self,
        repo: &RepoRef,
        changes: &[BatchChange],
        message: &str,
        branch: &str,
    ) -> Result<(), StoreError>;

    async fn create_repository(
        &self,
        options: &CreateRepositoryOptions,
    ) -> Result<RepositoryInfo, StoreError>;
}
