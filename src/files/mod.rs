use crate::reconciliation::{normalize_path, OperationKind, ValidationError};
use crate::store::{ContentStore, RepoRef, StoreError};
use crate::utils::DEFAULT_BRANCH;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum FileError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("File {0} does not exist")]
    FileNotFound(String),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

/// Arguments of a single-file write
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRequest {
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
    pub message: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Version token; fetched from the store when omitted
    #[serde(default)]
    pub sha: Option<String>,
}

/// Result of a single-file write
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWriteResult {
    pub path: String,
    pub operation: OperationKind,
    pub branch: String,
    /// Version token the write was based on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_sha: Option<String>,
}

struct ValidRequest<'a> {
    path: String,
    message: &'a str,
    branch: &'a str,
}

fn validate<'a>(request: &'a FileRequest) -> Result<ValidRequest<'a>, ValidationError> {
    let path = normalize_path(&request.path).map_err(|reason| ValidationError::InvalidPath {
        index: 0,
        path: request.path.clone(),
        reason,
    })?;
    if request.message.trim().is_empty() {
        return Err(ValidationError::EmptyMessage);
    }
    if request.branch.trim().is_empty() {
        return Err(ValidationError::EmptyBranch);
    }
    Ok(ValidRequest {
        path,
        message: &request.message,
        branch: &request.branch,
    })
}

fn require_content(
    request: &FileRequest,
    path: &str,
    operation: OperationKind,
) -> Result<Vec<u8>, ValidationError> {
    request
        .content
        .as_ref()
        .map(|c| c.as_bytes().to_vec())
        .ok_or_else(|| ValidationError::MissingContent {
            index: 0,
            path: path.to_string(),
            operation,
        })
}

/// Use the caller's token, or fetch the current one
async fn resolve_token(
    store: &dyn ContentStore,
    repo: &RepoRef,
    path: &str,
    branch: &str,
    supplied: Option<&str>,
) -> Result<String, FileError> {
    if let Some(sha) = supplied.filter(|s| !s.trim().is_empty()) {
        return Ok(sha.to_string());
    }

    store
        .fetch(repo, path, branch)
        .await?
        .map(|snapshot| snapshot.version_token)
        .ok_or_else(|| FileError::FileNotFound(path.to_string()))
}

/// Create a new file
pub async fn create_file(
    store: &dyn ContentStore,
    repo: &RepoRef,
    request: &FileRequest,
) -> Result<FileWriteResult, FileError> {
    let valid = validate(request)?;
    let content = require_content(request, &valid.path, OperationKind::Add)?;

    store
        .create(repo, &valid.path, &content, valid.message, valid.branch)
        .await?;
    info!(%repo, path = %valid.path, "Created file");

    Ok(FileWriteResult {
        path: valid.path,
        operation: OperationKind::Add,
        branch: valid.branch.to_string(),
        base_sha: None,
    })
}

/// Replace the content of an existing file
pub async fn update_file(
    store: &dyn ContentStore,
    repo: &RepoRef,
    request: &FileRequest,
) -> Result<FileWriteResult, FileError> {
    let valid = validate(request)?;
    let content = require_content(request, &valid.path, OperationKind::Modify)?;
    let sha =
        resolve_token(store, repo, &valid.path, valid.branch, request.sha.as_deref()).await?;

    store
        .update(
            repo,
            &valid.path,
            &content,
            valid.message,
            valid.branch,
            Some(&sha),
        )
        .await?;
    info!(%repo, path = %valid.path, "Updated file");

    Ok(FileWriteResult {
        path: valid.path,
        operation: OperationKind::Modify,
        branch: valid.branch.to_string(),
        base_sha: Some(sha),
    })
}

/// Delete an existing file
pub async fn delete_file(
    store: &dyn ContentStore,
    repo: &RepoRef,
    request: &FileRequest,
) -> Result<FileWriteResult, FileError> {
    let valid = validate(request)?;
    let sha =
        resolve_token(store, repo, &valid.path, valid.branch, request.sha.as_deref()).await?;

    store
        .delete(repo, &valid.path, valid.message, valid.branch, Some(&sha))
        .await?;
    info!(%repo, path = %valid.path, "Deleted file");

    Ok(FileWriteResult {
        path: valid.path,
        operation: OperationKind::Delete,
        branch: valid.branch.to_string(),
        base_sha: Some(sha),
    })
}
