use crate::reconciliation::{
    reconcile, OperationKind, RawFileOperation, ReconcileError, ReconcileRequest,
    RequestedStrategy, Summary,
};
use crate::store::{ContentStore, RepoRef};
use crate::utils::DEFAULT_BRANCH;
use ignore::{DirEntry, WalkBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Files larger than this are not uploaded
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Directories never uploaded, at any depth
const DEFAULT_IGNORED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "target",
    "__pycache__",
    ".venv",
    ".tox",
];

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Directory not found: {0}")]
    DirectoryNotFound(PathBuf),

    #[error("No files to sync in {0}")]
    NoFiles(PathBuf),

    #[error("Reconciliation error: {0}")]
    Reconcile(#[from] ReconcileError),
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

/// Upload a local directory into a repository
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialSyncRequest {
    pub directory: PathBuf,
    pub message: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub strategy: RequestedStrategy,
    #[serde(default)]
    pub dry_run: bool,
}

/// Collect the files below `root` as `modify` operations.
///
/// Honors `.gitignore` files at any level (negations and character classes
/// included) but never those above `root`. Also skips `.git`, common build
/// output, files over [`MAX_FILE_SIZE`] and files that are not UTF-8.
/// Paths are relative to `root`, use `/` and come back sorted.
pub fn discover_files(root: &Path) -> Result<Vec<RawFileOperation>, SyncError> {
    if !root.is_dir() {
        return Err(SyncError::DirectoryNotFound(root.to_path_buf()));
    }

    let walker = WalkBuilder::new(root)
        .hidden(false)
        .parents(false)
        .git_ignore(true)
        .git_global(false)
        .git_exclude(false)
        .require_git(false)
        .filter_entry(|entry| !is_default_ignored(entry))
        .build();

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }

        let Some(relative) = relative_path(root, entry.path()) else {
            continue;
        };

        let size = entry.metadata().map(|m| m.len()).unwrap_or(u64::MAX);
        if size > MAX_FILE_SIZE {
            debug!(path = %relative, size, "Skipping large file");
            continue;
        }

        let Some(content) = read_text(entry.path(), &relative) else {
            continue;
        };

        files.push(RawFileOperation {
            path: relative,
            content: Some(content),
            operation: Some(OperationKind::Modify.as_str().to_string()),
            sha: None,
        });
    }

    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn is_default_ignored(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_some_and(|t| t.is_dir())
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| DEFAULT_IGNORED_DIRS.contains(&name))
}

/// UTF-8 content of a local file; `None` when unreadable or binary
fn read_text(path: &Path, relative: &str) -> Option<String> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(path = %relative, error = %e, "Skipping unreadable file");
            return None;
        }
    };
    match String::from_utf8(bytes) {
        Ok(content) => Some(content),
        Err(_) => {
            debug!(path = %relative, "Skipping binary file");
            None
        }
    }
}

/// Forward-slash path of `path` relative to `root`; `None` for non-UTF-8 names
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

/// Push the contents of a local directory to the repository.
///
/// Remote files that are missing are created, identical ones are left
/// alone and differing ones are updated on top of the current version.
pub async fn initial_sync(
    store: &dyn ContentStore,
    repo: &RepoRef,
    request: &InitialSyncRequest,
) -> Result<Summary, SyncError> {
    let files = discover_files(&request.directory)?;
    if files.is_empty() {
        return Err(SyncError::NoFiles(request.directory.clone()));
    }
    info!(
        %repo,
        directory = %request.directory.display(),
        files = files.len(),
        "Discovered local files"
    );

    let mut reconcile_request = ReconcileRequest::new(files, request.message.clone());
    reconcile_request.branch = request.branch.clone();
    reconcile_request.strategy = request.strategy;
    reconcile_request.dry_run = request.dry_run;
    reconcile_request.detect_changes = true;

    Ok(reconcile(store, repo, &reconcile_request).await?)
}
