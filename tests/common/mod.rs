#![allow(dead_code)]

use forgesync::reconciliation::RawFileOperation;
use forgesync::store::{MemoryStore, RepoRef};
use tempfile::TempDir;

pub const BRANCH: &str = "main";

/// Create a temporary directory for testing
pub fn create_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

pub fn test_repo() -> RepoRef {
    RepoRef::new("acme", "website")
}

/// Raw operation as a tool caller would send it
pub fn raw(path: &str, content: Option<&str>, operation: &str) -> RawFileOperation {
    RawFileOperation {
        path: path.to_string(),
        content: content.map(str::to_string),
        operation: Some(operation.to_string()),
        sha: None,
    }
}

pub fn raw_with_sha(
    path: &str,
    content: Option<&str>,
    operation: &str,
    sha: &str,
) -> RawFileOperation {
    RawFileOperation {
        sha: Some(sha.to_string()),
        ..raw(path, content, operation)
    }
}

/// Store holding the given files on the test repository's main branch
pub async fn seeded_store(files: &[(&str, &str)]) -> MemoryStore {
    let store = MemoryStore::new();
    for (path, content) in files {
        store
            .insert(&test_repo(), BRANCH, path, content.as_bytes())
            .await;
    }
    store
}

/// Write a file below `root`, creating parent directories
pub fn write_file(root: &std::path::Path, path: &str, content: &str) {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).expect("Should create parent dirs");
    }
    std::fs::write(full, content).expect("Should write file");
}
