use super::types::{FileChange, FileOperation, OperationKind, RawFileOperation};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No file operations were provided")]
    EmptyRequest,

    #[error("File #{index}: unknown operation '{operation}' (expected add, modify or delete)")]
    UnknownOperation { index: usize, operation: String },

    #[error("File #{index} ({path}): content is required for {operation}")]
    MissingContent {
        index: usize,
        path: String,
        operation: OperationKind,
    },

    #[error("File #{index}: invalid path '{path}': {reason}")]
    InvalidPath {
        index: usize,
        path: String,
        reason: &'static str,
    },

    #[error("Commit message must not be empty")]
    EmptyMessage,

    #[error("Branch must not be empty")]
    EmptyBranch,
}

/// Canonicalize a repository-relative path.
///
/// Backslashes become forward slashes and empty or `.` segments are dropped.
/// Parent traversal, absolute paths and drive prefixes are rejected.
pub fn normalize_path(path: &str) -> Result<String, &'static str> {
    let unified = path.trim().replace('\\', "/");

    if unified.starts_with('/') {
        return Err("absolute paths are not allowed");
    }
    if has_drive_prefix(&unified) {
        return Err("drive-qualified paths are not allowed");
    }

    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return Err("parent traversal is not allowed"),
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        return Err("path is empty");
    }

    Ok(segments.join("/"))
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Validate and canonicalize raw operations, preserving their order.
///
/// The whole request is rejected on the first invalid entry; nothing is
/// dropped, so the output has the same length as the input.
pub fn normalize_operations(
    raw: &[RawFileOperation],
) -> Result<Vec<FileOperation>, ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::EmptyRequest);
    }

    raw.iter()
        .enumerate()
        .map(|(index, entry)| normalize_operation(index, entry))
        .collect()
}

fn normalize_operation(
    index: usize,
    raw: &RawFileOperation,
) -> Result<FileOperation, ValidationError> {
    let kind = match raw.operation.as_deref() {
        None => OperationKind::Add,
        Some(value) => {
            OperationKind::parse(value).ok_or_else(|| ValidationError::UnknownOperation {
                index,
                operation: value.to_string(),
            })?
        }
    };

    let path = normalize_path(&raw.path).map_err(|reason| ValidationError::InvalidPath {
        index,
        path: raw.path.clone(),
        reason,
    })?;

    let version_token = raw.sha.clone().filter(|sha| !sha.trim().is_empty());
    let require_content = || {
        raw.content.clone().ok_or_else(|| ValidationError::MissingContent {
            index,
            path: path.clone(),
            operation: kind,
        })
    };

    let change = match kind {
        OperationKind::Add => FileChange::Add {
            content: require_content()?,
        },
        OperationKind::Modify => FileChange::Modify {
            content: require_content()?,
            version_token,
        },
        OperationKind::Delete => FileChange::Delete { version_token },
    };

    Ok(FileOperation { path, change })
}
