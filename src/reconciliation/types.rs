use serde::{Deserialize, Serialize};
use std::fmt;

/// Requested operation on a single file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Add,
    Modify,
    Delete,
}

impl OperationKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "add" => Some(OperationKind::Add),
            "modify" => Some(OperationKind::Modify),
            "delete" => Some(OperationKind::Delete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Add => "add",
            OperationKind::Modify => "modify",
            OperationKind::Delete => "delete",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped operation record as received from the tool layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFileOperation {
    pub path: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, alias = "kind")]
    pub operation: Option<String>,
    #[serde(default, alias = "versionToken")]
    pub sha: Option<String>,
}

/// Validated change, with content and version token only where they apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChange {
    Add {
        content: String,
    },
    Modify {
        content: String,
        version_token: Option<String>,
    },
    Delete {
        version_token: Option<String>,
    },
}

impl FileChange {
    pub fn kind(&self) -> OperationKind {
        match self {
            FileChange::Add { .. } => OperationKind::Add,
            FileChange::Modify { .. } => OperationKind::Modify,
            FileChange::Delete { .. } => OperationKind::Delete,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            FileChange::Add { content } | FileChange::Modify { content, .. } => Some(content),
            FileChange::Delete { .. } => None,
        }
    }

    pub fn version_token(&self) -> Option<&str> {
        match self {
            FileChange::Add { .. } => None,
            FileChange::Modify { version_token, .. } | FileChange::Delete { version_token } => {
                version_token.as_deref()
            }
        }
    }
}

/// A normalized operation: relative forward-slash path plus typed change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileOperation {
    pub path: String,
    pub change: FileChange,
}

impl FileOperation {
    pub fn kind(&self) -> OperationKind {
        self.change.kind()
    }
}

/// Strategy requested by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestedStrategy {
    #[default]
    Auto,
    Batch,
    Individual,
}

/// Strategy the executor actually runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Batch,
    Individual,
}

/// What to do when a caller-supplied version token is stale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    /// Adopt the freshly fetched token and write anyway
    #[default]
    Overwrite,
    /// Report the file as failed without writing it
    Fail,
    /// Leave the file alone and report it as skipped
    Skip,
}

/// An operation selected for execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOperation {
    /// Position in the caller's request
    pub index: usize,
    pub operation: FileOperation,
    /// Kind before detection reclassified it
    pub original_kind: OperationKind,
}

/// Ordered operations that need to be executed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    pub entries: Vec<PlannedOperation>,
}

impl ReconciliationPlan {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_delete(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.operation.kind() == OperationKind::Delete)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Success,
    Failed,
    Skipped,
}

/// Per-file result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    #[serde(skip)]
    pub index: usize,
    pub path: String,
    #[serde(rename = "operation")]
    pub kind: OperationKind,
    pub status: OutcomeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A caller-supplied version token that no longer matches the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conflict {
    #[serde(skip)]
    pub index: usize,
    pub path: String,
    pub operation: OperationKind,
    pub expected_sha: String,
    pub current_sha: String,
    pub resolution: ConflictResolution,
}

/// Dry-run view of a planned operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedFile {
    pub path: String,
    pub operation: OperationKind,
    pub original_operation: OperationKind,
    pub has_remote_sha: bool,
}

/// Result of a reconciliation call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// `failed == 0`
    pub success: bool,
    pub dry_run: bool,
    pub strategy: Strategy,
    pub discovered: usize,
    pub analyzed: usize,
    pub needs_update: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub details: Vec<ExecutionOutcome>,
    pub unchanged: Vec<String>,
    pub conflicts: Vec<Conflict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<PlannedFile>>,
}
