use super::detect::{detect_changes, plan_without_detection};
use super::execute::{execute_plan, CommitTarget, ExecuteError};
use super::normalize::{normalize_operations, ValidationError};
use super::strategy::select_strategy;
use super::summary::{aggregate, AggregateInput};
use super::types::{ConflictResolution, RawFileOperation, RequestedStrategy, Summary};
use crate::store::{ContentStore, RepoRef};
use crate::utils::DEFAULT_BRANCH;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReconcileError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execute(#[from] ExecuteError),
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

fn default_detect_changes() -> bool {
    true
}

/// Input of a reconciliation call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileRequest {
    pub files: Vec<RawFileOperation>,
    pub message: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub strategy: RequestedStrategy,
    #[serde(default = "default_detect_changes")]
    pub detect_changes: bool,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub conflict_resolution: ConflictResolution,
}

impl ReconcileRequest {
    pub fn new(files: Vec<RawFileOperation>, message: impl Into<String>) -> Self {
        Self {
            files,
            message: message.into(),
            branch: default_branch(),
            strategy: RequestedStrategy::default(),
            detect_changes: default_detect_changes(),
            dry_run: false,
            conflict_resolution: ConflictResolution::default(),
        }
    }
}

/// Reconcile the requested files against the store.
///
/// Validation problems fail the call before any network I/O. After that the
/// call always returns a complete summary: per-file store failures are
/// reported in `details`, never as an error. A dry run probes the store
/// but issues no writes.
pub async fn reconcile(
    store: &dyn ContentStore,
    repo: &RepoRef,
    request: &ReconcileRequest,
) -> Result<Summary, ReconcileError> {
    if request.message.trim().is_empty() {
        return Err(ValidationError::EmptyMessage.into());
    }
    if request.branch.trim().is_empty() {
        return Err(ValidationError::EmptyBranch.into());
    }

    let operations = normalize_operations(&request.files)?;

    let detection = if request.detect_changes {
        detect_changes(
            store,
            repo,
            &operations,
            &request.branch,
            request.conflict_resolution,
        )
        .await
    } else {
        plan_without_detection(&operations)
    };

    let strategy = select_strategy(request.strategy, &detection.plan);
    info!(
        %repo,
        branch = %request.branch,
        requested = operations.len(),
        planned = detection.plan.len(),
        ?strategy,
        dry_run = request.dry_run,
        "Reconciliation planned"
    );

    let outcomes = if request.dry_run || detection.plan.is_empty() {
        Vec::new()
    } else {
        let target = CommitTarget {
            repo,
            branch: &request.branch,
            message: &request.message,
        };
        execute_plan(store, target, &detection.plan, strategy).await?
    };

    let summary = aggregate(AggregateInput {
        discovered: request.files.len(),
        operations: &operations,
        detection: &detection,
        outcomes,
        strategy,
        dry_run: request.dry_run,
    });

    info!(
        %repo,
        succeeded = summary.succeeded,
        failed = summary.failed,
        unchanged = summary.unchanged.len(),
        "Reconciliation finished"
    );
    Ok(summary)
}
