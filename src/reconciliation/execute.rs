use super::types::{
    ExecutionOutcome, FileChange, OutcomeStatus, PlannedOperation, ReconciliationPlan, Strategy,
};
use crate::store::{BatchChange, BatchChangeKind, ContentStore, RepoRef, StoreError};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecuteError {
    #[error("Executor was invoked with an empty plan")]
    EmptyPlan,
}

/// Where and how the plan is committed
#[derive(Debug, Clone, Copy)]
pub struct CommitTarget<'a> {
    pub repo: &'a RepoRef,
    pub branch: &'a str,
    pub message: &'a str,
}

/// Run the plan with the given strategy.
///
/// Store failures never escape: they become `Failed` outcomes. The only
/// error is calling this with nothing to do.
pub async fn execute_plan(
    store: &dyn ContentStore,
    target: CommitTarget<'_>,
    plan: &ReconciliationPlan,
    strategy: Strategy,
) -> Result<Vec<ExecutionOutcome>, ExecuteError> {
    match strategy {
        Strategy::Individual => execute_individual(store, target, plan).await,
        Strategy::Batch => execute_batch(store, target, plan).await,
    }
}

/// Commit each planned operation separately, in plan order.
pub async fn execute_individual(
    store: &dyn ContentStore,
    target: CommitTarget<'_>,
    plan: &ReconciliationPlan,
) -> Result<Vec<ExecutionOutcome>, ExecuteError> {
    if plan.is_empty() {
        return Err(ExecuteError::EmptyPlan);
    }

    let mut outcomes = Vec::with_capacity(plan.len());
    for entry in &plan.entries {
        let result = apply_one(store, target, entry).await;
        if let Err(error) = &result {
            warn!(
                repo = %target.repo,
                path = %entry.operation.path,
                %error,
                "File commit failed"
            );
        }
        outcomes.push(outcome(entry, result));
    }

    Ok(outcomes)
}

async fn apply_one(
    store: &dyn ContentStore,
    target: CommitTarget<'_>,
    entry: &PlannedOperation,
) -> Result<(), StoreError> {
    let path = entry.operation.path.as_str();
    match &entry.operation.change {
        FileChange::Add { content } => {
            store
                .create(
                    target.repo,
                    path,
                    content.as_bytes(),
                    target.message,
                    target.branch,
                )
                .await
        }
        FileChange::Modify {
            content,
            version_token,
        } => {
            store
                .update(
                    target.repo,
                    path,
                    content.as_bytes(),
                    target.message,
                    target.branch,
                    version_token.as_deref(),
                )
                .await
        }
        FileChange::Delete { version_token } => {
            store
                .delete(
                    target.repo,
                    path,
                    target.message,
                    target.branch,
                    version_token.as_deref(),
                )
                .await
        }
    }
}

/// Commit the whole plan as one combined commit.
///
/// The forge accepts or rejects the commit as a unit, so every operation
/// shares the same outcome.
pub async fn execute_batch(
    store: &dyn ContentStore,
    target: CommitTarget<'_>,
    plan: &ReconciliationPlan,
) -> Result<Vec<ExecutionOutcome>, ExecuteError> {
    if plan.is_empty() {
        return Err(ExecuteError::EmptyPlan);
    }

    let changes: Vec<BatchChange> = plan.entries.iter().map(batch_change).collect();
    let result = store
        .batch_commit(target.repo, &changes, target.message, target.branch)
        .await;

    match &result {
        Ok(()) => info!(repo = %target.repo, files = changes.len(), "Combined commit accepted"),
        Err(error) => warn!(repo = %target.repo, %error, "Combined commit failed"),
    }

    Ok(plan
        .entries
        .iter()
        .map(|entry| outcome(entry, result.clone()))
        .collect())
}

fn batch_change(entry: &PlannedOperation) -> BatchChange {
    let operation = &entry.operation;
    let kind = match operation.change {
        FileChange::Add { .. } => BatchChangeKind::Create,
        FileChange::Modify { .. } => BatchChangeKind::Update,
        FileChange::Delete { .. } => BatchChangeKind::Delete,
    };

    BatchChange {
        path: operation.path.clone(),
        kind,
        content: operation.change.content().map(|c| c.as_bytes().to_vec()),
        version_token: operation.change.version_token().map(str::to_string),
    }
}

fn outcome(entry: &PlannedOperation, result: Result<(), StoreError>) -> ExecutionOutcome {
    let (status, error) = match result {
        Ok(()) => (OutcomeStatus::Success, None),
        Err(error) => (OutcomeStatus::Failed, Some(error.to_string())),
    };

    ExecutionOutcome {
        index: entry.index,
        path: entry.operation.path.clone(),
        kind: entry.operation.kind(),
        status,
        error,
    }
}
