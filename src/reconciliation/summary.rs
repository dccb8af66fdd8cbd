use super::detect::Detection;
use super::types::{
    ConflictResolution, ExecutionOutcome, FileOperation, OutcomeStatus, PlannedFile, Strategy,
    Summary,
};

/// Everything the aggregator folds into a [`Summary`]
pub struct AggregateInput<'a> {
    /// Number of raw records in the request
    pub discovered: usize,
    pub operations: &'a [FileOperation],
    pub detection: &'a Detection,
    /// Executor outcomes; empty for dry runs and empty plans
    pub outcomes: Vec<ExecutionOutcome>,
    pub strategy: Strategy,
    pub dry_run: bool,
}

/// Fold detection decisions and execution outcomes into a summary.
///
/// `details` holds one entry per file that reached a terminal state other
/// than "unchanged": executed files plus conflicts rejected or skipped
/// during detection, ordered as in the request. Unchanged files are listed
/// only in `unchanged` and counted in `skipped`.
pub fn aggregate(input: AggregateInput<'_>) -> Summary {
    let AggregateInput {
        discovered,
        operations,
        detection,
        outcomes,
        strategy,
        dry_run,
    } = input;

    let conflicts = detection.conflicts();
    let unchanged = detection.unchanged(operations);

    let mut details = outcomes;
    details.extend(conflicts.iter().map(|conflict| {
        let (status, error) = match conflict.resolution {
            ConflictResolution::Skip => (OutcomeStatus::Skipped, None),
            ConflictResolution::Fail | ConflictResolution::Overwrite => (
                OutcomeStatus::Failed,
                Some(format!(
                    "version conflict: expected sha {}, found {}",
                    conflict.expected_sha, conflict.current_sha
                )),
            ),
        };
        ExecutionOutcome {
            index: conflict.index,
            path: conflict.path.clone(),
            kind: conflict.operation,
            status,
            error,
        }
    }));
    details.sort_by_key(|outcome| outcome.index);

    let count = |status: OutcomeStatus| details.iter().filter(|o| o.status == status).count();
    let succeeded = count(OutcomeStatus::Success);
    let failed = count(OutcomeStatus::Failed);
    let skipped = count(OutcomeStatus::Skipped) + unchanged.len();

    let plan = dry_run.then(|| {
        detection
            .plan
            .entries
            .iter()
            .map(|entry| PlannedFile {
                path: entry.operation.path.clone(),
                operation: entry.operation.kind(),
                original_operation: entry.original_kind,
                has_remote_sha: entry.operation.change.version_token().is_some(),
            })
            .collect()
    });

    Summary {
        success: failed == 0,
        dry_run,
        strategy,
        discovered,
        analyzed: operations.len(),
        needs_update: detection.plan.len(),
        processed: details.len(),
        succeeded,
        failed,
        skipped,
        details,
        unchanged,
        conflicts,
        plan,
    }
}
