use super::types::{
    Conflict, ConflictResolution, FileChange, FileOperation, PlannedOperation,
    ReconciliationPlan,
};
use crate::store::{ContentStore, RemoteSnapshot, RepoRef, StoreError};
use std::collections::HashMap;
use tracing::{debug, warn};

/// What detection decided for one normalized operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Included in the plan
    Planned,
    /// Add or modify whose content already matches the store
    Unchanged,
    /// Delete of a path the store does not have
    AlreadyAbsent,
    /// Stale caller token under a `fail` or `skip` policy
    Conflicted(Conflict),
}

/// Output of change detection
#[derive(Debug, Clone, Default)]
pub struct Detection {
    pub plan: ReconciliationPlan,
    /// One decision per normalized operation, in request order
    pub decisions: Vec<Decision>,
    /// Snapshots of every path found in the store
    pub snapshots: HashMap<String, RemoteSnapshot>,
}

impl Detection {
    /// Paths that need no write, in request order
    pub fn unchanged(&self, operations: &[FileOperation]) -> Vec<String> {
        operations
            .iter()
            .zip(&self.decisions)
            .filter(|(_, decision)| {
                matches!(decision, Decision::Unchanged | Decision::AlreadyAbsent)
            })
            .map(|(operation, _)| operation.path.clone())
            .collect()
    }

    pub fn conflicts(&self) -> Vec<Conflict> {
        self.decisions
            .iter()
            .filter_map(|decision| match decision {
                Decision::Conflicted(conflict) => Some(conflict.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Remote state of a path as seen by the prober
enum Probe {
    Present(RemoteSnapshot),
    Absent,
    /// The store could not answer; the operation is planned as requested
    Unavailable(StoreError),
}

impl From<Result<Option<RemoteSnapshot>, StoreError>> for Probe {
    fn from(result: Result<Option<RemoteSnapshot>, StoreError>) -> Self {
        match result {
            Ok(Some(snapshot)) => Probe::Present(snapshot),
            Ok(None) => Probe::Absent,
            Err(error) => Probe::Unavailable(error),
        }
    }
}

/// Plan every operation verbatim, without contacting the store
pub fn plan_without_detection(operations: &[FileOperation]) -> Detection {
    Detection {
        plan: ReconciliationPlan {
            entries: operations
                .iter()
                .enumerate()
                .map(|(index, operation)| planned(index, operation.clone(), operation))
                .collect(),
        },
        decisions: vec![Decision::Planned; operations.len()],
        snapshots: HashMap::new(),
    }
}

/// Probe the store for every operation and decide what must be written.
///
/// Probes run one at a time in request order. A path is fetched at most once
/// per call. A probe that fails for any reason other than "not found" does
/// not abort the call: the operation is planned unchanged and the executor
/// reports whatever the store says when the write is attempted.
pub async fn detect_changes(
    store: &dyn ContentStore,
    repo: &RepoRef,
    operations: &[FileOperation],
    branch: &str,
    resolution: ConflictResolution,
) -> Detection {
    let mut detection = Detection::default();
    let mut absent: Vec<&str> = Vec::new();

    for (index, operation) in operations.iter().enumerate() {
        let path = operation.path.as_str();
        let probe = if let Some(snapshot) = detection.snapshots.get(path) {
            Probe::Present(snapshot.clone())
        } else if absent.contains(&path) {
            Probe::Absent
        } else {
            Probe::from(store.fetch(repo, path, branch).await)
        };

        let decision = match probe {
            Probe::Present(snapshot) => {
                let decision = decide_present(index, operation, &snapshot, resolution);
                detection.snapshots.insert(path.to_string(), snapshot);
                decision
            }
            Probe::Absent => {
                if !absent.contains(&path) {
                    absent.push(path);
                }
                decide_absent(index, operation)
            }
            Probe::Unavailable(error) => {
                warn!(%repo, path, %error, "Could not probe remote state, planning as requested");
                Ok(planned(index, operation.clone(), operation))
            }
        };

        match decision {
            Ok(entry) => {
                debug!(path, operation = %entry.operation.kind(), "Planned");
                detection.plan.entries.push(entry);
                detection.decisions.push(Decision::Planned);
            }
            Err(decision) => {
                debug!(path, ?decision, "Excluded from plan");
                detection.decisions.push(decision);
            }
        }
    }

    detection
}

fn planned(index: usize, operation: FileOperation, original: &FileOperation) -> PlannedOperation {
    PlannedOperation {
        index,
        original_kind: original.kind(),
        operation,
    }
}

fn decide_present(
    index: usize,
    operation: &FileOperation,
    snapshot: &RemoteSnapshot,
    resolution: ConflictResolution,
) -> Result<PlannedOperation, Decision> {
    let fetched = snapshot.version_token.clone();

    let change = match &operation.change {
        FileChange::Add { content } | FileChange::Modify { content, .. }
            if content.as_bytes() == snapshot.content.as_slice() =>
        {
            return Err(Decision::Unchanged);
        }
        // the store rejects creating an existing path; reported per file
        FileChange::Add { .. } => return Ok(planned(index, operation.clone(), operation)),
        FileChange::Modify { content, .. } => FileChange::Modify {
            content: content.clone(),
            version_token: Some(fetched.clone()),
        },
        FileChange::Delete { .. } => FileChange::Delete {
            version_token: Some(fetched.clone()),
        },
    };

    if let Some(expected) = operation.change.version_token() {
        if expected != fetched && resolution != ConflictResolution::Overwrite {
            return Err(Decision::Conflicted(Conflict {
                index,
                path: operation.path.clone(),
                operation: operation.kind(),
                expected_sha: expected.to_string(),
                current_sha: fetched,
                resolution,
            }));
        }
    }

    let resolved = FileOperation {
        path: operation.path.clone(),
        change,
    };
    Ok(planned(index, resolved, operation))
}

fn decide_absent(index: usize, operation: &FileOperation) -> Result<PlannedOperation, Decision> {
    match &operation.change {
        FileChange::Add { .. } => Ok(planned(index, operation.clone(), operation)),
        FileChange::Modify { content, .. } => {
            let reclassified = FileOperation {
                path: operation.path.clone(),
                change: FileChange::Add {
                    content: content.clone(),
                },
            };
            Ok(planned(index, reclassified, operation))
        }
        FileChange::Delete { .. } => Err(Decision::AlreadyAbsent),
    }
}
