mod detect;
mod engine;
mod execute;
mod normalize;
mod strategy;
mod summary;
mod types;

pub use detect::{detect_changes, plan_without_detection, Decision, Detection};
pub use engine::{reconcile, ReconcileError, ReconcileRequest};
pub use execute::{execute_batch, execute_individual, execute_plan, CommitTarget, ExecuteError};
pub use normalize::{normalize_operations, normalize_path, ValidationError};
pub use strategy::select_strategy;
pub use summary::{aggregate, AggregateInput};
pub use types::{
    Conflict, ConflictResolution, ExecutionOutcome, FileChange, FileOperation, OperationKind,
    OutcomeStatus, PlannedFile, PlannedOperation, RawFileOperation, ReconciliationPlan,
    RequestedStrategy, Strategy, Summary,
};
