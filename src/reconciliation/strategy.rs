use super::types::{ReconciliationPlan, RequestedStrategy, Strategy};

/// Choose how a plan is committed.
///
/// `auto` commits plans of at most one operation, and any plan containing a
/// delete, one file at a time; everything else becomes one combined commit.
/// An explicit `batch` request falls back to individual commits when there
/// is at most one operation to write.
pub fn select_strategy(requested: RequestedStrategy, plan: &ReconciliationPlan) -> Strategy {
    match requested {
        RequestedStrategy::Individual => Strategy::Individual,
        RequestedStrategy::Batch if plan.len() <= 1 => Strategy::Individual,
        RequestedStrategy::Batch => Strategy::Batch,
        RequestedStrategy::Auto if plan.len() <= 1 || plan.contains_delete() => {
            Strategy::Individual
        }
        RequestedStrategy::Auto => Strategy::Batch,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconciliation::types::{FileChange, FileOperation, PlannedOperation};

    fn plan(changes: Vec<FileChange>) -> ReconciliationPlan {
        ReconciliationPlan {
            entries: changes
                .into_iter()
                .enumerate()
                .map(|(index, change)| {
                    let operation = FileOperation {
                        path: format!("f{index}.txt"),
                        change,
                    };
                    PlannedOperation {
                        index,
                        original_kind: operation.kind(),
                        operation,
                    }
                })
                .collect(),
        }
    }

    fn add() -> FileChange {
        FileChange::Add {
            content: "x".into(),
        }
    }

    fn delete() -> FileChange {
        FileChange::Delete {
            version_token: Some("t".into()),
        }
    }

    #[test]
    fn test_auto_single_operation_is_individual() {
        assert_eq!(
            select_strategy(RequestedStrategy::Auto, &plan(vec![add()])),
            Strategy::Individual
        );
    }

    #[test]
    fn test_auto_with_delete_is_individual() {
        assert_eq!(
            select_strategy(RequestedStrategy::Auto, &plan(vec![add(), add(), delete()])),
            Strategy::Individual
        );
    }

    #[test]
    fn test_auto_adds_and_modifies_are_batched() {
        let modify = FileChange::Modify {
            content: "y".into(),
            version_token: Some("t".into()),
        };
        assert_eq!(
            select_strategy(RequestedStrategy::Auto, &plan(vec![add(), modify, add()])),
            Strategy::Batch
        );
    }

    #[test]
    fn test_explicit_batch_is_honored_with_deletes() {
        assert_eq!(
            select_strategy(RequestedStrategy::Batch, &plan(vec![add(), delete()])),
            Strategy::Batch
        );
    }

    #[test]
    fn test_explicit_batch_downgrades_for_tiny_plans() {
        assert_eq!(
            select_strategy(RequestedStrategy::Batch, &plan(vec![add()])),
            Strategy::Individual
        );
        assert_eq!(
            select_strategy(RequestedStrategy::Batch, &plan(vec![])),
            Strategy::Individual
        );
    }

    #[test]
    fn test_explicit_individual_is_honored() {
        assert_eq!(
            select_strategy(RequestedStrategy::Individual, &plan(vec![add(), add()])),
            Strategy::Individual
        );
    }
}
