mod common;

use common::{raw, raw_with_sha, seeded_store, test_repo, BRANCH};
use forgesync::reconciliation::{
    reconcile, ConflictResolution, OperationKind, OutcomeStatus, ReconcileError,
    ReconcileRequest, RequestedStrategy, Strategy, ValidationError,
};
use forgesync::store::{StoreCall, StoreError};
use forgesync::utils::compute_hash;

fn request(files: Vec<forgesync::reconciliation::RawFileOperation>) -> ReconcileRequest {
    ReconcileRequest::new(files, "Update site")
}

#[tokio::test]
async fn test_modify_of_missing_file_is_added() {
    let store = seeded_store(&[]).await;
    let summary = reconcile(
        &store,
        &test_repo(),
        &request(vec![raw("a.txt", Some("X"), "modify")]),
    )
    .await
    .expect("Should reconcile");

    assert_eq!(summary.strategy, Strategy::Individual);
    assert_eq!(summary.needs_update, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.details[0].kind, OperationKind::Add);

    // Created without a version token
    let calls = store.calls().await;
    assert!(calls.contains(&StoreCall::Create {
        path: "a.txt".to_string()
    }));
    assert_eq!(
        store.content(&test_repo(), BRANCH, "a.txt").await.as_deref(),
        Some(&b"X"[..])
    );
}

#[tokio::test]
async fn test_delete_of_missing_file_is_noop() {
    let store = seeded_store(&[]).await;
    let summary = reconcile(
        &store,
        &test_repo(),
        &request(vec![raw("b.txt", None, "delete")]),
    )
    .await
    .expect("Should reconcile");

    assert!(summary.success);
    assert_eq!(summary.needs_update, 0);
    assert_eq!(summary.succeeded, 0);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.unchanged, vec!["b.txt".to_string()]);
    assert_eq!(store.write_count().await, 0);
}

#[tokio::test]
async fn test_batch_failure_fails_every_file() {
    let store = seeded_store(&[("b.txt", "old b"), ("c.txt", "old c")]).await;
    store
        .fail_batch(StoreError::Api {
            status: 500,
            body: "internal error".to_string(),
        })
        .await;

    let summary = reconcile(
        &store,
        &test_repo(),
        &request(vec![
            raw("a.txt", Some("new a"), "add"),
            raw("b.txt", Some("new b"), "modify"),
            raw("c.txt", Some("new c"), "modify"),
        ]),
    )
    .await
    .expect("Should reconcile");

    assert_eq!(summary.strategy, Strategy::Batch);
    assert!(!summary.success);
    assert_eq!(summary.failed, 3);
    assert!(summary
        .details
        .iter()
        .all(|d| d.status == OutcomeStatus::Failed));
    let first = summary.details[0].error.clone();
    assert!(first.is_some());
    assert!(summary.details.iter().all(|d| d.error == first));

    // Nothing was applied
    assert_eq!(
        store.content(&test_repo(), BRANCH, "b.txt").await.as_deref(),
        Some(&b"old b"[..])
    );
}

#[tokio::test]
async fn test_batch_commit_applies_all_files() {
    let store = seeded_store(&[("b.txt", "old b")]).await;
    let summary = reconcile(
        &store,
        &test_repo(),
        &request(vec![
            raw("a.txt", Some("new a"), "add"),
            raw("b.txt", Some("new b"), "modify"),
        ]),
    )
    .await
    .expect("Should reconcile");

    assert_eq!(summary.strategy, Strategy::Batch);
    assert_eq!(summary.succeeded, 2);
    assert!(matches!(
        store.calls().await.last(),
        Some(StoreCall::BatchCommit { paths }) if paths.len() == 2
    ));
}

#[tokio::test]
async fn test_delete_forces_individual_commits() {
    let store = seeded_store(&[("old.txt", "bye"), ("keep.txt", "v1")]).await;
    let summary = reconcile(
        &store,
        &test_repo(),
        &request(vec![
            raw("keep.txt", Some("v2"), "modify"),
            raw("old.txt", None, "delete"),
        ]),
    )
    .await
    .expect("Should reconcile");

    assert_eq!(summary.strategy, Strategy::Individual);
    assert_eq!(summary.succeeded, 2);
    assert!(store
        .content(&test_repo(), BRANCH, "old.txt")
        .await
        .is_none());
    assert!(matches!(
        store.calls().await.last(),
        Some(StoreCall::Delete { version_token: Some(token), .. }) if *token == compute_hash(b"bye")
    ));
}

#[tokio::test]
async fn test_individual_failure_does_not_stop_other_files() {
    let store = seeded_store(&[]).await;
    store
        .fail_write(
            "a.txt",
            StoreError::Transport("connection reset".to_string()),
        )
        .await;

    let mut req = request(vec![
        raw("a.txt", Some("a"), "add"),
        raw("b.txt", Some("b"), "add"),
    ]);
    req.strategy = RequestedStrategy::Individual;
    let summary = reconcile(&store, &test_repo(), &req)
        .await
        .expect("Should reconcile");

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.details[0].status, OutcomeStatus::Failed);
    assert_eq!(summary.details[1].status, OutcomeStatus::Success);
    assert!(store.content(&test_repo(), BRANCH, "b.txt").await.is_some());
}

#[tokio::test]
async fn test_counts_cover_every_requested_file() {
    let store = seeded_store(&[("same.txt", "same")]).await;
    let files = vec![
        raw("same.txt", Some("same"), "modify"),
        raw("new.txt", Some("new"), "add"),
        raw("gone.txt", None, "delete"),
        raw("docs\\guide.md", Some("guide"), "add"),
    ];

    let summary = reconcile(&store, &test_repo(), &request(files))
        .await
        .expect("Should reconcile");

    assert_eq!(summary.discovered, 4);
    assert_eq!(summary.analyzed, 4);
    assert_eq!(summary.needs_update, 2);
    assert_eq!(summary.skipped, 2);
    assert_eq!(
        summary.unchanged,
        vec!["same.txt".to_string(), "gone.txt".to_string()]
    );
    assert!(store
        .content(&test_repo(), BRANCH, "docs/guide.md")
        .await
        .is_some());
}

#[tokio::test]
async fn test_second_run_needs_no_update() {
    let store = seeded_store(&[("index.html", "<p>old</p>"), ("stale.txt", "x")]).await;
    let req = request(vec![
        raw("index.html", Some("<p>new</p>"), "modify"),
        raw("about.html", Some("<p>about</p>"), "add"),
        raw("stale.txt", None, "delete"),
    ]);

    let first = reconcile(&store, &test_repo(), &req)
        .await
        .expect("Should reconcile");
    assert!(first.success);
    assert_eq!(first.needs_update, 3);

    let second = reconcile(&store, &test_repo(), &req)
        .await
        .expect("Should reconcile");
    assert!(second.success);
    assert_eq!(second.needs_update, 0);
    assert_eq!(second.unchanged.len(), 3);
}

#[tokio::test]
async fn test_dry_run_matches_real_run() {
    let files = vec![
        raw("a.txt", Some("a"), "modify"),
        raw("b.txt", Some("b2"), "modify"),
        raw("c.txt", Some("c"), "modify"),
    ];

    let dry_store = seeded_store(&[("b.txt", "b1"), ("c.txt", "c")]).await;
    let mut dry = request(files.clone());
    dry.dry_run = true;
    let preview = reconcile(&dry_store, &test_repo(), &dry)
        .await
        .expect("Should reconcile");

    assert!(preview.dry_run);
    assert_eq!(dry_store.write_count().await, 0);
    let plan = preview.plan.expect("Dry run should report the plan");
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].path, "a.txt");
    assert_eq!(plan[0].operation, OperationKind::Add);
    assert_eq!(plan[0].original_operation, OperationKind::Modify);
    assert!(!plan[0].has_remote_sha);
    assert_eq!(plan[1].path, "b.txt");
    assert_eq!(plan[1].operation, OperationKind::Modify);
    assert!(plan[1].has_remote_sha);

    // The real run writes exactly the planned files
    let real_store = seeded_store(&[("b.txt", "b1"), ("c.txt", "c")]).await;
    let summary = reconcile(&real_store, &test_repo(), &request(files))
        .await
        .expect("Should reconcile");
    assert!(summary.plan.is_none());
    assert_eq!(summary.strategy, preview.strategy);
    let executed: Vec<(String, OperationKind)> = summary
        .details
        .iter()
        .map(|d| (d.path.clone(), d.kind))
        .collect();
    let planned: Vec<(String, OperationKind)> =
        plan.iter().map(|p| (p.path.clone(), p.operation)).collect();
    assert_eq!(executed, planned);
}

#[tokio::test]
async fn test_without_detection_operations_run_verbatim() {
    let store = seeded_store(&[("a.txt", "same")]).await;
    let mut req = request(vec![raw("a.txt", Some("same"), "modify")]);
    req.detect_changes = false;

    let summary = reconcile(&store, &test_repo(), &req)
        .await
        .expect("Should reconcile");

    // No probe, and the update goes out without a token
    let calls = store.calls().await;
    assert!(!calls.iter().any(|c| matches!(c, StoreCall::Fetch { .. })));
    assert_eq!(
        calls,
        vec![StoreCall::Update {
            path: "a.txt".to_string(),
            version_token: None
        }]
    );
    assert_eq!(summary.failed, 1);
}

#[tokio::test]
async fn test_probe_failure_is_fail_open() {
    let store = seeded_store(&[]).await;
    store
        .fail_fetch("a.txt", StoreError::Transport("timed out".to_string()))
        .await;

    let summary = reconcile(
        &store,
        &test_repo(),
        &request(vec![raw("a.txt", Some("X"), "add")]),
    )
    .await
    .expect("Should reconcile");

    assert_eq!(summary.needs_update, 1);
    assert_eq!(summary.succeeded, 1);
}

#[tokio::test]
async fn test_conflict_policies() {
    let stale = compute_hash(b"what the caller saw");

    // overwrite: write on top of the current version
    let store = seeded_store(&[("a.txt", "current")]).await;
    let mut req = request(vec![raw_with_sha("a.txt", Some("mine"), "modify", &stale)]);
    let summary = reconcile(&store, &test_repo(), &req)
        .await
        .expect("Should reconcile");
    assert_eq!(summary.succeeded, 1);
    assert!(summary.conflicts.is_empty());

    // fail: reported, nothing written
    let store = seeded_store(&[("a.txt", "current")]).await;
    req.conflict_resolution = ConflictResolution::Fail;
    let summary = reconcile(&store, &test_repo(), &req)
        .await
        .expect("Should reconcile");
    assert!(!summary.success);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.conflicts.len(), 1);
    assert_eq!(summary.conflicts[0].current_sha, compute_hash(b"current"));
    let error = summary.details[0].error.as_deref().unwrap_or_default();
    assert!(error.starts_with("version conflict"));
    assert_eq!(store.write_count().await, 0);

    // skip: left alone, still a success
    let store = seeded_store(&[("a.txt", "current")]).await;
    req.conflict_resolution = ConflictResolution::Skip;
    let summary = reconcile(&store, &test_repo(), &req)
        .await
        .expect("Should reconcile");
    assert!(summary.success);
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.details[0].status, OutcomeStatus::Skipped);
    assert_eq!(store.write_count().await, 0);
}

#[tokio::test]
async fn test_validation_fails_before_any_io() {
    let store = seeded_store(&[]).await;

    let result = reconcile(
        &store,
        &test_repo(),
        &request(vec![
            raw("ok.txt", Some("fine"), "add"),
            raw("../escape.txt", Some("nope"), "add"),
        ]),
    )
    .await;
    assert!(matches!(
        result,
        Err(ReconcileError::Validation(ValidationError::InvalidPath { index: 1, .. }))
    ));

    let result = reconcile(
        &store,
        &test_repo(),
        &request(vec![raw("a.txt", Some("x"), "rename")]),
    )
    .await;
    assert!(matches!(
        result,
        Err(ReconcileError::Validation(ValidationError::UnknownOperation { .. }))
    ));

    let result = reconcile(
        &store,
        &test_repo(),
        &request(vec![raw("a.txt", None, "modify")]),
    )
    .await;
    assert!(matches!(
        result,
        Err(ReconcileError::Validation(ValidationError::MissingContent { .. }))
    ));

    let result = reconcile(&store, &test_repo(), &request(Vec::new())).await;
    assert!(matches!(
        result,
        Err(ReconcileError::Validation(ValidationError::EmptyRequest))
    ));

    assert!(store.calls().await.is_empty());
}
