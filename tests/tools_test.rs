mod common;

use common::{create_test_dir, seeded_store, test_repo, write_file, BRANCH};
use forgesync::files::{create_file, delete_file, update_file, FileError, FileRequest};
use forgesync::registry::ClientRegistry;
use forgesync::repository::{create_repository, RepositoryError};
use forgesync::server::ForgeMcpServer;
use forgesync::store::{CreateRepositoryOptions, MemoryStore, StoreCall, StoreError};
use forgesync::utils::compute_hash;
use serde_json::{json, Value};
use std::sync::Arc;

fn file_request(path: &str, content: Option<&str>) -> FileRequest {
    FileRequest {
        path: path.to_string(),
        content: content.map(str::to_string),
        message: "Edit".to_string(),
        branch: BRANCH.to_string(),
        sha: None,
    }
}

fn server_with(store: Arc<MemoryStore>) -> ForgeMcpServer {
    let mut registry = ClientRegistry::new();
    registry.insert("home", store);
    ForgeMcpServer::new(registry)
}

async fn call_tool(server: &ForgeMcpServer, name: &str, arguments: Value) -> (bool, String) {
    let message = json!({
        "jsonrpc": "2.0",
        "id": 7,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    });
    let response = server
        .handle_message(&message.to_string())
        .await
        .expect("Should handle message")
        .expect("Should respond");
    let response: Value = serde_json::from_str(&response).expect("Should be JSON");
    let result = &response["result"];
    (
        result["isError"].as_bool().unwrap_or(false),
        result["content"][0]["text"]
            .as_str()
            .unwrap_or_default()
            .to_string(),
    )
}

#[tokio::test]
async fn test_create_file_then_update_and_delete() {
    let store = seeded_store(&[]).await;
    let repo = test_repo();

    let created = create_file(&store, &repo, &file_request("./docs//intro.md", Some("v1")))
        .await
        .expect("Should create file");
    assert_eq!(created.path, "docs/intro.md");

    let updated = update_file(&store, &repo, &file_request("docs/intro.md", Some("v2")))
        .await
        .expect("Should update file");
    assert_eq!(updated.base_sha, Some(compute_hash(b"v1")));
    assert_eq!(
        store.content(&repo, BRANCH, "docs/intro.md").await.as_deref(),
        Some(&b"v2"[..])
    );

    delete_file(&store, &repo, &file_request("docs/intro.md", None))
        .await
        .expect("Should delete file");
    assert!(store.content(&repo, BRANCH, "docs/intro.md").await.is_none());
}

#[tokio::test]
async fn test_single_file_errors() {
    let store = seeded_store(&[("a.txt", "current")]).await;
    let repo = test_repo();

    // Existing path
    let result = create_file(&store, &repo, &file_request("a.txt", Some("x"))).await;
    assert!(matches!(
        result,
        Err(FileError::StoreError(StoreError::Conflict { .. }))
    ));

    // Missing file, no token to fetch
    let result = update_file(&store, &repo, &file_request("b.txt", Some("x"))).await;
    assert!(matches!(result, Err(FileError::FileNotFound(path)) if path == "b.txt"));

    // Stale caller token is passed through
    let mut request = file_request("a.txt", Some("x"));
    request.sha = Some("stale".to_string());
    let result = update_file(&store, &repo, &request).await;
    assert!(matches!(
        result,
        Err(FileError::StoreError(StoreError::Conflict { status: 409, .. }))
    ));

    // Validation happens before any call
    store.clear_calls().await;
    let result = update_file(&store, &repo, &file_request("a.txt", None)).await;
    assert!(matches!(result, Err(FileError::Validation(_))));
    let result = create_file(&store, &repo, &file_request("/etc/passwd", Some("x"))).await;
    assert!(matches!(result, Err(FileError::Validation(_))));
    assert!(store.calls().await.is_empty());
}

#[tokio::test]
async fn test_create_repository_validation() {
    let store = MemoryStore::new();
    let options = CreateRepositoryOptions {
        name: "website".to_string(),
        description: Some("Company site".to_string()),
        private: false,
        auto_init: true,
        default_branch: "main".to_string(),
        organization: Some("acme".to_string()),
    };

    let info = create_repository(&store, &options)
        .await
        .expect("Should create repository");
    assert_eq!(info.full_name, "acme/website");

    let duplicate = create_repository(&store, &options).await;
    assert!(matches!(
        duplicate,
        Err(RepositoryError::StoreError(StoreError::Conflict { .. }))
    ));

    let bad = CreateRepositoryOptions {
        name: "my site".to_string(),
        ..options.clone()
    };
    assert!(matches!(
        create_repository(&store, &bad).await,
        Err(RepositoryError::InvalidName { .. })
    ));

    let bad_org = CreateRepositoryOptions {
        organization: Some("a/b".to_string()),
        ..options
    };
    assert!(matches!(
        create_repository(&store, &bad_org).await,
        Err(RepositoryError::InvalidOrganization(_))
    ));

    let calls = store.calls().await;
    assert_eq!(
        calls
            .iter()
            .filter(|c| matches!(c, StoreCall::CreateRepository { .. }))
            .count(),
        2
    );
}

#[tokio::test]
async fn test_tools_over_json_rpc() {
    let store = Arc::new(MemoryStore::new());
    let server = server_with(store.clone());

    let (is_error, text) = call_tool(
        &server,
        "create_repository",
        json!({ "name": "website", "private": true }),
    )
    .await;
    assert!(!is_error, "{text}");
    let info: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(info["fullName"], "me/website");

    let (is_error, text) = call_tool(
        &server,
        "create_file",
        json!({
            "owner": "acme",
            "repo": "website",
            "path": "index.html",
            "content": "<p>hi</p>",
            "message": "Add index"
        }),
    )
    .await;
    assert!(!is_error, "{text}");

    let (is_error, text) = call_tool(
        &server,
        "advanced_update",
        json!({
            "owner": "acme",
            "repo": "website",
            "instance": "home",
            "message": "Refresh",
            "dryRun": true,
            "files": [
                { "path": "index.html", "content": "<p>hi</p>", "operation": "modify" },
                { "path": "about.html", "content": "<p>about</p>", "operation": "modify" }
            ]
        }),
    )
    .await;
    assert!(!is_error, "{text}");
    let summary: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(summary["dryRun"], true);
    assert_eq!(summary["needsUpdate"], 1);
    assert_eq!(summary["unchanged"][0], "index.html");
    assert_eq!(summary["plan"][0]["path"], "about.html");
    assert_eq!(summary["plan"][0]["operation"], "add");
    assert_eq!(summary["plan"][0]["hasRemoteSha"], false);

    let (is_error, text) = call_tool(
        &server,
        "delete_file",
        json!({
            "owner": "acme",
            "repo": "website",
            "path": "index.html",
            "message": "Remove index"
        }),
    )
    .await;
    assert!(!is_error, "{text}");
    assert!(store
        .content(&test_repo(), BRANCH, "index.html")
        .await
        .is_none());
}

#[tokio::test]
async fn test_tool_errors_are_reported_as_results() {
    let server = server_with(Arc::new(MemoryStore::new()));

    let (is_error, text) = call_tool(
        &server,
        "advanced_update",
        json!({
            "owner": "acme",
            "repo": "website",
            "instance": "work",
            "message": "m",
            "files": [{ "path": "a.txt", "content": "a" }]
        }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("work"));

    let (is_error, text) = call_tool(
        &server,
        "advanced_update",
        json!({
            "owner": "acme",
            "repo": "website",
            "message": "m",
            "files": [{ "path": "../a.txt", "content": "a" }]
        }),
    )
    .await;
    assert!(is_error);
    assert!(text.contains("invalid path"));

    let (is_error, _) = call_tool(&server, "rename_file", json!({})).await;
    assert!(is_error);
}

#[tokio::test]
async fn test_initial_sync_tool() {
    let dir = create_test_dir();
    write_file(dir.path(), "README.md", "# Website");
    write_file(dir.path(), "src/index.html", "<p>hi</p>");
    write_file(dir.path(), ".gitignore", "*.tmp\n");
    write_file(dir.path(), "scratch.tmp", "ignore me");

    let store = Arc::new(MemoryStore::new());
    store
        .insert(&test_repo(), BRANCH, "src/index.html", b"<p>hi</p>")
        .await;
    let server = server_with(store.clone());

    let (is_error, text) = call_tool(
        &server,
        "initial_sync",
        json!({
            "owner": "acme",
            "repo": "website",
            "directory": dir.path(),
            "message": "Initial import"
        }),
    )
    .await;
    assert!(!is_error, "{text}");

    let summary: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(summary["discovered"], 3);
    assert_eq!(summary["needsUpdate"], 2);
    assert_eq!(summary["succeeded"], 2);
    assert_eq!(summary["unchanged"][0], "src/index.html");
    assert!(store
        .content(&test_repo(), BRANCH, "README.md")
        .await
        .is_some());
    assert!(store
        .content(&test_repo(), BRANCH, "scratch.tmp")
        .await
        .is_none());
}
