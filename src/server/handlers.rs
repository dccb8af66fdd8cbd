use super::ServerError;
use crate::files::{create_file, delete_file, update_file, FileRequest};
use crate::reconciliation::{reconcile, ReconcileRequest};
use crate::registry::ClientRegistry;
use crate::repository::create_repository;
use crate::store::{CreateRepositoryOptions, RepoRef};
use crate::sync::{initial_sync, InitialSyncRequest};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Repository a tool call operates on
#[derive(Debug, Deserialize)]
struct Target {
    owner: String,
    repo: String,
    #[serde(default)]
    instance: Option<String>,
}

impl Target {
    fn repo_ref(&self) -> Result<RepoRef, ServerError> {
        if self.owner.trim().is_empty() || self.repo.trim().is_empty() {
            return Err(ServerError::InvalidArguments(
                "owner and repo must not be empty".to_string(),
            ));
        }
        Ok(RepoRef::new(self.owner.trim(), self.repo.trim()))
    }
}

#[derive(Debug, Deserialize)]
struct CreateRepositoryArgs {
    #[serde(default)]
    instance: Option<String>,
    #[serde(flatten)]
    options: CreateRepositoryOptions,
}

#[derive(Debug, Deserialize)]
struct FileArgs {
    #[serde(flatten)]
    target: Target,
    #[serde(flatten)]
    request: FileRequest,
}

#[derive(Debug, Deserialize)]
struct AdvancedUpdateArgs {
    #[serde(flatten)]
    target: Target,
    #[serde(flatten)]
    request: ReconcileRequest,
}

#[derive(Debug, Deserialize)]
struct InitialSyncArgs {
    #[serde(flatten)]
    target: Target,
    #[serde(flatten)]
    request: InitialSyncRequest,
}

fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T, ServerError> {
    serde_json::from_value(arguments).map_err(|e| ServerError::InvalidArguments(e.to_string()))
}

/// Dispatch a `tools/call` to the matching operation
pub async fn handle_tool_call(
    registry: &ClientRegistry,
    tool_name: &str,
    arguments: Value,
) -> Result<Value, ServerError> {
    match tool_name {
        "create_repository" => {
            let args: CreateRepositoryArgs = parse_args(arguments)?;
            let store = registry.resolve(args.instance.as_deref())?;
            let repository = create_repository(store.as_ref(), &args.options).await?;
            Ok(serde_json::to_value(repository)?)
        }
        "create_file" | "update_file" | "delete_file" => {
            let args: FileArgs = parse_args(arguments)?;
            let repo = args.target.repo_ref()?;
            let store = registry.resolve(args.target.instance.as_deref())?;
            let result = match tool_name {
                "create_file" => create_file(store.as_ref(), &repo, &args.request).await?,
                "update_file" => update_file(store.as_ref(), &repo, &args.request).await?,
                _ => delete_file(store.as_ref(), &repo, &args.request).await?,
            };
            Ok(serde_json::to_value(result)?)
        }
        "advanced_update" => {
            let args: AdvancedUpdateArgs = parse_args(arguments)?;
            let repo = args.target.repo_ref()?;
            let store = registry.resolve(args.target.instance.as_deref())?;
            let summary = reconcile(store.as_ref(), &repo, &args.request).await?;
            Ok(serde_json::to_value(summary)?)
        }
        "initial_sync" => {
            let args: InitialSyncArgs = parse_args(arguments)?;
            let repo = args.target.repo_ref()?;
            let store = registry.resolve(args.target.instance.as_deref())?;
            let summary = initial_sync(store.as_ref(), &repo, &args.request).await?;
            Ok(serde_json::to_value(summary)?)
        }
        _ => Err(ServerError::UnknownTool(tool_name.to_string())),
    }
}
