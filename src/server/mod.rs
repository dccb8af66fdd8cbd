//! MCP server exposing the forge tools over JSON-RPC 2.0 on stdio.

mod handlers;
mod protocol;
mod tools;

pub use handlers::handle_tool_call;
pub use protocol::{JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION};
pub use tools::{get_tool_definitions, ToolContent, ToolDefinition, ToolResult};

use crate::files::FileError;
use crate::reconciliation::ReconcileError;
use crate::registry::{ClientRegistry, RegistryError};
use crate::repository::RepositoryError;
use crate::sync::SyncError;
use crate::utils::FORGESYNC_VERSION;
use protocol::{
    InitializeResult, ServerCapabilities, ServerInfo, ToolCallParams, ToolsCapability,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
use serde_json::{json, Value};
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    File(#[from] FileError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

pub struct ForgeMcpServer {
    registry: ClientRegistry,
}

impl ForgeMcpServer {
    pub fn new(registry: ClientRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ClientRegistry {
        &self.registry
    }

    /// Serve requests from stdin until it closes
    pub async fn run(&self) -> Result<(), ServerError> {
        info!(
            instances = ?self.registry.instance_ids(),
            "MCP server ready, listening on stdio"
        );
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Read newline-delimited messages from `reader` and write responses to `writer`
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<(), ServerError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            debug!(request = %line, "Received message");

            let response = match self.handle_message(&line).await {
                Ok(Some(response)) => response,
                Ok(None) => continue,
                Err(e) => serde_json::to_string(&JsonRpcResponse::error(
                    None,
                    INTERNAL_ERROR,
                    format!("Internal error: {e}"),
                ))?,
            };

            writer.write_all(response.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }

        info!("Input closed, stopping MCP server");
        Ok(())
    }

    /// Handle one JSON-RPC message; `None` for notifications
    pub async fn handle_message(&self, message: &str) -> Result<Option<String>, ServerError> {
        let value: Value = match serde_json::from_str(message) {
            Ok(value) => value,
            Err(e) => {
                let response =
                    JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}"));
                return Ok(Some(serde_json::to_string(&response)?));
            }
        };

        let request: JsonRpcRequest = match serde_json::from_value(value) {
            Ok(request) => request,
            Err(e) => {
                let response =
                    JsonRpcResponse::error(None, INVALID_REQUEST, format!("Invalid request: {e}"));
                return Ok(Some(serde_json::to_string(&response)?));
            }
        };

        if request.jsonrpc != "2.0" {
            let response = JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                "Invalid request: jsonrpc must be \"2.0\"",
            );
            return Ok(Some(serde_json::to_string(&response)?));
        }

        if request.id.is_none() {
            debug!(method = %request.method, "Notification received");
            return Ok(None);
        }

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id)?,
            "ping" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await?,
            _ => JsonRpcResponse::error(
                request.id,
                METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };

        Ok(Some(serde_json::to_string(&response)?))
    }

    fn handle_initialize(&self, id: Option<Value>) -> Result<JsonRpcResponse, ServerError> {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: "forgesync".to_string(),
                version: FORGESYNC_VERSION.to_string(),
            },
        };
        Ok(JsonRpcResponse::success(id, serde_json::to_value(result)?))
    }

    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": get_tool_definitions() }))
    }

    async fn handle_tools_call(
        &self,
        id: Option<Value>,
        params: Value,
    ) -> Result<JsonRpcResponse, ServerError> {
        let params: ToolCallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return Ok(JsonRpcResponse::error(
                    id,
                    INVALID_PARAMS,
                    format!("Invalid params: {e}"),
                ))
            }
        };

        let tool_result =
            match handle_tool_call(&self.registry, &params.name, params.arguments).await {
                Ok(result) => ToolResult::text(serde_json::to_string_pretty(&result)?),
                Err(e) => {
                    warn!(tool = %params.name, error = %e, "Tool call failed");
                    ToolResult::error(e.to_string())
                }
            };

        Ok(JsonRpcResponse::success(id, serde_json::to_value(tool_result)?))
    }
}
