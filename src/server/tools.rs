use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Tool advertised through `tools/list`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Result of `tools/call`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text { text: String },
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: content.into(),
            }],
            is_error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }
}

fn target_properties() -> serde_json::Map<String, Value> {
    let mut properties = serde_json::Map::new();
    properties.insert(
        "owner".into(),
        json!({ "type": "string", "description": "Repository owner (user or organization)" }),
    );
    properties.insert(
        "repo".into(),
        json!({ "type": "string", "description": "Repository name" }),
    );
    properties.insert(
        "instance".into(),
        json!({ "type": "string", "description": "Configured forge instance; defaults to the default instance" }),
    );
    properties.insert(
        "branch".into(),
        json!({ "type": "string", "description": "Target branch", "default": "main" }),
    );
    properties.insert(
        "message".into(),
        json!({ "type": "string", "description": "Commit message" }),
    );
    properties
}

fn file_tool(name: &str, description: &str, with_content: bool) -> ToolDefinition {
    let mut properties = target_properties();
    properties.insert(
        "path".into(),
        json!({ "type": "string", "description": "File path relative to the repository root" }),
    );
    properties.insert(
        "sha".into(),
        json!({ "type": "string", "description": "Current version token; fetched when omitted" }),
    );
    let mut required = vec!["owner", "repo", "path", "message"];
    if with_content {
        properties.insert(
            "content".into(),
            json!({ "type": "string", "description": "New file content (UTF-8 text)" }),
        );
        required.push("content");
    }

    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema: json!({
            "type": "object",
            "properties": properties,
            "required": required
        }),
    }
}

pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    let mut advanced = target_properties();
    advanced.insert(
        "files".into(),
        json!({
            "type": "array",
            "description": "Files to reconcile",
            "items": {
                "type": "object",
                "properties": {
                    "path": { "type": "string" },
                    "content": { "type": "string" },
                    "operation": { "type": "string", "enum": ["add", "modify", "delete"], "default": "add" },
                    "sha": { "type": "string", "description": "Version token the caller last saw" }
                },
                "required": ["path"]
            }
        }),
    );
    advanced.insert(
        "strategy".into(),
        json!({ "type": "string", "enum": ["auto", "batch", "individual"], "default": "auto" }),
    );
    advanced.insert(
        "detectChanges".into(),
        json!({ "type": "boolean", "default": true, "description": "Compare against the repository before writing" }),
    );
    advanced.insert(
        "dryRun".into(),
        json!({ "type": "boolean", "default": false, "description": "Plan without writing" }),
    );
    advanced.insert(
        "conflictResolution".into(),
        json!({ "type": "string", "enum": ["overwrite", "fail", "skip"], "default": "overwrite" }),
    );

    let mut sync = target_properties();
    sync.insert(
        "directory".into(),
        json!({ "type": "string", "description": "Local directory to upload" }),
    );
    sync.insert(
        "strategy".into(),
        json!({ "type": "string", "enum": ["auto", "batch", "individual"], "default": "auto" }),
    );
    sync.insert(
        "dryRun".into(),
        json!({ "type": "boolean", "default": false }),
    );

    vec![
        ToolDefinition {
            name: "create_repository".to_string(),
            description: "Create a repository for the user or an organization".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "instance": { "type": "string", "description": "Configured forge instance" },
                    "name": { "type": "string", "description": "Repository name" },
                    "description": { "type": "string" },
                    "private": { "type": "boolean", "default": false },
                    "autoInit": { "type": "boolean", "default": true, "description": "Create an initial commit" },
                    "defaultBranch": { "type": "string", "default": "main" },
                    "organization": { "type": "string", "description": "Create under this organization" }
                },
                "required": ["name"]
            }),
        },
        file_tool("create_file", "Create a new file in a repository", true),
        file_tool("update_file", "Replace the content of an existing file", true),
        file_tool("delete_file", "Delete a file from a repository", false),
        ToolDefinition {
            name: "advanced_update".to_string(),
            description: "Add, modify and delete several files, skipping files that are already up to date".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": advanced,
                "required": ["owner", "repo", "files", "message"]
            }),
        },
        ToolDefinition {
            name: "initial_sync".to_string(),
            description: "Upload the files of a local directory to a repository".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": sync,
                "required": ["owner", "repo", "directory", "message"]
            }),
        },
    ]
}
