use crate::store::ForgeClientOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("No forge instances are configured")]
    NoInstances,

    #[error("Instance id must not be empty")]
    EmptyInstanceId,

    #[error("Duplicate instance id: {0}")]
    DuplicateInstance(String),

    #[error("Instance {id} has an invalid url '{url}'")]
    InvalidUrl { id: String, url: String },

    #[error("Default instance '{0}' is not configured")]
    UnknownDefault(String),
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

/// Connection settings for one forge instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceConfig {
    pub id: String,
    /// Base URL of the forge, e.g. `https://git.example.com`
    pub url: String,
    /// Access token sent as `Authorization: token ...`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl InstanceConfig {
    pub fn new(id: impl Into<String>, url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            token,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }

    pub fn client_options(&self) -> ForgeClientOptions {
        ForgeClientOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            ..ForgeClientOptions::default()
        }
    }
}

/// Forgesync configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForgeConfig {
    #[serde(default)]
    pub instances: Vec<InstanceConfig>,
    /// Instance used when a tool call does not name one.
    /// Defaults to the first configured instance.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_instance: Option<String>,
}

impl ForgeConfig {
    /// Configuration with a single instance named `default`
    pub fn single(url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            instances: vec![InstanceConfig::new("default", url, token)],
            default_instance: Some("default".to_string()),
        }
    }

    /// Id of the instance used when none is named
    pub fn default_instance_id(&self) -> Option<&str> {
        self.default_instance
            .as_deref()
            .or_else(|| self.instances.first().map(|i| i.id.as_str()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instances.is_empty() {
            return Err(ConfigError::NoInstances);
        }

        let mut seen = HashSet::new();
        for instance in &self.instances {
            if instance.id.trim().is_empty() {
                return Err(ConfigError::EmptyInstanceId);
            }
            if !seen.insert(instance.id.as_str()) {
                return Err(ConfigError::DuplicateInstance(instance.id.clone()));
            }
            if reqwest::Url::parse(&instance.url).is_err() {
                return Err(ConfigError::InvalidUrl {
                    id: instance.id.clone(),
                    url: instance.url.clone(),
                });
            }
        }

        if let Some(default) = &self.default_instance {
            if !seen.contains(default.as_str()) {
                return Err(ConfigError::UnknownDefault(default.clone()));
            }
        }

        Ok(())
    }
}

/// Read and validate the configuration file
pub async fn read_config(config_path: &Path) -> Result<ForgeConfig, ConfigError> {
    let content = fs::read_to_string(config_path).await?;
    let config: ForgeConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Write the configuration file
pub async fn write_config(config_path: &Path, config: &ForgeConfig) -> Result<(), ConfigError> {
    let content = serde_json::to_string_pretty(config)?;
    fs::write(config_path, content).await?;
    Ok(())
}
