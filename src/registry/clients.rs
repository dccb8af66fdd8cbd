use super::RegistryError;
use crate::config::ForgeConfig;
use crate::store::{ContentStore, ForgeClient};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Content-store clients keyed by instance id.
///
/// Built once at startup and passed by reference to every tool call.
#[derive(Clone, Default)]
pub struct ClientRegistry {
    clients: BTreeMap<String, Arc<dyn ContentStore>>,
    default_instance: Option<String>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build HTTP clients for every configured instance
    pub fn from_config(config: &ForgeConfig) -> Result<Self, RegistryError> {
        config.validate()?;

        let mut registry = Self::new();
        for instance in &config.instances {
            let client = ForgeClient::new(
                &instance.url,
                instance.token.clone(),
                instance.client_options(),
            )
            .map_err(|source| RegistryError::ClientError {
                id: instance.id.clone(),
                source,
            })?;
            info!(id = %instance.id, url = %client.base_url(), "Registered forge instance");
            registry.insert(instance.id.clone(), Arc::new(client));
        }
        registry.default_instance = config.default_instance_id().map(str::to_string);

        Ok(registry)
    }

    /// Register a client; the first one registered becomes the default
    pub fn insert(&mut self, id: impl Into<String>, client: Arc<dyn ContentStore>) {
        let id = id.into();
        if self.default_instance.is_none() {
            self.default_instance = Some(id.clone());
        }
        self.clients.insert(id, client);
    }

    pub fn set_default(&mut self, id: &str) -> Result<(), RegistryError> {
        if !self.clients.contains_key(id) {
            return Err(RegistryError::InstanceNotFound(id.to_string()));
        }
        self.default_instance = Some(id.to_string());
        Ok(())
    }

    /// Look up a named instance, or the default when `id` is `None`
    pub fn resolve(&self, id: Option<&str>) -> Result<Arc<dyn ContentStore>, RegistryError> {
        let id = match id {
            Some(id) => id,
            None => self
                .default_instance
                .as_deref()
                .ok_or(RegistryError::NoDefaultInstance)?,
        };

        self.clients
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::InstanceNotFound(id.to_string()))
    }

    pub fn instance_ids(&self) -> Vec<&str> {
        self.clients.keys().map(String::as_str).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
