mod clients;

pub use clients::ClientRegistry;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Unknown forge instance: {0}")]
    InstanceNotFound(String),

    #[error("No default forge instance is configured")]
    NoDefaultInstance,

    #[error("Failed to create client for instance {id}: {source}")]
    ClientError {
        id: String,
        #[source]
        source: crate::store::StoreError,
    },

    #[error("Config error: {0}")]
    ConfigError(#[from] crate::config::ConfigError),
}
