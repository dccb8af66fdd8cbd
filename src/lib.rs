pub mod config;
pub mod files;
pub mod reconciliation;
pub mod registry;
pub mod repository;
pub mod server;
pub mod store;
pub mod sync;
pub mod utils;

// Re-export commonly used types
pub use config::{read_config, ConfigError, ForgeConfig, InstanceConfig};
pub use files::{create_file, delete_file, update_file, FileError, FileRequest, FileWriteResult};
pub use reconciliation::{
    reconcile, ConflictResolution, OperationKind, RawFileOperation, ReconcileError,
    ReconcileRequest, RequestedStrategy, Strategy, Summary, ValidationError,
};
pub use registry::{ClientRegistry, RegistryError};
pub use repository::{create_repository, validate_repository_name, RepositoryError};
pub use server::{ForgeMcpServer, ServerError};
pub use store::{
    ContentStore, CreateRepositoryOptions, ForgeClient, ForgeClientOptions, MemoryStore,
    RepoRef, RepositoryInfo, StoreError,
};
pub use sync::{discover_files, initial_sync, InitialSyncRequest, SyncError};
