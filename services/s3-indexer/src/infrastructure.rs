// Infrastructure layer modules
pub mod config;
pub mod index_repository;
pub mod logging;

// Re-exports
pub use config::{build_dynamodb_client, IndexerConfig, IndexerConfigError};
pub use index_repository::{DynamoIndexRepository, IndexRepository, StoreWriteError, WriteOutcome};
pub use logging::init_logging;
