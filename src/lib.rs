//! Mongo-Crawl-Store: MongoDB persistence for a crawler's storage contract
//!
//! This crate stores two pieces of crawler state in MongoDB: the cookie string
//! last seen for each host, and the set of request IDs that have already been
//! processed. The [`storage::Storage`] trait is the contract the crawler talks
//! to; [`storage::MongoStorage`] implements it on top of the `mongodb` driver and
//! [`storage::MemoryStorage`] keeps the same contract in process memory.
//!
//! # Example
//!
//! ```no_run
//! use mongo_crawl_store::config::MongoConfig;
//! use mongo_crawl_store::storage::{MongoStorage, Storage};
//!
//! # async fn run() -> Result<(), mongo_crawl_store::storage::StorageError> {
//! let storage = MongoStorage::new(MongoConfig::new("mongodb://localhost:27017"));
//! storage.init().await?;
//!
//! storage.set_cookies("example.com", "a=1").await;
//! assert_eq!(storage.cookies("example.com").await, "a=1");
//!
//! storage.mark_visited(42).await?;
//! assert!(storage.is_visited(42).await?);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod storage;

use thiserror::Error;

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid MongoDB URI: {0}")]
    InvalidUri(String),
}

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, MongoConfig, ResolvedConfig};
pub use storage::{MemoryStorage, MongoOptions, MongoStorage, Storage, StorageError};
