//! Configuration module for Mongo-Crawl-Store
//!
//! This module handles loading, parsing, and validating TOML configuration files,
//! and resolving optional settings to their defaults.
//!
//! # Example
//!
//! ```no_run
//! use mongo_crawl_store::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("store.toml")).unwrap();
//! println!("Lookups time out after {:?}", config.mongo.resolve().find_timeout);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, MongoConfig, ResolvedConfig, DEFAULT_COOKIE_COLLECTION, DEFAULT_DATABASE,
    DEFAULT_REQUEST_COLLECTION, DEFAULT_TIMEOUT,
};

// Re-export parser and validation functions
pub use parser::{load_config, parse_config};
pub use validation::validate_mongo_config;
