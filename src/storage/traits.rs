//! Storage traits and error types
//!
//! This module defines the storage contract the crawler relies on and the
//! error type shared by every backend.

use crate::storage::host_key;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors that can occur during storage operations
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Connection error: {0}")]
    Connection(#[source] mongodb::error::Error),

    #[error("Connection timed out after {0:?}")]
    ConnectTimeout(Duration),

    #[error("Query error: {0}")]
    Query(#[from] mongodb::error::Error),

    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Storage used before init() succeeded")]
    NotInitialized,
}

impl StorageError {
    /// Returns true for failures raised while establishing the connection
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::ConnectTimeout(_))
    }

    /// Returns true if the call gave up because its time budget ran out
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ConnectTimeout(_) | Self::Timeout { .. })
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Storage contract required by the crawler
///
/// `init` is called once at startup; every other method may then be called
/// concurrently from many workers. Implementations must be safe to share
/// behind an `Arc`.
///
/// Cookie methods have no error channel. A failed cookie read behaves like a
/// missing record and a failed write is dropped; in both cases the error is
/// kept for [`Storage::last_error`]. Visited-request methods return their
/// errors directly.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Connects to the backing store and attaches the collections
    ///
    /// May be called again after a failure; each call starts from scratch.
    async fn init(&self) -> StorageResult<()>;

    /// Returns the cookie string stored for `host`, or an empty string
    async fn cookies(&self, host: &str) -> String;

    /// Stores `cookies` for `host`, replacing any previous value
    async fn set_cookies(&self, host: &str, cookies: &str);

    /// Checks whether the request with this ID has already been processed
    async fn is_visited(&self, request_id: u64) -> StorageResult<bool>;

    /// Records the request with this ID as processed
    ///
    /// Marking an ID that is already marked succeeds.
    async fn mark_visited(&self, request_id: u64) -> StorageResult<()>;

    /// The most recent error seen by any operation, if one occurred
    fn last_error(&self) -> Option<StorageError>;

    /// Like [`Storage::last_error`], but clears the slot
    fn take_last_error(&self) -> Option<StorageError>;

    /// Returns the cookies stored for the host of `url`
    async fn cookies_for_url(&self, url: &Url) -> String {
        self.cookies(&host_key(url)).await
    }

    /// Stores cookies for the host of `url`
    async fn set_cookies_for_url(&self, url: &Url, cookies: &str) {
        self.set_cookies(&host_key(url), cookies).await
    }
}
