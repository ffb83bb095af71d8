//! Storage module for persisting crawler state
//!
//! This module holds the crawler's storage contract and its backends:
//! - `MongoStorage`: cookie and visited-request records in MongoDB
//! - `MemoryStorage`: the same contract kept in process memory
//! - Record shapes shared with the database
//! - Host key derivation and request ID encoding

mod error_slot;
mod memory;
mod mongo;
mod traits;

pub use error_slot::ErrorHook;
pub use memory::MemoryStorage;
pub use mongo::{ClientOptionsHook, MongoOptions, MongoStorage};
pub use traits::{Storage, StorageError, StorageResult};

use serde::{Deserialize, Serialize};
use url::Url;

/// A host to cookie relationship, one document per host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookieRecord {
    #[serde(rename = "_id")]
    pub host: String,

    #[serde(rename = "cookie")]
    pub cookies: String,
}

/// A processed request; the document's presence is the whole record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitedRecord {
    #[serde(rename = "_id")]
    pub request_id: i64,
}

impl VisitedRecord {
    pub fn new(request_id: u64) -> Self {
        Self {
            request_id: encode_request_id(request_id),
        }
    }
}

/// Maps a request ID onto BSON's signed 64-bit integer
///
/// BSON has no unsigned 64-bit type. The bit pattern is kept, so IDs above
/// `i64::MAX` are stored as negative numbers. Lookups go through the same
/// mapping, which keeps equality exact.
pub fn encode_request_id(request_id: u64) -> i64 {
    request_id as i64
}

/// Derives the cookie key for a URL: the host, plus the port when one is given
///
/// A port equal to the scheme's default is dropped even when written out, so
/// `http://example.com:80/` keys as `example.com`. Datasets keyed with the
/// explicit port (`example.com:80`) will not match those lookups.
///
/// Returns an empty string for URLs without a host.
pub fn host_key(url: &Url) -> String {
    match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{}:{}", host, port),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    }
}
