//! In-memory storage implementation
//!
//! Keeps cookies and visited request IDs in process memory. State lives as long
//! as the value does.

use crate::storage::error_slot::{ErrorHook, ErrorSlot};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// In-memory storage backend
#[derive(Default)]
pub struct MemoryStorage {
    initialized: AtomicBool,
    cookies: RwLock<HashMap<String, String>>,
    visited: RwLock<HashSet<u64>>,
    errors: ErrorSlot,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a callback that sees every captured or returned error
    pub fn with_error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&StorageError) + Send + Sync + 'static,
    {
        self.errors.set_hook(Arc::new(hook) as ErrorHook);
        self
    }

    /// Number of hosts with stored cookies
    pub fn cookie_count(&self) -> usize {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of distinct request IDs marked visited
    pub fn visited_count(&self) -> usize {
        self.visited
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn ensure_initialized(&self) -> StorageResult<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(self.errors.report(StorageError::NotInitialized))
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn init(&self) -> StorageResult<()> {
        self.initialized.store(true, Ordering::Release);
        Ok(())
    }

    async fn cookies(&self, host: &str) -> String {
        if self.ensure_initialized().is_err() {
            return String::new();
        }

        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(host)
            .cloned()
            .unwrap_or_default()
    }

    async fn set_cookies(&self, host: &str, cookies: &str) {
        if self.ensure_initialized().is_err() {
            return;
        }

        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(host.to_string(), cookies.to_string());
    }

    async fn is_visited(&self, request_id: u64) -> StorageResult<bool> {
        self.ensure_initialized()?;

        Ok(self
            .visited
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&request_id))
    }

    async fn mark_visited(&self, request_id: u64) -> StorageResult<()> {
        self.ensure_initialized()?;

        self.visited
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(request_id);
        Ok(())
    }

    fn last_error(&self) -> Option<StorageError> {
        self.errors.last()
    }

    fn take_last_error(&self) -> Option<StorageError> {
        self.errors.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    async fn ready() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.init().await.unwrap();
        storage
    }

    #[tokio::test]
    async fn test_unknown_host_has_no_cookies() {
        let storage = ready().await;
        assert_eq!(storage.cookies("example.com").await, "");
        assert!(storage.last_error().is_none());
    }

    #[tokio::test]
    async fn test_set_cookies_replaces_existing() {
        let storage = ready().await;

        storage.set_cookies("example.com", "a=1").await;
        storage.set_cookies("example.com", "a=2; b=3").await;

        assert_eq!(storage.cookies("example.com").await, "a=2; b=3");
        assert_eq!(storage.cookie_count(), 1);
    }

    #[tokio::test]
    async fn test_cookies_for_url_uses_host_and_port() {
        let storage = ready().await;
        let url = Url::parse("http://localhost:8080/login").unwrap();

        storage.set_cookies_for_url(&url, "session=abc").await;

        assert_eq!(storage.cookies("localhost:8080").await, "session=abc");
        assert_eq!(storage.cookies("localhost").await, "");
        let other = Url::parse("http://localhost:8080/other").unwrap();
        assert_eq!(storage.cookies_for_url(&other).await, "session=abc");
    }

    #[tokio::test]
    async fn test_mark_visited_is_idempotent() {
        let storage = ready().await;

        assert!(!storage.is_visited(42).await.unwrap());
        storage.mark_visited(42).await.unwrap();
        storage.mark_visited(42).await.unwrap();

        assert!(storage.is_visited(42).await.unwrap());
        assert_eq!(storage.visited_count(), 1);
    }

    #[tokio::test]
    async fn test_uninitialized_storage_reports_errors() {
        let storage = MemoryStorage::new();

        assert_eq!(storage.cookies("example.com").await, "");
        assert!(matches!(
            storage.take_last_error(),
            Some(StorageError::NotInitialized)
        ));
        assert!(matches!(
            storage.mark_visited(1).await,
            Err(StorageError::NotInitialized)
        ));
    }
}
