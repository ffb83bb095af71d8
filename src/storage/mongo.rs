//! MongoDB storage implementation
//!
//! This module provides a MongoDB-based implementation of the Storage trait.
//! Cookies live in one collection keyed by host and visited request IDs in
//! another, keyed by the encoded ID. Every call is bounded by its own timeout.

use crate::config::{MongoConfig, ResolvedConfig};
use crate::storage::error_slot::{ErrorHook, ErrorSlot};
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{CookieRecord, VisitedRecord};
use async_trait::async_trait;
use mongodb::bson::doc;
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::options::{
    ClientOptions, CollectionOptions, DatabaseOptions, FindOneOptions, InsertOneOptions,
    ReplaceOptions,
};
use mongodb::{Client, Collection};
use std::fmt;
use std::future::IntoFuture;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

/// Server error code for a unique index violation
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Adjusts the driver's client options after they are parsed from the URI
pub type ClientOptionsHook = Arc<dyn Fn(&mut ClientOptions) + Send + Sync>;

/// Driver options passed through to the `mongodb` crate unchanged
///
/// All fields are optional. `replace_cookie` is used for cookie writes with
/// `upsert` always forced on.
#[derive(Clone, Default)]
pub struct MongoOptions {
    pub client: Option<ClientOptionsHook>,
    pub database: Option<DatabaseOptions>,
    pub cookie_collection: Option<CollectionOptions>,
    pub request_collection: Option<CollectionOptions>,
    pub find_cookie: Option<FindOneOptions>,
    pub find_request: Option<FindOneOptions>,
    pub replace_cookie: Option<ReplaceOptions>,
    pub insert_request: Option<InsertOneOptions>,
}

impl fmt::Debug for MongoOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MongoOptions")
            .field("client", &self.client.as_ref().map(|_| "<hook>"))
            .field("database", &self.database)
            .field("cookie_collection", &self.cookie_collection)
            .field("request_collection", &self.request_collection)
            .field("find_cookie", &self.find_cookie)
            .field("find_request", &self.find_request)
            .field("replace_cookie", &self.replace_cookie)
            .field("insert_request", &self.insert_request)
            .finish()
    }
}

/// Collection handles attached by a successful `init`
#[derive(Clone)]
struct Handles {
    cookie: Collection<CookieRecord>,
    request: Collection<VisitedRecord>,
}

/// MongoDB storage backend
pub struct MongoStorage {
    settings: ResolvedConfig,
    options: MongoOptions,
    handles: RwLock<Option<Handles>>,
    errors: ErrorSlot,
}

impl MongoStorage {
    /// Creates an unconnected storage; call [`Storage::init`] before use
    pub fn new(config: MongoConfig) -> Self {
        Self::with_options(config, MongoOptions::default())
    }

    /// Creates an unconnected storage with driver options passed through
    pub fn with_options(config: MongoConfig, options: MongoOptions) -> Self {
        Self {
            settings: config.resolve(),
            options,
            handles: RwLock::new(None),
            errors: ErrorSlot::default(),
        }
    }

    /// Installs a callback that sees every captured or returned error
    pub fn with_error_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(&StorageError) + Send + Sync + 'static,
    {
        self.errors.set_hook(Arc::new(hook) as ErrorHook);
        self
    }

    /// The settings in effect, with defaults applied
    pub fn settings(&self) -> &ResolvedConfig {
        &self.settings
    }

    /// Returns true once `init` has succeeded
    pub fn is_initialized(&self) -> bool {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn handles(&self) -> StorageResult<Handles> {
        self.handles
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(StorageError::NotInitialized)
    }

    /// Parses the URI, builds the client and pings the server
    async fn connect(&self) -> mongodb::error::Result<Handles> {
        let mut client_options = ClientOptions::parse(self.settings.uri.as_str()).await?;
        if let Some(hook) = &self.options.client {
            hook(&mut client_options);
        }

        let client = Client::with_options(client_options)?;
        let database = client.database_with_options(
            &self.settings.database,
            self.options.database.clone().unwrap_or_default(),
        );

        // The client connects lazily; ping forces the first round trip
        database.run_command(doc! { "ping": 1 }).await?;

        let cookie = database.collection_with_options(
            &self.settings.cookie_collection,
            self.options.cookie_collection.clone().unwrap_or_default(),
        );
        let request = database.collection_with_options(
            &self.settings.request_collection,
            self.options.request_collection.clone().unwrap_or_default(),
        );

        Ok(Handles { cookie, request })
    }

    async fn find_cookie(&self, host: &str) -> StorageResult<Option<CookieRecord>> {
        let handles = self.handles()?;
        let find = handles
            .cookie
            .find_one(doc! { "_id": host })
            .with_options(self.options.find_cookie.clone());

        bounded("find cookie", self.settings.find_timeout, find).await
    }

    async fn upsert_cookie(&self, record: &CookieRecord) -> StorageResult<()> {
        let handles = self.handles()?;

        let mut options = self.options.replace_cookie.clone().unwrap_or_default();
        options.upsert = Some(true);

        let replace = handles
            .cookie
            .replace_one(doc! { "_id": record.host.as_str() }, record)
            .with_options(options);

        bounded("upsert cookie", self.settings.insert_timeout, replace).await?;
        Ok(())
    }

    async fn find_request(&self, record: VisitedRecord) -> StorageResult<bool> {
        let handles = self.handles()?;
        let find = handles
            .request
            .find_one(doc! { "_id": record.request_id })
            .with_options(self.options.find_request.clone());

        let found = bounded("find request", self.settings.find_timeout, find).await?;
        Ok(found.is_some())
    }

    async fn insert_request(&self, record: VisitedRecord) -> StorageResult<()> {
        let handles = self.handles()?;
        let insert = handles
            .request
            .insert_one(record)
            .with_options(self.options.insert_request.clone());

        bounded("insert request", self.settings.insert_timeout, insert).await?;
        Ok(())
    }
}

#[async_trait]
impl Storage for MongoStorage {
    async fn init(&self) -> StorageResult<()> {
        let timeout = self.settings.init_timeout;
        tracing::debug!(
            "Connecting to {} (timeout {:?})",
            self.settings.redacted_uri(),
            timeout
        );

        let handles = match tokio::time::timeout(timeout, self.connect()).await {
            Ok(Ok(handles)) => handles,
            Ok(Err(e)) => return Err(self.errors.report(StorageError::Connection(e))),
            Err(_) => return Err(self.errors.report(StorageError::ConnectTimeout(timeout))),
        };

        *self.handles.write().unwrap_or_else(PoisonError::into_inner) = Some(handles);

        tracing::debug!(
            "Attached collections {}.{} and {}.{}",
            self.settings.database,
            self.settings.cookie_collection,
            self.settings.database,
            self.settings.request_collection
        );
        Ok(())
    }

    async fn cookies(&self, host: &str) -> String {
        match self.find_cookie(host).await {
            Ok(Some(record)) => record.cookies,
            Ok(None) => String::new(),
            Err(e) => {
                tracing::warn!("Failed to read cookies for {}: {}", host, e);
                self.errors.report(e);
                String::new()
            }
        }
    }

    async fn set_cookies(&self, host: &str, cookies: &str) {
        let record = CookieRecord {
            host: host.to_string(),
            cookies: cookies.to_string(),
        };

        if let Err(e) = self.upsert_cookie(&record).await {
            tracing::warn!("Failed to store cookies for {}: {}", host, e);
            self.errors.report(e);
        }
    }

    async fn is_visited(&self, request_id: u64) -> StorageResult<bool> {
        self.find_request(VisitedRecord::new(request_id))
            .await
            .map_err(|e| self.errors.report(e))
    }

    async fn mark_visited(&self, request_id: u64) -> StorageResult<()> {
        match self.insert_request(VisitedRecord::new(request_id)).await {
            Ok(()) => Ok(()),
            Err(StorageError::Query(e)) if is_duplicate_key(&e) => {
                tracing::debug!("Request {} was already marked visited", request_id);
                Ok(())
            }
            Err(e) => Err(self.errors.report(e)),
        }
    }

    fn last_error(&self) -> Option<StorageError> {
        self.errors.last()
    }

    fn take_last_error(&self) -> Option<StorageError> {
        self.errors.take()
    }
}

/// Runs one driver call under `limit`
async fn bounded<F, T>(operation: &'static str, limit: Duration, call: F) -> StorageResult<T>
where
    F: IntoFuture<Output = mongodb::error::Result<T>>,
{
    match tokio::time::timeout(limit, call.into_future()).await {
        Ok(result) => Ok(result?),
        Err(_) => Err(StorageError::Timeout {
            operation,
            after: limit,
        }),
    }
}

/// Returns true if the server rejected a write because the key already exists
fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        &*error.kind,
        ErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}
