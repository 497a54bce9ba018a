//! Request Coordinator
//!
//! Composes the LRU cache and the database into the four key-value
//! operations. Every mutation is committed to the database first and
//! mirrored into the cache only on success, so a cached entry is always a
//! copy of a committed row.
//!
//! When a database call reports failure, an `exists` check decides whether
//! the cause was the key's presence (conflict / not found) or the backend
//! itself.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::{CacheStats, CacheStore};
use crate::db::{DbError, KvBackend, MAX_KEY_LENGTH, MAX_VALUE_LENGTH};
use crate::error::{KvError, Result};
use crate::pool::PoolStats;

// == Response Messages ==
const MSG_NOT_FOUND: &str = "Key not found";
const MSG_CONFLICT: &str = "Key already exists. Use PUT to update.";
const MSG_UPDATE_MISSING: &str = "Key not found. Use POST to create.";
const MSG_READ_FAILED: &str = "Failed to read from database";
const MSG_CREATE_FAILED: &str = "Failed to store in database";
const MSG_UPDATE_FAILED: &str = "Failed to update in database";
const MSG_DELETE_FAILED: &str = "Failed to delete key from database";

/// Where a read was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Database,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Cache => "cache",
            Source::Database => "database",
        }
    }
}

/// A successful read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup {
    pub value: String,
    pub source: Source,
}

/// Result of a delete. A missing key is a normal outcome, not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    Deleted,
    NotFound,
}

// == Coordinator ==
/// Shared handle on the cache and the backend.
#[derive(Clone)]
pub struct Coordinator {
    cache: Arc<Mutex<CacheStore>>,
    backend: Arc<dyn KvBackend>,
}

impl Coordinator {
    pub fn new(cache: CacheStore, backend: Arc<dyn KvBackend>) -> Self {
        Self {
            cache: Arc::new(Mutex::new(cache)),
            backend,
        }
    }

    /// Returns the shared cache.
    pub fn cache(&self) -> &Arc<Mutex<CacheStore>> {
        &self.cache
    }

    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.lock().await.stats()
    }

    pub fn pool_stats(&self) -> Option<PoolStats> {
        self.backend.pool_stats()
    }

    // == Read ==
    /// Cache first; on a miss, read through from the database.
    pub async fn read(&self, key: &str) -> Result<Lookup> {
        validate_key(key)?;

        if let Some(value) = self.cache.lock().await.get(key) {
            return Ok(Lookup {
                value,
                source: Source::Cache,
            });
        }

        match self.backend.read(key).await {
            Ok(Some(value)) => {
                self.cache.lock().await.put(key, value.clone());
                Ok(Lookup {
                    value,
                    source: Source::Database,
                })
            }
            Ok(None) => Err(KvError::NotFound(MSG_NOT_FOUND.to_string())),
            Err(_) => Err(KvError::Backend(MSG_READ_FAILED.to_string())),
        }
    }

    // == Create ==
    /// Inserts a new record and populates the cache.
    pub async fn create(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        validate_value(value)?;

        if succeeded(self.backend.create(key, value).await) {
            self.cache.lock().await.put(key, value);
            return Ok(());
        }

        match self.backend.exists(key).await {
            Ok(true) => Err(KvError::Conflict(MSG_CONFLICT.to_string())),
            _ => Err(KvError::Backend(MSG_CREATE_FAILED.to_string())),
        }
    }

    // == Update ==
    /// Overwrites an existing record and writes the new value through.
    pub async fn update(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        validate_value(value)?;

        if succeeded(self.backend.update(key, value).await) {
            self.cache.lock().await.put(key, value);
            return Ok(());
        }

        match self.backend.exists(key).await {
            Ok(false) => Err(KvError::NotFound(MSG_UPDATE_MISSING.to_string())),
            _ => Err(KvError::Backend(MSG_UPDATE_FAILED.to_string())),
        }
    }

    // == Delete ==
    /// Removes a record and invalidates its cache entry.
    pub async fn delete(&self, key: &str) -> Result<Removal> {
        validate_key(key)?;

        if succeeded(self.backend.delete(key).await) {
            let evicted = self.cache.lock().await.delete(key);
            debug!(key, evicted, "cache entry invalidated");
            return Ok(Removal::Deleted);
        }

        match self.backend.exists(key).await {
            Ok(false) => Ok(Removal::NotFound),
            _ => Err(KvError::Backend(MSG_DELETE_FAILED.to_string())),
        }
    }
}

fn succeeded(result: std::result::Result<bool, DbError>) -> bool {
    matches!(result, Ok(true))
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(KvError::InvalidRequest("Key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(KvError::InvalidRequest(format!(
            "Key exceeds maximum length of {} bytes",
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

fn validate_value(value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(KvError::InvalidRequest(
            "Missing value in request body or invalid JSON format".to_string(),
        ));
    }
    if value.len() > MAX_VALUE_LENGTH {
        return Err(KvError::InvalidRequest(format!(
            "Value exceeds maximum size of {} bytes",
            MAX_VALUE_LENGTH
        )));
    }
    Ok(())
}
