//! Database Module
//!
//! Persistence adapter for the `key_value_pairs` table, reached through the
//! connection pool.

mod connection;
mod store;

use async_trait::async_trait;
use thiserror::Error;

use crate::pool::{PoolError, PoolStats};

pub use connection::SqlConnectionManager;
pub use store::KvDatabase;

// == Public Constants ==
/// Maximum key length in bytes (`VARCHAR(255)` primary key)
pub const MAX_KEY_LENGTH: usize = 255;

/// Maximum value length in bytes (MySQL `TEXT`)
pub const MAX_VALUE_LENGTH: usize = 65_535;

// == Database Error ==
/// A backend failure. Duplicates and missing rows are not errors; they are
/// reported as `Ok(false)` / `Ok(None)` by [`KvBackend`].
#[derive(Error, Debug)]
pub enum DbError {
    /// No connection could be obtained
    #[error("connection pool error: {0}")]
    Pool(#[from] PoolError),

    /// The statement could not be executed
    #[error("statement failed: {0}")]
    Statement(#[from] sqlx::Error),

    /// The existing table cannot store keys faithfully
    #[error("unsupported schema: {0}")]
    Schema(String),
}

// == Backend Trait ==
/// Key-value operations against the system of record.
///
/// Each call borrows one pooled connection for its duration and returns it
/// on every path.
#[async_trait]
pub trait KvBackend: Send + Sync + 'static {
    /// True iff a record with `key` exists.
    async fn exists(&self, key: &str) -> Result<bool, DbError>;

    /// Inserts a new record. `Ok(false)` if the key already exists.
    async fn create(&self, key: &str, value: &str) -> Result<bool, DbError>;

    /// Returns the stored value, or `None` if absent.
    async fn read(&self, key: &str) -> Result<Option<String>, DbError>;

    /// Overwrites an existing record. `Ok(false)` if the key does not exist.
    async fn update(&self, key: &str, value: &str) -> Result<bool, DbError>;

    /// Removes a record. `Ok(false)` if the key does not exist.
    async fn delete(&self, key: &str) -> Result<bool, DbError>;

    /// Connection pool counters, if the backend is pooled.
    fn pool_stats(&self) -> Option<PoolStats> {
        None
    }
}
