//! Response DTOs for the key-value API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::CacheStats;
use crate::coordinator::{Lookup, Source};
use crate::pool::PoolStats;

/// Response body for GET /kv/{key}
#[derive(Debug, Clone, Serialize)]
pub struct GetResponse {
    /// The requested key
    pub key: String,
    /// The stored value
    pub value: String,
    /// `"cache"` or `"database"`
    pub source: Source,
}

impl GetResponse {
    pub fn new(key: impl Into<String>, lookup: Lookup) -> Self {
        Self {
            key: key.into(),
            value: lookup.value,
            source: lookup.source,
        }
    }
}

/// Response body for successful POST, PUT and DELETE
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Success message
    pub message: String,
    /// The affected key
    pub key: String,
}

impl MessageResponse {
    fn new(message: &str, key: impl Into<String>) -> Self {
        Self {
            message: message.to_string(),
            key: key.into(),
        }
    }

    pub fn created(key: impl Into<String>) -> Self {
        Self::new("Key-value pair created", key)
    }

    pub fn updated(key: impl Into<String>) -> Self {
        Self::new("Key-value pair updated", key)
    }

    pub fn deleted(key: impl Into<String>) -> Self {
        Self::new("Key-value pair deleted", key)
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    /// Cache counters
    pub cache: CacheStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Connection pool counters, if the backend is pooled
    pub pool: Option<PoolStats>,
}

impl StatsResponse {
    pub fn new(cache: CacheStats, pool: Option<PoolStats>) -> Self {
        Self {
            hit_rate: cache.hit_rate(),
            cache,
            pool,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}
