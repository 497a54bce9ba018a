//! SQL connection manager for the pool.
//!
//! Connections are opened through sqlx's `Any` driver, so the same code
//! talks to MySQL in production and SQLite in tests.

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::{AnyConnection, Connection};
use tracing::debug;

use crate::pool::{ManageConnection, PoolError};

/// Longest a liveness ping may take before the connection is replaced.
pub const VALIDATION_TIMEOUT: Duration = Duration::from_secs(2);

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

/// Opens and health-checks `AnyConnection`s for a database URL.
#[derive(Debug, Clone)]
pub struct SqlConnectionManager {
    url: String,
    validation_timeout: Duration,
}

impl SqlConnectionManager {
    pub fn new(url: impl Into<String>) -> Self {
        install_drivers();
        Self {
            url: url.into(),
            validation_timeout: VALIDATION_TIMEOUT,
        }
    }

    pub fn with_validation_timeout(mut self, timeout: Duration) -> Self {
        self.validation_timeout = timeout;
        self
    }

    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }
}

#[async_trait]
impl ManageConnection for SqlConnectionManager {
    type Connection = AnyConnection;

    async fn connect(&self) -> Result<AnyConnection, PoolError> {
        AnyConnection::connect(&self.url)
            .await
            .map_err(|e| PoolError::Connect(e.to_string()))
    }

    async fn is_valid(&self, conn: &mut AnyConnection) -> bool {
        responds_within(self.validation_timeout, conn.ping()).await
    }

    async fn disconnect(&self, conn: AnyConnection) {
        if let Err(e) = conn.close().await {
            debug!(error = %e, "error while closing connection");
        }
    }
}

/// True if `check` finishes successfully before `limit` elapses.
async fn responds_within<F, E>(limit: Duration, check: F) -> bool
where
    F: Future<Output = Result<(), E>>,
    E: std::fmt::Display,
{
    match tokio::time::timeout(limit, check).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            debug!(error = %e, "connection failed liveness check");
            false
        }
        Err(_) => {
            debug!(timeout_ms = limit.as_millis() as u64, "liveness check timed out");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_sqlite() {
        assert!(SqlConnectionManager::new("sqlite://kv.db").is_sqlite());
        assert!(!SqlConnectionManager::new("mysql://u:p@localhost/kv").is_sqlite());
    }

    #[tokio::test]
    async fn test_connect_and_validate() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("kv.db").display());
        let manager = SqlConnectionManager::new(url).with_validation_timeout(Duration::from_secs(1));

        let mut conn = manager.connect().await.unwrap();
        assert!(manager.is_valid(&mut conn).await);
        manager.disconnect(conn).await;
    }

    #[tokio::test]
    async fn test_connect_failure_maps_to_pool_error() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("missing").join("kv.db").display()
        );
        let manager = SqlConnectionManager::new(url);

        let result = manager.connect().await;
        assert!(matches!(result, Err(PoolError::Connect(_))));
    }

    #[tokio::test]
    async fn test_hung_ping_is_not_valid() {
        let hung = std::future::pending::<Result<(), sqlx::Error>>();
        assert!(!responds_within(Duration::from_millis(10), hung).await);

        let failed = async { Err::<(), _>(sqlx::Error::PoolClosed) };
        assert!(!responds_within(Duration::from_secs(1), failed).await);

        let ok = async { Ok::<(), sqlx::Error>(()) };
        assert!(responds_within(Duration::from_secs(1), ok).await);
    }
}
