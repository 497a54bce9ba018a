//! Connection Pool Module
//!
//! Bounded pool of backend connections.
//!
//! - A counting semaphore with one permit per pool slot is the wait/signal
//!   mechanism: `acquire` suspends on it, every release wakes one waiter.
//! - Idle connections sit in a `parking_lot::Mutex<VecDeque<_>>`; the lock is
//!   never held across an await.
//! - Idle connections are validated before hand-out. A dead one is discarded
//!   and replaced inline; a failed replacement is returned as an error.

mod connection;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

pub use connection::PooledConnection;

// == Pool Error ==
/// Errors returned by the pool.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    /// The pool was configured with zero connections
    #[error("pool size must be positive")]
    InvalidSize,

    /// A new connection could not be established
    #[error("failed to open connection: {0}")]
    Connect(String),

    /// The pool has been closed
    #[error("pool is closed")]
    Closed,
}

// == Connection Manager ==
/// Creates, validates and tears down the connections a [`Pool`] hands out.
#[async_trait]
pub trait ManageConnection: Send + Sync + 'static {
    type Connection: Send + 'static;

    /// Opens a new connection.
    async fn connect(&self) -> Result<Self::Connection, PoolError>;

    /// Returns true if the connection is still usable.
    async fn is_valid(&self, conn: &mut Self::Connection) -> bool;

    /// Closes a connection that leaves the pool.
    async fn disconnect(&self, conn: Self::Connection) {
        drop(conn);
    }
}

// == Pool Stats ==
/// Point-in-time pool counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Configured number of connections
    pub size: usize,
    /// Connections waiting in the idle set
    pub idle: usize,
    /// Connections currently checked out
    pub in_use: usize,
    /// Connections opened over the pool's lifetime
    pub total_created: u64,
    /// Connections dropped as dead or discarded
    pub total_discarded: u64,
}

pub(crate) struct PoolInner<M: ManageConnection> {
    manager: M,
    size: usize,
    idle: Mutex<VecDeque<M::Connection>>,
    semaphore: Arc<Semaphore>,
    created: AtomicU64,
    discarded: AtomicU64,
}

impl<M: ManageConnection> PoolInner<M> {
    async fn open(&self) -> Result<M::Connection, PoolError> {
        match self.manager.connect().await {
            Ok(conn) => {
                self.created.fetch_add(1, Ordering::Relaxed);
                Ok(conn)
            }
            Err(e) => {
                error!(error = %e, "failed to open backend connection");
                Err(e)
            }
        }
    }

    fn release(&self, conn: M::Connection) {
        if self.semaphore.is_closed() {
            self.record_discard();
            return;
        }
        self.idle.lock().push_back(conn);
    }

    fn record_discard(&self) {
        self.discarded.fetch_add(1, Ordering::Relaxed);
    }
}

// == Pool ==
/// Shared handle on a bounded connection pool.
pub struct Pool<M: ManageConnection> {
    inner: Arc<PoolInner<M>>,
}

impl<M: ManageConnection> Clone for Pool<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M: ManageConnection> Pool<M> {
    // == Initialize ==
    /// Builds a pool of `size` slots and eagerly opens a connection for each.
    ///
    /// Connections that fail to open are skipped; `acquire` opens them
    /// lazily later.
    pub async fn initialize(manager: M, size: usize) -> Result<Self, PoolError> {
        if size == 0 {
            return Err(PoolError::InvalidSize);
        }

        let mut idle = VecDeque::with_capacity(size);
        for slot in 0..size {
            match manager.connect().await {
                Ok(conn) => idle.push_back(conn),
                Err(e) => warn!(slot, error = %e, "initial connection failed, will open lazily"),
            }
        }
        let established = idle.len();
        info!(size, established, "connection pool initialized");

        Ok(Self {
            inner: Arc::new(PoolInner {
                manager,
                size,
                idle: Mutex::new(idle),
                semaphore: Arc::new(Semaphore::new(size)),
                created: AtomicU64::new(established as u64),
                discarded: AtomicU64::new(0),
            }),
        })
    }

    // == Acquire ==
    /// Borrows a connection, waiting for a release if all are checked out.
    ///
    /// There is no acquire timeout. Errors only if the pool is closed or a
    /// needed connection cannot be opened.
    pub async fn acquire(&self) -> Result<PooledConnection<M>, PoolError> {
        let permit = Arc::clone(&self.inner.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        let candidate = self.inner.idle.lock().pop_front();
        let conn = match candidate {
            Some(mut conn) => {
                if self.inner.manager.is_valid(&mut conn).await {
                    conn
                } else {
                    warn!("discarding dead connection");
                    self.inner.record_discard();
                    self.inner.manager.disconnect(conn).await;
                    self.inner.open().await?
                }
            }
            None => {
                debug!("no idle connection, opening a new one");
                self.inner.open().await?
            }
        };

        Ok(PooledConnection::new(conn, Arc::clone(&self.inner), permit))
    }

    // == Close ==
    /// Rejects further acquires and disconnects every idle connection.
    ///
    /// Connections still checked out are dropped when their guards release.
    pub async fn close(&self) {
        self.inner.semaphore.close();
        let drained: Vec<M::Connection> = self.inner.idle.lock().drain(..).collect();
        let count = drained.len();
        for conn in drained {
            self.inner.manager.disconnect(conn).await;
        }
        info!(closed = count, "connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.semaphore.is_closed()
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    /// Returns the connection manager.
    pub fn manager(&self) -> &M {
        &self.inner.manager
    }

    // == Stats ==
    pub fn stats(&self) -> PoolStats {
        let idle = self.inner.idle.lock().len();
        PoolStats {
            size: self.inner.size,
            idle,
            in_use: self
                .inner
                .size
                .saturating_sub(self.inner.semaphore.available_permits()),
            total_created: self.inner.created.load(Ordering::Relaxed),
            total_discarded: self.inner.discarded.load(Ordering::Relaxed),
        }
    }
}
