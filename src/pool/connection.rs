//! Pooled Connection Guard
//!
//! A checked-out connection. Dropping the guard releases it back to the
//! pool, which is what pairs every acquire with exactly one release.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tokio::sync::OwnedSemaphorePermit;

use super::{ManageConnection, PoolInner};

/// Exclusive handle on a connection borrowed from a [`Pool`](super::Pool).
pub struct PooledConnection<M: ManageConnection> {
    conn: Option<M::Connection>,
    pool: Arc<PoolInner<M>>,
    // Dropped after `Drop::drop` has put the connection back, so the
    // woken waiter always finds it in the idle set.
    _permit: OwnedSemaphorePermit,
}

impl<M: ManageConnection> PooledConnection<M> {
    pub(super) fn new(
        conn: M::Connection,
        pool: Arc<PoolInner<M>>,
        permit: OwnedSemaphorePermit,
    ) -> Self {
        Self {
            conn: Some(conn),
            pool,
            _permit: permit,
        }
    }

    /// Drops the connection instead of returning it to the pool.
    ///
    /// Capacity is kept: the next acquirer that finds the idle set empty
    /// opens a replacement.
    pub fn discard(mut self) {
        if self.conn.take().is_some() {
            self.pool.record_discard();
        }
    }
}

impl<M: ManageConnection> fmt::Debug for PooledConnection<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledConnection")
            .field("held", &self.conn.is_some())
            .finish_non_exhaustive()
    }
}

impl<M: ManageConnection> Drop for PooledConnection<M> {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn);
        }
    }
}

impl<M: ManageConnection> Deref for PooledConnection<M> {
    type Target = M::Connection;

    fn deref(&self) -> &Self::Target {
        // `conn` is only taken in `discard` and `drop`, both of which consume the guard.
        self.conn.as_ref().expect("pooled connection already released")
    }
}

impl<M: ManageConnection> DerefMut for PooledConnection<M> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn.as_mut().expect("pooled connection already released")
    }
}
