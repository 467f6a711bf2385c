//! # Connection Pool
//!
//! Reuses TCP connections to a single peer to avoid paying a handshake
//! on every request. Async counterpart of the sync client's pool: idle
//! connections sit behind a `tokio::sync::Mutex` (acquiring one may have
//! to wait for a slot, which is an async operation), while the
//! reservation count is a plain atomic so a dropped, never-released
//! connection always frees its slot without needing async `Drop`.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep a bounded set of reusable
//!    connections per peer.
//! 2. **Fail Fast**: Exceeding `max_total` returns an error immediately
//!    rather than queuing.
//! 3. **Explicit Return**: A connection is returned to the pool by the
//!    caller via [`ConnectionPool::release`] after a successful request;
//!    an error path simply drops it and the slot is reclaimed.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::Mutex;

use geecache_common::GeecacheError;

/// Pool configuration for one peer.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Peer address, e.g. `"127.0.0.1:9090"`.
    pub addr: String,
    /// Maximum number of idle connections to keep.
    pub max_idle: usize,
    /// Maximum total connections (idle + checked out).
    pub max_total: usize,
    /// Timeout applied to the initial TCP connect.
    pub connect_timeout: Duration,
}

impl PoolConfig {
    /// Reasonable defaults for a single peer: a handful of idle
    /// connections, headroom for bursty concurrency.
    pub fn new(addr: impl Into<String>) -> Self {
        PoolConfig {
            addr: addr.into(),
            max_idle: 8,
            max_total: 64,
            connect_timeout: Duration::from_secs(2),
        }
    }
}

struct Inner {
    config: PoolConfig,
    idle: Mutex<VecDeque<TcpStream>>,
    total: AtomicUsize,
}

/// Pooled connection handle for a single peer address.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<Inner>,
}

impl ConnectionPool {
    /// Creates a new, initially empty pool for `config.addr`.
    pub fn new(config: PoolConfig) -> Self {
        ConnectionPool {
            inner: Arc::new(Inner {
                config,
                idle: Mutex::new(VecDeque::new()),
                total: AtomicUsize::new(0),
            }),
        }
    }

    /// Acquires a connection, reusing an idle one if available or
    /// opening a new one if the pool has a free slot.
    pub async fn acquire(&self) -> Result<PooledConnection, GeecacheError> {
        if let Some(stream) = self.inner.idle.lock().await.pop_front() {
            return Ok(PooledConnection {
                pool: self.clone(),
                stream: Some(stream),
                returned: false,
            });
        }

        if !self.try_reserve() {
            return Err(GeecacheError::PeerFetch(format!(
                "connection pool exhausted for {}",
                self.inner.config.addr
            )));
        }

        match tokio::time::timeout(
            self.inner.config.connect_timeout,
            TcpStream::connect(&self.inner.config.addr),
        )
        .await
        {
            Ok(Ok(stream)) => {
                let _ = stream.set_nodelay(true);
                Ok(PooledConnection {
                    pool: self.clone(),
                    stream: Some(stream),
                    returned: false,
                })
            }
            Ok(Err(err)) => {
                self.release_slot();
                Err(GeecacheError::PeerFetch(err.to_string()))
            }
            Err(_) => {
                self.release_slot();
                Err(GeecacheError::PeerFetch(format!(
                    "connect to {} timed out",
                    self.inner.config.addr
                )))
            }
        }
    }

    fn try_reserve(&self) -> bool {
        loop {
            let current = self.inner.total.load(Ordering::Acquire);
            if current >= self.inner.config.max_total {
                return false;
            }
            if self
                .inner
                .total
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn release_slot(&self) {
        self.inner.total.fetch_sub(1, Ordering::AcqRel);
    }

    /// Returns a live connection to the idle pool, or drops it (freeing
    /// its slot) if the pool is already at `max_idle`.
    pub async fn release(&self, stream: TcpStream) {
        let mut idle = self.inner.idle.lock().await;
        if idle.len() < self.inner.config.max_idle {
            idle.push_back(stream);
        } else {
            drop(idle);
            self.release_slot();
        }
    }
}

/// A connection checked out of a [`ConnectionPool`].
///
/// Call [`PooledConnection::into_inner`] and then
/// [`ConnectionPool::release`] to return it after a successful request;
/// dropping it without doing so frees its reservation but discards the
/// socket.
pub struct PooledConnection {
    pool: ConnectionPool,
    stream: Option<TcpStream>,
    returned: bool,
}

impl PooledConnection {
    /// Borrows the underlying stream.
    pub fn stream_mut(&mut self) -> &mut TcpStream {
        self.stream.as_mut().expect("connection already taken")
    }

    /// Takes ownership of the stream and the pool to return it to, for
    /// hand-off back to [`ConnectionPool::release`].
    pub fn into_parts(mut self) -> (ConnectionPool, TcpStream) {
        self.returned = true;
        (self.pool.clone(), self.stream.take().expect("connection already taken"))
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if !self.returned && self.stream.take().is_some() {
            self.pool.release_slot();
        }
    }
}
