//! # Guarded Cache
//!
//! Wraps an [`LruStore`] with a background sweeper task, mirroring the
//! teacher's `MemoryEngine::start_expirer` but as a `tokio` task instead
//! of an OS thread, since the rest of this crate's read path is async.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

use crate::store::LruStore;

/// A bounded LRU store paired with the handle to its background sweeper.
///
/// "Guarded" refers to the sweeper's lifecycle, not locking inside
/// [`LruStore`] itself (that is handled by its own internal mutex):
/// dropping a `GuardedCache` without calling [`GuardedCache::shutdown`]
/// leaves the sweeper running detached, so callers that need a clean
/// shutdown (tests, graceful process exit) should call it explicitly.
pub struct GuardedCache {
    store: Arc<LruStore>,
    sweeper: Option<SweeperHandle>,
}

struct SweeperHandle {
    stop: Arc<AtomicBool>,
    notify: Arc<Notify>,
    join: JoinHandle<()>,
}

impl GuardedCache {
    /// Wraps `store` with no background sweeper; expiry is then purely
    /// lazy (checked on access).
    pub fn new(store: Arc<LruStore>) -> Self {
        GuardedCache {
            store,
            sweeper: None,
        }
    }

    /// Wraps `store` and starts a sweeper that samples `sample_size`
    /// entries every `interval`.
    pub fn with_sweeper(store: Arc<LruStore>, interval: Duration, sample_size: usize) -> Self {
        let stop = Arc::new(AtomicBool::new(false));
        let notify = Arc::new(Notify::new());
        let task_store = store.clone();
        let task_stop = stop.clone();
        let task_notify = notify.clone();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if task_stop.load(Ordering::Acquire) {
                            break;
                        }
                        task_store.sweep_sample(sample_size);
                    }
                    _ = task_notify.notified() => break,
                }
            }
        });

        GuardedCache {
            store,
            sweeper: Some(SweeperHandle {
                stop,
                notify,
                join,
            }),
        }
    }

    /// Returns the wrapped store.
    pub fn store(&self) -> &Arc<LruStore> {
        &self.store
    }

    /// Sets `key`'s expiry to `ttl` from now. No-op if `key` is not
    /// present; delegates directly to the wrapped store, which holds the
    /// single mutex guarding this cache (see [`LruStore::expire`]).
    pub fn expire(&self, key: &str, ttl: Duration) {
        self.store.expire(key, ttl);
    }

    /// Stops the sweeper (if any) and waits for it to exit.
    pub async fn shutdown(mut self) {
        if let Some(sweeper) = self.sweeper.take() {
            sweeper.stop.store(true, Ordering::Release);
            sweeper.notify.notify_one();
            let _ = sweeper.join.await;
        }
    }
}
