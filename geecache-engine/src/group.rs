//! # Group
//!
//! A named, independently-capacity-bounded cache namespace: the unit a
//! caller registers a loader against and reads through. Mirrors
//! groupcache's `Group` — multiple groups (e.g. "scores", "profiles")
//! share a process and its peer set but never share keys or capacity.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex as SyncMutex;
use parking_lot::RwLock;
use tracing::{trace, warn};

use geecache_common::{ByteView, GeecacheError, GeecacheResult};

use crate::flight::SingleFlight;
use crate::guarded::GuardedCache;
use crate::peer::PeerPicker;
use crate::store::LruStore;

/// Loads a value for a key that missed every cache and every peer.
///
/// The source of truth a group falls back to — a database query, a
/// remote service call, a filesystem read. Implemented by the caller
/// that constructs the group.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Produces the value for `key`, or an error if it cannot be
    /// produced.
    async fn load(&self, key: &str) -> GeecacheResult<ByteView>;
}

#[async_trait]
impl<F, Fut> Loader for F
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = GeecacheResult<ByteView>> + Send,
{
    async fn load(&self, key: &str) -> GeecacheResult<ByteView> {
        (self)(key.to_string()).await
    }
}

/// A named cache namespace: local storage, request coalescing, and an
/// optional peer picker for consulting the rest of the cluster before
/// falling back to the loader.
pub struct Group {
    name: String,
    loader: Arc<dyn Loader>,
    cache: GuardedCache,
    flight: SingleFlight,
    default_ttl: Option<Duration>,
    peer_picker: RwLock<Option<Arc<dyn PeerPicker>>>,
}

impl Group {
    /// Creates a group with a bare (sweeper-less) store; expiry is
    /// purely lazy.
    pub fn new(name: impl Into<String>, capacity: usize, loader: Arc<dyn Loader>) -> Self {
        Group {
            name: name.into(),
            loader,
            cache: GuardedCache::new(Arc::new(LruStore::new(capacity))),
            flight: SingleFlight::new(),
            default_ttl: None,
            peer_picker: RwLock::new(None),
        }
    }

    /// Creates a group whose store runs a background sweeper and whose
    /// populated entries carry `default_ttl`.
    pub fn with_sweeper(
        name: impl Into<String>,
        capacity: usize,
        loader: Arc<dyn Loader>,
        default_ttl: Duration,
        sweep_interval: Duration,
        sweep_sample: usize,
    ) -> Self {
        let store = Arc::new(LruStore::new(capacity));
        Group {
            name: name.into(),
            loader,
            cache: GuardedCache::with_sweeper(store, sweep_interval, sweep_sample),
            flight: SingleFlight::new(),
            default_ttl: Some(default_ttl),
            peer_picker: RwLock::new(None),
        }
    }

    /// Returns the group's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers the peer picker this group consults before falling
    /// back to its loader. Calling this more than once is a programmer
    /// error (a group's peer topology is fixed at wiring time) and
    /// panics.
    pub fn register_peer_picker(&self, picker: Arc<dyn PeerPicker>) {
        let mut slot = self.peer_picker.write();
        assert!(slot.is_none(), "peer picker already registered for group {}", self.name);
        *slot = Some(picker);
    }

    /// Reads `key`, consulting local cache, then a remote peer (if one
    /// owns the key), then the loader — in that order. Concurrent reads
    /// for the same missing key are coalesced into a single load.
    pub async fn get(&self, key: &str) -> GeecacheResult<ByteView> {
        if key.is_empty() {
            return Err(GeecacheError::InvalidKey);
        }

        if let Some(value) = self.cache.store().get(key) {
            trace!(group = %self.name, %key, "cache hit");
            return Ok(value);
        }

        // `do_call` spawns this future onto a detached task so that a
        // dropped/aborted caller can't cancel the load out from under
        // other waiters on the same key; it must therefore own its data
        // instead of borrowing `&self`.
        let name = self.name.clone();
        let loader = self.loader.clone();
        let store = self.cache.store().clone();
        let picker = self.peer_picker.read().clone();
        let default_ttl = self.default_ttl;
        let owned_key = key.to_string();

        self.flight
            .do_call(key, async move {
                Self::load(&name, &loader, &store, picker, default_ttl, &owned_key).await
            })
            .await
    }

    /// Inserts `value` for `key` directly, bypassing the loader and any
    /// peer. Used by a transport binding serving a peer's own `get`
    /// request, and by tests seeding cache state.
    pub fn populate(&self, key: &str, value: ByteView) {
        self.cache.store().add(key, value, self.default_ttl);
    }

    async fn load(
        name: &str,
        loader: &Arc<dyn Loader>,
        store: &Arc<LruStore>,
        picker: Option<Arc<dyn PeerPicker>>,
        default_ttl: Option<Duration>,
        key: &str,
    ) -> GeecacheResult<ByteView> {
        if let Some(picker) = picker {
            if let Some(peer) = picker.pick_peer(key) {
                match peer.fetch(name, key).await {
                    Ok(bytes) => return Ok(ByteView::from_bytes(bytes)),
                    Err(err) => {
                        warn!(group = %name, %key, %err, "peer fetch failed, falling back to local loader");
                    }
                }
            }
        }

        let value = loader.load(key).await?;
        store.add(key, value.clone(), default_ttl);
        Ok(value)
    }

    /// Shuts down the group's background sweeper, if any.
    pub async fn shutdown(self) {
        self.cache.shutdown().await;
    }
}

/// Process-wide registry of live groups, keyed by name.
///
/// Mirrors groupcache's package-level `NewGroup`/`GetGroup` pair: a
/// process typically constructs its groups once at startup and looks
/// them up by name from the transport layer thereafter.
#[derive(Default)]
pub struct Registry {
    groups: SyncMutex<HashMap<String, Arc<Group>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Registry {
            groups: SyncMutex::new(HashMap::new()),
        }
    }

    /// Registers `group` under its own name, overwriting any previous
    /// group registered under that name.
    pub fn register(&self, group: Arc<Group>) -> Arc<Group> {
        let mut groups = self.groups.lock();
        let name = group.name().to_string();
        groups.insert(name, group.clone());
        group
    }

    /// Looks up a previously registered group by name.
    pub fn get(&self, name: &str) -> Option<Arc<Group>> {
        self.groups.lock().get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingLoader {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Loader for CountingLoader {
        async fn load(&self, key: &str) -> GeecacheResult<ByteView> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ByteView::copy_from(format!("value-{key}").as_bytes()))
        }
    }

    #[tokio::test]
    async fn miss_then_hit_only_loads_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let group = Group::new("scores", 10, Arc::new(CountingLoader { calls: calls.clone() }));

        let first = group.get("tom").await.unwrap();
        let second = group.get("tom").await.unwrap();

        assert_eq!(first.as_bytes(), second.as_bytes());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn empty_key_is_rejected() {
        let group = Group::new(
            "scores",
            10,
            Arc::new(CountingLoader {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
        );
        assert!(matches!(group.get("").await, Err(GeecacheError::InvalidKey)));
    }

    #[tokio::test]
    async fn loader_error_is_not_cached() {
        struct FailingLoader;
        #[async_trait]
        impl Loader for FailingLoader {
            async fn load(&self, _key: &str) -> GeecacheResult<ByteView> {
                Err(GeecacheError::Loader("no such record".to_string()))
            }
        }

        let group = Group::new("scores", 10, Arc::new(FailingLoader));
        assert!(group.get("tom").await.is_err());
        assert!(group.get("tom").await.is_err());
    }

    #[test]
    fn registry_overwrites_duplicate_registration() {
        let registry = Registry::new();
        let make = || {
            Arc::new(Group::new(
                "scores",
                10,
                Arc::new(CountingLoader {
                    calls: Arc::new(AtomicUsize::new(0)),
                }),
            ))
        };
        let first = make();
        registry.register(first.clone());
        let second = make();
        registry.register(second.clone());

        let looked_up = registry.get("scores").unwrap();
        assert!(Arc::ptr_eq(&looked_up, &second));
        assert!(!Arc::ptr_eq(&looked_up, &first));
    }

    #[test]
    fn registry_get_returns_registered_group() {
        let registry = Registry::new();
        registry.register(Arc::new(Group::new(
            "scores",
            10,
            Arc::new(CountingLoader {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
        )));
        assert!(registry.get("scores").is_some());
        assert!(registry.get("missing").is_none());
    }
}
