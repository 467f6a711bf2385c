//! # Bounded LRU Store
//!
//! The per-group cache shard: an entry-count-bounded LRU with optional
//! per-entry TTL, backed by a dense node arena so links are array indices
//! rather than heap pointers.
//!
//! ## Design Principles
//! 1. **Index-Based Intrusive List**: `Vec<Option<Node>>` plus a free-list
//!    gives O(1) LRU updates without pointers or `unsafe`.
//! 2. **Entry-Count Eviction**: Capacity is bounded by entry count, not
//!    byte size — the read path never has to size a `ByteView` to track a
//!    byte budget.
//! 3. **Lazy + Active Expiry**: A lookup past a key's deadline is treated
//!    as a miss without invoking `on_evict`; a background sweeper also
//!    samples the map periodically so idle expired entries don't linger
//!    forever.

use std::time::{Duration, Instant};

use ahash::RandomState;
use hashbrown::HashMap;
use parking_lot::Mutex;
use rand::Rng;

use geecache_common::ByteView;

/// Callback invoked when an entry leaves the store via capacity eviction
/// or an active sweep. Not invoked for lazy, access-time expiry — at that
/// point the entry is already logically gone as far as a caller is
/// concerned, so there is nothing new to report.
pub type OnEvict = Box<dyn Fn(&str, &ByteView) + Send + Sync>;

struct Node {
    key: Box<str>,
    value: ByteView,
    expires_at: Option<Instant>,
    prev: Option<usize>,
    next: Option<usize>,
}

impl Node {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(deadline) if now >= deadline)
    }
}

struct Inner {
    map: HashMap<Box<str>, usize, RandomState>,
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl Inner {
    fn new() -> Self {
        Inner {
            map: HashMap::with_hasher(RandomState::new()),
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    fn lru_remove(&mut self, idx: usize) {
        let (prev, next) = {
            let node = self.nodes[idx].as_ref().expect("node exists");
            (node.prev, node.next)
        };

        if let Some(prev_idx) = prev {
            self.nodes[prev_idx].as_mut().expect("node exists").next = next;
        } else {
            self.head = next;
        }

        if let Some(next_idx) = next {
            self.nodes[next_idx].as_mut().expect("node exists").prev = prev;
        } else {
            self.tail = prev;
        }

        let node = self.nodes[idx].as_mut().expect("node exists");
        node.prev = None;
        node.next = None;
    }

    fn lru_push_back(&mut self, idx: usize) {
        let tail = self.tail;
        let node = self.nodes[idx].as_mut().expect("node exists");
        node.prev = tail;
        node.next = None;

        if let Some(tail_idx) = tail {
            self.nodes[tail_idx].as_mut().expect("node exists").next = Some(idx);
        } else {
            self.head = Some(idx);
        }
        self.tail = Some(idx);
    }

    fn touch(&mut self, idx: usize) {
        if self.tail == Some(idx) {
            return;
        }
        self.lru_remove(idx);
        self.lru_push_back(idx);
    }

    fn insert_new(&mut self, key: Box<str>, value: ByteView, expires_at: Option<Instant>) -> usize {
        let idx = self.free.pop().unwrap_or_else(|| {
            self.nodes.push(None);
            self.nodes.len() - 1
        });

        self.nodes[idx] = Some(Node {
            key: key.clone(),
            value,
            expires_at,
            prev: None,
            next: None,
        });
        self.lru_push_back(idx);
        self.map.insert(key, idx);
        idx
    }

    fn remove_idx(&mut self, idx: usize) -> Option<(Box<str>, ByteView)> {
        let node = self.nodes[idx].take()?;
        self.lru_remove(idx);
        self.map.remove(&node.key);
        self.free.push(idx);
        Some((node.key, node.value))
    }

    fn pop_lru(&mut self) -> Option<(Box<str>, ByteView)> {
        let idx = self.head?;
        self.remove_idx(idx)
    }
}

/// Entry-count-bounded LRU cache with optional per-entry TTL.
///
/// A capacity of `0` means unbounded: `add` never evicts.
pub struct LruStore {
    capacity: usize,
    inner: Mutex<Inner>,
    on_evict: Option<OnEvict>,
}

impl LruStore {
    /// Creates a store bounded to `capacity` entries (0 = unbounded).
    pub fn new(capacity: usize) -> Self {
        LruStore {
            capacity,
            inner: Mutex::new(Inner::new()),
            on_evict: None,
        }
    }

    /// Creates a bounded store with an eviction callback.
    ///
    /// The callback runs synchronously with the store's internal lock
    /// still held, so it must not call back into this store (logging or
    /// forwarding the evicted pair elsewhere is fine; re-adding or
    /// reading the same store from inside the callback will deadlock).
    pub fn with_on_evict(capacity: usize, on_evict: OnEvict) -> Self {
        LruStore {
            capacity,
            inner: Mutex::new(Inner::new()),
            on_evict: Some(on_evict),
        }
    }

    /// Looks up `key`, promoting it to most-recently-used on a hit.
    ///
    /// A lazily-discovered expired entry is removed and reported as a
    /// miss; `on_evict` is not invoked for it.
    pub fn get(&self, key: &str) -> Option<ByteView> {
        let now = Instant::now();
        let mut inner = self.inner.lock();

        let idx = *inner.map.get(key)?;
        let expired = inner.nodes[idx].as_ref().expect("node exists").is_expired(now);
        if expired {
            inner.remove_idx(idx);
            return None;
        }

        inner.touch(idx);
        Some(inner.nodes[idx].as_ref().expect("node exists").value.clone())
    }

    /// Inserts or replaces `key`, always setting (or clearing) its TTL to
    /// `ttl` — populating a key always overwrites any previous deadline.
    ///
    /// May evict the least-recently-used entry if this insert pushes the
    /// store over capacity. `on_evict` runs synchronously while the
    /// store's internal lock is still held, matching the reference
    /// eviction-notification behavior; the callback must not call back
    /// into this store or it will deadlock.
    pub fn add(&self, key: &str, value: ByteView, ttl: Option<Duration>) {
        let expires_at = ttl.map(|d| Instant::now() + d);
        let mut inner = self.inner.lock();

        if let Some(&idx) = inner.map.get(key) {
            let node = inner.nodes[idx].as_mut().expect("node exists");
            node.value = value;
            node.expires_at = expires_at;
            inner.touch(idx);
            return;
        }

        inner.insert_new(key.into(), value, expires_at);
        if self.capacity != 0 && inner.map.len() > self.capacity {
            if let Some((evicted_key, evicted_value)) = inner.pop_lru() {
                if let Some(on_evict) = self.on_evict.as_ref() {
                    on_evict(&evicted_key, &evicted_value);
                }
            }
        }
    }

    /// Sets `key`'s expiry to `ttl` from now, replacing any previous
    /// deadline (or clearing it, for a prior unbounded entry). No-op if
    /// `key` is not present.
    pub fn expire(&self, key: &str, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        let mut inner = self.inner.lock();
        if let Some(&idx) = inner.map.get(key) {
            inner.nodes[idx].as_mut().expect("node exists").expires_at = Some(expires_at);
        }
    }

    /// Removes `key`, returning its value if present (even if expired).
    pub fn remove(&self, key: &str) -> Option<ByteView> {
        let mut inner = self.inner.lock();
        let idx = *inner.map.get(key)?;
        inner.remove_idx(idx).map(|(_, value)| value)
    }

    /// Returns the number of live entries (expired-but-not-yet-swept
    /// entries are still counted).
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// Returns true if the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Samples up to `sample_size` random entries and removes the ones
    /// that have expired. Returns the number of entries removed.
    ///
    /// Matches the lazy `get`-path expiry check in not invoking
    /// `on_evict`: the grounding source's sweep routine removes a node
    /// directly rather than going through its capacity-eviction path, so
    /// only capacity-driven eviction ever fires the callback.
    ///
    /// This is the active half of expiry: a full scan would be
    /// O(capacity) per sweep, so the sweeper instead samples a bounded,
    /// randomly-positioned slice of the arena each tick, matching how
    /// bounded in-memory caches keep TTL sweeps cheap at scale.
    pub fn sweep_sample(&self, sample_size: usize) -> usize {
        let now = Instant::now();
        let mut expired = Vec::new();

        let mut inner = self.inner.lock();
        let len = inner.nodes.len();
        let scan = sample_size.min(len);
        if scan > 0 {
            let start = rand::thread_rng().gen_range(0..len);
            for offset in 0..scan {
                let idx = (start + offset) % len;
                if let Some(node) = inner.nodes[idx].as_ref() {
                    if node.is_expired(now) {
                        expired.push(idx);
                    }
                }
            }
        }
        for idx in &expired {
            inner.remove_idx(*idx);
        }

        expired.len()
    }
}
