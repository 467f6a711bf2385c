//! # Consistent Hash Ring
//!
//! Maps cache keys onto peers using consistent hashing with virtual nodes,
//! so that adding or removing a peer only reshuffles keys owned by the
//! peers adjacent to it on the ring rather than the whole keyspace.
//!
//! ## Design Principles
//! 1. **Virtual Nodes**: Each real peer is hashed `replicas` times under
//!    distinct labels to smooth out load distribution.
//! 2. **Sorted Ring + Binary Search**: Peer placement is a lower-bound
//!    search over a sorted `Vec<u32>`, wrapping around to the first entry
//!    past the largest hash.
//! 3. **Pluggable Hash**: The hash function is swappable for testing
//!    determinism; the default is CRC-32 (IEEE), matching the spec's
//!    default hash.

use std::collections::HashMap;

/// A function from an arbitrary byte string to a 32-bit hash.
pub type HashFn = fn(&[u8]) -> u32;

/// Default hash function: CRC-32/IEEE.
fn crc32_hash(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Consistent hash ring over a set of peer identifiers (addresses).
///
/// Not internally synchronized: callers that mutate the ring under
/// concurrent reads own a `parking_lot::RwLock<HashRing>` (or similar)
/// themselves, mirroring how `PeerPicker` implementations hold it.
#[derive(Debug, Clone)]
pub struct HashRing {
    hash_fn: HashFn,
    replicas: usize,
    /// Sorted virtual node hashes.
    keys: Vec<u32>,
    /// Virtual node hash -> owning peer identifier.
    ring: HashMap<u32, String>,
}

impl HashRing {
    /// Creates an empty ring with `replicas` virtual nodes per peer.
    pub fn new(replicas: usize) -> Self {
        Self::with_hash_fn(replicas, crc32_hash)
    }

    /// Creates an empty ring using a caller-provided hash function.
    ///
    /// Exists so tests can plug in a deterministic, easy-to-reason-about
    /// hash instead of CRC-32.
    pub fn with_hash_fn(replicas: usize, hash_fn: HashFn) -> Self {
        HashRing {
            hash_fn,
            replicas: replicas.max(1),
            keys: Vec::new(),
            ring: HashMap::new(),
        }
    }

    /// Returns true if the ring has no peers.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Adds peers to the ring, registering `replicas` virtual nodes each.
    ///
    /// Adding a peer that is already present first removes its existing
    /// virtual nodes, so re-adding is idempotent rather than doubling up.
    ///
    /// Ties within the ring (two virtual-node labels hashing to the same
    /// slot) resolve to whichever peer claimed the slot first: a
    /// colliding label is skipped rather than overwriting the existing
    /// owner.
    pub fn add(&mut self, peers: &[impl AsRef<str>]) {
        for peer in peers {
            let peer = peer.as_ref();
            self.remove(peer);
            for i in 0..self.replicas {
                let label = format!("{i}{peer}");
                let hash = (self.hash_fn)(label.as_bytes());
                if !self.ring.contains_key(&hash) {
                    self.ring.insert(hash, peer.to_string());
                    self.keys.push(hash);
                }
            }
        }
        self.keys.sort_unstable();
    }

    /// Removes a peer and all of its virtual nodes from the ring.
    ///
    /// Only removes a slot this peer currently owns, so removing a peer
    /// that lost a label collision to another peer doesn't evict the
    /// winner's entry.
    pub fn remove(&mut self, peer: &str) {
        for i in 0..self.replicas {
            let label = format!("{i}{peer}");
            let hash = (self.hash_fn)(label.as_bytes());
            if self.ring.get(&hash).map(String::as_str) == Some(peer) {
                self.ring.remove(&hash);
                if let Ok(pos) = self.keys.binary_search(&hash) {
                    self.keys.remove(pos);
                }
            }
        }
    }

    /// Returns the peer responsible for `key`, or `None` if the ring is
    /// empty.
    ///
    /// Finds the first virtual node hash greater than or equal to the
    /// key's hash via binary search, wrapping around to index 0 when the
    /// key's hash is larger than every virtual node on the ring.
    pub fn get(&self, key: &str) -> Option<&str> {
        if self.keys.is_empty() {
            return None;
        }

        let hash = (self.hash_fn)(key.as_bytes());
        let idx = match self.keys.binary_search(&hash) {
            Ok(idx) => idx,
            Err(idx) => idx % self.keys.len(),
        };
        self.ring.get(&self.keys[idx]).map(String::as_str)
    }
}
