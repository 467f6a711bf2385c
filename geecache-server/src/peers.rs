//! # HTTP Peer Pool
//!
//! The transport-side [`PeerPicker`]: owns the consistent-hash ring over
//! the cluster's peer addresses and a pooled [`PeerClient`] per remote
//! peer, mirroring how `HTTPPool` in groupcache is both the thing that
//! picks peers and the thing that serves them.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use geecache_client::PeerClient;
use geecache_engine::{HashRing, PeerGetter, PeerPicker};

/// Consistent-hash peer picker bound to a fixed local address.
///
/// The local address is never returned by `pick_peer` — a key that
/// hashes to this node is meant to be served locally, not fetched from
/// "itself" over the network.
pub struct HttpPeerPool {
    self_addr: String,
    base_path: String,
    replicas: usize,
    state: RwLock<State>,
}

struct State {
    ring: HashRing,
    clients: HashMap<String, Arc<PeerClient>>,
}

impl HttpPeerPool {
    /// Creates a pool for the local node at `self_addr`, with no peers
    /// registered yet.
    pub fn new(self_addr: impl Into<String>, base_path: impl Into<String>, replicas: usize) -> Self {
        HttpPeerPool {
            self_addr: self_addr.into(),
            base_path: base_path.into(),
            replicas,
            state: RwLock::new(State {
                ring: HashRing::new(replicas),
                clients: HashMap::new(),
            }),
        }
    }

    /// Replaces the full peer set (including, harmlessly, this node's
    /// own address if present in `peers`).
    pub fn set_peers(&self, peers: &[String]) {
        let mut ring = HashRing::new(self.replicas);
        ring.add(peers);

        let mut clients = HashMap::with_capacity(peers.len());
        for addr in peers {
            if addr == &self.self_addr {
                continue;
            }
            clients.insert(addr.clone(), Arc::new(PeerClient::new(addr.clone(), self.base_path.clone())));
        }

        let mut state = self.state.write();
        state.ring = ring;
        state.clients = clients;
    }
}

impl PeerPicker for HttpPeerPool {
    fn pick_peer(&self, key: &str) -> Option<Arc<dyn PeerGetter>> {
        let state = self.state.read();
        let owner = state.ring.get(key)?;
        if owner == self.self_addr {
            return None;
        }
        state
            .clients
            .get(owner)
            .cloned()
            .map(|client| client as Arc<dyn PeerGetter>)
    }
}
