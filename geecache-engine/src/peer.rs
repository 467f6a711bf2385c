//! # Peer Traits
//!
//! The two seams a transport binding must implement to let a [`Group`]
//! consult remote nodes before falling back to its own loader:
//! [`PeerPicker`] decides *which* peer owns a key, and [`PeerGetter`]
//! actually fetches the value from that peer.
//!
//! [`Group`]: crate::group::Group

use async_trait::async_trait;

use geecache_common::GeecacheResult;

/// Fetches a key's value from a specific remote peer.
///
/// Implemented by the transport crate (an HTTP client, in this
/// workspace); the engine only depends on the trait.
#[async_trait]
pub trait PeerGetter: Send + Sync {
    /// Fetches `key` from `group` on the remote peer this getter is
    /// bound to.
    async fn fetch(&self, group: &str, key: &str) -> GeecacheResult<bytes::Bytes>;
}

/// Chooses which peer, if any, owns a given key.
///
/// `pick_peer` returning `None` (or the local node itself) tells the
/// caller to serve the key from its own loader rather than over the
/// network.
pub trait PeerPicker: Send + Sync {
    /// Returns the remote peer responsible for `key`, or `None` if this
    /// node owns the key itself or no peers are registered.
    fn pick_peer(&self, key: &str) -> Option<std::sync::Arc<dyn PeerGetter>>;
}
