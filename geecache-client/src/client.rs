//! # Peer Client
//!
//! Implements [`PeerGetter`] over the minimal HTTP codec in [`crate::http`],
//! pooling connections per peer the way the sync client pools RESP
//! connections — just with an async pool and an HTTP body instead of a
//! RESP reply.

use async_trait::async_trait;
use tracing::debug;

use geecache_common::GeecacheError;
use geecache_engine::PeerGetter;

use crate::http::{encode_get, roundtrip};
use crate::pool::{ConnectionPool, PoolConfig};

/// One remote peer, addressable over HTTP.
pub struct PeerClient {
    addr: String,
    base_path: String,
    pool: ConnectionPool,
}

impl PeerClient {
    /// Creates a client for the peer at `addr` (e.g. `"10.0.0.2:9090"`),
    /// serving groups under `base_path` (e.g. `"/_geecache/"`).
    pub fn new(addr: impl Into<String>, base_path: impl Into<String>) -> Self {
        let addr = addr.into();
        PeerClient {
            pool: ConnectionPool::new(PoolConfig::new(addr.clone())),
            addr,
            base_path: base_path.into(),
        }
    }

    fn path_for(&self, group: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base_path.trim_end_matches('/'),
            encode_segment(group),
            encode_segment(key)
        )
    }
}

/// Percent-encodes the characters that would otherwise break a single
/// path segment (`/`, `%`, and ASCII whitespace); keys and group names
/// are opaque byte strings as far as the cache is concerned.
fn encode_segment(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        match byte {
            b'/' | b'%' | b' '..=b' ' | 0..=0x1f | 0x7f..=0xff => {
                out.push('%');
                out.push_str(&format!("{byte:02X}"));
            }
            _ => out.push(byte as char),
        }
    }
    out
}

#[async_trait]
impl PeerGetter for PeerClient {
    async fn fetch(&self, group: &str, key: &str) -> Result<bytes::Bytes, GeecacheError> {
        let path = self.path_for(group, key);
        let request = encode_get(&path, &self.addr);

        let mut conn = self.pool.acquire().await?;
        let result = roundtrip(conn.stream_mut(), &request).await;

        match result {
            Ok(response) if response.status == 200 => {
                let (pool, stream) = conn.into_parts();
                pool.release(stream).await;
                Ok(response.body)
            }
            Ok(response) => {
                debug!(peer = %self.addr, %group, %key, status = response.status, "peer returned non-success status");
                Err(GeecacheError::PeerFetch(format!(
                    "peer {} returned status {}",
                    self.addr, response.status
                )))
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_for_joins_base_group_and_key() {
        let client = PeerClient::new("127.0.0.1:9090", "/_geecache/");
        assert_eq!(client.path_for("scores", "tom"), "/_geecache/scores/tom");
    }

    #[test]
    fn path_for_percent_encodes_unsafe_characters() {
        let client = PeerClient::new("127.0.0.1:9090", "/_geecache/");
        assert_eq!(client.path_for("scores", "a/b"), "/_geecache/scores/a%2Fb");
    }
}
