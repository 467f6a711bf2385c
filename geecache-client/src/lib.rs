//! # geecache-client
//!
//! The peer side of the cache's HTTP transport: a pooled, async client
//! implementing [`geecache_engine::PeerGetter`] so a [`geecache_engine::Group`]
//! can fetch a key from whichever peer the consistent-hash ring assigns
//! it to.

mod client;
mod http;
mod pool;

pub use client::PeerClient;
pub use pool::{ConnectionPool, PoolConfig};
