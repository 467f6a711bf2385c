//! # geecache-server
//!
//! The HTTP transport binding: a minimal hand-rolled HTTP/1.1 server
//! (see [`server`]) serving reads against a [`geecache_engine::Registry`],
//! plus the consistent-hash [`peers::HttpPeerPool`] that lets a `Group`
//! consult the rest of the cluster before falling back to its loader.

pub mod peers;
pub mod server;

pub use peers::HttpPeerPool;
pub use server::{serve, serve_listener};
