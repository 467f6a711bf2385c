//! # geecache-engine
//!
//! The read path shared by every transport binding: consistent-hash peer
//! placement, a bounded LRU store with TTL, single-flight request
//! coalescing, and the `Group`/`Registry` types that tie them together.
//!
//! Kept transport-agnostic the way the teacher's `hkv-engine` knows
//! nothing about RESP or TCP: this crate depends on nothing from
//! `geecache-server` or `geecache-client`, only on the [`PeerPicker`] and
//! [`PeerGetter`] traits those crates implement.

pub mod flight;
pub mod group;
pub mod guarded;
pub mod peer;
pub mod ring;
pub mod store;

pub use flight::SingleFlight;
pub use group::{Group, Loader, Registry};
pub use guarded::GuardedCache;
pub use peer::{PeerGetter, PeerPicker};
pub use ring::HashRing;
pub use store::LruStore;
