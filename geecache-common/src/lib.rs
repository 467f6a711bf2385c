//! # geecache-common
//!
//! Shared types used by every other crate in the workspace: the error
//! hierarchy, the immutable value handle returned to cache callers, and
//! process-level configuration.
//!
//! Keeping these in their own crate (rather than in `geecache-engine`)
//! mirrors the teacher's `hkv-common` split: anything both the storage
//! engine and the transport layer need to agree on lives here, so neither
//! depends on the other's internals.

pub mod byteview;
pub mod config;
pub mod error;

pub use byteview::ByteView;
pub use config::GeecacheConfig;
pub use error::{GeecacheError, GeecacheResult};
