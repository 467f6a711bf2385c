//! # ByteView
//!
//! The shared, immutable handle returned to cache callers. Backed by
//! `bytes::Bytes` rather than `Arc<[u8]>` so that slicing a view (e.g. a
//! transport layer writing a response body) never copies the underlying
//! buffer — the teacher's `hkv-engine::memory` module makes the same
//! zero-copy-on-read tradeoff with `Arc<[u8]>`; `Bytes` gets us the same
//! property plus cheap sub-slicing.

use bytes::Bytes;
use std::fmt;

/// An opaque, immutable cached value.
///
/// The store never inspects contents. Cloning a `ByteView` is a reference
/// count bump, not a copy; callers that need an owned, mutable buffer use
/// [`ByteView::to_vec`] to get a defensive copy explicitly.
#[derive(Clone, PartialEq, Eq)]
pub struct ByteView(Bytes);

impl ByteView {
    /// Builds a view by copying the given bytes.
    pub fn copy_from(data: impl AsRef<[u8]>) -> Self {
        ByteView(Bytes::copy_from_slice(data.as_ref()))
    }

    /// Builds a view from bytes already owned as a `Vec`, without copying.
    pub fn from_vec(data: Vec<u8>) -> Self {
        ByteView(Bytes::from(data))
    }

    /// Builds a view from an already-shared `Bytes` buffer, without copying.
    pub fn from_bytes(data: Bytes) -> Self {
        ByteView(data)
    }

    /// Borrows the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns a defensive owned copy of the value.
    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Returns the shared `Bytes` handle backing this view.
    pub fn as_bytes_shared(&self) -> Bytes {
        self.0.clone()
    }

    /// Returns the length of the value in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the value is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.len() <= 32 {
            write!(f, "ByteView({:?})", String::from_utf8_lossy(self.as_bytes()))
        } else {
            write!(f, "ByteView({}B)", self.len())
        }
    }
}

impl From<&str> for ByteView {
    fn from(s: &str) -> Self {
        ByteView::copy_from(s.as_bytes())
    }
}

impl From<String> for ByteView {
    fn from(s: String) -> Self {
        ByteView::from_vec(s.into_bytes())
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(v: Vec<u8>) -> Self {
        ByteView::from_vec(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clone_is_shared_not_copied() {
        let view = ByteView::copy_from(b"alpha");
        let clone = view.clone();
        assert_eq!(view.as_bytes(), clone.as_bytes());
    }

    #[test]
    fn to_vec_is_defensive() {
        let view = ByteView::copy_from(b"alpha");
        let mut copy = view.to_vec();
        copy[0] = b'X';
        assert_eq!(view.as_bytes(), b"alpha");
    }

    #[test]
    fn debug_truncates_large_values() {
        let view = ByteView::from_vec(vec![b'x'; 64]);
        let rendered = format!("{view:?}");
        assert_eq!(rendered, "ByteView(64B)");
    }
}
