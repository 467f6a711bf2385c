//! # Error Hierarchy
//!
//! One typed error per row of the cache's error table. Programmer errors
//! (nil loader, double peer-picker registration, serving an unexpected
//! path) are not represented here: they panic at the call site instead of
//! being propagated as values, since they indicate a bug rather than a
//! recoverable runtime condition.

use std::fmt;

/// Result alias used throughout the cache read path.
pub type GeecacheResult<T> = Result<T, GeecacheError>;

/// Errors surfaced by the cache read path and its transport binding.
#[derive(thiserror::Error, Debug, Clone)]
pub enum GeecacheError {
    /// `Group::get` was called with an empty key.
    #[error("key is required")]
    InvalidKey,

    /// A registry lookup referenced a group that was never constructed.
    #[error("no such group: {0}")]
    NoSuchGroup(String),

    /// The user-supplied loader returned an error for this key.
    #[error("loader error: {0}")]
    Loader(String),

    /// A remote peer fetch failed (transport error or non-success status).
    ///
    /// Callers in the read path swallow this and fall back to the local
    /// loader; it is exposed as a variant so the fallback can be logged
    /// distinctly from a genuine loader failure.
    #[error("peer fetch failed: {0}")]
    PeerFetch(String),

    /// The single-flight leader's future panicked before producing a result.
    #[error("loader panicked")]
    LoaderPanicked,
}

impl GeecacheError {
    /// Maps this error onto the status code used by the HTTP binding (§6).
    pub fn status_code(&self) -> u16 {
        match self {
            GeecacheError::InvalidKey => 400,
            GeecacheError::NoSuchGroup(_) => 404,
            GeecacheError::Loader(_) | GeecacheError::LoaderPanicked => 500,
            GeecacheError::PeerFetch(_) => 500,
        }
    }
}

/// Thin wrapper so transport-layer IO errors can be folded into `PeerFetch`
/// without every call site writing out the conversion by hand.
impl From<std::io::Error> for GeecacheError {
    fn from(err: std::io::Error) -> Self {
        GeecacheError::PeerFetch(err.to_string())
    }
}

/// Displays the wire-facing message body for error responses.
pub struct WireMessage<'a>(pub &'a GeecacheError);

impl fmt::Display for WireMessage<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
