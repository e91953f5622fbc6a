//! Scanner Error Types
//!
//! These are the *fatal* errors: anything that stops a scan before a single
//! volume has been searched. Failures of individual volumes never end up
//! here; see [`scan::error`](crate::scan::error).

use derive_more::{Display, Error};

/// A scanner error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for scanner operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The catalog could not list its volumes.
    #[display("failed to enumerate volumes of catalog {_0}")]
    Enumerate(#[error(not(source))] String),
    /// The scan request is unusable as given.
    #[display("invalid scan request: {_0}")]
    InvalidRequest(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Enumerate(_))
    }
}
