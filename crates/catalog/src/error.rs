//! Catalog Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A catalog error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong internally.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Volume (or a folder inside it) does not exist
    #[display("not found: {_0}")]
    NotFound(#[error(not(source))] String),
    /// Volume exists but cannot currently be browsed
    #[display("volume unavailable: {_0}")]
    Unavailable(#[error(not(source))] String),
    /// Datastore path is malformed or escapes the volume root
    #[display("invalid datastore path: {_0}")]
    InvalidPath(#[error(not(source))] String),
    /// File-name pattern could not be compiled
    #[display("invalid pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
    /// The catalog rejected or failed the call
    #[display("remote call failed: {_0}")]
    Remote(#[error(not(source))] String),
    /// The catalog answered, but the answer is missing expected fields
    #[display("malformed search result: {_0}")]
    MalformedResult(#[error(not(source))] String),
}
impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Remote(_) | Self::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_kind_display() {
        assert_eq!(ErrorKind::NotFound("[ds1]".to_string()).to_string(), "not found: [ds1]");
        assert_eq!(
            ErrorKind::MalformedResult("missing size".to_string()).to_string(),
            "malformed search result: missing size"
        );
    }

    #[test]
    fn error_kind_retryable() {
        assert!(ErrorKind::Remote("timeout".to_string()).is_retryable());
        assert!(ErrorKind::Unavailable("ds1".to_string()).is_retryable());
        assert!(!ErrorKind::InvalidPattern("[".to_string()).is_retryable());
        assert!(!ErrorKind::MalformedResult("missing size".to_string()).is_retryable());
    }
}
