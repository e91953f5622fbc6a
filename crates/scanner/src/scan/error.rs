//! Error types for a single volume.
//!
//! A volume failing is never fatal to the scan. These errors are collected
//! into [`ScanReport::errors`](crate::ScanReport::errors), exactly one per
//! failed volume, with the underlying catalog error as their child.

use derive_more::{Display, Error};

/// A per-volume error with automatic location tracking via [`exn::Exn`].
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for per-volume operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Opening, running or reading the answer of a search on this volume
    /// failed. Malformed answers land here too.
    #[display("search of volume {_0} failed")]
    RemoteCall(#[error(not(source))] String),
    /// The scan was cancelled before this volume finished.
    #[display("search of volume {_0} was cancelled")]
    Cancelled(#[error(not(source))] String),
}

impl ErrorKind {
    /// Name of the volume that failed.
    pub fn volume(&self) -> &str {
        match self {
            Self::RemoteCall(volume) | Self::Cancelled(volume) => volume,
        }
    }

    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RemoteCall(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_names_volume() {
        let err = ErrorKind::RemoteCall("ds-03".to_string());
        assert_eq!(err.to_string(), "search of volume ds-03 failed");
        assert_eq!(err.volume(), "ds-03");
        assert!(err.is_retryable());
        assert!(!ErrorKind::Cancelled("ds-03".to_string()).is_retryable());
    }
}
