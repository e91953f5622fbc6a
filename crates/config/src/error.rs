//! Configuration Error Types

use derive_more::{Display, Error};

/// A configuration error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for configuration operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Sources could not be read, parsed or merged.
    #[display("failed to load configuration")]
    Load,
    /// An explicitly requested configuration file does not exist.
    #[display("configuration file not found: {_0}")]
    Missing(#[error(not(source))] String),
    /// The file extension doesn't name a supported format.
    #[display("unsupported configuration format: {_0} (expected toml, yaml or json)")]
    UnsupportedFormat(#[error(not(source))] String),
    /// Loaded fine, but a value is out of range.
    #[display("invalid configuration: {_0}")]
    Invalid(#[error(not(source))] String),
}
