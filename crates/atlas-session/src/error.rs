//! Error types for atlas-session

use thiserror::Error;

/// Result type alias using atlas-session Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during session operations
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the wire/transport layer
    #[error(transparent)]
    Stream(#[from] atlas_stream::Error),

    /// A persistence gateway failure (string-based; stores are external)
    #[error("Store error: {0}")]
    Store(String),

    /// A generic session error
    #[error("{0}")]
    Other(String),
}
