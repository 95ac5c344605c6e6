//! Error types for atlas-stream

use thiserror::Error;

/// Result type alias using atlas-stream Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the analysis service
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Service returned a non-success status
    #[error("API error: {status}: {message}")]
    Api { status: u16, message: String },
}

impl Error {
    /// Create an API error from a status code and body text
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }
}
