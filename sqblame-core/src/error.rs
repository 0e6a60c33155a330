//! Error types for sqblame

use thiserror::Error;

/// Result type alias for sqblame core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sqblame core operations
#[derive(Error, Debug)]
pub enum Error {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The issue-browser URL has no usable scheme/host
    #[error("Invalid issues URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
