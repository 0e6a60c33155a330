//! Error types for SonarQube operations

use std::time::Duration;

use thiserror::Error;

/// Result type for SonarQube operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum Error {
    /// Core error (invalid URL, output, config)
    #[error(transparent)]
    Core(#[from] sqblame_core::Error),

    /// Issue search returned a non-success status
    #[error("Issue search failed (HTTP {status}): {body}")]
    IssueFetch { status: u16, body: String },

    /// Issue search rejected the credentials
    #[error(
        "SonarQube rejected the credentials (HTTP {status}). \
         Check SONAR_TOKEN, --token or --user/--password"
    )]
    Unauthorized { status: u16, body: String },

    /// Any other endpoint returned a non-success status
    #[error("{endpoint} failed (HTTP {status}): {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// Response body could not be decoded
    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse { endpoint: String, reason: String },

    /// HTTP client could not be built
    #[error("Failed to create HTTP client: {0}")]
    Client(String),

    /// The whole run took longer than allowed
    #[error("Run exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),
}

impl Error {
    /// Whether the server refused the credentials
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::Unauthorized { .. })
    }
}

/// Why blame could not be fetched for one component
///
/// Never returned from the pipeline; the component just gets no blame.
#[derive(Error, Debug)]
pub enum BlameUnavailable {
    #[error("SCM endpoint returned HTTP {0}")]
    Status(u16),

    #[error("SCM request failed: {0}")]
    Transport(String),

    #[error("Malformed SCM response: {0}")]
    Malformed(String),
}
