//! Error types for the termsync engine.

use std::time::Duration;
use termsync_model::ModelError;
use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Number of body characters kept in error diagnostics.
pub const BODY_PREVIEW_CHARS: usize = 300;

/// Errors that stop a run.
#[derive(Error, Debug)]
pub enum Error {
    /// The request never produced an HTTP response.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The server answered with a non-success status.
    #[error("{endpoint} HTTP {status}. Body: {body}")]
    Http {
        /// Which call failed.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Start of the response body.
        body: String,
    },

    /// A response body did not have the expected shape.
    #[error("{endpoint} returned an unexpected body: {source}")]
    Decode {
        /// Which call returned the body.
        endpoint: String,
        /// Underlying shape error.
        #[source]
        source: ModelError,
    },

    /// A request body could not be encoded.
    #[error("failed to encode request: {0}")]
    Encode(#[from] serde_json::Error),

    /// A bulk submission was accepted but no job id could be found.
    #[error(
        "no bulkChangeId found. status={status}, Content-Type={}, Location={}, Body preview={body}",
        .content_type.as_deref().unwrap_or(""),
        .location.as_deref().unwrap_or("None")
    )]
    MissingJobId {
        /// HTTP status code.
        status: u16,
        /// Response content type.
        content_type: Option<String>,
        /// Response `Location` header.
        location: Option<String>,
        /// Start of the response body.
        body: String,
    },

    /// A job did not reach a terminal state within the configured wait.
    #[error("bulk job {job_id} still running after {waited:?}")]
    PollTimeout {
        /// Job identifier.
        job_id: String,
        /// Time spent waiting between polls.
        waited: Duration,
    },

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport { retryable, .. } => *retryable,
            Error::Http { status, .. } => matches!(*status, 502..=504),
            _ => false,
        }
    }
}

/// Truncates a body to [`BODY_PREVIEW_CHARS`] characters for diagnostics.
pub fn body_preview(body: &[u8]) -> String {
    String::from_utf8_lossy(body)
        .chars()
        .take(BODY_PREVIEW_CHARS)
        .collect()
}
