//! Error types for decoding server payloads.

use thiserror::Error;

/// Result type for model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised when a payload does not have the expected shape.
#[derive(Error, Debug)]
pub enum ModelError {
    /// The body was not valid JSON.
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),

    /// The body was JSON but neither a list nor an object wrapping one.
    #[error("expected a list, got {found}")]
    NotAList {
        /// JSON type that was found instead.
        found: &'static str,
    },

    /// One element of a list did not decode into the target type.
    #[error("item {index}: {source}")]
    Item {
        /// Position of the element in the normalised list.
        index: usize,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}
