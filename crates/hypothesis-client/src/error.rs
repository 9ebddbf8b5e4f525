//! Error types for Hypothesis API calls.

use thiserror::Error;

/// Error type for all annotation-service operations.
#[derive(Debug, Error)]
pub enum AnnotationError {
    /// Network or transport-level HTTP error from reqwest.
    ///
    /// Includes connection failures, timeouts, and TLS errors.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-success HTTP status.
    #[error("Hypothesis API error: {status} - {message}")]
    Api {
        /// The HTTP status code.
        status: u16,
        /// The response body, typically containing error details.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The requested annotation does not exist or is not visible to the token.
    #[error("Annotation not found: {0}")]
    NotFound(String),

    /// The request was rejected before being sent.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type alias for annotation-service operations.
pub type AnnotationResult<T> = Result<T, AnnotationError>;
