//! Storage error types.

use thiserror::Error;

/// Errors surfaced through [`crate::MappingStore`].
///
/// "Not found" on lookups is not an error; lookups return `Option`.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write. Nothing was changed.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// An update targeted a record that does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backing store failed.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wrap any backend error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// Result type alias using StoreError.
pub type StoreResult<T> = Result<T, StoreError>;
