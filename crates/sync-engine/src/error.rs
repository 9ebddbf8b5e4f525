//! Sync engine errors.

use crate::ChatError;
use bridge_core::StoreError;
use hypothesis_client::AnnotationError;
use thiserror::Error;

/// Errors from a poll cycle or a reply.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("annotation service error: {0}")]
    Annotations(#[from] AnnotationError),

    #[error("chat error: {0}")]
    Chat(#[from] ChatError),

    /// The annotation data cannot be bridged as-is. Not retried within a cycle.
    #[error("malformed annotation {annotation_id}: {reason}")]
    Malformed {
        annotation_id: String,
        reason: String,
    },

    /// Shutdown was observed.
    #[error("shutdown requested")]
    Cancelled,
}

/// Coarse classification used for logging and by callers deciding whether a
/// retry on the next trigger can help.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncErrorKind {
    /// Network or store failure. The next poll cycle or event retries.
    TransientIo,
    /// Missing fields, over-deep or cyclic reference chains.
    Malformed,
    /// A mapping for this annotation or message already exists.
    Conflict,
    Cancelled,
}

impl SyncError {
    pub(crate) fn malformed(annotation_id: &str, reason: impl Into<String>) -> Self {
        SyncError::Malformed {
            annotation_id: annotation_id.to_string(),
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> SyncErrorKind {
        match self {
            SyncError::Store(StoreError::AlreadyExists(_)) => SyncErrorKind::Conflict,
            SyncError::Store(_) => SyncErrorKind::TransientIo,
            SyncError::Annotations(AnnotationError::NotFound(_))
            | SyncError::Annotations(AnnotationError::InvalidRequest(_)) => {
                SyncErrorKind::Malformed
            }
            SyncError::Annotations(_) | SyncError::Chat(_) => SyncErrorKind::TransientIo,
            SyncError::Malformed { .. } => SyncErrorKind::Malformed,
            SyncError::Cancelled => SyncErrorKind::Cancelled,
        }
    }
}

/// Result type alias using SyncError.
pub type SyncResult<T> = Result<T, SyncError>;
