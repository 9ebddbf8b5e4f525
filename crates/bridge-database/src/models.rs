//! Row models.

use bridge_core::{AnnotationMetadata, ChatId, MappedAnnotation, MessageId};
use serde::{Deserialize, Serialize};

/// A row of `annotation_messages` joined with its document URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationMessage {
    pub annotation_id: String,
    pub references: Vec<String>,
    pub group: String,
    pub document_uri: String,
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

impl AnnotationMessage {
    /// The annotation side of this mapping.
    pub fn into_mapped(self) -> MappedAnnotation {
        MappedAnnotation {
            annotation_id: self.annotation_id,
            metadata: AnnotationMetadata {
                references: self.references,
                group: self.group,
                document_uri: self.document_uri,
            },
        }
    }
}

/// Input for inserting a mapping.
#[derive(Debug, Clone)]
pub struct NewAnnotationMessage<'a> {
    pub annotation_id: &'a str,
    pub metadata: &'a AnnotationMetadata,
    pub chat_id: ChatId,
    pub message_id: MessageId,
}
