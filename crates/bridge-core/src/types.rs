//! Core record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Chat identifier on the chat service.
pub type ChatId = i64;

/// Message identifier, unique within one chat.
pub type MessageId = i32;

/// Opaque annotation-service identifier.
pub type AnnotationId = String;

/// One (annotation group, chat) pairing to bridge.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Annotation-service credential scoped to this subscription.
    pub token: String,
    /// Annotation-service group.
    pub group: String,
    /// Target chat.
    pub chat_id: ChatId,
    /// Only annotations updated strictly after this instant are unprocessed.
    pub watermark: DateTime<Utc>,
}

impl Subscription {
    pub fn new(
        token: impl Into<String>,
        group: impl Into<String>,
        chat_id: ChatId,
        watermark: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            group: group.into(),
            chat_id,
            watermark,
        }
    }

    /// The uniqueness key of this subscription.
    pub fn key(&self) -> SubscriptionKey {
        SubscriptionKey {
            group: self.group.clone(),
            chat_id: self.chat_id,
        }
    }
}

// Hand-written so tokens never reach the logs.
impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("group", &self.group)
            .field("chat_id", &self.chat_id)
            .field("watermark", &self.watermark)
            .finish_non_exhaustive()
    }
}

/// Unique key of a [`Subscription`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionKey {
    pub group: String,
    pub chat_id: ChatId,
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.chat_id)
    }
}

/// What a mapping remembers about its annotation, enough to post a reply to it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationMetadata {
    /// Ancestor ids, root first, immediate parent last.
    pub references: Vec<AnnotationId>,
    /// Group the annotation belongs to.
    pub group: String,
    /// Document the annotation is attached to.
    pub document_uri: String,
}

impl AnnotationMetadata {
    pub fn new(
        references: Vec<AnnotationId>,
        group: impl Into<String>,
        document_uri: impl Into<String>,
    ) -> Self {
        Self {
            references,
            group: group.into(),
            document_uri: document_uri.into(),
        }
    }

    /// Reference chain for a reply to the annotation described by `self`,
    /// whose own id is `annotation_id`: the full ancestry, then the annotation.
    pub fn child_references(&self, annotation_id: &str) -> Vec<AnnotationId> {
        let mut refs = Vec::with_capacity(self.references.len() + 1);
        refs.extend(self.references.iter().cloned());
        refs.push(annotation_id.to_string());
        refs
    }
}

/// The annotation side of a mapping, as found from its chat message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedAnnotation {
    pub annotation_id: AnnotationId,
    pub metadata: AnnotationMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn debug_output_hides_token() {
        let sub = Subscription::new(
            "secret-token",
            "grp",
            42,
            Utc.timestamp_opt(1, 0).unwrap(),
        );
        let rendered = format!("{:?}", sub);
        assert!(rendered.contains("grp"));
        assert!(!rendered.contains("secret-token"));
    }

    #[test]
    fn key_display() {
        let sub = Subscription::new("t", "grp", -100, Utc.timestamp_opt(1, 0).unwrap());
        assert_eq!(sub.key().to_string(), "grp:-100");
    }

    #[test]
    fn child_references_appends_parent() {
        let meta = AnnotationMetadata::new(vec!["x".into(), "y".into()], "g", "https://doc");
        assert_eq!(meta.child_references("p"), vec!["x", "y", "p"]);
        // The parent's own chain is untouched.
        assert_eq!(meta.references, vec!["x", "y"]);
    }

    #[test]
    fn child_references_of_root() {
        let meta = AnnotationMetadata::default();
        assert_eq!(meta.child_references("a0"), vec!["a0"]);
    }
}
