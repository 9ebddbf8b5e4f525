//! Chat reply → annotation reply.

use crate::text::chat_reply_annotation_text;
use crate::{SyncError, SyncResult};
use bridge_core::{AnnotationMetadata, ChatId, MappingStore, MessageId};
use hypothesis_client::AnnotationClientFactory;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// An inbound chat text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatReply {
    pub chat_id: ChatId,
    pub message_id: MessageId,
    /// Display name of the sender.
    pub author: String,
    pub text: String,
    /// The message this one replies to, if any.
    pub reply_to: Option<RepliedMessage>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepliedMessage {
    pub chat_id: ChatId,
    pub message_id: MessageId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// A reply annotation was posted and mapped to the chat message.
    Bridged { annotation_id: String },
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NotAReply,
    /// The replied-to message lives in another chat.
    DifferentChat,
    /// The replied-to message was not bridged from an annotation.
    UnmappedParent,
    /// The chat is no longer subscribed to the parent's group.
    NoSubscription,
}

/// Turns chat replies to bridged messages into annotation replies.
pub struct ReplyHandler {
    annotations: Arc<dyn AnnotationClientFactory>,
    store: Arc<dyn MappingStore>,
}

impl ReplyHandler {
    pub fn new(annotations: Arc<dyn AnnotationClientFactory>, store: Arc<dyn MappingStore>) -> Self {
        Self { annotations, store }
    }

    /// Handle one inbound chat message.
    ///
    /// Failures are returned to the caller; a failed annotation post leaves no
    /// mapping behind.
    pub async fn on_reply(&self, reply: &ChatReply) -> SyncResult<ReplyOutcome> {
        debug!(
            chat_id = reply.chat_id,
            message_id = reply.message_id,
            "Handling chat message"
        );

        let Some(parent) = reply.reply_to else {
            debug!("Ignoring message which is not a reply");
            return Ok(ReplyOutcome::Ignored(IgnoreReason::NotAReply));
        };
        if parent.chat_id != reply.chat_id {
            debug!("Ignoring reply to a message in another chat");
            return Ok(ReplyOutcome::Ignored(IgnoreReason::DifferentChat));
        }

        let Some(mapped) = self
            .store
            .annotation_for(reply.chat_id, parent.message_id)
            .await?
        else {
            debug!(parent_message_id = parent.message_id, "Ignoring reply to non-annotation message");
            return Ok(ReplyOutcome::Ignored(IgnoreReason::UnmappedParent));
        };

        let Some(sub) = self
            .store
            .subscription(reply.chat_id, &mapped.metadata.group)
            .await?
        else {
            // Possible once a subscription is removed.
            debug!(group = %mapped.metadata.group, "Ignoring reply in chat without subscription");
            return Ok(ReplyOutcome::Ignored(IgnoreReason::NoSubscription));
        };

        let references = mapped.metadata.child_references(&mapped.annotation_id);
        let document_uri = mapped.metadata.document_uri;
        let text = chat_reply_annotation_text(&reply.author, &reply.text);

        // Held until the mapping is written so the poller cannot bridge the
        // new annotation back into the chat.
        let _guard = self.store.lock().await;

        let annotation_id = self
            .annotations
            .client(&sub.token, &sub.group)
            .reply(&text, &references, &document_uri)
            .await
            .map_err(|e| {
                warn!(parent = %mapped.annotation_id, error = %e, "Failed to post annotation reply");
                SyncError::from(e)
            })?;

        let metadata = AnnotationMetadata::new(references, sub.group.clone(), document_uri);
        self.store
            .create_mapping(&annotation_id, &metadata, reply.chat_id, reply.message_id)
            .await
            .map_err(|e| {
                warn!(annotation_id = %annotation_id, error = %e, "Failed to record annotation for chat reply");
                SyncError::from(e)
            })?;

        info!(
            annotation_id = %annotation_id,
            parent = %mapped.annotation_id,
            chat_id = reply.chat_id,
            message_id = reply.message_id,
            "Bridged chat reply to annotation"
        );
        Ok(ReplyOutcome::Bridged { annotation_id })
    }
}
