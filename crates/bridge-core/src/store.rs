//! The mapping-store contract.

use crate::{
    AnnotationMetadata, BridgeLockGuard, ChatId, MappedAnnotation, MessageId, StoreResult,
    Subscription,
};
use async_trait::async_trait;

/// Persistent storage for subscriptions and annotation↔message mappings.
///
/// Every method is atomic on its own. Cross-call atomicity is only available
/// through [`MappingStore::lock`].
#[async_trait]
pub trait MappingStore: Send + Sync {
    // ========================================================================
    // Mappings
    // ========================================================================

    /// Message bridged from `annotation_id` in `chat_id`, if any.
    ///
    /// Waits for the bridge lock to be free before reading, so a mapping being
    /// recorded under the lock is visible once this returns.
    async fn message_id_for(
        &self,
        annotation_id: &str,
        chat_id: ChatId,
    ) -> StoreResult<Option<MessageId>>;

    /// Annotation bridged to or from `message_id` in `chat_id`, if any.
    async fn annotation_for(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> StoreResult<Option<MappedAnnotation>>;

    /// Record a new mapping.
    ///
    /// Fails with [`crate::StoreError::AlreadyExists`] when either
    /// (annotation, chat) or (chat, message) is already mapped; the store is
    /// left unchanged in that case. Does not take the bridge lock, so it may
    /// be called while holding it.
    async fn create_mapping(
        &self,
        annotation_id: &str,
        metadata: &AnnotationMetadata,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> StoreResult<()>;

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Add a subscription. Fails with `AlreadyExists` on a duplicate
    /// (group, chat) pair.
    async fn add_subscription(&self, subscription: &Subscription) -> StoreResult<()>;

    /// Snapshot of all subscriptions.
    async fn subscriptions(&self) -> StoreResult<Vec<Subscription>>;

    /// The subscription for (chat, group), if any.
    async fn subscription(&self, chat_id: ChatId, group: &str)
        -> StoreResult<Option<Subscription>>;

    /// Persist the token and watermark of an existing subscription, located by
    /// its (group, chat) key. Fails with `NotFound` if it was removed.
    async fn update_subscription(&self, subscription: &Subscription) -> StoreResult<()>;

    /// Delete a subscription. Returns whether one was removed.
    async fn remove_subscription(&self, chat_id: ChatId, group: &str) -> StoreResult<bool>;

    // ========================================================================
    // Coordination
    // ========================================================================

    /// Take the store-wide bridge lock. Dropping the guard releases it.
    async fn lock(&self) -> BridgeLockGuard;
}
