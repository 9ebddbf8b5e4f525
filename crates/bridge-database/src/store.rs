//! SQLite-backed [`MappingStore`].

use crate::{queries, AsyncDatabase, DatabaseResult, NewAnnotationMessage};
use async_trait::async_trait;
use bridge_core::{
    AnnotationMetadata, BridgeLock, BridgeLockGuard, ChatId, MappedAnnotation, MappingStore,
    MessageId, StoreError, StoreResult, Subscription,
};
use std::path::Path;

/// Mapping store over an [`AsyncDatabase`], plus the process-wide bridge lock.
///
/// Clones share the same database and the same lock.
#[derive(Debug, Clone)]
pub struct SqliteMappingStore {
    db: AsyncDatabase,
    lock: BridgeLock,
}

impl SqliteMappingStore {
    pub fn new(db: AsyncDatabase) -> Self {
        Self {
            db,
            lock: BridgeLock::new(),
        }
    }

    /// Open (and migrate) the database file at `path`.
    pub async fn open(path: &Path) -> DatabaseResult<Self> {
        Ok(Self::new(AsyncDatabase::open(path).await?))
    }

    /// Fresh in-memory store.
    pub async fn open_in_memory() -> DatabaseResult<Self> {
        Ok(Self::new(AsyncDatabase::open_in_memory().await?))
    }
}

#[async_trait]
impl MappingStore for SqliteMappingStore {
    async fn message_id_for(
        &self,
        annotation_id: &str,
        chat_id: ChatId,
    ) -> StoreResult<Option<MessageId>> {
        self.lock.wait_unlocked().await;

        let annotation_id = annotation_id.to_string();
        let id = self
            .db
            .call(move |conn| queries::get_message_id(conn, &annotation_id, chat_id))
            .await?;
        Ok(id)
    }

    async fn annotation_for(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> StoreResult<Option<MappedAnnotation>> {
        let row = self
            .db
            .call(move |conn| queries::get_annotation_message(conn, chat_id, message_id))
            .await?;
        Ok(row.map(|r| r.into_mapped()))
    }

    async fn create_mapping(
        &self,
        annotation_id: &str,
        metadata: &AnnotationMetadata,
        chat_id: ChatId,
        message_id: MessageId,
    ) -> StoreResult<()> {
        let annotation_id = annotation_id.to_string();
        let metadata = metadata.clone();
        self.db
            .call(move |conn| {
                queries::insert_annotation_message(
                    conn,
                    &NewAnnotationMessage {
                        annotation_id: &annotation_id,
                        metadata: &metadata,
                        chat_id,
                        message_id,
                    },
                )
            })
            .await?;
        Ok(())
    }

    async fn add_subscription(&self, subscription: &Subscription) -> StoreResult<()> {
        let sub = subscription.clone();
        self.db
            .call(move |conn| queries::insert_subscription(conn, &sub))
            .await?;
        Ok(())
    }

    async fn subscriptions(&self) -> StoreResult<Vec<Subscription>> {
        Ok(self.db.call(queries::list_subscriptions).await?)
    }

    async fn subscription(
        &self,
        chat_id: ChatId,
        group: &str,
    ) -> StoreResult<Option<Subscription>> {
        let group = group.to_string();
        Ok(self
            .db
            .call(move |conn| queries::get_subscription(conn, chat_id, &group))
            .await?)
    }

    async fn update_subscription(&self, subscription: &Subscription) -> StoreResult<()> {
        let sub = subscription.clone();
        let key = sub.key();
        let changed = self
            .db
            .call(move |conn| queries::update_subscription(conn, &sub))
            .await?;
        if changed == 0 {
            return Err(StoreError::NotFound(format!("subscription {}", key)));
        }
        Ok(())
    }

    async fn remove_subscription(&self, chat_id: ChatId, group: &str) -> StoreResult<bool> {
        let group = group.to_string();
        Ok(self
            .db
            .call(move |conn| queries::delete_subscription(conn, chat_id, &group))
            .await?)
    }

    async fn lock(&self) -> BridgeLockGuard {
        self.lock.acquire().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use std::time::Duration;

    fn meta(refs: &[&str]) -> AnnotationMetadata {
        AnnotationMetadata::new(
            refs.iter().map(|s| s.to_string()).collect(),
            "grp",
            "https://doc.test/page",
        )
    }

    #[tokio::test]
    async fn test_mapping_is_visible_both_ways() {
        let store = SqliteMappingStore::open_in_memory().await.unwrap();
        store.create_mapping("a1", &meta(&["a0"]), 9, 77).await.unwrap();

        assert_eq!(store.message_id_for("a1", 9).await.unwrap(), Some(77));
        let mapped = store.annotation_for(9, 77).await.unwrap().unwrap();
        assert_eq!(mapped.annotation_id, "a1");
        assert_eq!(mapped.metadata, meta(&["a0"]));
    }

    #[tokio::test]
    async fn test_duplicate_mapping_is_rejected_and_store_unchanged() {
        let store = SqliteMappingStore::open_in_memory().await.unwrap();
        store.create_mapping("a1", &meta(&[]), 9, 77).await.unwrap();

        let same_annotation = store.create_mapping("a1", &meta(&[]), 9, 78).await;
        assert!(matches!(same_annotation, Err(StoreError::AlreadyExists(_))));

        let same_message = store.create_mapping("a2", &meta(&[]), 9, 77).await;
        assert!(matches!(same_message, Err(StoreError::AlreadyExists(_))));

        assert_eq!(store.message_id_for("a1", 9).await.unwrap(), Some(77));
        assert_eq!(store.message_id_for("a2", 9).await.unwrap(), None);
        assert!(store.annotation_for(9, 78).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_same_annotation_in_two_chats() {
        let store = SqliteMappingStore::open_in_memory().await.unwrap();
        store.create_mapping("a1", &meta(&[]), 1, 5).await.unwrap();
        store.create_mapping("a1", &meta(&[]), 2, 5).await.unwrap();

        assert_eq!(store.message_id_for("a1", 1).await.unwrap(), Some(5));
        assert_eq!(store.message_id_for("a1", 2).await.unwrap(), Some(5));
    }

    #[tokio::test]
    async fn test_subscription_lifecycle() {
        let store = SqliteMappingStore::open_in_memory().await.unwrap();
        let mut sub = Subscription::new("tok", "grp", 4, Utc.timestamp_opt(1_700_000_000, 0).unwrap());

        store.add_subscription(&sub).await.unwrap();
        assert!(matches!(
            store.add_subscription(&sub).await,
            Err(StoreError::AlreadyExists(_))
        ));

        sub.watermark = sub.watermark + chrono::Duration::seconds(30);
        store.update_subscription(&sub).await.unwrap();
        assert_eq!(store.subscription(4, "grp").await.unwrap(), Some(sub.clone()));
        assert_eq!(store.subscriptions().await.unwrap(), vec![sub.clone()]);

        assert!(store.remove_subscription(4, "grp").await.unwrap());
        assert!(matches!(
            store.update_subscription(&sub).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(store.subscriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lookup_waits_for_locked_write() {
        let store = Arc::new(SqliteMappingStore::open_in_memory().await.unwrap());
        let guard = store.lock().await;

        let lookup = {
            let store = store.clone();
            tokio::spawn(async move { store.message_id_for("r1", 3).await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!lookup.is_finished());

        // create_mapping must not need the lock, or this would deadlock.
        store.create_mapping("r1", &meta(&["a0"]), 3, 11).await.unwrap();
        drop(guard);

        assert_eq!(lookup.await.unwrap().unwrap(), Some(11));
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hypogram.sqlite");

        {
            let store = SqliteMappingStore::open(&path).await.unwrap();
            store.create_mapping("a1", &meta(&[]), 1, 2).await.unwrap();
        }

        let store = SqliteMappingStore::open(&path).await.unwrap();
        assert_eq!(store.message_id_for("a1", 1).await.unwrap(), Some(2));
    }
}
