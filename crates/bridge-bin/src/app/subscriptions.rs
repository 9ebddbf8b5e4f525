//! Administrative subscription commands.

use bridge_core::{ChatId, MappingStore, StoreError, Subscription};
use bridge_database::SqliteMappingStore;
use chrono::{DateTime, Utc};
use std::path::Path;
use tracing::info;

type AppResult<T> = Result<T, Box<dyn std::error::Error>>;

async fn open_store(db_path: &Path) -> AppResult<SqliteMappingStore> {
    SqliteMappingStore::open(db_path)
        .await
        .map_err(|e| format!("Failed to open database {}: {}", db_path.display(), e).into())
}

/// Add a subscription. Fails if the chat is already subscribed to the group.
pub async fn subscribe(
    db_path: &Path,
    token: String,
    group: String,
    chat_id: ChatId,
    watermark: DateTime<Utc>,
) -> AppResult<Subscription> {
    if token.trim().is_empty() {
        return Err("Hypothesis token must not be empty".into());
    }
    if group.trim().is_empty() {
        return Err("Group must not be empty".into());
    }
    if chat_id == 0 {
        return Err("Chat id must not be 0".into());
    }

    let store = open_store(db_path).await?;
    let subscription = Subscription::new(token, group, chat_id, watermark);

    match store.add_subscription(&subscription).await {
        Ok(()) => {
            info!(subscription = %subscription.key(), %watermark, "Subscription added");
            Ok(subscription)
        }
        Err(StoreError::AlreadyExists(_)) => Err(format!(
            "Chat {} is already subscribed to group {}",
            chat_id, subscription.group
        )
        .into()),
        Err(e) => Err(e.into()),
    }
}

/// Remove a subscription. Returns whether one existed.
pub async fn unsubscribe(db_path: &Path, group: &str, chat_id: ChatId) -> AppResult<bool> {
    let store = open_store(db_path).await?;
    let removed = store.remove_subscription(chat_id, group).await?;
    if removed {
        info!(group, chat_id, "Subscription removed");
    }
    Ok(removed)
}

pub async fn list_subscriptions(db_path: &Path) -> AppResult<Vec<Subscription>> {
    let store = open_store(db_path).await?;
    Ok(store.subscriptions().await?)
}

/// One-line summary with the token redacted.
pub fn describe_subscription(subscription: &Subscription) -> String {
    format!(
        "group={} chat={} after={} token={}",
        subscription.group,
        subscription.chat_id,
        subscription.watermark.to_rfc3339(),
        redact(&subscription.token)
    )
}

fn redact(token: &str) -> String {
    let prefix: String = token.chars().take(4).collect();
    if token.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{}****", prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    fn since() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_subscribe_then_list() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("hypogram.sqlite");

        subscribe(&db, "6879-secret".into(), "g1".into(), -1001, since())
            .await
            .unwrap();

        let subscriptions = list_subscriptions(&db).await.unwrap();
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].group, "g1");
        assert_eq!(subscriptions[0].chat_id, -1001);
        assert_eq!(subscriptions[0].watermark, since());
    }

    #[tokio::test]
    async fn test_duplicate_subscribe_fails_and_keeps_original() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("hypogram.sqlite");

        subscribe(&db, "first".into(), "g1".into(), 7, since())
            .await
            .unwrap();
        let err = subscribe(&db, "second".into(), "g1".into(), 7, Utc::now())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already subscribed"));

        let subscriptions = list_subscriptions(&db).await.unwrap();
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].token, "first");
        assert_eq!(subscriptions[0].watermark, since());
    }

    #[tokio::test]
    async fn test_unsubscribe_reports_whether_removed() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("hypogram.sqlite");

        subscribe(&db, "tok".into(), "g1".into(), 7, since())
            .await
            .unwrap();

        assert!(unsubscribe(&db, "g1", 7).await.unwrap());
        assert!(!unsubscribe(&db, "g1", 7).await.unwrap());
        assert!(list_subscriptions(&db).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_rejects_missing_fields() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("hypogram.sqlite");

        let err = subscribe(&db, " ".into(), "g1".into(), 7, since())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("token"));
        let err = subscribe(&db, "tok".into(), "".into(), 7, since())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Group"));
        let err = subscribe(&db, "tok".into(), "g1".into(), 0, since())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Chat id"));

        assert!(!db.exists());
    }

    #[test]
    fn test_describe_redacts_token() {
        let subscription = Subscription::new("6879-abcdefghijkl", "g1", -1001, since());
        let line = describe_subscription(&subscription);

        assert!(line.contains("group=g1"));
        assert!(line.contains("chat=-1001"));
        assert!(line.contains("token=6879****"));
        assert!(!line.contains("abcdefghijkl"));
    }

    #[test]
    fn test_short_token_fully_redacted() {
        assert_eq!(redact("abc"), "****");
        assert_eq!(redact(""), "****");
    }
}
