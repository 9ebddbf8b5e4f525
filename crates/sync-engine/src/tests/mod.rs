//! Engine tests against an in-memory SQLite store and hand-written fakes.

mod reply;

use bridge_core::{MappingStore, Subscription};
use bridge_database::SqliteMappingStore;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

pub(crate) use fakes::{FakeAnnotationService, RecordingChat};

pub(crate) const GROUP: &str = "g1";
pub(crate) const CHAT: i64 = -1001;
pub(crate) const TOKEN: &str = "tok-1";

/// Minutes after a fixed base instant.
pub(crate) fn t(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
}

pub(crate) async fn store() -> Arc<SqliteMappingStore> {
    Arc::new(SqliteMappingStore::open_in_memory().await.unwrap())
}

pub(crate) async fn subscribe(store: &SqliteMappingStore, group: &str, chat_id: i64, since: DateTime<Utc>) {
    store
        .add_subscription(&Subscription::new(TOKEN, group, chat_id, since))
        .await
        .unwrap();
}
