use super::*;
use crate::{
    ChatReply, IgnoreReason, Poller, PollerConfig, RepliedMessage, ReplyHandler, ReplyOutcome,
    Shutdown, SyncErrorKind,
};
use bridge_core::AnnotationMetadata;
use std::time::Duration;

const DOC: &str = "https://doc.test/paper";

struct Harness {
    service: FakeAnnotationService,
    store: Arc<SqliteMappingStore>,
    handler: ReplyHandler,
}

async fn harness() -> Harness {
    let service = FakeAnnotationService::new();
    let store = store().await;
    let handler = ReplyHandler::new(Arc::new(service.clone()), store.clone());
    Harness {
        service,
        store,
        handler,
    }
}

impl Harness {
    async fn map(&self, annotation_id: &str, refs: &[&str], message_id: i32) {
        let metadata = AnnotationMetadata::new(
            refs.iter().map(|s| s.to_string()).collect(),
            GROUP,
            DOC,
        );
        self.store
            .create_mapping(annotation_id, &metadata, CHAT, message_id)
            .await
            .unwrap();
    }
}

fn reply_to(message_id: i32, parent: i32) -> ChatReply {
    ChatReply {
        chat_id: CHAT,
        message_id,
        author: "Bob Stone (bob)".to_string(),
        text: "I disagree".to_string(),
        reply_to: Some(RepliedMessage {
            chat_id: CHAT,
            message_id: parent,
        }),
    }
}

#[tokio::test]
async fn reply_to_root_posts_annotation_and_records_mapping() {
    let h = harness().await;
    subscribe(&h.store, GROUP, CHAT, t(0)).await;
    h.map("A0", &[], 1).await;

    let outcome = h.handler.on_reply(&reply_to(2, 1)).await.unwrap();
    let annotation_id = match outcome {
        ReplyOutcome::Bridged { annotation_id } => annotation_id,
        other => panic!("expected a bridged reply, got {:?}", other),
    };

    let replies = h.service.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, "Bob Stone (bob) wrote \"I disagree\"");
    assert_eq!(replies[0].references, vec!["A0"]);
    assert_eq!(replies[0].uri, DOC);
    assert_eq!(replies[0].token, TOKEN);
    assert_eq!(replies[0].group, GROUP);

    assert_eq!(
        h.store.message_id_for(&annotation_id, CHAT).await.unwrap(),
        Some(2)
    );
    let mapped = h.store.annotation_for(CHAT, 2).await.unwrap().unwrap();
    assert_eq!(mapped.annotation_id, annotation_id);
    assert_eq!(
        mapped.metadata,
        AnnotationMetadata::new(vec!["A0".to_string()], GROUP, DOC)
    );
}

#[tokio::test]
async fn reference_chain_grows_by_the_parent() {
    let h = harness().await;
    subscribe(&h.store, GROUP, CHAT, t(0)).await;
    h.map("P", &["x", "y"], 5).await;

    h.handler.on_reply(&reply_to(6, 5)).await.unwrap();

    assert_eq!(h.service.replies()[0].references, vec!["x", "y", "P"]);
    // The parent's stored chain is untouched.
    let parent = h.store.annotation_for(CHAT, 5).await.unwrap().unwrap();
    assert_eq!(parent.metadata.references, vec!["x", "y"]);
}

#[tokio::test]
async fn unrelated_messages_are_ignored() {
    let h = harness().await;
    subscribe(&h.store, GROUP, CHAT, t(0)).await;
    h.map("A0", &[], 1).await;

    let not_a_reply = ChatReply {
        reply_to: None,
        ..reply_to(2, 1)
    };
    assert_eq!(
        h.handler.on_reply(&not_a_reply).await.unwrap(),
        ReplyOutcome::Ignored(IgnoreReason::NotAReply)
    );

    let other_chat = ChatReply {
        reply_to: Some(RepliedMessage {
            chat_id: CHAT + 1,
            message_id: 1,
        }),
        ..reply_to(2, 1)
    };
    assert_eq!(
        h.handler.on_reply(&other_chat).await.unwrap(),
        ReplyOutcome::Ignored(IgnoreReason::DifferentChat)
    );

    assert_eq!(
        h.handler.on_reply(&reply_to(2, 99)).await.unwrap(),
        ReplyOutcome::Ignored(IgnoreReason::UnmappedParent)
    );

    assert!(h.service.replies().is_empty());
}

#[tokio::test]
async fn reply_after_unsubscribe_is_ignored() {
    let h = harness().await;
    subscribe(&h.store, GROUP, CHAT, t(0)).await;
    h.map("A0", &[], 1).await;
    h.store.remove_subscription(CHAT, GROUP).await.unwrap();

    assert_eq!(
        h.handler.on_reply(&reply_to(2, 1)).await.unwrap(),
        ReplyOutcome::Ignored(IgnoreReason::NoSubscription)
    );
    assert!(h.service.replies().is_empty());
}

#[tokio::test]
async fn failed_post_surfaces_error_without_mapping() {
    let h = harness().await;
    subscribe(&h.store, GROUP, CHAT, t(0)).await;
    h.map("A0", &[], 1).await;
    h.service.set_replies_failing(true);

    let err = h.handler.on_reply(&reply_to(2, 1)).await.unwrap_err();
    assert_eq!(err.kind(), SyncErrorKind::TransientIo);
    assert!(h.store.annotation_for(CHAT, 2).await.unwrap().is_none());
}

#[tokio::test]
async fn already_mapped_message_is_a_conflict() {
    let h = harness().await;
    subscribe(&h.store, GROUP, CHAT, t(0)).await;
    h.map("A0", &[], 1).await;
    h.map("A1", &["A0"], 2).await;

    // Message 2 is already bridged, so the new annotation cannot claim it.
    let err = h.handler.on_reply(&reply_to(2, 1)).await.unwrap_err();
    assert_eq!(err.kind(), SyncErrorKind::Conflict);

    let mapped = h.store.annotation_for(CHAT, 2).await.unwrap().unwrap();
    assert_eq!(mapped.annotation_id, "A1");
}

#[tokio::test]
async fn concurrent_poll_does_not_echo_the_reply() {
    let h = harness().await;
    subscribe(&h.store, GROUP, CHAT, t(0)).await;
    h.map("A0", &[], 1).await;
    h.service.set_reply_time(t(5));
    let gate = h.service.install_gate();

    let chat = RecordingChat::new();
    let poller = Poller::new(
        Arc::new(h.service.clone()),
        h.store.clone(),
        Arc::new(chat.clone()),
        PollerConfig::default(),
    );

    let handler = Arc::new(h.handler);
    let reply_task = {
        let handler = handler.clone();
        tokio::spawn(async move { handler.on_reply(&reply_to(2, 1)).await })
    };

    // The reply annotation now exists and is visible to search, but its
    // mapping has not been written yet.
    gate.posted.notified().await;
    let poll_task = tokio::spawn(async move { poller.run_once(&Shutdown::never()).await });

    tokio::time::sleep(Duration::from_millis(30)).await;
    assert!(!poll_task.is_finished(), "poller should wait for the bridge lock");

    gate.release.notify_one();
    let outcome = reply_task.await.unwrap().unwrap();
    poll_task.await.unwrap().unwrap();

    assert!(matches!(outcome, ReplyOutcome::Bridged { .. }));
    assert!(chat.sent().is_empty(), "reply annotation was echoed: {:?}", chat.sent());
    assert_eq!(
        h.store.subscription(CHAT, GROUP).await.unwrap().unwrap().watermark,
        t(5)
    );
}
