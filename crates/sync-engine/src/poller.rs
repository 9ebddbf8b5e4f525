//! Subscription-driven poller.

use crate::text::{annotation_link, reply_message_text, root_message_text};
use crate::{ChatSender, Shutdown, SyncError, SyncResult};
use bridge_core::{AnnotationMetadata, ChatId, MappingStore, MessageId, Subscription};
use hypothesis_client::{Annotation, AnnotationClient, AnnotationClientFactory};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Poller tuning.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Sleep between cycles.
    pub interval: Duration,
    /// Most unmapped ancestors materialized for a single annotation.
    pub max_ancestor_depth: usize,
    /// Share-link prefix; the annotation id is appended.
    pub link_base: String,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_ancestor_depth: 64,
            link_base: "https://hypothes.is/a/".to_string(),
        }
    }
}

/// Pulls new annotations for every subscription and posts them to the chat.
pub struct Poller {
    annotations: Arc<dyn AnnotationClientFactory>,
    store: Arc<dyn MappingStore>,
    chat: Arc<dyn ChatSender>,
    config: PollerConfig,
}

impl Poller {
    pub fn new(
        annotations: Arc<dyn AnnotationClientFactory>,
        store: Arc<dyn MappingStore>,
        chat: Arc<dyn ChatSender>,
        config: PollerConfig,
    ) -> Self {
        Self {
            annotations,
            store,
            chat,
            config,
        }
    }

    /// Poll until shutdown. Returns the reason it stopped, which is always
    /// [`SyncError::Cancelled`].
    pub async fn run(&self, shutdown: &Shutdown) -> SyncError {
        info!(interval_secs = self.config.interval.as_secs(), "Poller started");
        loop {
            if shutdown.is_triggered() {
                break;
            }

            if let Err(e) = self.run_once(shutdown).await {
                debug!(error = %e, "Poll cycle finished with errors");
            }

            debug!("Sleeping until next poll cycle");
            tokio::select! {
                _ = tokio::time::sleep(self.config.interval) => {}
                _ = shutdown.wait() => break,
            }
        }
        info!("Poller stopped");
        SyncError::Cancelled
    }

    /// One pass over every subscription.
    ///
    /// A failing subscription is logged and skipped; the others still run.
    /// Returns the last error seen, if any.
    pub async fn run_once(&self, shutdown: &Shutdown) -> SyncResult<()> {
        let subscriptions = self.store.subscriptions().await.map_err(|e| {
            warn!(error = %e, "Failed to list subscriptions");
            SyncError::from(e)
        })?;
        info!(count = subscriptions.len(), "Starting poll cycle");

        let total = subscriptions.len();
        let mut last_error = None;
        for (i, sub) in subscriptions.into_iter().enumerate() {
            let key = sub.key();
            debug!(subscription = %key, "[{}/{}] Polling subscription", i + 1, total);

            match self.handle_subscription(sub, shutdown).await {
                Ok(()) => {}
                Err(SyncError::Cancelled) => return Err(SyncError::Cancelled),
                Err(e) => {
                    warn!(
                        subscription = %key,
                        kind = ?e.kind(),
                        error = %e,
                        "Abandoning subscription for this cycle"
                    );
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Bridge everything updated after the subscription's watermark, advancing
    /// and persisting the watermark after each annotation.
    async fn handle_subscription(&self, mut sub: Subscription, shutdown: &Shutdown) -> SyncResult<()> {
        let client = self.annotations.client(&sub.token, &sub.group);

        loop {
            if shutdown.is_triggered() {
                return Err(SyncError::Cancelled);
            }

            let batch = client.annotations_after(sub.watermark).await?;
            debug!(subscription = %sub.key(), count = batch.len(), "Fetched annotations");
            if batch.is_empty() {
                return Ok(());
            }

            let start = sub.watermark;
            let total = batch.len();
            for (i, annot) in batch.iter().enumerate() {
                debug!(annotation_id = %annot.id, "Annotation [{}/{}]", i + 1, total);
                let Some(updated) = annot.updated else {
                    return Err(SyncError::malformed(&annot.id, "no update timestamp"));
                };

                self.bridge_annotation(client.as_ref(), annot, sub.chat_id, shutdown)
                    .await?;

                if updated > sub.watermark {
                    sub.watermark = updated;
                    self.store.update_subscription(&sub).await?;
                }
            }

            if sub.watermark == start {
                // The service keeps returning rows at or before the watermark.
                warn!(subscription = %sub.key(), "Search made no progress; stopping");
                return Ok(());
            }
        }
    }

    /// Make sure `annot` and all of its ancestors have chat messages.
    ///
    /// Walks up the reference chain until it reaches an ancestor that is
    /// already mapped (or the thread root), then posts the unmapped ones
    /// top-down so each message threads under its predecessor. Returns the
    /// message id for `annot`.
    pub async fn bridge_annotation(
        &self,
        client: &dyn AnnotationClient,
        annot: &Annotation,
        chat_id: ChatId,
        shutdown: &Shutdown,
    ) -> SyncResult<MessageId> {
        if annot.id.is_empty() {
            return Err(SyncError::malformed(&annot.id, "no id"));
        }
        if let Some(message_id) = self.store.message_id_for(&annot.id, chat_id).await? {
            debug!(annotation_id = %annot.id, chat_id, message_id, "Annotation already in chat");
            return Ok(message_id);
        }

        // Unmapped ancestors, nearest first.
        let mut ancestors: Vec<Annotation> = Vec::new();
        let mut on_chain: HashSet<String> = HashSet::from([annot.id.clone()]);
        let mut parent_message = None;
        let mut next = annot.parent_id().map(str::to_string);

        while let Some(parent_id) = next.take() {
            if let Some(message_id) = self.store.message_id_for(&parent_id, chat_id).await? {
                parent_message = Some(message_id);
                break;
            }
            if !on_chain.insert(parent_id.clone()) {
                return Err(SyncError::malformed(
                    &annot.id,
                    format!("reference cycle through {}", parent_id),
                ));
            }
            if ancestors.len() >= self.config.max_ancestor_depth {
                return Err(SyncError::malformed(
                    &annot.id,
                    format!(
                        "more than {} unmapped ancestors",
                        self.config.max_ancestor_depth
                    ),
                ));
            }
            if shutdown.is_triggered() {
                return Err(SyncError::Cancelled);
            }

            debug!(annotation_id = %annot.id, ancestor = %parent_id, "Fetching unmapped ancestor");
            let parent = client.annotation(&parent_id).await?;
            next = parent.parent_id().map(str::to_string);
            ancestors.push(parent);
        }

        if !ancestors.is_empty() {
            info!(
                annotation_id = %annot.id,
                count = ancestors.len(),
                "Posting unmapped ancestors first"
            );
        }
        while let Some(ancestor) = ancestors.pop() {
            parent_message = Some(self.post(&ancestor, chat_id, parent_message, shutdown).await?);
        }
        self.post(annot, chat_id, parent_message, shutdown).await
    }

    /// Send one annotation to the chat and record the mapping.
    async fn post(
        &self,
        annot: &Annotation,
        chat_id: ChatId,
        parent_message: Option<MessageId>,
        shutdown: &Shutdown,
    ) -> SyncResult<MessageId> {
        if shutdown.is_triggered() {
            return Err(SyncError::Cancelled);
        }

        let link = annotation_link(&self.config.link_base, &annot.id);
        let message_id = match parent_message {
            None => {
                let selection = annot.quote().unwrap_or_else(|| {
                    warn!(annotation_id = %annot.id, "No text quote selector");
                    ""
                });
                let text = root_message_text(&annot.user, &annot.text, selection, &link);
                self.chat.send(chat_id, &text).await?
            }
            Some(parent) => {
                let text = reply_message_text(&annot.user, &annot.text, &link);
                self.chat.send_reply(chat_id, parent, &text).await?
            }
        };

        let metadata = AnnotationMetadata::new(
            annot.references.clone(),
            annot.group.clone(),
            annot.uri.clone(),
        );
        self.store
            .create_mapping(&annot.id, &metadata, chat_id, message_id)
            .await?;

        info!(
            annotation_id = %annot.id,
            chat_id,
            message_id,
            reply_to = ?parent_message,
            "Bridged annotation to chat"
        );
        Ok(message_id)
    }
}
