//! Inbound update loop.

use crate::client::TelegramClient;
use crate::error::TelegramResult;
use crate::types::{format_user, Message, Update};
use std::sync::Arc;
use std::time::Duration;
use sync_engine::{ChatReply, RepliedMessage, ReplyHandler, ReplyOutcome, Shutdown};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const RETRY_DELAY: Duration = Duration::from_secs(1);

/// Convert a Bot API message into the engine's inbound event.
/// Non-text messages yield `None`.
pub fn chat_reply_from(message: &Message) -> Option<ChatReply> {
    let text = message.text.as_ref()?;
    Some(ChatReply {
        chat_id: message.chat.id,
        message_id: message.message_id,
        author: format_user(message.from.as_ref()),
        text: text.clone(),
        reply_to: message.reply_to_message.as_ref().map(|parent| RepliedMessage {
            chat_id: parent.chat.id,
            message_id: parent.message_id,
        }),
    })
}

/// Long-polls Telegram and feeds text messages to the reply handler.
pub struct BotRunner {
    client: TelegramClient,
    handler: Arc<ReplyHandler>,
    long_poll: Duration,
}

impl BotRunner {
    pub fn new(client: TelegramClient, handler: Arc<ReplyHandler>, long_poll: Duration) -> Self {
        Self {
            client,
            handler,
            long_poll,
        }
    }

    /// Run until shutdown.
    ///
    /// Fails only if the bot token is rejected at startup. Handlers already
    /// running when shutdown fires are awaited before returning.
    pub async fn run(&self, shutdown: &Shutdown) -> TelegramResult<()> {
        let me = self.client.get_me().await?;
        info!(bot_id = me.id, username = ?me.username, "Starting bot");

        let mut offset = 0;
        let mut handlers = JoinSet::new();

        loop {
            let result = tokio::select! {
                result = self.client.get_updates(offset, self.long_poll) => result,
                _ = shutdown.wait() => break,
            };

            match result {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        self.dispatch(update, &mut handlers);
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to fetch updates; retrying");
                    tokio::select! {
                        _ = tokio::time::sleep(RETRY_DELAY) => {}
                        _ = shutdown.wait() => break,
                    }
                }
            }

            while handlers.try_join_next().is_some() {}
        }

        info!(in_flight = handlers.len(), "Bot stopping");
        while handlers.join_next().await.is_some() {}
        Ok(())
    }

    fn dispatch(&self, update: Update, handlers: &mut JoinSet<()>) {
        let Some(reply) = update.message.as_ref().and_then(chat_reply_from) else {
            debug!(update_id = update.update_id, "Skipping non-text update");
            return;
        };

        let handler = self.handler.clone();
        handlers.spawn(async move {
            match handler.on_reply(&reply).await {
                Ok(ReplyOutcome::Bridged { annotation_id }) => {
                    debug!(annotation_id = %annotation_id, "Chat reply bridged");
                }
                Ok(ReplyOutcome::Ignored(reason)) => {
                    debug!(?reason, chat_id = reply.chat_id, "Chat message ignored");
                }
                Err(e) => {
                    warn!(
                        chat_id = reply.chat_id,
                        message_id = reply.message_id,
                        kind = ?e.kind(),
                        error = %e,
                        "Failed to bridge chat reply"
                    );
                }
            }
        });
    }
}
