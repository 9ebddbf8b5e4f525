//! Outbound chat seam.

use async_trait::async_trait;
use bridge_core::{ChatId, MessageId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// The request never got a usable answer.
    #[error("chat transport error: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The chat service answered and refused.
    #[error("chat service rejected request: {0}")]
    Rejected(String),
}

impl ChatError {
    pub fn transport<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        ChatError::Transport(Box::new(err))
    }
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Posts messages into a chat.
#[async_trait]
pub trait ChatSender: Send + Sync {
    /// Post a top-level message.
    async fn send(&self, chat_id: ChatId, text: &str) -> ChatResult<MessageId>;

    /// Post a message threaded under `parent`.
    async fn send_reply(
        &self,
        chat_id: ChatId,
        parent: MessageId,
        text: &str,
    ) -> ChatResult<MessageId>;
}
