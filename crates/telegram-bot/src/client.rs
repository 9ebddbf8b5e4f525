//! Bot API client.

use crate::error::{TelegramError, TelegramResult};
use crate::types::{
    ApiResponse, GetUpdatesRequest, Message, ReplyParameters, SendMessageRequest, Update, User,
};
use async_trait::async_trait;
use bridge_core::{ChatId, MessageId};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use sync_engine::{ChatResult, ChatSender};
use tracing::{debug, warn};

/// Timeout for ordinary calls. Long polls add their own wait on top.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct TelegramClient {
    http_client: reqwest::Client,
    api_url: String,
    token: String,
}

impl TelegramClient {
    /// Create a client for the Bot API rooted at `api_url`
    /// (e.g. `https://api.telegram.org`).
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> TelegramResult<Self> {
        let http_client = reqwest::Client::builder()
            .build()
            .map_err(TelegramError::http)?;
        Ok(Self {
            http_client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    /// The bot's own account. Fails on a bad token.
    pub async fn get_me(&self) -> TelegramResult<User> {
        self.call("getMe", &serde_json::json!({}), REQUEST_TIMEOUT).await
    }

    /// Long-poll for message updates with id >= `offset`.
    pub async fn get_updates(&self, offset: i64, long_poll: Duration) -> TelegramResult<Vec<Update>> {
        let request = GetUpdatesRequest {
            offset,
            timeout: long_poll.as_secs(),
            allowed_updates: vec!["message"],
        };
        self.call("getUpdates", &request, REQUEST_TIMEOUT + long_poll)
            .await
    }

    /// Send `text` to `chat_id`, optionally as a reply to `reply_to`.
    pub async fn send_message(
        &self,
        chat_id: ChatId,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> TelegramResult<Message> {
        let request = SendMessageRequest {
            chat_id,
            text,
            reply_parameters: reply_to.map(|message_id| ReplyParameters { message_id }),
        };
        let message: Message = self.call("sendMessage", &request, REQUEST_TIMEOUT).await?;
        debug!(
            chat_id,
            message_id = message.message_id,
            reply_to = ?reply_to,
            "Sent chat message"
        );
        Ok(message)
    }

    async fn call<P, R>(&self, method: &str, params: &P, timeout: Duration) -> TelegramResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .http_client
            .post(self.method_url(method))
            .timeout(timeout)
            .json(params)
            .send()
            .await
            .map_err(TelegramError::http)?;

        let status = response.status();
        let body = response.text().await.map_err(TelegramError::http)?;

        let envelope: ApiResponse<R> = match serde_json::from_str(&body) {
            Ok(envelope) => envelope,
            Err(e) if status.is_success() => return Err(e.into()),
            Err(_) => {
                return Err(TelegramError::Api {
                    code: Some(i64::from(status.as_u16())),
                    description: body,
                })
            }
        };

        match (envelope.ok, envelope.result) {
            (true, Some(result)) => Ok(result),
            (ok, _) => {
                let description = envelope
                    .description
                    .unwrap_or_else(|| "response without result".to_string());
                if !ok {
                    warn!(method, code = ?envelope.error_code, "Telegram request failed: {}", description);
                }
                Err(TelegramError::Api {
                    code: envelope.error_code,
                    description,
                })
            }
        }
    }
}

#[async_trait]
impl ChatSender for TelegramClient {
    async fn send(&self, chat_id: ChatId, text: &str) -> ChatResult<MessageId> {
        let message = self.send_message(chat_id, text, None).await?;
        Ok(message.message_id)
    }

    async fn send_reply(&self, chat_id: ChatId, parent: MessageId, text: &str) -> ChatResult<MessageId> {
        let message = self.send_message(chat_id, text, Some(parent)).await?;
        Ok(message.message_id)
    }
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient")
            .field("api_url", &self.api_url)
            .finish_non_exhaustive()
    }
}
