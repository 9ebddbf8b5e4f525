//! Error types for Bot API calls.

use sync_engine::ChatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TelegramError {
    /// Network or transport-level HTTP error from reqwest. Build it with
    /// [`TelegramError::http`], which strips the URL and with it the bot token.
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// The Bot API answered with `ok: false`.
    #[error("Telegram API error: {description}")]
    Api {
        code: Option<i64>,
        description: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl TelegramError {
    pub(crate) fn http(e: reqwest::Error) -> Self {
        TelegramError::Http(e.without_url())
    }
}

impl From<TelegramError> for ChatError {
    fn from(e: TelegramError) -> Self {
        match e {
            TelegramError::Api { description, .. } => ChatError::Rejected(description),
            other => ChatError::transport(other),
        }
    }
}

/// Result type alias for Bot API calls.
pub type TelegramResult<T> = Result<T, TelegramError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let err = TelegramError::Api {
            code: Some(400),
            description: "Bad Request: message to reply not found".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Telegram API error: Bad Request: message to reply not found"
        );
    }

    #[test]
    fn api_error_becomes_rejection() {
        let err = ChatError::from(TelegramError::Api {
            code: Some(403),
            description: "Forbidden: bot was kicked".to_string(),
        });
        assert!(matches!(err, ChatError::Rejected(d) if d.contains("kicked")));
    }
}
