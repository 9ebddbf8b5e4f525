//! Telegram side of the bridge.
//!
//! - [`TelegramClient`]: a thin Bot API client (`getMe`, `getUpdates`,
//!   `sendMessage`) that doubles as the engine's [`sync_engine::ChatSender`].
//! - [`BotRunner`]: long-polls for updates and hands every text message to the
//!   [`sync_engine::ReplyHandler`] on its own task.

mod client;
mod error;
mod runner;
mod types;

pub use client::TelegramClient;
pub use error::{TelegramError, TelegramResult};
pub use runner::{chat_reply_from, BotRunner};
pub use types::{format_user, ApiResponse, Chat, Message, ReplyParameters, Update, User};
