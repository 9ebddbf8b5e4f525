//! # Sync engine: the annotation ↔ chat bridge core
//!
//! Two independently triggered flows share one [`MappingStore`]:
//!
//! - **[`Poller`]**: on a fixed interval, walks every subscription, pulls the
//!   annotations updated after its watermark and posts each one (plus any
//!   ancestors not yet in the chat) as a threaded chat message.
//!
//! - **[`ReplyHandler`]**: per inbound chat reply, resolves the replied-to
//!   message back to its annotation, posts a reply annotation carrying the
//!   full reference chain and records the new mapping.
//!
//! ## Architecture
//!
//! ```text
//!                ┌────────────────┐   send / send_reply  ┌─────────────┐
//!  Hypothesis ──▶│     Poller     │─────────────────────▶│ ChatSender  │
//!  (search)      └───────┬────────┘                      └─────────────┘
//!                        │ message_id_for (waits on lock)
//!                 ┌──────▼───────┐
//!                 │ MappingStore │◀── lock held: reply → create_mapping
//!                 └──────▲───────┘
//!                        │
//!                ┌───────┴────────┐   reply              ┌─────────────┐
//!  chat reply ──▶│  ReplyHandler  │─────────────────────▶│ Hypothesis  │
//!                └────────────────┘                      └─────────────┘
//! ```
//!
//! The reply handler holds the store-wide bridge lock from "post annotation"
//! until "mapping written". The poller's annotation→message lookup waits for
//! that lock, so a poll that sees the freshly posted reply annotation also
//! sees its mapping and never posts it back into the chat.
//!
//! [`MappingStore`]: bridge_core::MappingStore

mod chat;
mod error;
mod poller;
mod reply;
mod shutdown;
mod text;

#[cfg(test)]
mod tests;

pub use chat::{ChatError, ChatResult, ChatSender};
pub use error::{SyncError, SyncErrorKind, SyncResult};
pub use poller::{Poller, PollerConfig};
pub use reply::{ChatReply, IgnoreReason, RepliedMessage, ReplyHandler, ReplyOutcome};
pub use shutdown::{shutdown_channel, Shutdown, ShutdownTrigger};
pub use text::{annotation_link, chat_reply_annotation_text, reply_message_text, root_message_text};
