//! # bridge-core
//!
//! Record types shared by every hypogram crate and the contract the sync
//! engine expects from persistent storage.
//!
//! ```text
//! Poller ──┐                    ┌── SqliteMappingStore (bridge-database)
//!          ├── MappingStore ────┤
//! Replies ─┘   + BridgeLock     └── (test doubles)
//! ```
//!
//! Records are plain owned values. Every read hands back a fresh copy, so a
//! caller mutating a returned [`Subscription`] changes nothing in storage until
//! it is written back through [`MappingStore::update_subscription`].

mod error;
mod lock;
mod store;
mod types;

pub use error::{StoreError, StoreResult};
pub use lock::{BridgeLock, BridgeLockGuard};
pub use store::MappingStore;
pub use types::{
    AnnotationId, AnnotationMetadata, ChatId, MappedAnnotation, MessageId, Subscription,
    SubscriptionKey,
};
