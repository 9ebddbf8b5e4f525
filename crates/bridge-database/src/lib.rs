//! SQLite persistence for the hypogram bridge.
//!
//! This crate provides:
//! - An async SQLite executor running on a dedicated thread
//! - Versioned schema migrations
//! - Row models and standalone query functions
//! - [`SqliteMappingStore`], the production [`bridge_core::MappingStore`]
//!
//! # Architecture
//!
//! All SQL runs inside [`AsyncDatabase::call`], which ships the closure to the
//! executor thread and parks the caller until it finishes. Queries take a
//! plain `&Connection` so they compose inside a single `call`:
//!
//! ```ignore
//! let db = AsyncDatabase::open(path).await?;
//! let subs = db.call(|conn| queries::list_subscriptions(conn)).await?;
//! ```
//!
//! Only SQL belongs inside `call()`. Locks and network I/O stay outside.

mod error;
mod executor;
mod migrations;
mod models;
pub mod queries;
mod store;

pub use error::{DatabaseError, DatabaseResult};
pub use executor::AsyncDatabase;
pub use migrations::{run_migrations, CURRENT_VERSION};
pub use models::*;
pub use store::SqliteMappingStore;
