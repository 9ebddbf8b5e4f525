//! Command implementations.

mod run;
mod subscriptions;

pub use run::run_bridge;
pub use subscriptions::{describe_subscription, list_subscriptions, subscribe, unsubscribe};
