//! Configuration, file-system layout, and logging setup for hypogram.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, DEFAULT_ANNOTATION_LINK_BASE, DEFAULT_HYPOTHESIS_API_URL, DEFAULT_LOG_LEVEL,
    DEFAULT_MAX_ANCESTOR_DEPTH, DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TELEGRAM_API_URL,
    DEFAULT_TELEGRAM_LONG_POLL_SECS,
};
pub use error::{CoreError, CoreResult};
pub use logging::init_logging;
pub use paths::Paths;
