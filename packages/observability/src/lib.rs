//! # Observability
//!
//! Tracing setup shared by every hypogram entry point.
//!
//! Services call [`init_with_config`] once at startup and then use the plain
//! `tracing` macros everywhere else. Two sinks are supported:
//!
//! - an append-only JSONL file (one [`json_layer::LogEntry`] per line), enabled
//!   when [`LogConfig::log_path`] is set
//! - a compact human-readable stderr stream, enabled by [`LogConfig::also_stderr`]
//!
//! `RUST_LOG` always wins over [`LogConfig::default_level`].
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "hypogram".into(),
//!     default_level: "debug".into(),
//!     also_stderr: true,
//!     ..Default::default()
//! });
//! tracing::info!("ready");
//! ```

mod file;
pub mod json_layer;

use std::io;
use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

pub use file::{AppendOnlyLogWriter, WriterFactory};
use json_layer::JsonLayer;

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, written into every JSONL entry.
    pub service_name: String,

    /// Default log level filter (e.g., "debug", "info", "warn").
    /// Can be overridden by the `RUST_LOG` environment variable.
    pub default_level: String,

    /// JSONL log file. No file sink is installed when `None`.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: true,
        }
    }
}

/// Initialize the global subscriber.
///
/// Calling this twice is harmless: the second installation attempt is ignored.
/// If the log file cannot be opened, logging falls back to stderr only and the
/// failure is reported there.
pub fn init_with_config(config: LogConfig) {
    let file_layer = match &config.log_path {
        Some(path) => match AppendOnlyLogWriter::new(path) {
            Ok(writer) => Some(JsonLayer::new(
                config.service_name.clone(),
                WriterFactory::new(writer),
            )),
            Err(e) => {
                eprintln!("failed to open log file {}: {}", path.display(), e);
                None
            }
        },
        None => None,
    };

    // Keep stderr on even without the flag when there is no other sink.
    let stderr_enabled = config.also_stderr || file_layer.is_none();
    let stderr_layer = stderr_enabled.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .compact()
            .with_writer(io::stderr)
    });

    let result = tracing_subscriber::registry()
        .with(file_layer.map(|l| l.with_filter(env_filter(&config.default_level))))
        .with(stderr_layer.map(|l| l.with_filter(env_filter(&config.default_level))))
        .try_init();

    if result.is_ok() {
        tracing::info!(
            service = %config.service_name,
            log_path = ?config.log_path,
            "observability initialized"
        );
    }
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}
