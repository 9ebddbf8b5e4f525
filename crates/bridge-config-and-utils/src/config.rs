//! Bridge configuration.
//!
//! Values come from three layers, later ones winning:
//! built-in defaults, `<base>/config.json`, then `HYPOGRAM_*` environment
//! variables. Credentials are never stored here; subscription tokens live in
//! the database and the bot token is passed on the command line.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";
/// Seconds between poll cycles.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
/// Longest unmapped ancestor chain the poller will materialize for one annotation.
pub const DEFAULT_MAX_ANCESTOR_DEPTH: usize = 64;
/// Hypothesis REST API root.
pub const DEFAULT_HYPOTHESIS_API_URL: &str = "https://api.hypothes.is/api";
/// Prefix for annotation share links included in chat messages.
pub const DEFAULT_ANNOTATION_LINK_BASE: &str = "https://hypothes.is/a/";
/// Telegram Bot API root.
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
/// Long-poll timeout for `getUpdates`.
pub const DEFAULT_TELEGRAM_LONG_POLL_SECS: u64 = 10;

/// Main bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Fixed interval between poll cycles.
    pub poll_interval_secs: u64,
    /// Bound on ancestor-chain materialization per annotation.
    pub max_ancestor_depth: usize,
    /// Annotation service API root.
    pub hypothesis_api_url: String,
    /// Share-link prefix; the annotation id is appended.
    pub annotation_link_base: String,
    /// Chat service API root.
    pub telegram_api_url: String,
    /// Long-poll timeout for inbound chat updates.
    pub telegram_long_poll_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            max_ancestor_depth: DEFAULT_MAX_ANCESTOR_DEPTH,
            hypothesis_api_url: DEFAULT_HYPOTHESIS_API_URL.to_string(),
            annotation_link_base: DEFAULT_ANNOTATION_LINK_BASE.to_string(),
            telegram_api_url: DEFAULT_TELEGRAM_API_URL.to_string(),
            telegram_long_poll_secs: DEFAULT_TELEGRAM_LONG_POLL_SECS,
        }
    }
}

impl Config {
    /// Load configuration from `paths.config_file()`, falling back to defaults
    /// when the file does not exist, then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    fn load_from_env(&mut self) -> CoreResult<()> {
        if let Ok(log_level) = std::env::var("HYPOGRAM_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(raw) = std::env::var("HYPOGRAM_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = raw.trim().parse().map_err(|_| CoreError::InvalidValue {
                key: "HYPOGRAM_POLL_INTERVAL_SECS".to_string(),
                value: raw.clone(),
            })?;
        }
        Ok(())
    }

    /// Reject values the bridge cannot run with.
    pub fn validate(&self) -> CoreResult<()> {
        if self.poll_interval_secs == 0 {
            return Err(CoreError::Config(
                "poll_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.max_ancestor_depth == 0 {
            return Err(CoreError::Config(
                "max_ancestor_depth must be at least 1".to_string(),
            ));
        }
        self.hypothesis_api_url()?;
        self.telegram_api_url()?;
        Ok(())
    }

    /// Poll interval as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Long-poll timeout as a `Duration`.
    pub fn telegram_long_poll(&self) -> Duration {
        Duration::from_secs(self.telegram_long_poll_secs)
    }

    /// Annotation service API root as a parsed URL.
    pub fn hypothesis_api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.hypothesis_api_url).map_err(CoreError::from)
    }

    /// Chat service API root as a parsed URL.
    pub fn telegram_api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.telegram_api_url).map_err(CoreError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert_eq!(config.poll_interval(), Duration::from_secs(60));
        assert_eq!(config.max_ancestor_depth, DEFAULT_MAX_ANCESTOR_DEPTH);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{ "log_level": "debug", "poll_interval_secs": 5 }"#,
        )
        .unwrap();

        let config = Config::load_from_file(&config_path).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.poll_interval_secs, 5);
        assert_eq!(config.hypothesis_api_url, DEFAULT_HYPOTHESIS_API_URL);
    }

    #[test]
    fn test_load_reads_config_file_under_base_dir() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());
        paths.ensure_dirs().unwrap();
        std::fs::write(
            paths.config_file(),
            r#"{ "log_level": "warn", "max_ancestor_depth": 8 }"#,
        )
        .unwrap();

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.max_ancestor_depth, 8);
        if std::env::var("HYPOGRAM_LOG_LEVEL").is_err() {
            assert_eq!(config.log_level, "warn");
        }
    }

    #[test]
    fn test_load_nonexistent_uses_defaults() {
        let dir = tempdir().unwrap();
        let paths = Paths::with_base_dir(dir.path().to_path_buf());

        let config = Config::load(&paths).unwrap();
        assert_eq!(config.hypothesis_api_url, DEFAULT_HYPOTHESIS_API_URL);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        let config = Config {
            poll_interval_secs: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let config = Config {
            telegram_api_url: "not a valid url".to_string(),
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::InvalidUrl(_))));
    }
}
