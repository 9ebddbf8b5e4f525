//! Logging initialization.
//!
//! Thin wrapper over the `observability` package so the binary has one call
//! to make at startup.

use observability::LogConfig;
use std::path::PathBuf;

/// Service name written into every JSONL log line.
const SERVICE_NAME: &str = "hypogram";

/// Initialize the logging system.
///
/// Logs go to stderr, and additionally to `log_path` as JSONL when given.
/// `RUST_LOG` overrides `level`.
pub fn init_logging(level: &str, log_path: Option<PathBuf>) {
    observability::init_with_config(LogConfig {
        service_name: SERVICE_NAME.into(),
        default_level: level.into(),
        log_path,
        also_stderr: true,
    });
}


#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_logging_writes_jsonl_file() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("logs").join("bridge.jsonl");

        init_logging("info", Some(log_path.clone()));
        tracing::info!(chat_id = -1001_i64, "bridge ready");

        let content = std::fs::read_to_string(&log_path).unwrap();
        let line = content
            .lines()
            .find(|l| l.contains("bridge ready"))
            .expect("event line");
        let entry: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(entry["service"], "hypogram");
        assert_eq!(entry["level"], "INFO");
        assert_eq!(entry["fields"]["chat_id"], -1001);
    }
}
