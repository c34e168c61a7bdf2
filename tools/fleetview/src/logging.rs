use crate::config::LoggingConfig;
use crate::errors::FleetviewError;
use crate::log_retention::enforce_total_budget;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const DEFAULT_DISK_BUDGET_BYTES: u64 = 50 * 1024 * 1024;

/// Append-only JSONL event log. The terminal belongs to the dashboard, so
/// diagnostics go here instead of stderr.
#[derive(Debug, Clone)]
pub struct JsonlLogger {
    pub path: PathBuf,
    pub max_payload_bytes: usize,
    pub budget_bytes: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEvent<'a> {
    pub level: &'a str,
    pub event_type: &'a str,
    pub payload: Value,
}

impl JsonlLogger {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            max_payload_bytes: 4096,
            budget_bytes: DEFAULT_DISK_BUDGET_BYTES,
        }
    }

    pub fn from_config(cfg: &LoggingConfig) -> Self {
        Self {
            path: cfg.path.clone(),
            max_payload_bytes: cfg.max_payload_bytes,
            budget_bytes: cfg.budget_bytes,
        }
    }

    pub fn info(&self, event_type: &str, payload: Value) -> Result<(), FleetviewError> {
        self.append(&LogEvent {
            level: "info",
            event_type,
            payload,
        })
    }

    pub fn warn(&self, event_type: &str, payload: Value) -> Result<(), FleetviewError> {
        self.append(&LogEvent {
            level: "warn",
            event_type,
            payload,
        })
    }

    pub fn error(&self, event_type: &str, payload: Value) -> Result<(), FleetviewError> {
        self.append(&LogEvent {
            level: "error",
            event_type,
            payload,
        })
    }

    pub fn append(&self, event: &LogEvent<'_>) -> Result<(), FleetviewError> {
        if let Some(parent) = non_empty_parent(&self.path) {
            fs::create_dir_all(parent).map_err(|e| FleetviewError::Io(e.to_string()))?;
        }
        let truncated = truncate_json(event.payload.clone(), self.max_payload_bytes);
        let line = serde_json::to_string(&LogEvent {
            level: event.level,
            event_type: event.event_type,
            payload: truncated,
        })
        .map_err(|e| FleetviewError::Io(e.to_string()))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| FleetviewError::Io(format!("{}: {e}", self.path.display())))?;
        file.write_all(line.as_bytes())
            .map_err(|e| FleetviewError::Io(e.to_string()))?;
        file.write_all(b"\n")
            .map_err(|e| FleetviewError::Io(e.to_string()))?;

        enforce_total_budget(&self.path, self.budget_bytes)?;
        Ok(())
    }
}

/// One-line, grep-friendly summary used when stdout is not a terminal.
pub fn structured_fallback_line(source: &str, event: &str, message: &str) -> String {
    format!(
        "source={source} event={event} message={} ",
        message.replace('\n', "\\n")
    )
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|parent| !parent.as_os_str().is_empty())
}

fn truncate_json(value: Value, max_bytes: usize) -> Value {
    let rendered = serde_json::to_string(&value).unwrap_or_default();
    if rendered.len() <= max_bytes {
        return value;
    }
    let mut cut = max_bytes.saturating_sub(3);
    while cut > 0 && !rendered.is_char_boundary(cut) {
        cut -= 1;
    }
    Value::String(format!("{}...", &rendered[..cut]))
}

#[cfg(test)]
mod tests {
    use super::{structured_fallback_line, JsonlLogger};
    use serde_json::json;

    #[test]
    fn logger_truncates_large_payloads_and_writes_jsonl() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("logs/run.jsonl");
        let mut logger = JsonlLogger::new(&path);
        logger.max_payload_bytes = 20;
        logger.budget_bytes = 1024;

        logger
            .warn("fetch_failed", json!({"error": "abcdefghijklmnopqrstuvwxyz"}))
            .expect("append");
        logger.info("refresh_completed", json!({"ms": 3})).expect("append");

        let text = std::fs::read_to_string(&path).expect("read");
        let lines = text.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"level\":\"warn\""));
        assert!(lines[0].contains("..."));
        assert!(lines[1].contains("\"event_type\":\"refresh_completed\""));
    }

    #[test]
    fn budget_pruning_leaves_foreign_files_in_the_log_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let notes = dir.path().join("operator-notes.txt");
        std::fs::write(&notes, vec![b'n'; 200]).expect("notes");
        let mut logger = JsonlLogger::new(dir.path().join("fleetview.jsonl"));
        logger.budget_bytes = 100;

        logger.info("startup", json!({"endpoints": ["http://a"]})).expect("append");
        assert!(notes.exists());
        assert_eq!(std::fs::read(&notes).expect("read").len(), 200);
    }

    #[test]
    fn fallback_line_is_deterministic() {
        let line = structured_fallback_line("refresh", "fetch_failed", "timed out\nretrying");
        assert_eq!(line, "source=refresh event=fetch_failed message=timed out\\nretrying ");
    }
}
