//! Structured logging and the in-app debug log.
//!
//! Events go through `tracing`. [`init`] installs a subscriber with an env
//! filter, an optional plain-text file sink (stdout belongs to the terminal
//! UI), and a [`CaptureLayer`] that appends every event to a [`DebugLog`].
//! The debug log is rewritten to the capture file as events arrive, so a
//! crashed or dropped session still leaves its log behind.

use std::fmt::Write as _;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;
use crate::error::LogError;

/// One captured log event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// RFC 3339 timestamp, UTC.
    pub time: String,
    pub level: String,
    pub target: String,
    pub msg: String,
}

/// Append-only, shareable record of log events.
#[derive(Debug, Clone, Default)]
pub struct DebugLog {
    records: Arc<Mutex<Vec<LogRecord>>>,
    persist_path: Arc<OnceLock<PathBuf>>,
}

impl DebugLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A layer that appends to this log.
    pub fn layer(&self) -> CaptureLayer {
        CaptureLayer { log: self.clone() }
    }

    /// Keep `path` in sync with the log: every later push rewrites it.
    ///
    /// Only the first call takes effect. Call after [`load_history`] so the
    /// previous export is not overwritten before it is read.
    ///
    /// [`load_history`]: DebugLog::load_history
    pub fn persist_to(&self, path: PathBuf) {
        let _ = self.persist_path.set(path);
    }

    pub fn push(&self, record: LogRecord) {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        records.push(record);
        if let Some(path) = self.persist_path.get() {
            // Failures can't be logged from inside the capture layer.
            let _ = write_records(path, &records);
        }
    }

    /// Snapshot of everything captured so far, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Put a previous export in front of the current records.
    ///
    /// A missing file is not an error; returns the number of records loaded.
    pub fn load_history(&self, path: &Path) -> Result<usize, LogError> {
        if !path.exists() {
            return Ok(0);
        }
        let content = std::fs::read_to_string(path)?;
        let mut history: Vec<LogRecord> = serde_json::from_str(&content)?;
        let loaded = history.len();

        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        history.append(&mut records);
        *records = history;
        Ok(loaded)
    }

    /// Write every record to `path` as a JSON array. Returns the record count.
    pub fn export(&self, path: &Path) -> Result<usize, LogError> {
        let records = self.records();
        write_records(path, &records)?;
        Ok(records.len())
    }
}

fn write_records(path: &Path, records: &[LogRecord]) -> Result<(), LogError> {
    let json = serde_json::to_string_pretty(records)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// `tracing` layer feeding a [`DebugLog`].
pub struct CaptureLayer {
    log: DebugLog,
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let meta = event.metadata();
        self.log.push(LogRecord {
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            level: meta.level().to_string(),
            target: meta.target().to_string(),
            msg: visitor.finish(),
        });
    }
}

/// Flattens an event into `message key=value ...`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        }
    }

    fn push_field(&mut self, name: &str, value: std::fmt::Arguments<'_>) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
        let _ = write!(self.fields, "{name}={value}");
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.push_field(field.name(), format_args!("{value}"));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.push_field(field.name(), format_args!("{value:?}"));
        }
    }
}

/// Install the global subscriber and return the debug log it feeds.
///
/// `RUST_LOG` overrides the configured filter. Previous captures at
/// `capture_path` are loaded as history, then the file follows the log.
pub fn init(config: &LoggingConfig) -> Result<DebugLog, LogError> {
    let log = DebugLog::new();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .map_err(|e| LogError::Subscriber(e.to_string()))?;

    let file_layer = match &config.file {
        Some(path) => {
            let file = open_append(path)?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(log.layer())
        .try_init()
        .map_err(|e| LogError::Subscriber(e.to_string()))?;

    let history = log.load_history(&config.capture_path);
    log.persist_to(config.capture_path.clone());
    match history {
        Ok(0) => {}
        Ok(n) => tracing::debug!(records = n, "loaded log history"),
        Err(e) => tracing::warn!(
            error = %e,
            path = %config.capture_path.display(),
            "replacing unreadable log history"
        ),
    }
    Ok(log)
}

fn open_append(path: &Path) -> Result<File, LogError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LogError::FileOpen {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn capture<F: FnOnce()>(f: F) -> DebugLog {
        let log = DebugLog::new();
        let subscriber = tracing_subscriber::registry().with(log.layer());
        tracing::subscriber::with_default(subscriber, f);
        log
    }

    #[test]
    fn test_capture_records_message_and_fields() {
        let log = capture(|| {
            tracing::info!(attempt = 3, "session channel open");
            tracing::warn!("protocol anomaly");
        });

        let records = log.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level, "INFO");
        assert_eq!(records[0].msg, "session channel open attempt=3");
        assert_eq!(records[1].level, "WARN");
        assert_eq!(records[1].msg, "protocol anomaly");
        assert!(records[0].target.starts_with("connect_four_client"));
        assert!(chrono::DateTime::parse_from_rfc3339(&records[0].time).is_ok());
    }

    #[test]
    fn test_export_then_load_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_logs.json");

        let first = capture(|| tracing::info!("first run"));
        assert_eq!(first.export(&path).unwrap(), 1);

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value[0]["msg"], "first run");

        let second = capture(|| tracing::info!("second run"));
        assert_eq!(second.load_history(&path).unwrap(), 1);
        let msgs: Vec<String> = second.records().into_iter().map(|r| r.msg).collect();
        assert_eq!(msgs, vec!["first run", "second run"]);
    }

    #[test]
    fn test_persisted_log_survives_without_export() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client_logs.json");
        std::fs::write(&path, r#"[{"time":"t","level":"INFO","target":"c","msg":"older run"}]"#)
            .unwrap();

        let first = DebugLog::new();
        first.load_history(&path).unwrap();
        first.persist_to(path.clone());
        let subscriber = tracing_subscriber::registry().with(first.layer());
        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!("session channel failed");
        });
        drop(first);

        let second = DebugLog::new();
        assert_eq!(second.load_history(&path).unwrap(), 2);
        let msgs: Vec<String> = second.records().into_iter().map(|r| r.msg).collect();
        assert_eq!(msgs, vec!["older run", "session channel failed"]);
    }

    #[test]
    fn test_load_history_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = DebugLog::new();
        assert_eq!(log.load_history(&dir.path().join("none.json")).unwrap(), 0);
        assert!(log.is_empty());
    }

    #[test]
    fn test_load_history_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            DebugLog::new().load_history(&path),
            Err(LogError::Json(_))
        ));
    }
}
