//! Structured logging with event context.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use tacmap_core::RequestId;
use tracing_subscriber::EnvFilter;

/// Log level for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Trace => write!(f, "TRACE"),
            Self::Debug => write!(f, "DEBUG"),
            Self::Info => write!(f, "INFO"),
            Self::Warn => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// A structured log entry.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    /// RFC 3339 wall-clock time of the entry.
    pub timestamp: String,
    /// Log level.
    pub level: LogLevel,
    /// Log message.
    pub message: String,
    /// Event ID for correlation.
    pub event_id: String,
    /// Worker event kind ("install", "fetch", ...).
    pub event: String,
    /// Worker version, i.e. the shell store name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Additional structured fields.
    #[serde(flatten)]
    pub fields: BTreeMap<String, serde_json::Value>,
    /// Microseconds since the event started.
    pub elapsed_us: u64,
}

impl LogEntry {
    /// Format as JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| self.message.clone())
    }

    /// Format as human-readable string.
    pub fn to_human(&self) -> String {
        let mut s = format!("[{}] {}: {} ({}us)", self.level, self.event, self.message, self.elapsed_us);

        if !self.fields.is_empty() {
            let fields: Vec<String> = self
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            s.push_str(" | ");
            s.push_str(&fields.join(" "));
        }

        s
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON format (for log aggregation).
    #[default]
    Json,
    /// Human-readable format (for development).
    Human,
}

/// Logger bound to a single worker event.
///
/// Entries are formatted with the event context and forwarded to `tracing`
/// under the `tacmap::event` target.
#[derive(Debug, Clone)]
pub struct EventLogger {
    event_id: RequestId,
    event: String,
    version: Option<String>,
    start_time: std::time::Instant,
    min_level: LogLevel,
    format: LogFormat,
}

impl EventLogger {
    /// Create a logger for an event.
    pub fn new(event: impl Into<String>) -> Self {
        Self::with_id(RequestId::generate(), event)
    }

    /// Create a logger for an event that already has an ID.
    pub fn with_id(event_id: RequestId, event: impl Into<String>) -> Self {
        Self {
            event_id,
            event: event.into(),
            version: None,
            start_time: std::time::Instant::now(),
            min_level: LogLevel::Debug,
            format: LogFormat::Json,
        }
    }

    /// Set the worker version.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set minimum log level.
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Set output format.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Build the entry that a call at `level` would emit, if not filtered out.
    pub fn entry(
        &self,
        level: LogLevel,
        message: &str,
        fields: BTreeMap<String, serde_json::Value>,
    ) -> Option<LogEntry> {
        if level < self.min_level {
            return None;
        }

        Some(LogEntry {
            timestamp: chrono::Utc::now().to_rfc3339(),
            level,
            message: message.to_string(),
            event_id: self.event_id.to_string(),
            event: self.event.clone(),
            version: self.version.clone(),
            fields,
            elapsed_us: self.elapsed_us(),
        })
    }

    fn log(&self, level: LogLevel, message: &str, fields: BTreeMap<String, serde_json::Value>) {
        let Some(entry) = self.entry(level, message, fields) else {
            return;
        };

        let line = match self.format {
            LogFormat::Json => entry.to_json(),
            LogFormat::Human => entry.to_human(),
        };

        match level {
            LogLevel::Trace => tracing::trace!(target: "tacmap::event", "{}", line),
            LogLevel::Debug => tracing::debug!(target: "tacmap::event", "{}", line),
            LogLevel::Info => tracing::info!(target: "tacmap::event", "{}", line),
            LogLevel::Warn => tracing::warn!(target: "tacmap::event", "{}", line),
            LogLevel::Error => tracing::error!(target: "tacmap::event", "{}", line),
        }
    }

    /// Get the event ID.
    pub fn event_id(&self) -> &RequestId {
        &self.event_id
    }

    /// Get elapsed time since logger creation.
    pub fn elapsed_us(&self) -> u64 {
        self.start_time.elapsed().as_micros() as u64
    }
}

/// Builder for log entries with fluent API.
pub struct LogBuilder<'a> {
    logger: &'a EventLogger,
    level: LogLevel,
    message: String,
    fields: BTreeMap<String, serde_json::Value>,
}

impl<'a> LogBuilder<'a> {
    /// Create a new log builder.
    pub fn new(logger: &'a EventLogger, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            logger,
            level,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Add a string field.
    pub fn field(mut self, key: &str, value: impl Into<String>) -> Self {
        self.fields
            .insert(key.to_string(), serde_json::json!(value.into()));
        self
    }

    /// Add an integer field.
    pub fn field_u64(mut self, key: &str, value: u64) -> Self {
        self.fields.insert(key.to_string(), serde_json::json!(value));
        self
    }

    /// Add a boolean field.
    pub fn field_bool(mut self, key: &str, value: bool) -> Self {
        self.fields.insert(key.to_string(), serde_json::json!(value));
        self
    }

    /// Add a list of strings.
    pub fn field_list(mut self, key: &str, values: &[String]) -> Self {
        self.fields.insert(key.to_string(), serde_json::json!(values));
        self
    }

    /// Emit the log entry.
    pub fn emit(self) {
        self.logger.log(self.level, &self.message, self.fields);
    }
}

impl EventLogger {
    /// Start building an info log entry.
    pub fn info_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Info, message)
    }

    /// Start building a warn log entry.
    pub fn warn_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Warn, message)
    }

    /// Start building an error log entry.
    pub fn error_builder(&self, message: impl Into<String>) -> LogBuilder<'_> {
        LogBuilder::new(self, LogLevel::Error, message)
    }
}

/// Install a global `fmt` subscriber.
///
/// `RUST_LOG` wins over `default_filter` when set. Returns `false` if a
/// subscriber was already installed.
pub fn init_tracing(default_filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_carries_context() {
        let logger = EventLogger::with_id(RequestId::from_string("evt-1"), "install")
            .with_version("tacmap-v1");
        let entry = logger
            .entry(LogLevel::Info, "precached", BTreeMap::new())
            .unwrap();

        assert_eq!(entry.event_id, "evt-1");
        assert_eq!(entry.event, "install");
        assert_eq!(entry.version.as_deref(), Some("tacmap-v1"));
    }

    #[test]
    fn test_entry_filtered_below_min_level() {
        let logger = EventLogger::new("fetch").with_min_level(LogLevel::Warn);
        assert!(logger.entry(LogLevel::Info, "x", BTreeMap::new()).is_none());
        assert!(logger.entry(LogLevel::Error, "x", BTreeMap::new()).is_some());
    }

    #[test]
    fn test_json_flattens_fields() {
        let logger = EventLogger::with_id(RequestId::from_string("evt-2"), "activate");
        let mut fields = BTreeMap::new();
        fields.insert("deleted".to_string(), serde_json::json!(2));
        let json = logger.entry(LogLevel::Info, "cleanup", fields).unwrap().to_json();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["deleted"], 2);
        assert_eq!(value["event"], "activate");
        assert_eq!(value["level"], "info");
        assert!(chrono::DateTime::parse_from_rfc3339(value["timestamp"].as_str().unwrap()).is_ok());
        assert!(value.get("version").is_none());
    }

    #[test]
    fn test_human_format() {
        let logger = EventLogger::with_id(RequestId::from_string("evt-3"), "message");
        let mut fields = BTreeMap::new();
        fields.insert("command".to_string(), serde_json::json!("clearTileCache"));
        let line = logger.entry(LogLevel::Warn, "handled", fields).unwrap().to_human();

        assert!(line.starts_with("[WARN] message: handled"));
        assert!(line.ends_with("| command=\"clearTileCache\""));
    }

    #[test]
    fn test_init_tracing_installs_once() {
        assert!(init_tracing("tacmap=debug"));
        assert!(!init_tracing("tacmap=debug"));

        EventLogger::new("fetch")
            .with_format(LogFormat::Human)
            .warn_builder("emitted through the installed subscriber")
            .field("url", "http://localhost/")
            .emit();
    }

    #[test]
    fn test_builder_emits_without_subscriber() {
        let logger = EventLogger::new("install");
        logger
            .info_builder("done")
            .field("store", "tacmap-v1")
            .field_u64("count", 6)
            .field_bool("skip_waiting", true)
            .emit();
    }
}
