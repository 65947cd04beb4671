//! # Log Entries
//!
//! A [`LogEntry`] is one append-only audit record: a level, the name of the
//! component that wrote it, an epoch-millisecond timestamp, a message, and
//! optional structured error and data payloads.
//!
//! Errors are stored flattened: the error and each of its `source()` causes
//! become one [`ErrorRecord`], outermost first.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AuditError;

// ---------------------------------------------------------------------------
// LogLevel
// ---------------------------------------------------------------------------

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Diagnostic detail.
    Debug,
    /// Normal operation.
    Info,
    /// Unexpected but tolerated.
    Warn,
    /// A failed operation.
    Error,
    /// Fine-grained tracing.
    Trace,
}

impl LogLevel {
    /// Every level, in declaration order.
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
        LogLevel::Trace,
    ];

    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Trace => "trace",
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| AuditError::UnknownLevel(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ErrorRecord
// ---------------------------------------------------------------------------

/// One error in a flattened error chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    /// Error name or machine-readable code.
    pub name: String,
    /// Human-readable message.
    pub message: String,
    /// Structured context attached to the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

impl ErrorRecord {
    /// Create an error record.
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
            properties: None,
        }
    }

    /// Attach structured context.
    pub fn with_properties(mut self, properties: serde_json::Value) -> Self {
        self.properties = Some(properties);
        self
    }

    /// Flatten `err` and its causes. The outermost record is named `name`;
    /// causes are named `cause`.
    pub fn flatten(
        name: impl Into<String>,
        err: &(dyn std::error::Error + 'static),
    ) -> Vec<ErrorRecord> {
        let mut records = vec![ErrorRecord::new(name, err.to_string())];
        let mut source = err.source();
        while let Some(cause) = source {
            records.push(ErrorRecord::new("cause", cause.to_string()));
            source = cause.source();
        }
        records
    }
}

// ---------------------------------------------------------------------------
// LogEntry
// ---------------------------------------------------------------------------

/// A structured audit log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Severity.
    pub level: LogLevel,
    /// Name of the component that wrote the entry.
    pub source: String,
    /// Unix epoch milliseconds.
    pub ts: i64,
    /// Message.
    pub message: String,
    /// Flattened error chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Vec<ErrorRecord>>,
    /// Structured data payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create an entry timestamped now.
    pub fn new(level: LogLevel, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            source: source.into(),
            ts: chrono::Utc::now().timestamp_millis(),
            message: message.into(),
            error: None,
            data: None,
        }
    }

    /// Attach a data payload.
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Attach a flattened error chain.
    pub fn with_error(mut self, error: Vec<ErrorRecord>) -> Self {
        self.error = Some(error);
        self
    }

    /// Override the timestamp.
    pub fn at(mut self, ts: i64) -> Self {
        self.ts = ts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    #[error("outer failure")]
    struct Outer(#[source] Inner);

    #[derive(Debug, thiserror::Error)]
    #[error("inner failure")]
    struct Inner;

    #[test]
    fn level_names_roundtrip() {
        for level in LogLevel::ALL {
            assert_eq!(level.as_str().parse::<LogLevel>().unwrap(), level);
            assert_eq!(
                serde_json::to_value(level).unwrap(),
                json!(level.as_str())
            );
        }
        assert_eq!(" WARN ".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!(matches!(
            "fatal".parse::<LogLevel>(),
            Err(AuditError::UnknownLevel(_))
        ));
    }

    #[test]
    fn flatten_walks_source_chain() {
        let records = ErrorRecord::flatten("VERIFICATION_FAILED", &Outer(Inner));
        assert_eq!(
            records,
            vec![
                ErrorRecord::new("VERIFICATION_FAILED", "outer failure"),
                ErrorRecord::new("cause", "inner failure"),
            ]
        );
    }

    #[test]
    fn entry_builder_and_serde() {
        let entry = LogEntry::new(LogLevel::Info, "FederatedCatalogue", "registered")
            .with_data(json!({"participantId": "did:example:abc"}))
            .at(1_700_000_000_000);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["level"], "info");
        assert_eq!(value["ts"], 1_700_000_000_000_i64);
        assert!(value.get("error").is_none());
        let back: LogEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }

    #[test]
    fn new_entry_is_timestamped() {
        let before = chrono::Utc::now().timestamp_millis();
        let entry = LogEntry::new(LogLevel::Debug, "test", "m");
        assert!(entry.ts >= before);
    }
}
