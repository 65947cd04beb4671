//! # Audit Sinks
//!
//! [`AuditSink`] is the append port the catalogue writes to.
//!
//! - [`EntityStorageAuditSink`] persists entries as [`LogRecord`]s in an
//!   [`EntityStorage`], keeping only the configured levels, and supports
//!   querying them back. Error and data payloads are stored as JSON text and
//!   restored losslessly.
//! - [`TracingAuditSink`] forwards entries to `tracing` and cannot be
//!   queried.

use std::collections::BTreeSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use fedcat_storage::{
    ComparisonOperator, Entity, EntityCondition, EntityStorage, QueryRequest, QueryResult,
    SortProperty,
};

use crate::entry::{ErrorRecord, LogEntry, LogLevel};
use crate::error::AuditError;

/// Filter for reading log entries back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Only entries at this level.
    pub level: Option<LogLevel>,
    /// Only entries from this source.
    pub source: Option<String>,
    /// Inclusive lower bound on `ts`.
    pub time_start: Option<i64>,
    /// Inclusive upper bound on `ts`.
    pub time_end: Option<i64>,
    /// Cursor returned by the previous page.
    pub cursor: Option<String>,
    /// Maximum entries per page.
    pub page_size: Option<usize>,
}

impl LogQuery {
    fn to_request(&self) -> QueryRequest {
        let mut conditions = Vec::new();
        if let Some(level) = self.level {
            conditions.push(EntityCondition::equals("level", level.as_str()));
        }
        if let Some(source) = &self.source {
            conditions.push(EntityCondition::equals("source", source.as_str()));
        }
        if let Some(start) = self.time_start {
            conditions.push(EntityCondition::compare(
                "ts",
                ComparisonOperator::GreaterThanOrEqual,
                start,
            ));
        }
        if let Some(end) = self.time_end {
            conditions.push(EntityCondition::compare(
                "ts",
                ComparisonOperator::LessThanOrEqual,
                end,
            ));
        }
        QueryRequest::new()
            .with_condition(EntityCondition::all(conditions))
            .sorted_by(SortProperty::ascending("ts"))
            .with_cursor(self.cursor.clone())
            .with_page_size(self.page_size)
    }
}

/// Structured, leveled append-only log.
pub trait AuditSink: Send + Sync {
    /// Append an entry.
    fn log(&self, entry: LogEntry) -> Result<(), AuditError>;

    /// Read entries back, oldest first.
    fn query(&self, query: &LogQuery) -> Result<QueryResult<LogEntry>, AuditError>;
}

// ---------------------------------------------------------------------------
// EntityStorageAuditSink
// ---------------------------------------------------------------------------

/// Stored form of a log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Random identifier.
    pub id: String,
    /// Severity.
    pub level: LogLevel,
    /// Writing component.
    pub source: String,
    /// Unix epoch milliseconds.
    pub ts: i64,
    /// Message.
    pub message: String,
    /// JSON text of the flattened error chain.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// JSON text of the data payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

impl Entity for LogRecord {
    fn primary_key(&self) -> &str {
        &self.id
    }
}

impl LogRecord {
    fn from_entry(entry: LogEntry) -> Result<Self, AuditError> {
        let error = match &entry.error {
            Some(records) if !records.is_empty() => Some(serde_json::to_string(records)?),
            _ => None,
        };
        let data = entry.data.as_ref().map(serde_json::to_string).transpose()?;
        Ok(Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            level: entry.level,
            source: entry.source,
            ts: entry.ts,
            message: entry.message,
            error,
            data,
        })
    }

    fn into_entry(self) -> Result<LogEntry, AuditError> {
        let error = self
            .error
            .as_deref()
            .map(serde_json::from_str::<Vec<ErrorRecord>>)
            .transpose()?;
        let data = self.data.as_deref().map(serde_json::from_str).transpose()?;
        Ok(LogEntry {
            level: self.level,
            source: self.source,
            ts: self.ts,
            message: self.message,
            error,
            data,
        })
    }
}

/// Audit sink persisting into entity storage.
#[derive(Clone)]
pub struct EntityStorageAuditSink {
    levels: BTreeSet<LogLevel>,
    storage: Arc<dyn EntityStorage<LogRecord>>,
}

impl std::fmt::Debug for EntityStorageAuditSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityStorageAuditSink")
            .field("levels", &self.levels)
            .finish_non_exhaustive()
    }
}

impl EntityStorageAuditSink {
    /// Capture every level.
    pub fn new(storage: Arc<dyn EntityStorage<LogRecord>>) -> Self {
        Self::with_levels(storage, LogLevel::ALL)
    }

    /// Capture only `levels`; entries at other levels are dropped.
    pub fn with_levels(
        storage: Arc<dyn EntityStorage<LogRecord>>,
        levels: impl IntoIterator<Item = LogLevel>,
    ) -> Self {
        Self {
            levels: levels.into_iter().collect(),
            storage,
        }
    }

    /// Whether entries at `level` are persisted.
    pub fn captures(&self, level: LogLevel) -> bool {
        self.levels.contains(&level)
    }
}

impl AuditSink for EntityStorageAuditSink {
    fn log(&self, entry: LogEntry) -> Result<(), AuditError> {
        if !self.captures(entry.level) {
            return Ok(());
        }
        self.storage.set(LogRecord::from_entry(entry)?)?;
        Ok(())
    }

    fn query(&self, query: &LogQuery) -> Result<QueryResult<LogEntry>, AuditError> {
        self.storage
            .query(&query.to_request())?
            .try_map(LogRecord::into_entry)
    }
}

// ---------------------------------------------------------------------------
// TracingAuditSink
// ---------------------------------------------------------------------------

/// Audit sink that emits `tracing` events under the `fedcat::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log(&self, entry: LogEntry) -> Result<(), AuditError> {
        let error = entry.error.as_ref().map(serde_json::to_string).transpose()?;
        let data = entry.data.as_ref().map(serde_json::to_string).transpose()?;
        let error = error.unwrap_or_default();
        let data = data.unwrap_or_default();
        let (source, ts, message) = (entry.source.as_str(), entry.ts, entry.message.as_str());

        match entry.level {
            LogLevel::Trace => {
                tracing::trace!(target: "fedcat::audit", source, ts, error = %error, data = %data, "{message}")
            }
            LogLevel::Debug => {
                tracing::debug!(target: "fedcat::audit", source, ts, error = %error, data = %data, "{message}")
            }
            LogLevel::Info => {
                tracing::info!(target: "fedcat::audit", source, ts, error = %error, data = %data, "{message}")
            }
            LogLevel::Warn => {
                tracing::warn!(target: "fedcat::audit", source, ts, error = %error, data = %data, "{message}")
            }
            LogLevel::Error => {
                tracing::error!(target: "fedcat::audit", source, ts, error = %error, data = %data, "{message}")
            }
        }
        Ok(())
    }

    fn query(&self, _query: &LogQuery) -> Result<QueryResult<LogEntry>, AuditError> {
        Err(AuditError::QueryNotSupported)
    }
}
