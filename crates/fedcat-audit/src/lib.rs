//! # fedcat-audit — Structured Audit Trail
//!
//! The catalogue appends one [`LogEntry`] per verified registration and per
//! rejected credential. Sinks decide where entries go; the entity storage
//! sink can also read them back for review.

pub mod entry;
pub mod error;
pub mod sink;

pub use entry::{ErrorRecord, LogEntry, LogLevel};
pub use error::AuditError;
pub use sink::{AuditSink, EntityStorageAuditSink, LogQuery, LogRecord, TracingAuditSink};
