use fedcat_storage::StorageError;
use thiserror::Error;

/// Errors from audit sinks.
#[derive(Error, Debug)]
pub enum AuditError {
    /// The sink can append but not read back.
    #[error("audit sink does not support queries")]
    QueryNotSupported,

    /// The underlying entity storage failed.
    #[error("audit storage failed: {0}")]
    Storage(#[from] StorageError),

    /// A stored payload could not be encoded or decoded.
    #[error("audit payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A level name was not one of `debug|info|warn|error|trace`.
    #[error("unknown log level: \"{0}\"")]
    UnknownLevel(String),
}
