use thiserror::Error;

/// Errors from entity storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// The cursor was not produced by this store.
    #[error("invalid cursor: \"{0}\"")]
    InvalidCursor(String),

    /// A page size of zero was requested.
    #[error("page size must be at least 1")]
    InvalidPageSize,

    /// An entity could not be converted to or from its JSON form.
    #[error("entity serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backing store rejected the operation.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
