//! # Error Hierarchy
//!
//! Validation and canonicalization errors shared by every crate in the
//! workspace, built with `thiserror`. Each variant carries the rejected input
//! and the expected form so operators can diagnose bad credentials without
//! re-running the ingestion.

use thiserror::Error;

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for identifier and temporal newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// DID does not conform to W3C DID syntax (did:method:identifier).
    #[error("invalid DID format: \"{0}\" (expected did:<method>:<identifier>)")]
    InvalidDid(String),

    /// A required identifier was empty after normalization.
    #[error("{field} must be non-empty")]
    EmptyIdentifier {
        /// Which identifier was empty.
        field: &'static str,
    },

    /// Timestamp string is not valid RFC 3339.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Integrity digest string is not `sha256-<64 hex chars>`.
    #[error("invalid integrity digest: \"{0}\" (expected sha256-<hex>)")]
    InvalidDigest(String),
}
