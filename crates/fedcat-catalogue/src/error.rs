//! # Catalogue Error
//!
//! One error type for every catalogue operation. Each variant carries a
//! stable machine-readable kind and a structured context suitable for an
//! audit record or a transport error body.

use fedcat_audit::AuditError;
use fedcat_storage::StorageError;
use fedcat_vc::DecodeError;
use serde_json::json;
use thiserror::Error;

use crate::extract::ExtractError;

/// Errors from registration and query operations.
#[derive(Error, Debug)]
pub enum CatalogueError {
    /// A caller-supplied argument was unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The envelope could not be decoded or its signature did not check.
    #[error("credential could not be decoded: {0}")]
    Decode(#[from] DecodeError),

    /// The credential decoded but the verifier rejected it.
    #[error("credential cannot be verified: {reason}")]
    VerificationFailed { reason: String },

    /// A service description names a provider that is not a participant.
    #[error("service provider {provided_by} is not known as participant")]
    UnknownServiceProvider { provided_by: String },

    /// The verified credential lacks a claim the entry needs.
    #[error("verified credential has malformed claims: {0}")]
    MalformedClaims(#[from] ExtractError),

    /// Entry storage failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The audit sink failed.
    #[error("audit error: {0}")]
    Audit(#[from] AuditError),
}

impl CatalogueError {
    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::Decode(_) => "DECODE_ERROR",
            Self::VerificationFailed { .. } => "VERIFICATION_FAILED",
            Self::UnknownServiceProvider { .. } => "UNKNOWN_SERVICE_PROVIDER",
            Self::MalformedClaims(_) => "MALFORMED_CLAIMS",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Audit(_) => "AUDIT_ERROR",
        }
    }

    /// Structured context: the kind, the message, and variant fields.
    pub fn context(&self) -> serde_json::Value {
        let mut context = json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        match self {
            Self::VerificationFailed { reason } => {
                context["verificationFailureReason"] = json!(reason);
            }
            Self::UnknownServiceProvider { provided_by } => {
                context["providedBy"] = json!(provided_by);
            }
            _ => {}
        }
        context
    }
}
