//! # Credential Errors
//!
//! [`DecodeError`] covers every way an envelope can fail before a
//! verification verdict exists: malformed JWS segments, unsupported
//! algorithms, bad signatures, unresolvable keys and credential payloads that
//! do not have the expected shape. A decode failure never produces an audit
//! record; only verdicts do.

use fedcat_core::ValidationError;
use thiserror::Error;

/// Errors from Ed25519 key handling and envelope signing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// Public key bytes or encoding are invalid.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Producing a signed envelope failed.
    #[error("signing failed: {0}")]
    Signing(String),
}

/// Errors from resolving a verification method to a public key.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No key is registered for the verification method or its DID.
    #[error("unknown verification method: {0}")]
    UnknownVerificationMethod(String),

    /// A key was found but could not be used.
    #[error("key for {method} is unusable: {source}")]
    UnusableKey {
        /// The verification method that was resolved.
        method: String,
        /// Why the key was rejected.
        #[source]
        source: KeyError,
    },
}

/// Errors decoding a signed credential envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The envelope was empty after trimming.
    #[error("envelope is empty")]
    EmptyEnvelope,

    /// The envelope is not a well-formed compact JWS.
    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    /// The JWS header names an algorithm other than EdDSA.
    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// The JWS header carries no `kid`.
    #[error("envelope header has no key id")]
    MissingKeyId,

    /// The signing key could not be resolved.
    #[error("key resolution failed: {0}")]
    KeyResolution(#[from] ResolveError),

    /// The signature does not match the envelope contents.
    #[error("invalid signature for key {0}")]
    InvalidSignature(String),

    /// The envelope's `exp` claim lies in the past.
    #[error("envelope has expired")]
    Expired,

    /// The payload is not a credential, VC-JWT wrapper, or presentation.
    #[error("invalid envelope payload: {0}")]
    InvalidPayload(String),

    /// The credential inside the payload does not have the expected shape.
    #[error("invalid credential: {0}")]
    InvalidCredential(String),

    /// The JWS `kid` is not a DID URL.
    #[error("key id {kid} is not a DID URL: {source}")]
    InvalidKeyId {
        /// The offending `kid`.
        kid: String,
        /// Why its DID part was rejected.
        #[source]
        source: ValidationError,
    },

    /// The signing key belongs to a different DID than the credential issuer.
    #[error("envelope signed by {signer} but credential issued by {issuer}")]
    IssuerMismatch {
        /// DID part of the JWS `kid`.
        signer: String,
        /// The credential's `issuer`.
        issuer: String,
    },
}
