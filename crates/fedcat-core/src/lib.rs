//! # fedcat-core — Foundational Types for the Federated Catalogue
//!
//! Every other crate in the workspace depends on `fedcat-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** [`Did`] and [`ParticipantId`]
//!    have validated constructors. A participant identifier can only be
//!    produced from a credential subject id, with the fragment stripped.
//!
//! 2. **UTC-only timestamps.** [`Timestamp`] normalizes every instant to UTC
//!    with seconds precision, so validity windows compare and serialize
//!    deterministically.
//!
//! 3. **[`CanonicalBytes`] is the sole input to integrity digests.** Evidence
//!    integrity checks hash the JCS form of a credential, never raw
//!    `serde_json::to_vec()` output.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `fedcat-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, IntegrityDigest};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{strip_fragment, Did, ParticipantId};
pub use temporal::Timestamp;
