//! # fedcat-vc — Signed Credentials for the Federated Catalogue
//!
//! Turns a signed envelope into a typed, verified claim graph.
//!
//! - **credential**: W3C Verifiable Credential envelope and bundled
//!   credentials with integrity digests.
//! - **claims**: typed claim IR (compliance, service description, and the
//!   sub-credentials a compliance credential resolves to).
//! - **keys**: Ed25519 public keys and key pairs.
//! - **envelope**: compact JWS (EdDSA) decoding and signing.
//! - **resolver**: verification method → public key.
//! - **verification**: the [`CredentialVerifier`] port and the default
//!   [`GaiaxVerifier`].

pub mod claims;
pub mod credential;
pub mod envelope;
pub mod error;
pub mod keys;
pub mod resolver;
pub mod verification;

pub use claims::{
    ComplianceCredential, ComplianceSubject, EvidenceRef, LegalParticipantClaims,
    RegistrationNumberClaims, ServiceDescriptionCredential, ServiceEndpoint,
    ServiceOfferingClaims, SubCredential, SubjectClaims,
};
pub use credential::{BundledCredential, ContextValue, CredentialTypeValue, VerifiableCredential};
pub use envelope::{DecodedEnvelope, EnvelopeDecoder, EnvelopeSigner};
pub use error::{DecodeError, KeyError, ResolveError};
pub use keys::{Ed25519KeyPair, Ed25519PublicKey};
pub use resolver::{KeyResolver, StaticKeyResolver};
pub use verification::{CredentialVerifier, GaiaxVerifier, VerificationResult};
