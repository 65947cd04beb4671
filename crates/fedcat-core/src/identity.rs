//! # Identifier Newtypes
//!
//! [`Did`] validates W3C DID syntax at construction. [`ParticipantId`] is the
//! catalogue's primary key for participants and can only be derived from a
//! credential subject identifier, with any `#fragment` suffix removed.
//!
//! Compliance services commonly return the subject id with a fragment
//! appended (`did:web:example.com#participant`), while the participant's own
//! credentials use the bare id. Stripping the fragment in one place keeps the
//! participant store keyed consistently.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Return `id` with any `#fragment` suffix removed.
pub fn strip_fragment(id: &str) -> &str {
    match id.split_once('#') {
        Some((base, _)) => base,
        None => id,
    }
}

// ---------------------------------------------------------------------------
// Did
// ---------------------------------------------------------------------------

/// A W3C Decentralized Identifier (`did:method:identifier`).
///
/// The method must be non-empty lowercase alphanumeric and the
/// method-specific identifier non-empty. DID URLs (with a `#fragment`) are
/// rejected; use [`Did::from_did_url`] to parse the DID part of a
/// verification method.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Create a DID from a string, validating format.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Parse the DID part of a DID URL such as `did:web:example.com#key-1`.
    pub fn from_did_url(url: &str) -> Result<Self, ValidationError> {
        Self::new(strip_fragment(url))
    }

    fn validate(s: &str) -> Result<(), ValidationError> {
        let invalid = || ValidationError::InvalidDid(s.to_string());

        let rest = s.strip_prefix("did:").ok_or_else(invalid)?;
        let (method, identifier) = rest.split_once(':').ok_or_else(invalid)?;

        if method.is_empty()
            || !method
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        {
            return Err(invalid());
        }
        if identifier.is_empty() || identifier.contains('#') {
            return Err(invalid());
        }
        Ok(())
    }

    /// Access the DID string value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the DID method (the part between the first and second colons).
    pub fn method(&self) -> &str {
        self.0
            .strip_prefix("did:")
            .and_then(|rest| rest.split_once(':'))
            .map(|(method, _)| method)
            .unwrap_or_default()
    }
}

impl TryFrom<String> for Did {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Did> for String {
    fn from(did: Did) -> Self {
        did.0
    }
}

impl std::fmt::Display for Did {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// ParticipantId
// ---------------------------------------------------------------------------

/// Primary key of a participant entry.
///
/// Participant identifiers are not required to be DIDs (Gaia-X participants
/// are frequently identified by HTTPS URLs), but they are never empty and
/// never carry a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Derive a participant id from a credential subject id.
    pub fn from_subject_id(subject_id: &str) -> Result<Self, ValidationError> {
        let base = strip_fragment(subject_id.trim());
        if base.is_empty() {
            return Err(ValidationError::EmptyIdentifier {
                field: "participant id",
            });
        }
        Ok(Self(base.to_string()))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned identifier string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
