//! # Verifiable Credential Envelope
//!
//! [`VerifiableCredential`] follows the W3C VC Data Model (v1 and v2 field
//! names). The envelope fields are typed; `credentialSubject` and `evidence`
//! stay as JSON because their shape depends on the credential type and is
//! interpreted by [`crate::claims`].
//!
//! Unknown top-level fields are tolerated: credentials arrive from external
//! compliance services that add their own members.

use serde::{Deserialize, Serialize};

use fedcat_core::{sha256_digest, CanonicalBytes, CanonicalizationError, IntegrityDigest, Timestamp};

/// JSON-LD `@context` value, either a single string or an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContextValue {
    /// Single context URI string.
    Single(String),
    /// Array of context URI strings or objects.
    Array(Vec<serde_json::Value>),
}

impl Default for ContextValue {
    fn default() -> Self {
        Self::Array(vec![serde_json::Value::String(
            "https://www.w3.org/2018/credentials/v1".to_string(),
        )])
    }
}

/// Credential `type` value, either a single string or an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CredentialTypeValue {
    /// Single type string.
    Single(String),
    /// Array of type strings.
    Array(Vec<String>),
}

impl CredentialTypeValue {
    /// All type names, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Array(arr) => arr.iter().map(String::as_str).collect(),
        }
    }

    /// Whether `name` is among the types, with or without the `gx:` prefix.
    pub fn has(&self, name: &str) -> bool {
        self.names()
            .into_iter()
            .any(|t| t == name || t.strip_prefix("gx:") == Some(name))
    }
}

/// A W3C Verifiable Credential as carried inside an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiableCredential {
    /// JSON-LD context URIs.
    #[serde(rename = "@context", default)]
    pub context: ContextValue,

    /// Credential identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Credential type(s).
    #[serde(rename = "type")]
    pub credential_type: CredentialTypeValue,

    /// Identifier of the issuer.
    #[serde(deserialize_with = "issuer_id")]
    pub issuer: String,

    /// Start of validity (`issuanceDate` in VC Data Model v1).
    #[serde(rename = "validFrom", alias = "issuanceDate")]
    pub valid_from: Timestamp,

    /// End of validity (`expirationDate` in VC Data Model v1).
    #[serde(
        rename = "validUntil",
        alias = "expirationDate",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub valid_until: Option<Timestamp>,

    /// The credential subject.
    #[serde(rename = "credentialSubject")]
    pub credential_subject: serde_json::Value,

    /// Evidence metadata attached by the issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub evidence: Option<serde_json::Value>,
}

impl VerifiableCredential {
    /// Parse a credential from its JSON form.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }

    /// The `id` member of the credential subject, if it is a string.
    pub fn subject_id(&self) -> Option<&str> {
        self.credential_subject.get("id").and_then(|v| v.as_str())
    }

    /// Evidence objects, whether `evidence` is a single object or an array.
    pub fn evidence_objects(&self) -> Vec<&serde_json::Value> {
        match &self.evidence {
            Some(serde_json::Value::Array(items)) => items.iter().collect(),
            Some(v @ serde_json::Value::Object(_)) => vec![v],
            _ => Vec::new(),
        }
    }
}

/// A credential bundled alongside the primary credential of a presentation.
///
/// The JSON document is kept exactly as received so integrity digests cover
/// the issuer's bytes rather than a re-serialization.
#[derive(Debug, Clone, PartialEq)]
pub struct BundledCredential {
    /// The typed credential.
    pub credential: VerifiableCredential,
    document: serde_json::Value,
}

impl BundledCredential {
    /// Parse a bundled credential, keeping its original document.
    pub fn from_document(document: serde_json::Value) -> Result<Self, serde_json::Error> {
        let credential = VerifiableCredential::from_value(&document)?;
        Ok(Self {
            credential,
            document,
        })
    }

    /// The credential as received.
    pub fn document(&self) -> &serde_json::Value {
        &self.document
    }

    /// SHA-256 over the JCS form of the received document.
    pub fn integrity(&self) -> Result<IntegrityDigest, CanonicalizationError> {
        Ok(sha256_digest(&CanonicalBytes::new(&self.document)?))
    }
}

/// Accept `issuer` as a string or as an object with an `id`.
fn issuer_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Issuer {
        Id(String),
        Object { id: String },
    }
    Ok(match Issuer::deserialize(deserializer)? {
        Issuer::Id(id) | Issuer::Object { id } => id,
    })
}
