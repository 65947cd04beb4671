//! # Typed Claim IR
//!
//! Decoding turns an envelope into one of two typed credentials:
//!
//! - [`ComplianceCredential`]: a compliance attestation whose subject lists
//!   evidence references, plus the bundled credentials those references
//!   point at.
//! - [`ServiceDescriptionCredential`]: a self-description of a service
//!   offering.
//!
//! Verification resolves bundled credentials into [`SubCredential`]s keyed by
//! [`SubjectClaims::type_name`]. Claim names use the Gaia-X `gx:` prefix;
//! unprefixed names are accepted as aliases. A subject carrying several
//! spellings of one claim is read through its `gx:` spelling. Claim members
//! are optional at this layer: whether a verified credential carries enough
//! data to build a catalogue entry is decided by the extraction step.

use std::collections::{BTreeMap, BTreeSet};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fedcat_core::Timestamp;

use crate::credential::{BundledCredential, VerifiableCredential};
use crate::envelope::DecodedEnvelope;
use crate::error::DecodeError;

// ---------------------------------------------------------------------------
// Compliance credential
// ---------------------------------------------------------------------------

/// One entry of a compliance subject's `gx:evidence` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceRef {
    /// Identifier of the referenced credential.
    pub id: String,
    /// Declared type of the referenced credential.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub evidence_type: Option<String>,
    /// `sha256-<hex>` digest of the referenced credential.
    #[serde(
        rename = "gx:integrity",
        alias = "integrity",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub integrity: Option<String>,
}

/// Subject of a compliance credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceSubject {
    /// Subject identifier; may carry a `#fragment`.
    pub id: String,
    /// Evidence references, in issuer order.
    #[serde(
        rename = "gx:evidence",
        alias = "evidence",
        default,
        deserialize_with = "one_or_many"
    )]
    pub evidence: Vec<EvidenceRef>,
}

/// A decoded compliance credential with its bundled evidence credentials.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplianceCredential {
    /// The compliance credential itself.
    pub credential: VerifiableCredential,
    /// Its typed subject.
    pub subject: ComplianceSubject,
    /// Credentials bundled in the same presentation.
    pub bundled: Vec<BundledCredential>,
}

impl ComplianceCredential {
    /// Type a decoded envelope as a compliance credential.
    pub fn from_envelope(envelope: DecodedEnvelope) -> Result<Self, DecodeError> {
        let credential = VerifiableCredential::from_value(&envelope.primary)
            .map_err(|e| DecodeError::InvalidCredential(e.to_string()))?;
        let subject = subject_claims::<ComplianceSubject>(&credential.credential_subject)
            .map_err(|e| DecodeError::InvalidCredential(format!("compliance subject: {e}")))?;
        let bundled = envelope
            .bundled
            .into_iter()
            .map(BundledCredential::from_document)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DecodeError::InvalidCredential(format!("bundled credential: {e}")))?;
        Ok(Self {
            credential,
            subject,
            bundled,
        })
    }

    /// Credential identifier, if any.
    pub fn id(&self) -> Option<&str> {
        self.credential.id.as_deref()
    }

    /// Issuer of the compliance credential.
    pub fn issuer(&self) -> &str {
        &self.credential.issuer
    }

    /// Start of validity.
    pub fn valid_from(&self) -> Timestamp {
        self.credential.valid_from
    }

    /// End of validity, if bounded.
    pub fn valid_until(&self) -> Option<Timestamp> {
        self.credential.valid_until
    }

    /// Find a bundled credential by its `id`.
    pub fn find_bundled(&self, id: &str) -> Option<&BundledCredential> {
        self.bundled
            .iter()
            .find(|b| b.credential.id.as_deref() == Some(id))
    }
}

// ---------------------------------------------------------------------------
// Service description credential
// ---------------------------------------------------------------------------

/// Endpoint of a service offering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEndpoint {
    /// Endpoint URL.
    #[serde(
        rename = "endpointURL",
        alias = "gx:endpointURL",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub endpoint_url: Option<String>,
}

/// Claims of a service offering subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceOfferingClaims {
    /// Service identifier.
    pub id: String,
    /// Participant offering the service.
    #[serde(
        rename = "gx:providedBy",
        alias = "providedBy",
        default,
        deserialize_with = "optional_reference",
        skip_serializing_if = "Option::is_none"
    )]
    pub provided_by: Option<String>,
    /// Policy reference governing the service.
    #[serde(
        rename = "gx:servicePolicy",
        alias = "servicePolicy",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub service_policy: Option<String>,
    /// Human-readable service name.
    #[serde(
        rename = "gx:name",
        alias = "name",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,
    /// Service endpoint.
    #[serde(
        rename = "gx:endpoint",
        alias = "endpoint",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub endpoint: Option<ServiceEndpoint>,
}

impl ServiceOfferingClaims {
    /// Endpoint URL, if declared.
    pub fn endpoint_url(&self) -> Option<&str> {
        self.endpoint.as_ref()?.endpoint_url.as_deref()
    }
}

/// A decoded service description credential.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDescriptionCredential {
    /// The service description credential itself.
    pub credential: VerifiableCredential,
    /// Its typed subject.
    pub subject: ServiceOfferingClaims,
}

impl ServiceDescriptionCredential {
    /// Type a decoded envelope as a service description credential.
    ///
    /// Bundled credentials are ignored.
    pub fn from_envelope(envelope: DecodedEnvelope) -> Result<Self, DecodeError> {
        let credential = VerifiableCredential::from_value(&envelope.primary)
            .map_err(|e| DecodeError::InvalidCredential(e.to_string()))?;
        let subject = subject_claims::<ServiceOfferingClaims>(&credential.credential_subject)
            .map_err(|e| DecodeError::InvalidCredential(format!("service subject: {e}")))?;
        Ok(Self {
            credential,
            subject,
        })
    }

    /// Credential identifier, if any.
    pub fn id(&self) -> Option<&str> {
        self.credential.id.as_deref()
    }

    /// Issuer of the credential.
    pub fn issuer(&self) -> &str {
        &self.credential.issuer
    }

    /// Start of validity.
    pub fn valid_from(&self) -> Timestamp {
        self.credential.valid_from
    }

    /// End of validity, if bounded.
    pub fn valid_until(&self) -> Option<Timestamp> {
        self.credential.valid_until
    }
}

// ---------------------------------------------------------------------------
// Sub-credentials
// ---------------------------------------------------------------------------

/// Claims of a legal participant credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegalParticipantClaims {
    /// Participant identifier; may carry a `#fragment`.
    pub id: String,
    /// Registered legal name.
    #[serde(
        rename = "gx:legalName",
        alias = "legalName",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub legal_name: Option<String>,
}

/// Claims of a legal registration number credential.
///
/// At most one registration number is expected; when several are present
/// [`registration_number`](Self::registration_number) picks the first in
/// field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationNumberClaims {
    /// Subject identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Tax identifier.
    #[serde(
        rename = "gx:taxID",
        alias = "gx:taxId",
        alias = "taxID",
        alias = "taxId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub tax_id: Option<String>,
    /// VAT identifier.
    #[serde(
        rename = "gx:vatID",
        alias = "gx:vatId",
        alias = "vatID",
        alias = "vatId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vat_id: Option<String>,
    /// EORI number.
    #[serde(
        rename = "gx:EORI",
        alias = "EORI",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub eori: Option<String>,
    /// Legal Entity Identifier.
    #[serde(
        rename = "gx:leiCode",
        alias = "leiCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub lei_code: Option<String>,
    /// Local registration number.
    #[serde(
        rename = "gx:local",
        alias = "local",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub local: Option<String>,
    /// ISO 3166 country code of the registration.
    #[serde(
        rename = "gx:countryCode",
        alias = "countryCode",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub country_code: Option<String>,
    /// Registration number type declared in the credential's evidence.
    #[serde(
        rename = "gx:evidenceOf",
        default,
        skip_deserializing,
        skip_serializing_if = "Option::is_none"
    )]
    pub evidence_of: Option<String>,
}

impl RegistrationNumberClaims {
    /// The first registration number present.
    pub fn registration_number(&self) -> Option<&str> {
        [
            &self.tax_id,
            &self.vat_id,
            &self.eori,
            &self.lei_code,
            &self.local,
        ]
        .into_iter()
        .find_map(|v| v.as_deref())
    }

    /// Registration number type, as declared by the credential's evidence
    /// (`gx:evidenceOf`). The number claims never imply a type: a `taxId`
    /// may be evidenced as a `VATID`.
    pub fn lrn_type(&self) -> Option<&str> {
        self.evidence_of.as_deref()
    }
}

/// Claims of a resolved sub-credential, one variant per supported kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "credentialSubject")]
pub enum SubjectClaims {
    /// A legal participant self-description.
    LegalParticipant(LegalParticipantClaims),
    /// A notarized legal registration number.
    #[serde(rename = "legalRegistrationNumber")]
    LegalRegistrationNumber(RegistrationNumberClaims),
    /// A service offering self-description.
    ServiceOffering(ServiceOfferingClaims),
}

impl SubjectClaims {
    /// Key of this kind in a verification result's credential map.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::LegalParticipant(_) => "LegalParticipant",
            Self::LegalRegistrationNumber(_) => "legalRegistrationNumber",
            Self::ServiceOffering(_) => "ServiceOffering",
        }
    }
}

/// A credential resolved during verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubCredential {
    /// Credential identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Issuer of the credential.
    pub issuer: String,
    /// Typed subject claims.
    #[serde(flatten)]
    pub claims: SubjectClaims,
}

impl SubCredential {
    /// Type a credential by its declared type (on the credential or its
    /// subject). Returns `Ok(None)` for kinds the catalogue does not use.
    pub fn classify(vc: &VerifiableCredential) -> Result<Option<Self>, serde_json::Error> {
        let claims = if declares_type(vc, "LegalParticipant") {
            SubjectClaims::LegalParticipant(subject_claims(&vc.credential_subject)?)
        } else if declares_type(vc, "legalRegistrationNumber") {
            let mut claims: RegistrationNumberClaims = subject_claims(&vc.credential_subject)?;
            claims.evidence_of = vc.evidence_objects().into_iter().find_map(|e| {
                e.get("gx:evidenceOf")
                    .or_else(|| e.get("evidenceOf"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            });
            SubjectClaims::LegalRegistrationNumber(claims)
        } else if declares_type(vc, "ServiceOffering") {
            SubjectClaims::ServiceOffering(subject_claims(&vc.credential_subject)?)
        } else {
            return Ok(None);
        };
        Ok(Some(Self {
            id: vc.id.clone(),
            issuer: vc.issuer.clone(),
            claims,
        }))
    }

    /// Legal participant claims, if this is one.
    pub fn as_legal_participant(&self) -> Option<&LegalParticipantClaims> {
        match &self.claims {
            SubjectClaims::LegalParticipant(c) => Some(c),
            _ => None,
        }
    }

    /// Registration number claims, if this is one.
    pub fn as_registration_number(&self) -> Option<&RegistrationNumberClaims> {
        match &self.claims {
            SubjectClaims::LegalRegistrationNumber(c) => Some(c),
            _ => None,
        }
    }

    /// Service offering claims, if this is one.
    pub fn as_service_offering(&self) -> Option<&ServiceOfferingClaims> {
        match &self.claims {
            SubjectClaims::ServiceOffering(c) => Some(c),
            _ => None,
        }
    }
}

/// Gaia-X puts the kind either on the credential `type` or on the subject's.
fn declares_type(vc: &VerifiableCredential, name: &str) -> bool {
    if vc.credential_type.has(name) {
        return true;
    }
    let matches = |t: &str| t == name || t.strip_prefix("gx:") == Some(name);
    match vc.credential_subject.get("type") {
        Some(serde_json::Value::String(t)) => matches(t),
        Some(serde_json::Value::Array(ts)) => ts.iter().filter_map(|t| t.as_str()).any(matches),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

/// Deserialize a credential subject after [`collapse_spellings`].
fn subject_claims<T: DeserializeOwned>(subject: &Value) -> Result<T, serde_json::Error> {
    T::deserialize(collapse_spellings(subject))
}

/// Keep one spelling per claim so renamed and aliased fields never meet a
/// duplicate. Keys that differ only by the `gx:` prefix or ASCII case form
/// one group; the prefixed spelling wins, then the lexicographically first.
fn collapse_spellings(subject: &Value) -> Value {
    let Value::Object(map) = subject else {
        return subject.clone();
    };
    let mut chosen: BTreeMap<String, &str> = BTreeMap::new();
    for key in map.keys() {
        let base = key.strip_prefix("gx:").unwrap_or(key).to_ascii_lowercase();
        let rank = |k: &str| (!k.starts_with("gx:"), k.to_string());
        chosen
            .entry(base)
            .and_modify(|kept| {
                if rank(key) < rank(kept) {
                    *kept = key.as_str();
                }
            })
            .or_insert(key.as_str());
    }
    let keep: BTreeSet<&str> = chosen.into_values().collect();
    Value::Object(
        map.iter()
            .filter(|(k, _)| keep.contains(k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
    )
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        Many(Vec<T>),
        One(T),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(v) => v,
        OneOrMany::One(t) => vec![t],
    })
}

/// A participant reference, either a bare id or `{ "id": ... }`.
fn optional_reference<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Reference {
        Id(String),
        Object { id: String },
    }
    Ok(Option::<Reference>::deserialize(deserializer)?.map(|r| match r {
        Reference::Id(id) | Reference::Object { id } => id,
    }))
}
