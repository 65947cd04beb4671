//! # Entry Extraction
//!
//! Builds catalogue entries from verified credentials. Extraction runs only
//! after a positive verdict and reads nothing but claim data; a verified
//! credential that still lacks a required claim is reported as
//! [`ExtractError`] rather than stored half-filled.

use fedcat_core::{ParticipantId, Timestamp, ValidationError};
use fedcat_vc::{
    ComplianceCredential, LegalParticipantClaims, RegistrationNumberClaims,
    ServiceDescriptionCredential, SubCredential, VerificationResult,
};
use thiserror::Error;

use crate::entry::{ParticipantEntry, ServiceDescriptionEntry};

/// A verified credential without the claims an entry needs.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The verdict did not resolve a required sub-credential.
    #[error("verified result lacks a {0} credential")]
    MissingCredential(&'static str),

    /// A required claim is absent or blank.
    #[error("{credential} credential lacks {claim}")]
    MissingClaim {
        credential: &'static str,
        claim: &'static str,
    },

    /// An identifier claim is unusable as a key.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] ValidationError),
}

/// Build the participant entry for a verified compliance credential.
///
/// The participant id is the compliance subject id without its fragment; the
/// trusted issuer is the compliance credential's issuer.
pub fn participant_entry(
    credential: &ComplianceCredential,
    result: &VerificationResult,
    now: Timestamp,
) -> Result<ParticipantEntry, ExtractError> {
    let participant = legal_participant(result)?;
    let registration = registration_number(result)?;

    let legal_name = required(
        participant.legal_name.as_deref(),
        "LegalParticipant",
        "legal name",
    )?;
    let registration_number = required(
        registration.registration_number(),
        "legalRegistrationNumber",
        "registration number",
    )?;
    let lrn_type = required(
        registration.lrn_type(),
        "legalRegistrationNumber",
        "registration number type",
    )?;
    let country_code = required(
        registration.country_code.as_deref(),
        "legalRegistrationNumber",
        "country code",
    )?;

    Ok(ParticipantEntry {
        participant_id: ParticipantId::from_subject_id(&credential.subject.id)?,
        lrn_type,
        registration_number,
        legal_name,
        trusted_issuer_id: credential.issuer().to_string(),
        country_code,
        valid_from: credential.valid_from(),
        valid_until: credential.valid_until(),
        date_created: now,
        evidences: credential
            .subject
            .evidence
            .iter()
            .map(|e| e.id.clone())
            .collect(),
    })
}

/// The participant a service description credential names as its provider.
pub fn service_provider(
    credential: &ServiceDescriptionCredential,
) -> Result<ParticipantId, ExtractError> {
    let provided_by = required(
        credential.subject.provided_by.as_deref(),
        "ServiceOffering",
        "providedBy",
    )?;
    Ok(ParticipantId::from_subject_id(&provided_by)?)
}

/// Build the service description entry for a verified credential whose
/// provider has already been resolved.
pub fn service_description_entry(
    credential: &ServiceDescriptionCredential,
    provided_by: ParticipantId,
    now: Timestamp,
) -> Result<ServiceDescriptionEntry, ExtractError> {
    let subject = &credential.subject;
    let service_id = required(Some(subject.id.as_str()), "ServiceOffering", "id")?;
    let service_policy = required(
        subject.service_policy.as_deref(),
        "ServiceOffering",
        "service policy",
    )?;
    let name = required(subject.name.as_deref(), "ServiceOffering", "name")?;
    let endpoint_url = required(subject.endpoint_url(), "ServiceOffering", "endpoint URL")?;

    Ok(ServiceDescriptionEntry {
        service_id,
        provided_by,
        service_policy,
        name,
        endpoint_url,
        valid_from: credential.valid_from(),
        valid_until: credential.valid_until(),
        date_created: now,
        evidences: credential.id().map(str::to_string).into_iter().collect(),
    })
}

fn legal_participant(result: &VerificationResult) -> Result<&LegalParticipantClaims, ExtractError> {
    result
        .credential("LegalParticipant")
        .and_then(SubCredential::as_legal_participant)
        .ok_or(ExtractError::MissingCredential("LegalParticipant"))
}

fn registration_number(
    result: &VerificationResult,
) -> Result<&RegistrationNumberClaims, ExtractError> {
    result
        .credential("legalRegistrationNumber")
        .and_then(SubCredential::as_registration_number)
        .ok_or(ExtractError::MissingCredential("legalRegistrationNumber"))
}

fn required(
    value: Option<&str>,
    credential: &'static str,
    claim: &'static str,
) -> Result<String, ExtractError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ExtractError::MissingClaim { credential, claim }),
    }
}
