//! # Credential Verification
//!
//! [`CredentialVerifier`] is the port the catalogue pipeline calls to turn an
//! envelope into a typed credential and a [`VerificationResult`]. Decoding
//! failures are errors; rule violations are verdicts with
//! `verified == false` and a reason.
//!
//! [`GaiaxVerifier`] is the default adapter. It decodes compact JWS envelopes
//! through an [`EnvelopeDecoder`] and applies these rules:
//!
//! **Compliance credentials**
//! 1. The issuer is in the trusted-issuer set.
//! 2. The credential is within its validity window.
//! 3. The subject lists at least one evidence reference, and every reference
//!    resolves to a bundled credential whose JCS digest matches the
//!    reference's `gx:integrity`, when one is given.
//! 4. The resolved credentials include a `LegalParticipant` and a
//!    `legalRegistrationNumber`.
//! 5. The legal participant is the compliance subject (fragments ignored).
//!
//! **Service description credentials**
//! 1. The issuer is trusted, or is the providing participant itself.
//! 2. The credential is within its validity window.
//! 3. The credential is typed `ServiceOffering`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use fedcat_core::{strip_fragment, IntegrityDigest, Timestamp};

use crate::claims::{ComplianceCredential, ServiceDescriptionCredential, SubCredential, SubjectClaims};
use crate::envelope::EnvelopeDecoder;
use crate::error::DecodeError;
use crate::resolver::KeyResolver;

/// Outcome of verifying a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    /// Whether every rule passed.
    pub verified: bool,
    /// First rule violation, when not verified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verification_failure_reason: Option<String>,
    /// Resolved sub-credentials keyed by type name, when verified.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub credentials: BTreeMap<String, SubCredential>,
}

impl VerificationResult {
    /// A successful verdict.
    pub fn success(credentials: BTreeMap<String, SubCredential>) -> Self {
        Self {
            verified: true,
            verification_failure_reason: None,
            credentials,
        }
    }

    /// A failed verdict.
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            verified: false,
            verification_failure_reason: Some(reason.into()),
            credentials: BTreeMap::new(),
        }
    }

    /// Resolved credential of the given type name.
    pub fn credential(&self, type_name: &str) -> Option<&SubCredential> {
        self.credentials.get(type_name)
    }
}

/// Decodes and verifies signed credentials.
pub trait CredentialVerifier: Send + Sync {
    /// Decode a compliance credential envelope.
    fn decode_compliance(&self, envelope: &str) -> Result<ComplianceCredential, DecodeError>;

    /// Verify a decoded compliance credential.
    fn verify_compliance(&self, credential: &ComplianceCredential) -> VerificationResult;

    /// Decode a service description credential envelope.
    fn decode_service_description(
        &self,
        envelope: &str,
    ) -> Result<ServiceDescriptionCredential, DecodeError>;

    /// Verify a decoded service description credential.
    fn verify_service_description(
        &self,
        credential: &ServiceDescriptionCredential,
    ) -> VerificationResult;
}

// ---------------------------------------------------------------------------
// GaiaxVerifier
// ---------------------------------------------------------------------------

/// Default verifier for Gaia-X style credentials in JWS envelopes.
#[derive(Debug, Clone)]
pub struct GaiaxVerifier {
    decoder: EnvelopeDecoder,
    trusted_issuers: BTreeSet<String>,
}

impl GaiaxVerifier {
    /// Create a verifier resolving keys through `resolver` and trusting the
    /// given issuers.
    pub fn new<I, S>(resolver: Arc<dyn KeyResolver>, trusted_issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            decoder: EnvelopeDecoder::new(resolver),
            trusted_issuers: trusted_issuers.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `issuer` is in the trusted set.
    pub fn is_trusted(&self, issuer: &str) -> bool {
        self.trusted_issuers.contains(issuer)
    }

    /// Verify a compliance credential as of `now`.
    pub fn verify_compliance_at(
        &self,
        credential: &ComplianceCredential,
        now: Timestamp,
    ) -> VerificationResult {
        match self.check_compliance(credential, now) {
            Ok(credentials) => VerificationResult::success(credentials),
            Err(reason) => {
                tracing::debug!(%reason, "compliance credential rejected");
                VerificationResult::failure(reason)
            }
        }
    }

    /// Verify a service description credential as of `now`.
    pub fn verify_service_description_at(
        &self,
        credential: &ServiceDescriptionCredential,
        now: Timestamp,
    ) -> VerificationResult {
        match self.check_service_description(credential, now) {
            Ok(credentials) => VerificationResult::success(credentials),
            Err(reason) => {
                tracing::debug!(%reason, "service description credential rejected");
                VerificationResult::failure(reason)
            }
        }
    }

    fn check_compliance(
        &self,
        credential: &ComplianceCredential,
        now: Timestamp,
    ) -> Result<BTreeMap<String, SubCredential>, String> {
        if !self.is_trusted(credential.issuer()) {
            return Err(format!(
                "issuer {} is not a trusted issuer",
                credential.issuer()
            ));
        }
        check_validity(credential.valid_from(), credential.valid_until(), now)?;

        if credential.subject.evidence.is_empty() {
            return Err("compliance credential lists no evidence".to_string());
        }

        let mut credentials = BTreeMap::new();
        for evidence in &credential.subject.evidence {
            let bundled = credential
                .find_bundled(&evidence.id)
                .ok_or_else(|| format!("evidence {} is not bundled with the credential", evidence.id))?;

            if let Some(expected) = &evidence.integrity {
                let expected = IntegrityDigest::parse(expected)
                    .map_err(|e| format!("evidence {}: {e}", evidence.id))?;
                let actual = bundled
                    .integrity()
                    .map_err(|e| format!("evidence {}: {e}", evidence.id))?;
                if actual != expected {
                    return Err(format!(
                        "integrity mismatch for evidence {}: expected {expected}, computed {actual}",
                        evidence.id
                    ));
                }
            }

            let sub = SubCredential::classify(&bundled.credential)
                .map_err(|e| format!("evidence {} has malformed claims: {e}", evidence.id))?;
            if let Some(sub) = sub {
                let key = sub.claims.type_name();
                if credentials.insert(key.to_string(), sub).is_some() {
                    return Err(format!("evidence lists more than one {key} credential"));
                }
            }
        }

        let participant = credentials
            .get("LegalParticipant")
            .and_then(SubCredential::as_legal_participant)
            .ok_or_else(|| "evidence lacks a LegalParticipant credential".to_string())?;
        if !credentials.contains_key("legalRegistrationNumber") {
            return Err("evidence lacks a legalRegistrationNumber credential".to_string());
        }
        if strip_fragment(&participant.id) != strip_fragment(&credential.subject.id) {
            return Err(format!(
                "legal participant {} is not the compliance subject {}",
                participant.id, credential.subject.id
            ));
        }

        Ok(credentials)
    }

    fn check_service_description(
        &self,
        credential: &ServiceDescriptionCredential,
        now: Timestamp,
    ) -> Result<BTreeMap<String, SubCredential>, String> {
        let issuer = credential.issuer();
        let self_issued = credential.subject.provided_by.as_deref().map(strip_fragment) == Some(issuer);
        if !self.is_trusted(issuer) && !self_issued {
            return Err(format!(
                "issuer {issuer} is neither trusted nor the service provider"
            ));
        }
        check_validity(credential.valid_from(), credential.valid_until(), now)?;

        if !credential.credential.credential_type.has("ServiceOffering") {
            return Err("credential is not a ServiceOffering".to_string());
        }
        let sub = SubCredential {
            id: credential.credential.id.clone(),
            issuer: issuer.to_string(),
            claims: SubjectClaims::ServiceOffering(credential.subject.clone()),
        };
        Ok(BTreeMap::from([(sub.claims.type_name().to_string(), sub)]))
    }
}

fn check_validity(
    valid_from: Timestamp,
    valid_until: Option<Timestamp>,
    now: Timestamp,
) -> Result<(), String> {
    if valid_from > now {
        return Err(format!("credential is not valid before {valid_from}"));
    }
    if let Some(until) = valid_until {
        if now > until {
            return Err(format!("credential expired at {until}"));
        }
    }
    Ok(())
}

impl CredentialVerifier for GaiaxVerifier {
    fn decode_compliance(&self, envelope: &str) -> Result<ComplianceCredential, DecodeError> {
        ComplianceCredential::from_envelope(self.decoder.decode(envelope)?)
    }

    fn verify_compliance(&self, credential: &ComplianceCredential) -> VerificationResult {
        self.verify_compliance_at(credential, Timestamp::now())
    }

    fn decode_service_description(
        &self,
        envelope: &str,
    ) -> Result<ServiceDescriptionCredential, DecodeError> {
        ServiceDescriptionCredential::from_envelope(self.decoder.decode(envelope)?)
    }

    fn verify_service_description(
        &self,
        credential: &ServiceDescriptionCredential,
    ) -> VerificationResult {
        self.verify_service_description_at(credential, Timestamp::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::DecodedEnvelope;
    use crate::resolver::StaticKeyResolver;
    use fedcat_core::{sha256_digest, CanonicalBytes};
    use serde_json::{json, Value};

    const ISSUER: &str = "did:example:issuer1";

    fn verifier() -> GaiaxVerifier {
        GaiaxVerifier::new(Arc::new(StaticKeyResolver::new()), [ISSUER])
    }

    fn now() -> Timestamp {
        Timestamp::parse("2026-03-01T00:00:00Z").unwrap()
    }

    fn legal_participant() -> Value {
        json!({
            "id": "https://abc.test/lp.json",
            "type": ["VerifiableCredential", "gx:LegalParticipant"],
            "issuer": "did:example:abc",
            "validFrom": "2026-01-01T00:00:00Z",
            "credentialSubject": {"id": "did:example:abc", "gx:legalName": "ACME GmbH"}
        })
    }

    fn registration_number() -> Value {
        json!({
            "id": "https://notary.test/lrn.json",
            "type": ["VerifiableCredential"],
            "issuer": "did:example:notary",
            "validFrom": "2026-01-01T00:00:00Z",
            "credentialSubject": {
                "id": "did:example:abc#lrn",
                "type": "gx:legalRegistrationNumber",
                "gx:taxId": "DE123",
                "gx:countryCode": "DE"
            },
            "evidence": {"gx:evidenceOf": "VATID"}
        })
    }

    fn compliance(evidence: Value, bundled: Vec<Value>) -> ComplianceCredential {
        ComplianceCredential::from_envelope(DecodedEnvelope {
            verification_method: format!("{ISSUER}#key-1"),
            primary: json!({
                "id": "https://compliance.test/cc.json",
                "type": ["VerifiableCredential", "gx:compliance"],
                "issuer": ISSUER,
                "validFrom": "2026-02-01T00:00:00Z",
                "validUntil": "2026-05-01T00:00:00Z",
                "credentialSubject": {"id": "did:example:abc#participant", "gx:evidence": evidence}
            }),
            bundled,
        })
        .unwrap()
    }

    fn valid_compliance() -> ComplianceCredential {
        compliance(
            json!([{"id": "https://abc.test/lp.json"}, {"id": "https://notary.test/lrn.json"}]),
            vec![legal_participant(), registration_number()],
        )
    }

    #[test]
    fn valid_compliance_resolves_both_sub_credentials() {
        let result = verifier().verify_compliance_at(&valid_compliance(), now());
        assert!(result.verified, "{:?}", result.verification_failure_reason);
        assert!(result.credential("LegalParticipant").is_some());
        let lrn = result
            .credential("legalRegistrationNumber")
            .and_then(SubCredential::as_registration_number)
            .unwrap();
        assert_eq!(lrn.registration_number(), Some("DE123"));
        assert_eq!(lrn.lrn_type(), Some("VATID"));
    }

    #[test]
    fn untrusted_issuer_is_rejected() {
        let v = GaiaxVerifier::new(Arc::new(StaticKeyResolver::new()), ["did:example:other"]);
        let result = v.verify_compliance_at(&valid_compliance(), now());
        assert!(!result.verified);
        assert!(result
            .verification_failure_reason
            .unwrap()
            .contains("not a trusted issuer"));
        assert!(result.credentials.is_empty());
    }

    #[test]
    fn validity_window_is_enforced() {
        let before = Timestamp::parse("2026-01-15T00:00:00Z").unwrap();
        let after = Timestamp::parse("2026-06-01T00:00:00Z").unwrap();
        assert!(!verifier().verify_compliance_at(&valid_compliance(), before).verified);
        assert!(!verifier().verify_compliance_at(&valid_compliance(), after).verified);
        let edge = Timestamp::parse("2026-05-01T00:00:00Z").unwrap();
        assert!(verifier().verify_compliance_at(&valid_compliance(), edge).verified);
    }

    #[test]
    fn missing_or_unbundled_evidence_is_rejected() {
        let none = compliance(json!([]), vec![legal_participant(), registration_number()]);
        assert!(!verifier().verify_compliance_at(&none, now()).verified);

        let unbundled = compliance(
            json!([{"id": "https://abc.test/lp.json"}, {"id": "https://nowhere.test/x"}]),
            vec![legal_participant(), registration_number()],
        );
        let result = verifier().verify_compliance_at(&unbundled, now());
        assert!(result
            .verification_failure_reason
            .unwrap()
            .contains("https://nowhere.test/x"));
    }

    #[test]
    fn missing_registration_number_is_rejected() {
        let cc = compliance(json!([{"id": "https://abc.test/lp.json"}]), vec![legal_participant()]);
        let result = verifier().verify_compliance_at(&cc, now());
        assert!(!result.verified);
        assert!(result
            .verification_failure_reason
            .unwrap()
            .contains("legalRegistrationNumber"));
    }

    #[test]
    fn integrity_digest_is_checked() {
        let lp = legal_participant();
        let good = sha256_digest(&CanonicalBytes::new(&lp).unwrap()).to_string();
        let cc = compliance(
            json!([
                {"id": "https://abc.test/lp.json", "gx:integrity": good},
                {"id": "https://notary.test/lrn.json"}
            ]),
            vec![lp.clone(), registration_number()],
        );
        assert!(verifier().verify_compliance_at(&cc, now()).verified);

        let wrong = format!("sha256-{}", "ab".repeat(32));
        let cc = compliance(
            json!([
                {"id": "https://abc.test/lp.json", "gx:integrity": wrong},
                {"id": "https://notary.test/lrn.json"}
            ]),
            vec![lp, registration_number()],
        );
        let result = verifier().verify_compliance_at(&cc, now());
        assert!(result
            .verification_failure_reason
            .unwrap()
            .contains("integrity mismatch"));
    }

    #[test]
    fn participant_must_be_the_subject() {
        let mut lp = legal_participant();
        lp["credentialSubject"]["id"] = json!("did:example:someone-else");
        let cc = compliance(
            json!([{"id": "https://abc.test/lp.json"}, {"id": "https://notary.test/lrn.json"}]),
            vec![lp, registration_number()],
        );
        let result = verifier().verify_compliance_at(&cc, now());
        assert!(!result.verified);
        assert!(result
            .verification_failure_reason
            .unwrap()
            .contains("not the compliance subject"));
    }

    fn service(issuer: &str, types: Value) -> ServiceDescriptionCredential {
        ServiceDescriptionCredential::from_envelope(DecodedEnvelope {
            verification_method: format!("{issuer}#key-1"),
            primary: json!({
                "id": "https://abc.test/so.json",
                "type": types,
                "issuer": issuer,
                "validFrom": "2026-02-01T00:00:00Z",
                "credentialSubject": {
                    "id": "https://abc.test/services/storage",
                    "gx:providedBy": "did:example:abc",
                    "gx:servicePolicy": "https://abc.test/policy",
                    "gx:name": "Storage",
                    "gx:endpoint": {"endpointURL": "https://abc.test/api"}
                }
            }),
            bundled: Vec::new(),
        })
        .unwrap()
    }

    #[test]
    fn self_issued_service_description_is_accepted() {
        let sd = service("did:example:abc", json!(["VerifiableCredential", "gx:ServiceOffering"]));
        let result = verifier().verify_service_description_at(&sd, now());
        assert!(result.verified);
        let offering = result
            .credential("ServiceOffering")
            .and_then(SubCredential::as_service_offering)
            .unwrap();
        assert_eq!(offering.name.as_deref(), Some("Storage"));
    }

    #[test]
    fn foreign_untrusted_service_issuer_is_rejected() {
        let sd = service("did:example:mallory", json!(["VerifiableCredential", "ServiceOffering"]));
        assert!(!verifier().verify_service_description_at(&sd, now()).verified);
        let trusted = service(ISSUER, json!(["VerifiableCredential", "ServiceOffering"]));
        assert!(verifier().verify_service_description_at(&trusted, now()).verified);
    }

    #[test]
    fn service_description_requires_offering_type() {
        let sd = service(ISSUER, json!("VerifiableCredential"));
        let result = verifier().verify_service_description_at(&sd, now());
        assert_eq!(
            result.verification_failure_reason.as_deref(),
            Some("credential is not a ServiceOffering")
        );
    }

    #[test]
    fn failure_serializes_reason_in_camel_case() {
        let value = serde_json::to_value(VerificationResult::failure("nope")).unwrap();
        assert_eq!(value, json!({"verified": false, "verificationFailureReason": "nope"}));
    }
}
