//! # Federated Catalogue Service
//!
//! [`FederatedCatalogue`] is the ingestion pipeline and the read facade in
//! one handle. It owns no state of its own: every dependency is a port
//! injected at construction, so clones share the same stores and sink.
//!
//! ## Registration
//!
//! Both registration operations follow the same shape:
//!
//! 1. Decode the envelope. Decode failures return immediately and leave no
//!    audit record.
//! 2. Verify. A negative verdict is written to the audit sink at `error`
//!    level with the full verdict as data, then returned as
//!    [`CatalogueError::VerificationFailed`].
//! 3. Extract the entry from verified claim data, persist it (full replace by
//!    primary key) and write one `info` audit record.
//!
//! A service description additionally requires its provider to be a
//! registered participant. The existence check and the write are two
//! independent store calls.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, info, warn};

use fedcat_audit::{AuditSink, ErrorRecord, LogEntry, LogLevel};
use fedcat_core::{strip_fragment, Timestamp};
use fedcat_storage::{
    EntityCondition, EntityStorage, QueryRequest, QueryResult, StorageError, DEFAULT_PAGE_SIZE,
};
use fedcat_vc::{CredentialVerifier, VerificationResult};

use crate::config::DEFAULT_MAX_PAGE_SIZE;
use crate::entry::{ParticipantEntry, ServiceDescriptionEntry};
use crate::error::CatalogueError;
use crate::extract;

/// `source` of every audit record the catalogue writes.
pub const AUDIT_SOURCE: &str = "FederatedCatalogue";

const COMPLIANCE_REJECTED: &str = "Compliance credential cannot be verified";
const COMPLIANCE_REGISTERED: &str =
    "Compliance credential verified and new entry added to the Fed Catalogue";
const SERVICE_REJECTED: &str = "Service Description credential cannot be verified";
const SERVICE_PROVIDER_UNKNOWN: &str = "Service provider is not known as participant";
const SERVICE_REGISTERED: &str =
    "Service Description credential verified and new entry added to the Fed Catalogue";

/// One page of query results.
pub type QueryPage<T> = QueryResult<T>;

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Participant lookup. Supplied filters combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantQuery {
    /// Participant id, with or without a `#fragment`.
    pub participant_id: Option<String>,
    /// Exact registration number.
    pub legal_registration_number: Option<String>,
    /// Exact registration number type.
    pub lrn_type: Option<String>,
    /// Cursor from the previous page.
    pub cursor: Option<String>,
    /// Page size; clamped to the catalogue maximum.
    pub page_size: Option<usize>,
}

/// Service description lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceDescriptionQuery {
    /// Provider participant id, with or without a `#fragment`.
    pub provided_by: Option<String>,
    /// Cursor from the previous page.
    pub cursor: Option<String>,
    /// Page size; clamped to the catalogue maximum.
    pub page_size: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PageLimits {
    default: usize,
    max: usize,
}

// ---------------------------------------------------------------------------
// FederatedCatalogue
// ---------------------------------------------------------------------------

/// The catalogue: registration pipeline plus query facade.
#[derive(Clone)]
pub struct FederatedCatalogue {
    verifier: Arc<dyn CredentialVerifier>,
    participants: Arc<dyn EntityStorage<ParticipantEntry>>,
    service_descriptions: Arc<dyn EntityStorage<ServiceDescriptionEntry>>,
    audit: Arc<dyn AuditSink>,
    page_limits: PageLimits,
}

impl std::fmt::Debug for FederatedCatalogue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedCatalogue")
            .field("page_limits", &self.page_limits)
            .finish_non_exhaustive()
    }
}

impl FederatedCatalogue {
    /// Wire a catalogue from its ports.
    pub fn new(
        verifier: Arc<dyn CredentialVerifier>,
        participants: Arc<dyn EntityStorage<ParticipantEntry>>,
        service_descriptions: Arc<dyn EntityStorage<ServiceDescriptionEntry>>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            verifier,
            participants,
            service_descriptions,
            audit,
            page_limits: PageLimits {
                default: DEFAULT_PAGE_SIZE,
                max: DEFAULT_MAX_PAGE_SIZE,
            },
        }
    }

    /// Override the default and maximum query page sizes.
    ///
    /// Zero values are raised to 1, and `default` is lowered to `max`.
    pub fn with_page_limits(mut self, default: usize, max: usize) -> Self {
        let max = max.max(1);
        self.page_limits = PageLimits {
            default: default.clamp(1, max),
            max,
        };
        self
    }

    // -- Registration -------------------------------------------------------

    /// Verify a compliance credential envelope and record its participant.
    ///
    /// Returns the stored entry.
    pub fn register_compliance_credential(
        &self,
        envelope: &str,
    ) -> Result<ParticipantEntry, CatalogueError> {
        let span = tracing::info_span!("register_compliance_credential");
        let _guard = span.enter();
        let result = self.ingest_compliance(envelope);
        record_registration("participant", &result);
        result
    }

    /// Verify a service description envelope and record the service.
    ///
    /// Returns the stored entry.
    pub fn register_service_description_credential(
        &self,
        envelope: &str,
    ) -> Result<ServiceDescriptionEntry, CatalogueError> {
        let span = tracing::info_span!("register_service_description_credential");
        let _guard = span.enter();
        let result = self.ingest_service_description(envelope);
        record_registration("service_description", &result);
        result
    }

    fn ingest_compliance(&self, envelope: &str) -> Result<ParticipantEntry, CatalogueError> {
        let envelope = non_empty_envelope(envelope)?;
        let credential = self.verifier.decode_compliance(envelope)?;
        debug!(
            issuer = credential.issuer(),
            subject = %credential.subject.id,
            "decoded compliance credential"
        );

        let result = self.verifier.verify_compliance(&credential);
        if !result.verified {
            return Err(self.reject(COMPLIANCE_REJECTED, result));
        }

        let entry = extract::participant_entry(&credential, &result, Timestamp::now())
            .map_err(|e| self.malformed(COMPLIANCE_REJECTED, e.into()))?;
        self.participants.set(entry.clone())?;

        self.audit.log(
            LogEntry::new(LogLevel::Info, AUDIT_SOURCE, COMPLIANCE_REGISTERED).with_data(json!({
                "participantId": entry.participant_id,
                "trustedIssuer": entry.trusted_issuer_id,
            })),
        )?;
        info!(
            participant_id = %entry.participant_id,
            trusted_issuer = %entry.trusted_issuer_id,
            "participant registered"
        );
        Ok(entry)
    }

    fn ingest_service_description(
        &self,
        envelope: &str,
    ) -> Result<ServiceDescriptionEntry, CatalogueError> {
        let envelope = non_empty_envelope(envelope)?;
        let credential = self.verifier.decode_service_description(envelope)?;
        debug!(
            issuer = credential.issuer(),
            service = %credential.subject.id,
            "decoded service description credential"
        );

        let result = self.verifier.verify_service_description(&credential);
        if !result.verified {
            return Err(self.reject(SERVICE_REJECTED, result));
        }

        let provided_by = extract::service_provider(&credential)
            .map_err(|e| self.malformed(SERVICE_REJECTED, e.into()))?;
        if self.participants.get(provided_by.as_str())?.is_none() {
            let err = CatalogueError::UnknownServiceProvider {
                provided_by: provided_by.to_string(),
            };
            self.audit.log(
                LogEntry::new(LogLevel::Error, AUDIT_SOURCE, SERVICE_PROVIDER_UNKNOWN)
                    .with_error(error_records(&err))
                    .with_data(json!({ "providedBy": provided_by })),
            )?;
            warn!(provided_by = %provided_by, "service provider is not a registered participant");
            return Err(err);
        }

        let entry = extract::service_description_entry(&credential, provided_by, Timestamp::now())
            .map_err(|e| self.malformed(SERVICE_REJECTED, e.into()))?;
        self.service_descriptions.set(entry.clone())?;

        self.audit.log(
            LogEntry::new(LogLevel::Info, AUDIT_SOURCE, SERVICE_REGISTERED).with_data(json!({
                "providedBy": entry.provided_by,
                "trustedIssuer": credential.issuer(),
            })),
        )?;
        info!(
            service_id = %entry.service_id,
            provided_by = %entry.provided_by,
            "service description registered"
        );
        Ok(entry)
    }

    /// Audit a negative verdict and turn it into an error. An audit failure
    /// replaces the verification error.
    fn reject(&self, message: &'static str, result: VerificationResult) -> CatalogueError {
        let reason = result
            .verification_failure_reason
            .clone()
            .unwrap_or_else(|| "verification failed".to_string());
        let err = CatalogueError::VerificationFailed { reason };
        let logged = self.audit.log(
            LogEntry::new(LogLevel::Error, AUDIT_SOURCE, message)
                .with_error(error_records(&err))
                .with_data(json!({ "result": result })),
        );
        if let Err(audit_err) = logged {
            return audit_err.into();
        }
        warn!(error = %err, "credential rejected");
        err
    }

    /// Audit a verified credential that cannot be turned into an entry.
    fn malformed(&self, message: &'static str, err: CatalogueError) -> CatalogueError {
        let logged = self.audit.log(
            LogEntry::new(LogLevel::Error, AUDIT_SOURCE, message).with_error(error_records(&err)),
        );
        if let Err(audit_err) = logged {
            return audit_err.into();
        }
        warn!(error = %err, "verified credential has malformed claims");
        err
    }

    // -- Queries ------------------------------------------------------------

    /// Page through participants matching every supplied filter, in
    /// participant id order.
    pub fn query_participants(
        &self,
        query: &ParticipantQuery,
    ) -> Result<QueryPage<ParticipantEntry>, CatalogueError> {
        let mut conditions = Vec::new();
        if let Some(id) = filter_value(query.participant_id.as_deref()) {
            conditions.push(EntityCondition::equals("participantId", strip_fragment(id)));
        }
        if let Some(number) = filter_value(query.legal_registration_number.as_deref()) {
            conditions.push(EntityCondition::equals("registrationNumber", number));
        }
        if let Some(lrn_type) = filter_value(query.lrn_type.as_deref()) {
            conditions.push(EntityCondition::equals("lrnType", lrn_type));
        }
        let request = self.request(conditions, query.cursor.clone(), query.page_size)?;

        metrics::counter!("fedcat_queries_total", "kind" => "participant").increment(1);
        let page = self.participants.query(&request).map_err(query_error)?;
        debug!(
            returned = page.entities.len(),
            total = page.total_entities,
            "participant query"
        );
        Ok(page)
    }

    /// Page through service descriptions, optionally by provider, in service
    /// id order.
    pub fn query_service_descriptions(
        &self,
        query: &ServiceDescriptionQuery,
    ) -> Result<QueryPage<ServiceDescriptionEntry>, CatalogueError> {
        let mut conditions = Vec::new();
        if let Some(provider) = filter_value(query.provided_by.as_deref()) {
            conditions.push(EntityCondition::equals("providedBy", strip_fragment(provider)));
        }
        let request = self.request(conditions, query.cursor.clone(), query.page_size)?;

        metrics::counter!("fedcat_queries_total", "kind" => "service_description").increment(1);
        let page = self.service_descriptions.query(&request).map_err(query_error)?;
        debug!(
            returned = page.entities.len(),
            total = page.total_entities,
            "service description query"
        );
        Ok(page)
    }

    fn request(
        &self,
        conditions: Vec<EntityCondition>,
        cursor: Option<String>,
        page_size: Option<usize>,
    ) -> Result<QueryRequest, CatalogueError> {
        let page_size = match page_size {
            Some(0) => {
                return Err(CatalogueError::InvalidArgument(
                    "page size must be at least 1".into(),
                ))
            }
            Some(n) => n.min(self.page_limits.max),
            None => self.page_limits.default,
        };
        Ok(QueryRequest::new()
            .with_condition(EntityCondition::all(conditions))
            .with_cursor(cursor)
            .with_page_size(Some(page_size)))
    }
}

fn non_empty_envelope(envelope: &str) -> Result<&str, CatalogueError> {
    let envelope = envelope.trim();
    if envelope.is_empty() {
        return Err(CatalogueError::InvalidArgument(
            "credential envelope is empty".into(),
        ));
    }
    Ok(envelope)
}

/// Blank filters are treated as absent.
fn filter_value(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// A cursor the store does not recognize is the caller's mistake.
fn query_error(err: StorageError) -> CatalogueError {
    match err {
        StorageError::InvalidCursor(cursor) => {
            CatalogueError::InvalidArgument(format!("invalid cursor \"{cursor}\""))
        }
        other => other.into(),
    }
}

fn error_records(err: &CatalogueError) -> Vec<ErrorRecord> {
    let mut records = ErrorRecord::flatten(err.kind(), err);
    if let Some(first) = records.first_mut() {
        first.properties = Some(err.context());
    }
    records
}

fn record_registration<T>(kind: &'static str, result: &Result<T, CatalogueError>) {
    let outcome = match result {
        Ok(_) => "registered",
        Err(err) => err.kind(),
    };
    metrics::counter!("fedcat_registrations_total", "kind" => kind, "outcome" => outcome)
        .increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use fedcat_audit::{EntityStorageAuditSink, LogQuery, LogRecord};
    use fedcat_core::ParticipantId;
    use fedcat_storage::MemoryStorage;
    use fedcat_vc::{
        ComplianceCredential, DecodeError, DecodedEnvelope, LegalParticipantClaims,
        RegistrationNumberClaims, ServiceDescriptionCredential, SubCredential, SubjectClaims,
    };

    /// Verifier stub: decodes a fixed credential and returns a fixed verdict.
    struct StubVerifier {
        verdict: VerificationResult,
        provided_by: Option<String>,
    }

    impl StubVerifier {
        fn accepting() -> Self {
            let mut credentials = BTreeMap::new();
            credentials.insert(
                "LegalParticipant".to_string(),
                SubCredential {
                    id: Some("https://abc.test/lp.json".into()),
                    issuer: "did:example:abc".into(),
                    claims: SubjectClaims::LegalParticipant(LegalParticipantClaims {
                        id: "did:example:abc".into(),
                        legal_name: Some("ACME GmbH".into()),
                    }),
                },
            );
            credentials.insert(
                "legalRegistrationNumber".to_string(),
                SubCredential {
                    id: Some("https://notary.test/lrn.json".into()),
                    issuer: "did:example:notary".into(),
                    claims: SubjectClaims::LegalRegistrationNumber(RegistrationNumberClaims {
                        vat_id: Some("DE123".into()),
                        country_code: Some("DE".into()),
                        ..Default::default()
                    }),
                },
            );
            Self {
                verdict: VerificationResult::success(credentials),
                provided_by: Some("did:example:abc".into()),
            }
        }

        fn rejecting(reason: &str) -> Self {
            Self {
                verdict: VerificationResult::failure(reason),
                provided_by: Some("did:example:abc".into()),
            }
        }
    }

    impl CredentialVerifier for StubVerifier {
        fn decode_compliance(&self, envelope: &str) -> Result<ComplianceCredential, DecodeError> {
            if envelope == "garbage" {
                return Err(DecodeError::MalformedEnvelope("not a JWS".into()));
            }
            ComplianceCredential::from_envelope(DecodedEnvelope {
                verification_method: "did:example:issuer1#key-1".into(),
                primary: json!({
                    "id": "https://compliance.test/cc.json",
                    "type": ["VerifiableCredential"],
                    "issuer": "did:example:issuer1",
                    "validFrom": "2026-01-01T00:00:00Z",
                    "credentialSubject": {
                        "id": "did:example:abc#participant",
                        "gx:evidence": [{"id": "https://abc.test/lp.json"}]
                    }
                }),
                bundled: Vec::new(),
            })
        }

        fn verify_compliance(&self, _: &ComplianceCredential) -> VerificationResult {
            self.verdict.clone()
        }

        fn decode_service_description(
            &self,
            _envelope: &str,
        ) -> Result<ServiceDescriptionCredential, DecodeError> {
            ServiceDescriptionCredential::from_envelope(DecodedEnvelope {
                verification_method: "did:example:abc#key-1".into(),
                primary: json!({
                    "id": "https://abc.test/so.json",
                    "type": ["VerifiableCredential", "gx:ServiceOffering"],
                    "issuer": "did:example:abc",
                    "validFrom": "2026-01-01T00:00:00Z",
                    "credentialSubject": {
                        "id": "https://abc.test/services/storage",
                        "gx:providedBy": self.provided_by,
                        "gx:servicePolicy": "https://abc.test/policy",
                        "gx:name": "Storage",
                        "gx:endpoint": {"endpointURL": "https://abc.test/api"}
                    }
                }),
                bundled: Vec::new(),
            })
        }

        fn verify_service_description(&self, _: &ServiceDescriptionCredential) -> VerificationResult {
            self.verdict.clone()
        }
    }

    struct Harness {
        catalogue: FederatedCatalogue,
        participants: MemoryStorage<ParticipantEntry>,
        services: MemoryStorage<ServiceDescriptionEntry>,
        audit: EntityStorageAuditSink,
    }

    fn harness(verifier: StubVerifier) -> Harness {
        let participants = MemoryStorage::new();
        let services = MemoryStorage::new();
        let records: MemoryStorage<LogRecord> = MemoryStorage::new();
        let audit = EntityStorageAuditSink::new(Arc::new(records));
        let catalogue = FederatedCatalogue::new(
            Arc::new(verifier),
            Arc::new(participants.clone()),
            Arc::new(services.clone()),
            Arc::new(audit.clone()),
        );
        Harness {
            catalogue,
            participants,
            services,
            audit,
        }
    }

    fn audit_entries(h: &Harness) -> Vec<LogEntry> {
        h.audit.query(&LogQuery::default()).unwrap().entities
    }

    #[test]
    fn empty_envelope_is_invalid_argument() {
        let h = harness(StubVerifier::accepting());
        let err = h.catalogue.register_compliance_credential("   ").unwrap_err();
        assert_eq!(err.kind(), "INVALID_ARGUMENT");
        let err = h.catalogue.register_service_description_credential("").unwrap_err();
        assert_eq!(err.kind(), "INVALID_ARGUMENT");
        assert!(audit_entries(&h).is_empty());
    }

    #[test]
    fn decode_failure_leaves_no_trace() {
        let h = harness(StubVerifier::accepting());
        let err = h.catalogue.register_compliance_credential("garbage").unwrap_err();
        assert_eq!(err.kind(), "DECODE_ERROR");
        assert!(h.participants.is_empty());
        assert!(audit_entries(&h).is_empty());
    }

    #[test]
    fn accepted_compliance_writes_entry_and_info_record() {
        let h = harness(StubVerifier::accepting());
        let entry = h.catalogue.register_compliance_credential("envelope").unwrap();
        assert_eq!(entry.participant_id.as_str(), "did:example:abc");
        assert_eq!(entry.lrn_type, "VATID");
        assert_eq!(h.participants.len(), 1);

        let audit = audit_entries(&h);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].level, LogLevel::Info);
        assert_eq!(audit[0].source, AUDIT_SOURCE);
        assert_eq!(
            audit[0].data,
            Some(json!({"participantId": "did:example:abc", "trustedIssuer": "did:example:issuer1"}))
        );
    }

    #[test]
    fn rejected_compliance_writes_one_error_record() {
        let h = harness(StubVerifier::rejecting("issuer did:example:x is not a trusted issuer"));
        let err = h.catalogue.register_compliance_credential("envelope").unwrap_err();
        assert!(matches!(err, CatalogueError::VerificationFailed { .. }));
        assert!(h.participants.is_empty());

        let audit = audit_entries(&h);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].level, LogLevel::Error);
        assert_eq!(audit[0].message, COMPLIANCE_REJECTED);
        let data = audit[0].data.as_ref().unwrap();
        assert_eq!(data["result"]["verified"], false);
        assert_eq!(
            data["result"]["verificationFailureReason"],
            "issuer did:example:x is not a trusted issuer"
        );
        let error = audit[0].error.as_ref().unwrap();
        assert_eq!(error[0].name, "VERIFICATION_FAILED");
    }

    #[test]
    fn service_requires_known_provider() {
        let h = harness(StubVerifier::accepting());
        let err = h
            .catalogue
            .register_service_description_credential("envelope")
            .unwrap_err();
        assert!(matches!(
            &err,
            CatalogueError::UnknownServiceProvider { provided_by } if provided_by == "did:example:abc"
        ));
        assert!(h.services.is_empty());
        let audit = audit_entries(&h);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].message, SERVICE_PROVIDER_UNKNOWN);
        assert_eq!(audit[0].data, Some(json!({"providedBy": "did:example:abc"})));

        h.catalogue.register_compliance_credential("envelope").unwrap();
        let entry = h
            .catalogue
            .register_service_description_credential("envelope")
            .unwrap();
        assert_eq!(entry.provided_by, ParticipantId::from_subject_id("did:example:abc").unwrap());
        assert_eq!(h.services.len(), 1);
    }

    #[test]
    fn service_without_provider_is_malformed() {
        let mut verifier = StubVerifier::accepting();
        verifier.provided_by = None;
        let h = harness(verifier);
        let err = h
            .catalogue
            .register_service_description_credential("envelope")
            .unwrap_err();
        assert_eq!(err.kind(), "MALFORMED_CLAIMS");
        let audit = audit_entries(&h);
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].error.as_ref().unwrap()[0].name, "MALFORMED_CLAIMS");
    }

    #[test]
    fn page_size_is_clamped_and_zero_rejected() {
        let h = harness(StubVerifier::accepting());
        let catalogue = h.catalogue.clone().with_page_limits(2, 3);
        for i in 0..5 {
            h.participants
                .set(ParticipantEntry {
                    participant_id: ParticipantId::from_subject_id(&format!("did:example:{i}"))
                        .unwrap(),
                    lrn_type: "LEI".into(),
                    registration_number: format!("LEI{i}"),
                    legal_name: format!("Org {i}"),
                    trusted_issuer_id: "did:example:issuer1".into(),
                    country_code: "FR".into(),
                    valid_from: Timestamp::now(),
                    valid_until: None,
                    date_created: Timestamp::now(),
                    evidences: Vec::new(),
                })
                .unwrap();
        }
        let page = catalogue.query_participants(&ParticipantQuery::default()).unwrap();
        assert_eq!(page.entities.len(), 2);
        assert_eq!(page.total_entities, 5);

        let page = catalogue
            .query_participants(&ParticipantQuery {
                page_size: Some(50),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(page.page_size, Some(3));

        let err = catalogue
            .query_participants(&ParticipantQuery {
                page_size: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), "INVALID_ARGUMENT");
    }

    #[test]
    fn unknown_cursor_is_invalid_argument() {
        let h = harness(StubVerifier::accepting());
        let err = h
            .catalogue
            .query_service_descriptions(&ServiceDescriptionQuery {
                cursor: Some("not-a-cursor".into()),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err.kind(), "INVALID_ARGUMENT");
    }
}
