//! Shared fixtures: a bootstrapped in-memory catalogue plus signers that
//! produce real EdDSA envelopes the catalogue's verifier accepts.

#![allow(dead_code)]

use fedcat_audit::{AuditSink, LogEntry, LogQuery};
use fedcat_catalogue::bootstrap::{build_catalogue, CatalogueComponents};
use fedcat_catalogue::CatalogueConfig;
use fedcat_core::{sha256_digest, strip_fragment, CanonicalBytes};
use fedcat_vc::{Ed25519KeyPair, EnvelopeSigner};
use serde_json::{json, Value};

pub const TRUSTED_ISSUER: &str = "did:example:issuer1";
pub const PROVIDER: &str = "did:example:abc";
pub const OUTSIDER: &str = "did:example:mallory";

pub struct Fixture {
    pub components: CatalogueComponents,
    /// Signs as the trusted compliance issuer.
    pub issuer: EnvelopeSigner,
    /// Signs as the participant `did:example:abc`.
    pub provider: EnvelopeSigner,
    /// Signs as a DID whose key is known but which is not trusted.
    pub outsider: EnvelopeSigner,
}

pub fn fixture() -> Fixture {
    let issuer_key = Ed25519KeyPair::from_seed(&[1u8; 32]);
    let provider_key = Ed25519KeyPair::from_seed(&[2u8; 32]);
    let outsider_key = Ed25519KeyPair::from_seed(&[3u8; 32]);

    let mut config = CatalogueConfig {
        trusted_issuers: vec![TRUSTED_ISSUER.to_string()],
        ..Default::default()
    };
    config
        .issuer_keys
        .insert(format!("{TRUSTED_ISSUER}#key-1"), issuer_key.public_key().to_hex());
    config
        .issuer_keys
        .insert(PROVIDER.to_string(), provider_key.public_key().to_hex());
    config
        .issuer_keys
        .insert(OUTSIDER.to_string(), outsider_key.public_key().to_hex());

    Fixture {
        components: build_catalogue(&config).unwrap(),
        issuer: EnvelopeSigner::new(&issuer_key, format!("{TRUSTED_ISSUER}#key-1")).unwrap(),
        provider: EnvelopeSigner::new(&provider_key, format!("{PROVIDER}#key-1")).unwrap(),
        outsider: EnvelopeSigner::new(&outsider_key, format!("{OUTSIDER}#key-1")).unwrap(),
    }
}

impl Fixture {
    pub fn audit_trail(&self) -> Vec<LogEntry> {
        self.components
            .audit
            .query(&LogQuery::default())
            .unwrap()
            .entities
    }
}

/// Claims of a compliance presentation.
#[derive(Clone)]
pub struct Participant {
    pub subject_id: String,
    pub legal_name: String,
    pub registration: Value,
    pub evidence_of: Option<String>,
}

impl Participant {
    pub fn new(subject_id: &str, legal_name: &str) -> Self {
        Self {
            subject_id: subject_id.to_string(),
            legal_name: legal_name.to_string(),
            registration: json!({"gx:countryCode": "DE", "gx:taxId": "DE123"}),
            evidence_of: Some("VATID".to_string()),
        }
    }

    fn slug(&self) -> String {
        strip_fragment(&self.subject_id).replace(':', "-")
    }

    pub fn legal_participant(&self) -> Value {
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "id": format!("https://{}.test/lp.json", self.slug()),
            "type": ["VerifiableCredential", "gx:LegalParticipant"],
            "issuer": strip_fragment(&self.subject_id),
            "validFrom": "2026-01-01T00:00:00Z",
            "credentialSubject": {
                "id": self.subject_id,
                "gx:legalName": self.legal_name
            }
        })
    }

    pub fn registration_number(&self) -> Value {
        let mut subject = json!({
            "id": format!("{}#lrn", strip_fragment(&self.subject_id)),
            "type": "gx:legalRegistrationNumber"
        });
        if let (Some(target), Some(claims)) = (subject.as_object_mut(), self.registration.as_object()) {
            target.extend(claims.clone());
        }
        let mut credential = json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "id": format!("https://notary.test/{}/lrn.json", self.slug()),
            "type": ["VerifiableCredential"],
            "issuer": "did:example:notary",
            "validFrom": "2026-01-01T00:00:00Z",
            "credentialSubject": subject
        });
        if let Some(kind) = &self.evidence_of {
            credential["evidence"] = json!({"gx:evidenceOf": kind});
        }
        credential
    }

    /// The compliance credential over `bundled`, with integrity digests.
    pub fn compliance(&self, issuer: &str, bundled: &[Value]) -> Value {
        let evidence: Vec<Value> = bundled
            .iter()
            .map(|doc| {
                json!({
                    "id": doc["id"],
                    "type": "gx:compliance",
                    "gx:integrity": integrity(doc)
                })
            })
            .collect();
        json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "id": format!("https://compliance.test/{}.json", self.slug()),
            "type": ["VerifiableCredential", "gx:compliance"],
            "issuer": issuer,
            "validFrom": "2026-01-01T00:00:00Z",
            "validUntil": "2099-01-01T00:00:00Z",
            "credentialSubject": {
                "id": self.subject_id,
                "gx:evidence": evidence
            }
        })
    }

    /// A presentation signed by `signer` whose primary credential is issued
    /// by the signer's DID.
    pub fn envelope(&self, signer: &EnvelopeSigner) -> String {
        let bundled = vec![self.legal_participant(), self.registration_number()];
        let issuer = strip_fragment(signer.verification_method()).to_string();
        let mut credentials = vec![self.compliance(&issuer, &bundled)];
        credentials.extend(bundled);
        signer.sign_presentation(credentials).unwrap()
    }
}

pub fn integrity(doc: &Value) -> String {
    sha256_digest(&CanonicalBytes::new(doc).unwrap()).to_string()
}

/// A self-issued service offering of `provided_by`.
pub fn service_offering(service_id: &str, provided_by: &str, name: &str) -> Value {
    json!({
        "@context": ["https://www.w3.org/2018/credentials/v1"],
        "id": format!("{service_id}/credential.json"),
        "type": ["VerifiableCredential", "gx:ServiceOffering"],
        "issuer": strip_fragment(provided_by),
        "validFrom": "2026-01-01T00:00:00Z",
        "credentialSubject": {
            "id": service_id,
            "gx:providedBy": {"id": provided_by},
            "gx:servicePolicy": format!("{service_id}/policy"),
            "gx:name": name,
            "gx:endpoint": {"gx:endpointURL": format!("{service_id}/api")}
        }
    })
}
