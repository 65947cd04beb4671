//! # Catalogue Entries
//!
//! The two record kinds the catalogue stores. Both are derived from verified
//! claim data only, serialize in camelCase, and are replaced wholesale when
//! the same primary key is registered again.

use serde::{Deserialize, Serialize};

use fedcat_core::{ParticipantId, Timestamp};
use fedcat_storage::Entity;

/// A verified legal participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantEntry {
    /// Credential subject id without fragment. Primary key.
    pub participant_id: ParticipantId,
    /// Registration number type (`VATID`, `EORI`, `LEI`, `TAXID`, ...).
    pub lrn_type: String,
    /// Legal registration number.
    pub registration_number: String,
    /// Registered legal name.
    pub legal_name: String,
    /// Issuer of the compliance credential.
    pub trusted_issuer_id: String,
    /// Country of registration.
    pub country_code: String,
    /// Start of the compliance credential's validity.
    pub valid_from: Timestamp,
    /// End of the compliance credential's validity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Timestamp>,
    /// When this entry was extracted.
    pub date_created: Timestamp,
    /// Evidence credential ids, in the order the compliance subject lists them.
    pub evidences: Vec<String>,
}

impl Entity for ParticipantEntry {
    fn primary_key(&self) -> &str {
        self.participant_id.as_str()
    }
}

/// A verified service offering of a registered participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescriptionEntry {
    /// Service identifier. Primary key.
    pub service_id: String,
    /// Offering participant; always a registered participant at write time.
    pub provided_by: ParticipantId,
    /// Service policy reference.
    pub service_policy: String,
    /// Service name.
    pub name: String,
    /// Service endpoint.
    #[serde(rename = "endpointURL")]
    pub endpoint_url: String,
    /// Start of the credential's validity.
    pub valid_from: Timestamp,
    /// End of the credential's validity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_until: Option<Timestamp>,
    /// When this entry was extracted.
    pub date_created: Timestamp,
    /// Id of the originating credential.
    pub evidences: Vec<String>,
}

impl Entity for ServiceDescriptionEntry {
    fn primary_key(&self) -> &str {
        &self.service_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    #[test]
    fn participant_entry_wire_names() {
        let entry = ParticipantEntry {
            participant_id: ParticipantId::from_subject_id("did:example:abc#participant").unwrap(),
            lrn_type: "VATID".into(),
            registration_number: "DE123".into(),
            legal_name: "ACME GmbH".into(),
            trusted_issuer_id: "did:example:issuer1".into(),
            country_code: "DE".into(),
            valid_from: ts("2026-01-01T00:00:00Z"),
            valid_until: None,
            date_created: ts("2026-01-02T00:00:00Z"),
            evidences: vec!["https://abc.test/lp.json".into()],
        };
        assert_eq!(entry.primary_key(), "did:example:abc");
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({
                "participantId": "did:example:abc",
                "lrnType": "VATID",
                "registrationNumber": "DE123",
                "legalName": "ACME GmbH",
                "trustedIssuerId": "did:example:issuer1",
                "countryCode": "DE",
                "validFrom": "2026-01-01T00:00:00Z",
                "dateCreated": "2026-01-02T00:00:00Z",
                "evidences": ["https://abc.test/lp.json"]
            })
        );
    }

    #[test]
    fn service_entry_uses_endpoint_url_casing() {
        let entry = ServiceDescriptionEntry {
            service_id: "https://abc.test/services/storage".into(),
            provided_by: ParticipantId::from_subject_id("did:example:abc").unwrap(),
            service_policy: "https://abc.test/policy".into(),
            name: "Storage".into(),
            endpoint_url: "https://abc.test/api".into(),
            valid_from: ts("2026-01-01T00:00:00Z"),
            valid_until: Some(ts("2027-01-01T00:00:00Z")),
            date_created: ts("2026-01-02T00:00:00Z"),
            evidences: vec!["https://abc.test/so.json".into()],
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["endpointURL"], "https://abc.test/api");
        assert_eq!(value["providedBy"], "did:example:abc");
        assert_eq!(value["validUntil"], "2027-01-01T00:00:00Z");
        assert_eq!(entry.primary_key(), "https://abc.test/services/storage");
        let back: ServiceDescriptionEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back, entry);
    }
}
