//! # Compact JWS Envelopes
//!
//! Credentials travel as compact JWS (`header.payload.signature`) signed with
//! EdDSA over Ed25519. The header's `kid` names the verification method used
//! to sign; its DID part must be the issuer of the credential it carries.
//!
//! The payload takes one of three shapes:
//!
//! | Payload | Primary credential | Bundled |
//! |---------|--------------------|---------|
//! | a credential | the payload | none |
//! | `{ "vc": {...} }` (VC-JWT) | `vc` | none |
//! | `{ "verifiableCredential": [...] }` (presentation) | first element | the rest |
//!
//! Presentation elements may themselves be compact JWS strings; those are
//! decoded recursively, and each is bound to its own signer the same way.

use std::sync::Arc;

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde_json::Value;

use fedcat_core::Did;

use crate::error::{DecodeError, KeyError};
use crate::keys::Ed25519KeyPair;
use crate::resolver::KeyResolver;

/// Nested envelopes deeper than this are rejected.
const MAX_NESTING: usize = 4;

/// The verified contents of an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedEnvelope {
    /// Verification method that signed the outer envelope.
    pub verification_method: String,
    /// The primary credential document.
    pub primary: Value,
    /// Further credential documents carried alongside it.
    pub bundled: Vec<Value>,
}

/// Decodes and signature-checks compact JWS envelopes.
#[derive(Clone)]
pub struct EnvelopeDecoder {
    resolver: Arc<dyn KeyResolver>,
}

impl std::fmt::Debug for EnvelopeDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeDecoder").finish_non_exhaustive()
    }
}

impl EnvelopeDecoder {
    /// Create a decoder that resolves signing keys through `resolver`.
    pub fn new(resolver: Arc<dyn KeyResolver>) -> Self {
        Self { resolver }
    }

    /// Decode an envelope, verify its signature, and split its payload.
    pub fn decode(&self, envelope: &str) -> Result<DecodedEnvelope, DecodeError> {
        let envelope = envelope.trim();
        if envelope.is_empty() {
            return Err(DecodeError::EmptyEnvelope);
        }
        let (verification_method, payload) = self.verify_jws(envelope)?;
        let (primary, bundled) = self.split_payload(payload, 0)?;
        let signer = bind_issuer(&verification_method, &primary)?;

        tracing::debug!(
            kid = %verification_method,
            %signer,
            bundled = bundled.len(),
            "decoded credential envelope"
        );
        Ok(DecodedEnvelope {
            verification_method,
            primary,
            bundled,
        })
    }

    /// Check the JWS signature and return `(kid, payload)`.
    fn verify_jws(&self, token: &str) -> Result<(String, Value), DecodeError> {
        let header = jsonwebtoken::decode_header(token)
            .map_err(|e| DecodeError::MalformedEnvelope(e.to_string()))?;
        if header.alg != Algorithm::EdDSA {
            return Err(DecodeError::UnsupportedAlgorithm(format!("{:?}", header.alg)));
        }
        let kid = header.kid.ok_or(DecodeError::MissingKeyId)?;

        let public_key = self.resolver.resolve(&kid)?;
        let decoding_key = DecodingKey::from_ed_components(&public_key.to_base64url())
            .map_err(|e| DecodeError::MalformedEnvelope(format!("decoding key: {e}")))?;

        let mut validation = Validation::new(Algorithm::EdDSA);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;

        let data = jsonwebtoken::decode::<Value>(token, &decoding_key, &validation).map_err(
            |e| match e.kind() {
                ErrorKind::InvalidSignature => DecodeError::InvalidSignature(kid.clone()),
                ErrorKind::ExpiredSignature => DecodeError::Expired,
                _ => DecodeError::MalformedEnvelope(e.to_string()),
            },
        )?;
        Ok((kid, data.claims))
    }

    fn split_payload(&self, payload: Value, depth: usize) -> Result<(Value, Vec<Value>), DecodeError> {
        let Value::Object(mut map) = payload else {
            return Err(DecodeError::InvalidPayload("payload is not a JSON object".into()));
        };

        if let Some(credentials) = map.remove("verifiableCredential") {
            let items = match credentials {
                Value::Array(items) => items,
                single => vec![single],
            };
            let mut documents = items
                .into_iter()
                .map(|item| self.credential_document(item, depth))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter();
            let primary = documents.next().ok_or_else(|| {
                DecodeError::InvalidPayload("presentation carries no credentials".into())
            })?;
            return Ok((primary, documents.collect()));
        }

        if let Some(vc) = map.remove("vc") {
            return Ok((self.credential_document(vc, depth)?, Vec::new()));
        }

        Ok((Value::Object(map), Vec::new()))
    }

    /// A presentation element: an embedded credential or a nested envelope.
    fn credential_document(&self, item: Value, depth: usize) -> Result<Value, DecodeError> {
        match item {
            Value::Object(_) => Ok(item),
            Value::String(token) => {
                if depth >= MAX_NESTING {
                    return Err(DecodeError::InvalidPayload("envelopes nested too deeply".into()));
                }
                let (kid, payload) = self.verify_jws(&token)?;
                let (primary, _) = self.split_payload(payload, depth + 1)?;
                bind_issuer(&kid, &primary)?;
                Ok(primary)
            }
            _ => Err(DecodeError::InvalidPayload(
                "credential must be an object or an envelope".into(),
            )),
        }
    }
}

/// The DID of the signing `kid`, which must be the document's issuer.
fn bind_issuer(kid: &str, document: &Value) -> Result<Did, DecodeError> {
    let signer = Did::from_did_url(kid).map_err(|source| DecodeError::InvalidKeyId {
        kid: kid.to_string(),
        source,
    })?;
    let issuer = document
        .get("issuer")
        .and_then(|i| i.as_str().or_else(|| i.get("id").and_then(Value::as_str)))
        .ok_or_else(|| DecodeError::InvalidCredential("credential has no issuer".into()))?;
    if signer.as_str() != issuer {
        return Err(DecodeError::IssuerMismatch {
            signer: signer.into(),
            issuer: issuer.to_string(),
        });
    }
    Ok(signer)
}

/// Produces compact JWS envelopes signed with an Ed25519 key.
pub struct EnvelopeSigner {
    verification_method: String,
    encoding_key: EncodingKey,
}

impl std::fmt::Debug for EnvelopeSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeSigner")
            .field("verification_method", &self.verification_method)
            .finish_non_exhaustive()
    }
}

impl EnvelopeSigner {
    /// Create a signer that stamps `verification_method` as the `kid`.
    pub fn new(
        key_pair: &Ed25519KeyPair,
        verification_method: impl Into<String>,
    ) -> Result<Self, KeyError> {
        Ok(Self {
            verification_method: verification_method.into(),
            encoding_key: EncodingKey::from_ed_der(&key_pair.to_pkcs8_der()?),
        })
    }

    /// The `kid` this signer stamps.
    pub fn verification_method(&self) -> &str {
        &self.verification_method
    }

    /// Sign an arbitrary JSON payload.
    pub fn sign(&self, payload: &Value) -> Result<String, KeyError> {
        let mut header = Header::new(Algorithm::EdDSA);
        header.kid = Some(self.verification_method.clone());
        jsonwebtoken::encode(&header, payload, &self.encoding_key)
            .map_err(|e| KeyError::Signing(e.to_string()))
    }

    /// Sign a presentation whose first credential is the primary one.
    pub fn sign_presentation(&self, credentials: Vec<Value>) -> Result<String, KeyError> {
        self.sign(&serde_json::json!({
            "@context": ["https://www.w3.org/2018/credentials/v1"],
            "type": ["VerifiablePresentation"],
            "verifiableCredential": credentials,
        }))
    }
}
