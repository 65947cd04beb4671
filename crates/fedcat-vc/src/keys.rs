//! # Ed25519 Keys
//!
//! Public keys resolve from verification methods and feed the JWS decoder;
//! key pairs exist to produce envelopes (issuer tooling and test fixtures).
//!
//! - Public keys serialize as hex and convert to base64url for JWS key
//!   material.
//! - Key pairs never serialize and their `Debug` output hides the secret.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use ed25519_dalek::pkcs8::{EncodePrivateKey, KeypairBytes};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::KeyError;

/// An Ed25519 public key (32 bytes).
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; 32]);

/// An Ed25519 key pair used to sign envelopes.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

// ---------------------------------------------------------------------------
// Ed25519PublicKey
// ---------------------------------------------------------------------------

impl Ed25519PublicKey {
    /// Create a public key from raw bytes, rejecting non-curve points.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, KeyError> {
        ed25519_dalek::VerifyingKey::from_bytes(&bytes)
            .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Return the raw 32-byte public key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the public key as lowercase hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Parse a public key from 64 hex characters.
    pub fn from_hex(hex: &str) -> Result<Self, KeyError> {
        let hex = hex.trim();
        if hex.len() != 64 || !hex.is_ascii() {
            return Err(KeyError::InvalidPublicKey(format!(
                "public key hex must be 64 chars, got {}",
                hex.len()
            )));
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map_err(|e| KeyError::InvalidPublicKey(format!("invalid hex at {}: {e}", i * 2)))?;
        }
        Self::from_bytes(bytes)
    }

    /// Base64url (unpadded) form, as used for OKP `x` parameters.
    pub fn to_base64url(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.0)
    }

    /// Parse a base64url (unpadded) public key.
    pub fn from_base64url(encoded: &str) -> Result<Self, KeyError> {
        let raw = URL_SAFE_NO_PAD
            .decode(encoded.trim())
            .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;
        let bytes: [u8; 32] = raw.try_into().map_err(|v: Vec<u8>| {
            KeyError::InvalidPublicKey(format!("expected 32 bytes, got {}", v.len()))
        })?;
        Self::from_bytes(bytes)
    }
}

impl Serialize for Ed25519PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519PublicKey({}...)", &self.to_hex()[..8])
    }
}

impl std::fmt::Display for Ed25519PublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Ed25519KeyPair
// ---------------------------------------------------------------------------

impl Ed25519KeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Create a key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// The public half of this key pair.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// PKCS#8 v1 DER encoding of the private key (RFC 8410, seed only).
    pub(crate) fn to_pkcs8_der(&self) -> Result<Vec<u8>, KeyError> {
        let keypair = KeypairBytes {
            secret_key: self.signing_key.to_bytes(),
            public_key: None,
        };
        let document = keypair
            .to_pkcs8_der()
            .map_err(|e| KeyError::Signing(format!("PKCS#8 encoding: {e}")))?;
        Ok(document.as_bytes().to_vec())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}
