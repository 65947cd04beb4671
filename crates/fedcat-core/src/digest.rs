//! # Integrity Digests
//!
//! Evidence references may pin the exact credential they point at with a
//! `gx:integrity` value of the form `sha256-<64 lowercase hex chars>`. The
//! digest is computed over the JCS canonical form of the referenced
//! credential, so [`sha256_digest()`] only accepts [`CanonicalBytes`].

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;
use crate::error::ValidationError;

const SHA256_PREFIX: &str = "sha256-";

/// A SHA-256 integrity digest in `sha256-<hex>` notation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IntegrityDigest([u8; 32]);

impl IntegrityDigest {
    /// Parse `sha256-<hex>`. Hex digits are accepted in either case.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let invalid = || ValidationError::InvalidDigest(s.to_string());
        let hex = s.trim().strip_prefix(SHA256_PREFIX).ok_or_else(invalid)?;
        if hex.len() != 64 || !hex.is_ascii() {
            return Err(invalid());
        }
        let mut bytes = [0u8; 32];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Self(bytes))
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Render the digest as lowercase hex, without the algorithm prefix.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for IntegrityDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{SHA256_PREFIX}{}", self.to_hex())
    }
}

impl TryFrom<String> for IntegrityDigest {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<IntegrityDigest> for String {
    fn from(d: IntegrityDigest) -> Self {
        d.to_string()
    }
}

/// Compute the SHA-256 integrity digest of canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> IntegrityDigest {
    let hash = Sha256::digest(data.as_bytes());
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&hash);
    IntegrityDigest(bytes)
}
