//! # Canonical Serialization — JCS Byte Production
//!
//! [`CanonicalBytes`] is the only input accepted by
//! [`sha256_digest()`](crate::digest::sha256_digest). Its inner buffer is
//! private and the only constructor serializes through `serde_jcs`
//! (RFC 8785: sorted keys, compact separators, deterministic number form),
//! so two parties hashing the same credential always hash the same bytes.

use serde::Serialize;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Canonicalize any serializable value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let s = serde_jcs::to_string(&value)?;
        Ok(Self(s.into_bytes()))
    }

    /// Access the canonical bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn canonical_str(v: &serde_json::Value) -> String {
        let cb = CanonicalBytes::new(v).unwrap();
        String::from_utf8(cb.as_bytes().to_vec()).unwrap()
    }

    #[test]
    fn sorts_keys_recursively() {
        let data = json!({"outer": {"b": 2, "a": 1}, "list": [3, 2, 1], "@context": "x"});
        assert_eq!(
            canonical_str(&data),
            r#"{"@context":"x","list":[3,2,1],"outer":{"a":1,"b":2}}"#
        );
    }

    #[test]
    fn key_order_of_input_is_irrelevant() {
        let a: serde_json::Value = serde_json::from_str(r#"{"x":1,"gx:name":"n"}"#).unwrap();
        let b: serde_json::Value = serde_json::from_str(r#"{"gx:name":"n","x":1}"#).unwrap();
        assert_eq!(
            CanonicalBytes::new(&a).unwrap(),
            CanonicalBytes::new(&b).unwrap()
        );
    }

    #[test]
    fn unicode_passes_through_as_utf8() {
        let s = canonical_str(&json!({"gx:legalName": "Société Générale"}));
        assert!(s.contains("Société"));
    }

    #[test]
    fn empty_containers() {
        assert_eq!(CanonicalBytes::new(&json!({})).unwrap().as_bytes(), b"{}");
        assert_eq!(CanonicalBytes::new(&json!([])).unwrap().as_bytes(), b"[]");
        assert!(!CanonicalBytes::new(&json!({})).unwrap().is_empty());
    }
}
