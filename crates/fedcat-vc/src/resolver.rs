//! # Key Resolution
//!
//! [`KeyResolver`] maps a verification method (`did:...#key-1`) to the
//! Ed25519 public key that signs for it. DID resolution proper is an
//! external concern; [`StaticKeyResolver`] serves keys provisioned ahead of
//! time, looking up the exact verification method first and then its bare
//! DID.

use std::collections::HashMap;

use parking_lot::RwLock;

use fedcat_core::strip_fragment;

use crate::error::ResolveError;
use crate::keys::Ed25519PublicKey;

/// Resolves verification methods to public keys.
pub trait KeyResolver: Send + Sync {
    /// Resolve the key for `verification_method`.
    fn resolve(&self, verification_method: &str) -> Result<Ed25519PublicKey, ResolveError>;
}

/// A key resolver backed by an in-memory table.
#[derive(Debug, Default)]
pub struct StaticKeyResolver {
    keys: RwLock<HashMap<String, Ed25519PublicKey>>,
}

impl StaticKeyResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `key` for a verification method or a bare DID.
    pub fn insert(&self, method_or_did: impl Into<String>, key: Ed25519PublicKey) {
        self.keys.write().insert(method_or_did.into(), key);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_key(self, method_or_did: impl Into<String>, key: Ed25519PublicKey) -> Self {
        self.insert(method_or_did, key);
        self
    }

    /// Register a hex-encoded key, as found in configuration.
    pub fn insert_hex(&self, method_or_did: impl Into<String>, hex: &str) -> Result<(), ResolveError> {
        let method = method_or_did.into();
        let key = Ed25519PublicKey::from_hex(hex).map_err(|source| ResolveError::UnusableKey {
            method: method.clone(),
            source,
        })?;
        self.insert(method, key);
        Ok(())
    }

    /// Number of registered entries.
    pub fn len(&self) -> usize {
        self.keys.read().len()
    }

    /// Whether no keys are registered.
    pub fn is_empty(&self) -> bool {
        self.keys.read().is_empty()
    }
}

impl KeyResolver for StaticKeyResolver {
    fn resolve(&self, verification_method: &str) -> Result<Ed25519PublicKey, ResolveError> {
        let keys = self.keys.read();
        keys.get(verification_method)
            .or_else(|| keys.get(strip_fragment(verification_method)))
            .cloned()
            .ok_or_else(|| ResolveError::UnknownVerificationMethod(verification_method.to_string()))
    }
}
