//! Public key handling and the peer key store.
//!
//! Keys travel between nodes over an out-of-band distribution channel as raw
//! 32-byte Ed25519 public keys. [`import_public_key`] is the only way bytes
//! become a [`PublicKey`], so every key in the store is a valid curve point.

use crate::signing::CryptoError;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Length of a raw Ed25519 public key.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Length of a full Ed25519 signature.
pub const SIGNATURE_LEN: usize = 64;

/// Ed25519 public key of a mesh node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey([u8; PUBLIC_KEY_LEN]);

impl PublicKey {
    pub(crate) fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }

    /// Raw key bytes, suitable for export.
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; PUBLIC_KEY_LEN] {
        &self.0
    }

    /// Stable short identifier: first 16 bytes of the BLAKE3 hash, hex encoded.
    pub fn key_id(&self) -> String {
        let hash = blake3::hash(&self.0);
        hex::encode(&hash.as_bytes()[..16])
    }

    /// Check an Ed25519 signature over `data`.
    ///
    /// Fail-closed: a wrong-length signature or any provider error is `false`.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> bool {
        let Ok(verifying_key) = VerifyingKey::from_bytes(&self.0) else {
            tracing::warn!(key_id = %self.key_id(), "public key is not a valid curve point");
            return false;
        };

        let Ok(signature) = Signature::from_slice(signature) else {
            tracing::debug!(len = signature.len(), "rejecting signature of wrong length");
            return false;
        };

        match verifying_key.verify(data, &signature) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(key_id = %self.key_id(), error = %e, "signature verification failed");
                false
            }
        }
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.0))
    }
}

/// Import a raw public key received from a peer.
pub fn import_public_key(bytes: &[u8]) -> Result<PublicKey, CryptoError> {
    let array: [u8; PUBLIC_KEY_LEN] =
        bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidKey {
                reason: format!("expected {} bytes, got {}", PUBLIC_KEY_LEN, bytes.len()),
            })?;

    let verifying_key = VerifyingKey::from_bytes(&array).map_err(|e| CryptoError::InvalidKey {
        reason: e.to_string(),
    })?;

    Ok(PublicKey::from_verifying_key(&verifying_key))
}

/// Check `signature` over `data` against `public_key`.
pub fn verify(data: &[u8], signature: &[u8], public_key: &PublicKey) -> bool {
    public_key.verify(data, signature)
}

/// Trusted public keys indexed by 32-bit origin id.
#[derive(Debug, Default, Clone)]
pub struct PeerKeyStore {
    keys: HashMap<u32, PublicKey>,
}

impl PeerKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trust `key` for packets originating from `origin_id`.
    ///
    /// Returns the key previously trusted for that origin, if any.
    pub fn insert(&mut self, origin_id: u32, key: PublicKey) -> Option<PublicKey> {
        let previous = self.keys.insert(origin_id, key);
        if previous.is_some_and(|p| p != key) {
            tracing::warn!(origin = %format!("{:08x}", origin_id), "replacing trusted key");
        }
        previous
    }

    /// Import raw key bytes and trust them for `origin_id`.
    pub fn import(&mut self, origin_id: u32, bytes: &[u8]) -> Result<PublicKey, CryptoError> {
        let key = import_public_key(bytes)?;
        self.insert(origin_id, key);
        Ok(key)
    }

    pub fn get(&self, origin_id: u32) -> Option<&PublicKey> {
        self.keys.get(&origin_id)
    }

    pub fn remove(&mut self, origin_id: u32) -> Option<PublicKey> {
        self.keys.remove(&origin_id)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Verify a signature from `origin_id`. Unknown origins are never trusted.
    pub fn verify_from(&self, origin_id: u32, data: &[u8], signature: &[u8]) -> bool {
        match self.keys.get(&origin_id) {
            Some(key) => key.verify(data, signature),
            None => {
                tracing::debug!(origin = %format!("{:08x}", origin_id), "no trusted key for origin");
                false
            }
        }
    }
}
