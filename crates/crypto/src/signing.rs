//! Node Signing Service
//!
//! Each mesh node owns exactly one Ed25519 keypair, generated from OS entropy
//! when the node initializes. The keypair signs every outgoing packet; the
//! public half is exported to peers over the key-distribution channel.
//!
//! # Security Model
//!
//! - Private keys never leave the signer and are zeroized on construction paths
//! - Signatures are deterministic for the same key and input
//! - Key generation failure is fatal to node initialization

use crate::keys::{PublicKey, SIGNATURE_LEN};
use ed25519_dalek::{Signer, SigningKey};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use zeroize::Zeroize;

/// Errors that can occur during key handling and signing.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// The platform could not supply key material
    #[error("Cryptographic provider unavailable: {reason}")]
    CryptoUnavailable { reason: String },

    #[error("Invalid key: {reason}")]
    InvalidKey { reason: String },

    #[error("Signing failed: {reason}")]
    SigningFailed { reason: String },
}

/// Abstract signing capability consumed by the packet codec.
///
/// The platform crypto provider sits behind this trait; [`NodeSigner`] is the
/// software Ed25519 implementation.
pub trait SignatureProvider: Send + Sync {
    /// Sign `data`, returning the full 64-byte Ed25519 signature.
    fn sign(&self, data: &[u8]) -> Result<[u8; SIGNATURE_LEN], CryptoError>;

    /// Public half of the signing keypair.
    fn public_key(&self) -> PublicKey;
}

/// Metrics for observability.
#[derive(Debug, Default)]
pub struct SigningMetrics {
    pub messages_signed_total: AtomicU64,
}

impl SigningMetrics {
    pub fn messages_signed(&self) -> u64 {
        self.messages_signed_total.load(Ordering::Relaxed)
    }
}

/// Ed25519 keypair owned by a single node.
pub struct NodeSigner {
    signing_key: SigningKey,
    public_key: PublicKey,
    public_key_id: String,
    metrics: SigningMetrics,
}

impl NodeSigner {
    /// Generate a fresh keypair from operating-system entropy.
    ///
    /// # Errors
    /// `CryptoUnavailable` when the entropy source fails.
    pub fn generate() -> Result<Self, CryptoError> {
        let mut secret_key_bytes = [0u8; 32];
        getrandom::getrandom(&mut secret_key_bytes).map_err(|e| CryptoError::CryptoUnavailable {
            reason: e.to_string(),
        })?;

        let signer = Self::from_secret(&secret_key_bytes);
        secret_key_bytes.zeroize();

        tracing::info!(key_id = %signer.public_key_id, "generated node signing key");
        Ok(signer)
    }

    /// Create a signer from existing 32-byte secret key material.
    ///
    /// # Security
    /// The intermediate copy of the key bytes is zeroized.
    pub fn from_key(key_bytes: &[u8]) -> Result<Self, CryptoError> {
        if key_bytes.len() != 32 {
            return Err(CryptoError::InvalidKey {
                reason: format!("Invalid key length: {} (expected 32)", key_bytes.len()),
            });
        }

        let mut key_array = [0u8; 32];
        key_array.copy_from_slice(key_bytes);
        let signer = Self::from_secret(&key_array);
        key_array.zeroize();

        Ok(signer)
    }

    fn from_secret(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        let public_key = PublicKey::from_verifying_key(&signing_key.verifying_key());
        let public_key_id = public_key.key_id();

        Self {
            signing_key,
            public_key,
            public_key_id,
            metrics: SigningMetrics::default(),
        }
    }

    /// Raw public key bytes for distribution to peers.
    pub fn export_public_key(&self) -> [u8; 32] {
        self.public_key.to_bytes()
    }

    pub fn public_key_id(&self) -> &str {
        &self.public_key_id
    }

    pub fn metrics(&self) -> &SigningMetrics {
        &self.metrics
    }
}

impl SignatureProvider for NodeSigner {
    fn sign(&self, data: &[u8]) -> Result<[u8; SIGNATURE_LEN], CryptoError> {
        let signature = self.signing_key.sign(data);
        self.metrics
            .messages_signed_total
            .fetch_add(1, Ordering::Relaxed);
        Ok(signature.to_bytes())
    }

    fn public_key(&self) -> PublicKey {
        self.public_key
    }
}

impl std::fmt::Debug for NodeSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeSigner")
            .field("public_key_id", &self.public_key_id)
            .finish_non_exhaustive()
    }
}
