//! Cryptographic primitives for AeroMesh nodes.
//!
//! # Core Capabilities
//!
//! - **Digital Signatures**: one Ed25519 keypair per node signs every packet
//! - **Verification**: fail-closed checks against imported peer keys
//! - **Key Distribution**: raw public key export/import and a trusted key store
//!
//! # Security Principles
//!
//! - Never roll custom cryptographic primitives
//! - Secrets must never be logged
//! - Verification errors are treated as "not valid", never propagated as panics

pub mod keys;
pub mod signing;

pub use keys::{
    import_public_key, verify, PeerKeyStore, PublicKey, PUBLIC_KEY_LEN, SIGNATURE_LEN,
};
pub use signing::{CryptoError, NodeSigner, SignatureProvider, SigningMetrics};
