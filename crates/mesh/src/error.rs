//! Error types for mesh packet and transmit operations.

use aeromesh_core::CoreError;
use aeromesh_crypto::CryptoError;
use thiserror::Error;

/// Errors that can occur building or parsing mesh packets.
#[derive(Debug, Error)]
pub enum MeshError {
    /// Input shorter than the fixed header
    #[error("packet too short: {len} bytes, header needs {required}")]
    ShortPacket { len: usize, required: usize },

    /// Header enum or CBOR payload could not be decoded
    #[error("decode failure: {0}")]
    DecodeFailure(String),

    /// Payload could not be serialized
    #[error("payload encoding failed: {0}")]
    Encode(String),

    /// Header plus payload exceed the LoRa maximum
    #[error("packet of {len} bytes exceeds the {max}-byte maximum")]
    PayloadTooLarge { len: usize, max: usize },

    /// Radio configuration rejected at construction
    #[error(transparent)]
    Config(#[from] CoreError),

    /// Signing or key generation failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Result type for mesh operations.
pub type MeshResult<T> = Result<T, MeshError>;
