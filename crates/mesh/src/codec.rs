//! Packet assembly and parsing.
//!
//! Signing input is the 20-byte header prefix followed by the encoded
//! payload. Only the first 32 bytes of the 64-byte Ed25519 signature fit in
//! the header slot, so a receiver cannot verify a packet from the wire bytes
//! alone. [`ParsedPacket::valid`] therefore only reports that the sender set
//! the SIGNED flag. Peers that need authentication exchange the full
//! signature out of band and call [`verify_detached`].

use crate::error::{MeshError, MeshResult};
use crate::packet::{
    encode_header, MeshHeader, PacketFlags, HEADER_LEN, SIGNATURE_SLOT_LEN, SIGNED_PREFIX_LEN,
};
use crate::payload::Payload;
use aeromesh_crypto::{PublicKey, SignatureProvider, SIGNATURE_LEN};

/// A signed packet ready for the air.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltPacket {
    pub header: MeshHeader,
    /// Encoded payload bytes
    pub payload: Vec<u8>,
    /// Header followed by payload
    pub packet: Vec<u8>,
    /// Full signature over the signing input
    pub signature: [u8; SIGNATURE_LEN],
}

impl BuiltPacket {
    pub fn len(&self) -> usize {
        self.packet.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packet.is_empty()
    }
}

/// A received packet.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPacket {
    pub header: MeshHeader,
    pub payload: Payload,
    /// True when the SIGNED flag is set. This is NOT a cryptographic check;
    /// see [`verify_detached`].
    pub valid: bool,
}

/// Sign and assemble a packet.
///
/// The SIGNED flag is added to `header.flags` and any signature already in
/// the header is replaced. Fails with `PayloadTooLarge` when the result would
/// exceed `max_len` bytes.
pub fn build_packet(
    signer: &dyn SignatureProvider,
    mut header: MeshHeader,
    payload: &Payload,
    max_len: usize,
) -> MeshResult<BuiltPacket> {
    let payload_bytes = payload.encode()?;
    let len = HEADER_LEN + payload_bytes.len();
    if len > max_len {
        return Err(MeshError::PayloadTooLarge { len, max: max_len });
    }

    header.flags.insert(PacketFlags::SIGNED);
    header.signature = [0u8; SIGNATURE_SLOT_LEN];

    let mut signing_data = encode_header(&header, false);
    signing_data.extend_from_slice(&payload_bytes);
    let signature = signer.sign(&signing_data)?;
    header.signature.copy_from_slice(&signature[..SIGNATURE_SLOT_LEN]);

    let mut packet = encode_header(&header, true);
    packet.extend_from_slice(&payload_bytes);

    Ok(BuiltPacket {
        header,
        payload: payload_bytes,
        packet,
        signature,
    })
}

/// Parse wire bytes into header and payload.
pub fn try_parse_packet(bytes: &[u8]) -> MeshResult<ParsedPacket> {
    let header = MeshHeader::decode(bytes)?;
    let payload = Payload::decode(header.msg_type, &bytes[HEADER_LEN..])?;

    let valid = header.is_signed();
    if valid {
        tracing::debug!(
            origin = %format!("{:08x}", header.origin_id),
            sequence = header.sequence,
            "signed flag set; truncated signature not verified"
        );
    }

    Ok(ParsedPacket {
        header,
        payload,
        valid,
    })
}

/// [`try_parse_packet`] with failures logged and mapped to `None`.
pub fn parse_packet(bytes: &[u8]) -> Option<ParsedPacket> {
    match try_parse_packet(bytes) {
        Ok(parsed) => Some(parsed),
        Err(MeshError::ShortPacket { len, required }) => {
            tracing::warn!(len, required, "packet too short for valid header");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to parse packet");
            None
        }
    }
}

/// Reconstruct the signing input (header prefix followed by payload) from
/// wire bytes.
pub fn signing_data(packet: &[u8]) -> Option<Vec<u8>> {
    if packet.len() < HEADER_LEN {
        return None;
    }
    let mut data = packet[..SIGNED_PREFIX_LEN].to_vec();
    data.extend_from_slice(&packet[HEADER_LEN..]);
    Some(data)
}

/// Verify `packet` against a full detached signature.
///
/// The signature must also agree with the truncated copy in the header, so a
/// valid signature for different wire bytes is rejected.
pub fn verify_detached(packet: &[u8], signature: &[u8], key: &PublicKey) -> bool {
    let Some(data) = signing_data(packet) else {
        return false;
    };
    if signature.len() != SIGNATURE_LEN
        || packet[SIGNED_PREFIX_LEN..SIGNED_PREFIX_LEN + SIGNATURE_SLOT_LEN]
            != signature[..SIGNATURE_SLOT_LEN]
    {
        return false;
    }
    key.verify(&data, signature)
}
