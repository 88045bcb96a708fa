//! Fixed-width mesh header.
//!
//! ```text
//!  0      version
//!  1      msg_type
//!  2..4   sequence      u16 BE
//!  4..8   timestamp     u32 BE, epoch seconds
//!  8..12  origin_id     u32 BE
//! 12..16  icao_code     u32 BE, 4 ASCII bytes
//! 16      ttl
//! 17      priority
//! 18      flags
//! 19      reserved
//! 20..52  signature     first 32 bytes of the Ed25519 signature
//! 52..64  padding       zero
//! ```

use crate::error::MeshError;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU16, Ordering};

pub const PROTOCOL_VERSION: u8 = 1;

/// Total header width; the payload starts here.
pub const HEADER_LEN: usize = 64;

/// Bytes covered by the signature (everything before the signature slot).
pub const SIGNED_PREFIX_LEN: usize = 20;

/// Width of the signature slot.
pub const SIGNATURE_SLOT_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    Metar = 0,
    Taf = 1,
    Sensor = 2,
    Alert = 3,
    Control = 4,
    Heartbeat = 5,
    Ack = 6,
    Route = 7,
}

impl TryFrom<u8> for MessageType {
    type Error = MeshError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Metar,
            1 => Self::Taf,
            2 => Self::Sensor,
            3 => Self::Alert,
            4 => Self::Control,
            5 => Self::Heartbeat,
            6 => Self::Ack,
            7 => Self::Route,
            other => {
                return Err(MeshError::DecodeFailure(format!(
                    "unknown message type {other}"
                )))
            }
        })
    }
}

/// Delivery priority; lower values are more urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Priority {
    Critical = 0,
    High = 1,
    Normal = 2,
    Low = 3,
    Background = 4,
}

impl TryFrom<u8> for Priority {
    type Error = MeshError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Critical,
            1 => Self::High,
            2 => Self::Normal,
            3 => Self::Low,
            4 => Self::Background,
            other => {
                return Err(MeshError::DecodeFailure(format!("unknown priority {other}")))
            }
        })
    }
}

/// Header flag bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PacketFlags(u8);

impl PacketFlags {
    pub const SIGNED: Self = Self(0x01);
    pub const ENCRYPTED: Self = Self(0x02);
    pub const ACK_REQUIRED: Self = Self(0x04);
    pub const ROUTE_REQUEST: Self = Self(0x08);
    pub const EMERGENCY: Self = Self(0x10);
    pub const COMPRESSED: Self = Self(0x20);

    pub const fn empty() -> Self {
        Self(0)
    }

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }
}

impl std::ops::BitOr for PacketFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Decoded mesh header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeshHeader {
    pub version: u8,
    pub msg_type: MessageType,
    /// Anti-replay counter
    pub sequence: u16,
    /// Epoch seconds
    pub timestamp: u32,
    pub origin_id: u32,
    pub icao_code: u32,
    /// Remaining hops
    pub ttl: u8,
    pub priority: Priority,
    pub flags: PacketFlags,
    pub reserved: u8,
    pub signature: [u8; SIGNATURE_SLOT_LEN],
}

impl MeshHeader {
    pub fn icao(&self) -> String {
        int_to_icao(self.icao_code)
    }

    pub fn is_signed(&self) -> bool {
        self.flags.contains(PacketFlags::SIGNED)
    }

    /// Decode the first [`HEADER_LEN`] bytes of `bytes`.
    pub fn decode(bytes: &[u8]) -> Result<Self, MeshError> {
        if bytes.len() < HEADER_LEN {
            return Err(MeshError::ShortPacket {
                len: bytes.len(),
                required: HEADER_LEN,
            });
        }

        let mut signature = [0u8; SIGNATURE_SLOT_LEN];
        signature.copy_from_slice(&bytes[SIGNED_PREFIX_LEN..SIGNED_PREFIX_LEN + SIGNATURE_SLOT_LEN]);

        Ok(Self {
            version: bytes[0],
            msg_type: MessageType::try_from(bytes[1])?,
            sequence: u16::from_be_bytes([bytes[2], bytes[3]]),
            timestamp: be_u32(&bytes[4..8]),
            origin_id: be_u32(&bytes[8..12]),
            icao_code: be_u32(&bytes[12..16]),
            ttl: bytes[16],
            priority: Priority::try_from(bytes[17])?,
            flags: PacketFlags::from_bits(bytes[18]),
            reserved: bytes[19],
            signature,
        })
    }
}

fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Serialize a header.
///
/// With `include_signature == false` only the signed prefix (bytes 0..20) is
/// returned; otherwise the full 64-byte header with zero padding.
pub fn encode_header(header: &MeshHeader, include_signature: bool) -> Vec<u8> {
    let mut out = vec![0u8; HEADER_LEN];
    out[0] = header.version;
    out[1] = header.msg_type as u8;
    out[2..4].copy_from_slice(&header.sequence.to_be_bytes());
    out[4..8].copy_from_slice(&header.timestamp.to_be_bytes());
    out[8..12].copy_from_slice(&header.origin_id.to_be_bytes());
    out[12..16].copy_from_slice(&header.icao_code.to_be_bytes());
    out[16] = header.ttl;
    out[17] = header.priority as u8;
    out[18] = header.flags.bits();
    out[19] = header.reserved;

    if !include_signature {
        out.truncate(SIGNED_PREFIX_LEN);
        return out;
    }
    out[SIGNED_PREFIX_LEN..SIGNED_PREFIX_LEN + SIGNATURE_SLOT_LEN].copy_from_slice(&header.signature);
    out
}

/// Pack up to four bytes of `code` into a big-endian u32, null-padded.
pub fn icao_to_int(code: &str) -> u32 {
    let mut bytes = [0u8; 4];
    for (slot, b) in bytes.iter_mut().zip(code.bytes()) {
        *slot = b;
    }
    u32::from_be_bytes(bytes)
}

/// Inverse of [`icao_to_int`]; null bytes are dropped.
pub fn int_to_icao(value: u32) -> String {
    let bytes: Vec<u8> = value.to_be_bytes().into_iter().filter(|b| *b != 0).collect();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// Per-node packet sequence. The first allocated value is 1 and the counter
/// wraps from 65535 to 0.
#[derive(Debug, Default)]
pub struct SequenceCounter {
    last: AtomicU16,
}

impl SequenceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counter whose next allocation is `last + 1`.
    pub fn starting_after(last: u16) -> Self {
        Self {
            last: AtomicU16::new(last),
        }
    }

    pub fn next(&self) -> u16 {
        self.last.fetch_add(1, Ordering::SeqCst).wrapping_add(1)
    }

    /// Most recently allocated value (0 before the first allocation).
    pub fn current(&self) -> u16 {
        self.last.load(Ordering::SeqCst)
    }
}
