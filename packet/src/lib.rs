// Copyright (c) 2026 The Chainseal Developers

//! Seal packet definitions for chainseal clients
//!
//! This crate provides the wire-level envelopes exchanged with the chainseal
//! backend: MessagePack arrays carrying a device id, a typed payload and an
//! Ed25519 signature. Chained envelopes additionally carry the previous
//! packet's signature, so each device's packets form a hash-linked sequence
//! the backend can audit.
//!
//! Envelope construction and parsing live in [envelope], the public-key
//! announcement payload in [keyreg]. Signing itself is left to the caller
//! (see the `chainseal` client crate), this crate only defines what gets
//! signed.

pub mod envelope;
pub mod keyreg;
pub mod prelude;

/// Wire protocol version, encoded in the high nibble of the version byte
pub const PROTOCOL_VERSION: u8 = 2;

/// Ed25519 signature length
pub const SIGNATURE_LEN: usize = 64;

/// Chain link value for the first packet of a device
pub const CHAIN_START: [u8; SIGNATURE_LEN] = [0u8; SIGNATURE_LEN];

/// Envelope variants, encoded in the low nibble of the version byte
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Variant {
    /// Independent signed packet
    Signed = 0x02,

    /// Chained packet, commits to the previous packet's signature
    Chained = 0x03,
}

impl Variant {
    /// Wire version byte for this variant
    pub const fn version_byte(&self) -> u8 {
        (PROTOCOL_VERSION << 4) | (*self as u8)
    }

    /// Envelope array element count for this variant
    pub(crate) const fn num_elements(&self) -> u32 {
        match self {
            Variant::Signed => 5,
            Variant::Chained => 6,
        }
    }

    /// Parse a wire version byte
    ///
    /// Unsigned (plain) envelopes are rejected here, the backend only
    /// accepts signed content.
    pub fn from_version_byte(b: u8) -> Result<Self, PacketError> {
        if b >> 4 != PROTOCOL_VERSION {
            return Err(PacketError::InvalidVersion(b));
        }

        match b & 0x0f {
            0x02 => Ok(Variant::Signed),
            0x03 => Ok(Variant::Chained),
            v => Err(PacketError::InvalidVariant(v)),
        }
    }
}

/// Well-known payload type codes
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PayloadType {
    /// Opaque binary payload (also used for sealed payload hashes)
    Binary = 0x00,

    /// Public key registration, see [keyreg::KeyRegistration]
    KeyRegistration = 0x01,

    /// Timestamped sensor readings
    SensorReadings = 0x32,

    /// Free-form sensor document
    SensorJson = 0x53,
}

impl From<PayloadType> for u8 {
    fn from(t: PayloadType) -> u8 {
        t as u8
    }
}

impl TryFrom<u8> for PayloadType {
    type Error = PacketError;

    fn try_from(v: u8) -> Result<Self, PacketError> {
        match v {
            0x00 => Ok(PayloadType::Binary),
            0x01 => Ok(PayloadType::KeyRegistration),
            0x32 => Ok(PayloadType::SensorReadings),
            0x53 => Ok(PayloadType::SensorJson),
            _ => Err(PacketError::UnknownPayloadType(v)),
        }
    }
}

/// Seal packet encode / decode errors
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum PacketError {
    /// Truncated buffer or malformed MessagePack structure
    #[error("malformed MessagePack structure")]
    InvalidEncoding,

    /// Version nibble mismatch
    #[error("unsupported protocol version byte 0x{0:02x}")]
    InvalidVersion(u8),

    /// Unknown or unsigned envelope variant
    #[error("unsupported envelope variant 0x{0:02x}")]
    InvalidVariant(u8),

    /// Envelope element count does not match the variant
    #[error("unexpected envelope element count {actual} (expected {expected})")]
    InvalidElementCount { expected: u32, actual: u32 },

    /// Device id field is not a 16 byte binary
    #[error("invalid device id field")]
    InvalidDevice,

    /// Signature field is not a 64 byte binary
    #[error("invalid signature field")]
    InvalidSignature,

    /// Signature does not verify over the received head bytes
    #[error("signature verification failed")]
    SignatureMismatch,

    /// Bytes remain after the signature element
    #[error("trailing bytes after envelope")]
    TrailingData,

    /// Payload type code outside the known set
    #[error("unknown payload type 0x{0:02x}")]
    UnknownPayloadType(u8),

    /// Key registration payload is not the expected map
    #[error("malformed key registration payload")]
    InvalidRegistration,
}
