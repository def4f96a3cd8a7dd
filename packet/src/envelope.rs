// Copyright (c) 2026 The Chainseal Developers

//! Seal packet envelopes
//!
//! Envelopes are MessagePack arrays:
//!
//! ```text
//! signed:  [ version, device(bin16), payload_type, payload, signature(bin64) ]
//! chained: [ version, device(bin16), prev_signature(bin64), payload_type, payload, signature(bin64) ]
//! ```
//!
//! The signature is Ed25519 over the SHA-512 digest of the serialized array
//! prefix, everything before the signature element. For a chained packet that
//! prefix includes the previous packet's signature, which is what links the
//! sequence.

use std::io::{Cursor, Read};

use ed25519_dalek::{Signature, VerifyingKey};
use rmpv::Value;
use sha2::{Digest, Sha512};
use uuid::Uuid;

use super::{PacketError, Variant, CHAIN_START, SIGNATURE_LEN};

/// Encode the signed envelope prefix (everything before the signature)
///
/// The outer array length written is the full element count, so a complete
/// packet is the head followed by the signature as a bin64 element.
pub fn encode_head(
    variant: Variant,
    device: &Uuid,
    prev_signature: Option<&[u8; SIGNATURE_LEN]>,
    payload_type: u8,
    payload: &Value,
) -> Result<Vec<u8>, PacketError> {
    let mut buff = Vec::with_capacity(128);

    rmp::encode::write_array_len(&mut buff, variant.num_elements())
        .map_err(|_| PacketError::InvalidEncoding)?;

    // Version byte
    rmp::encode::write_uint(&mut buff, variant.version_byte() as u64)
        .map_err(|_| PacketError::InvalidEncoding)?;

    // Device id
    rmp::encode::write_bin(&mut buff, device.as_bytes())
        .map_err(|_| PacketError::InvalidEncoding)?;

    // Chain link
    if variant == Variant::Chained {
        let prev = prev_signature.unwrap_or(&CHAIN_START);
        rmp::encode::write_bin(&mut buff, prev).map_err(|_| PacketError::InvalidEncoding)?;
    }

    // Payload type and payload
    rmp::encode::write_uint(&mut buff, payload_type as u64)
        .map_err(|_| PacketError::InvalidEncoding)?;
    rmpv::encode::write_value(&mut buff, payload).map_err(|_| PacketError::InvalidEncoding)?;

    Ok(buff)
}

/// SHA-512 digest committed to by a packet signature
pub fn signing_digest(head: &[u8]) -> [u8; 64] {
    Sha512::digest(head).into()
}

/// Seal packet, locally constructed or decoded from the wire
#[derive(Clone, Debug, PartialEq)]
pub struct Packet {
    /// Envelope variant
    pub variant: Variant,

    /// Device id of the signing identity
    pub device: Uuid,

    /// Previous packet signature (chained packets only)
    pub prev_signature: Option<[u8; SIGNATURE_LEN]>,

    /// Payload type code, see [PayloadType][super::PayloadType]
    pub payload_type: u8,

    /// Payload value
    pub payload: Value,

    /// Ed25519 signature over the head digest
    pub signature: [u8; SIGNATURE_LEN],
}

impl Packet {
    /// Create an independent signed packet
    pub fn signed(
        device: Uuid,
        payload_type: u8,
        payload: Value,
        signature: [u8; SIGNATURE_LEN],
    ) -> Self {
        Self {
            variant: Variant::Signed,
            device,
            prev_signature: None,
            payload_type,
            payload,
            signature,
        }
    }

    /// Create a chained packet linking to the previous signature
    pub fn chained(
        device: Uuid,
        prev_signature: [u8; SIGNATURE_LEN],
        payload_type: u8,
        payload: Value,
        signature: [u8; SIGNATURE_LEN],
    ) -> Self {
        Self {
            variant: Variant::Chained,
            device,
            prev_signature: Some(prev_signature),
            payload_type,
            payload,
            signature,
        }
    }

    /// Serialize the packet, head followed by the signature
    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut buff = encode_head(
            self.variant,
            &self.device,
            self.prev_signature.as_ref(),
            self.payload_type,
            &self.payload,
        )?;

        rmp::encode::write_bin(&mut buff, &self.signature)
            .map_err(|_| PacketError::InvalidEncoding)?;

        Ok(buff)
    }

    /// Decode a packet, retaining the signed head range for verification
    pub fn decode(buff: &[u8]) -> Result<DecodedPacket<'_>, PacketError> {
        let mut rd = Cursor::new(buff);

        let elements =
            rmp::decode::read_array_len(&mut rd).map_err(|_| PacketError::InvalidEncoding)?;

        // Version byte selects the variant and expected element count
        let version: u8 =
            rmp::decode::read_int(&mut rd).map_err(|_| PacketError::InvalidEncoding)?;
        let variant = Variant::from_version_byte(version)?;

        if elements != variant.num_elements() {
            return Err(PacketError::InvalidElementCount {
                expected: variant.num_elements(),
                actual: elements,
            });
        }

        // Device id
        let device = Uuid::from_bytes(read_bin_fixed::<16>(&mut rd, PacketError::InvalidDevice)?);

        // Chain link
        let prev_signature = match variant {
            Variant::Chained => Some(read_bin_fixed::<SIGNATURE_LEN>(
                &mut rd,
                PacketError::InvalidSignature,
            )?),
            Variant::Signed => None,
        };

        // Payload type and payload
        let payload_type: u8 =
            rmp::decode::read_int(&mut rd).map_err(|_| PacketError::InvalidEncoding)?;
        let payload =
            rmpv::decode::read_value(&mut rd).map_err(|_| PacketError::InvalidEncoding)?;

        // Everything up to here is what the signature commits to
        let head_len = rd.position() as usize;

        let signature = read_bin_fixed::<SIGNATURE_LEN>(&mut rd, PacketError::InvalidSignature)?;

        if rd.position() as usize != buff.len() {
            return Err(PacketError::TrailingData);
        }

        Ok(DecodedPacket {
            packet: Packet {
                variant,
                device,
                prev_signature,
                payload_type,
                payload,
                signature,
            },
            head: &buff[..head_len],
        })
    }
}

/// Decoded packet with the signed head range of the source buffer
#[derive(Clone, Debug)]
pub struct DecodedPacket<'a> {
    /// The decoded packet
    pub packet: Packet,

    head: &'a [u8],
}

impl<'a> DecodedPacket<'a> {
    /// Signed head bytes (envelope prefix before the signature element)
    pub fn head(&self) -> &'a [u8] {
        self.head
    }

    /// Verify the signature over the received head bytes
    ///
    /// Verification always recomputes the digest over the bytes as received,
    /// never over a re-serialization of the parsed fields.
    pub fn verify(&self, key: &VerifyingKey) -> Result<(), PacketError> {
        let digest = signing_digest(self.head);
        let signature = Signature::from_bytes(&self.packet.signature);

        key.verify_strict(&digest, &signature)
            .map_err(|_| PacketError::SignatureMismatch)
    }
}

/// Read a fixed-length binary element
fn read_bin_fixed<const N: usize>(
    rd: &mut Cursor<&[u8]>,
    err: PacketError,
) -> Result<[u8; N], PacketError> {
    let len = rmp::decode::read_bin_len(rd).map_err(|_| PacketError::InvalidEncoding)? as usize;
    if len != N {
        return Err(err);
    }

    let mut b = [0u8; N];
    rd.read_exact(&mut b)
        .map_err(|_| PacketError::InvalidEncoding)?;

    Ok(b)
}

#[cfg(test)]
mod test {
    use ed25519_dalek::{Signer, SigningKey};
    use rand_core::OsRng;

    use super::*;
    use crate::PayloadType;

    fn sign_head(key: &SigningKey, head: &[u8]) -> [u8; SIGNATURE_LEN] {
        key.sign(&signing_digest(head)).to_bytes()
    }

    #[test]
    fn signed_packet_roundtrip() {
        let key = SigningKey::generate(&mut OsRng);
        let device = Uuid::new_v4();
        let payload = Value::Binary(b"just some bytes".to_vec());

        let head = encode_head(
            Variant::Signed,
            &device,
            None,
            PayloadType::Binary.into(),
            &payload,
        )
        .unwrap();
        let signature = sign_head(&key, &head);

        let packet = Packet::signed(device, PayloadType::Binary.into(), payload, signature);
        let encoded = packet.encode().unwrap();

        let decoded = Packet::decode(&encoded).unwrap();
        assert_eq!(decoded.packet, packet);
        assert_eq!(decoded.head(), &encoded[..head.len()]);

        decoded.verify(&key.verifying_key()).unwrap();
    }

    #[test]
    fn chained_packets_link() {
        let key = SigningKey::generate(&mut OsRng);
        let device = Uuid::new_v4();

        // First packet of a chain links to the zero signature
        let p1 = {
            let payload = Value::from("first");
            let head = encode_head(
                Variant::Chained,
                &device,
                Some(&CHAIN_START),
                PayloadType::Binary.into(),
                &payload,
            )
            .unwrap();
            let sig = sign_head(&key, &head);
            Packet::chained(device, CHAIN_START, PayloadType::Binary.into(), payload, sig)
        };

        // Second packet commits to the first packet's signature
        let p2 = {
            let payload = Value::from("second");
            let head = encode_head(
                Variant::Chained,
                &device,
                Some(&p1.signature),
                PayloadType::Binary.into(),
                &payload,
            )
            .unwrap();
            let sig = sign_head(&key, &head);
            Packet::chained(device, p1.signature, PayloadType::Binary.into(), payload, sig)
        };

        let d1 = p1.encode().unwrap();
        let d2 = p2.encode().unwrap();

        let r1 = Packet::decode(&d1).unwrap();
        let r2 = Packet::decode(&d2).unwrap();

        assert_eq!(r1.packet.prev_signature, Some(CHAIN_START));
        assert_eq!(r2.packet.prev_signature, Some(r1.packet.signature));

        r1.verify(&key.verifying_key()).unwrap();
        r2.verify(&key.verifying_key()).unwrap();
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let key = SigningKey::generate(&mut OsRng);
        let device = Uuid::new_v4();
        let payload = Value::Binary(vec![1, 2, 3, 4]);

        let head = encode_head(
            Variant::Signed,
            &device,
            None,
            PayloadType::Binary.into(),
            &payload,
        )
        .unwrap();
        let signature = sign_head(&key, &head);
        let head_len = head.len();

        let mut encoded = Packet::signed(device, PayloadType::Binary.into(), payload, signature)
            .encode()
            .unwrap();

        // Flip the last payload byte, structure stays valid
        encoded[head_len - 1] ^= 0xff;

        let decoded = Packet::decode(&encoded).unwrap();
        assert!(matches!(
            decoded.verify(&key.verifying_key()),
            Err(PacketError::SignatureMismatch)
        ));
    }

    #[test]
    fn decode_rejects_bad_version() {
        let key = SigningKey::generate(&mut OsRng);
        let device = Uuid::new_v4();
        let payload = Value::from(42);

        let head = encode_head(
            Variant::Signed,
            &device,
            None,
            PayloadType::Binary.into(),
            &payload,
        )
        .unwrap();
        let signature = sign_head(&key, &head);

        let mut encoded = Packet::signed(device, PayloadType::Binary.into(), payload, signature)
            .encode()
            .unwrap();

        // buff[0] is the array marker, buff[1] the version fixint
        encoded[1] = 0x11;

        assert!(matches!(
            Packet::decode(&encoded),
            Err(PacketError::InvalidVersion(0x11))
        ));
    }

    #[test]
    fn decode_rejects_element_count_mismatch() {
        let key = SigningKey::generate(&mut OsRng);
        let device = Uuid::new_v4();
        let payload = Value::from(42);

        let head = encode_head(
            Variant::Signed,
            &device,
            None,
            PayloadType::Binary.into(),
            &payload,
        )
        .unwrap();
        let signature = sign_head(&key, &head);

        let mut encoded = Packet::signed(device, PayloadType::Binary.into(), payload, signature)
            .encode()
            .unwrap();

        // Claim six elements on a signed (five element) envelope
        encoded[0] = 0x96;

        assert!(matches!(
            Packet::decode(&encoded),
            Err(PacketError::InvalidElementCount {
                expected: 5,
                actual: 6
            })
        ));
    }

    #[test]
    fn decode_rejects_trailing_data() {
        let key = SigningKey::generate(&mut OsRng);
        let device = Uuid::new_v4();
        let payload = Value::from(42);

        let head = encode_head(
            Variant::Signed,
            &device,
            None,
            PayloadType::Binary.into(),
            &payload,
        )
        .unwrap();
        let signature = sign_head(&key, &head);

        let mut encoded = Packet::signed(device, PayloadType::Binary.into(), payload, signature)
            .encode()
            .unwrap();
        encoded.push(0x00);

        assert!(matches!(
            Packet::decode(&encoded),
            Err(PacketError::TrailingData)
        ));
    }

    #[test]
    fn decode_rejects_truncated_buffer() {
        let key = SigningKey::generate(&mut OsRng);
        let device = Uuid::new_v4();
        let payload = Value::from(42);

        let head = encode_head(
            Variant::Signed,
            &device,
            None,
            PayloadType::Binary.into(),
            &payload,
        )
        .unwrap();
        let signature = sign_head(&key, &head);

        let encoded = Packet::signed(device, PayloadType::Binary.into(), payload, signature)
            .encode()
            .unwrap();

        assert!(Packet::decode(&encoded[..encoded.len() - 10]).is_err());
    }
}
