// Copyright (c) 2026 The Chainseal Developers

//! Public key registration payload
//!
//! A new identity announces its public key to the backend key service with a
//! signed packet of type [PayloadType::KeyRegistration][crate::PayloadType]
//! whose payload is the MessagePack map defined here.

use chrono::{DateTime, Duration, Utc};
use rmpv::Value;
use uuid::Uuid;

use super::PacketError;

/// Algorithm label for Ed25519 device keys
pub const ALGORITHM_ED25519: &str = "ECC_ED25519";

/// Registration validity window in days
const VALIDITY_DAYS: i64 = 365;

/// Public key registration for a device identity
///
/// Timestamps are encoded as UNIX seconds, ids and keys as raw binaries.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyRegistration {
    pub algorithm: String,
    pub created: DateTime<Utc>,
    pub hw_device_id: Uuid,
    pub pub_key: [u8; 32],
    pub pub_key_id: [u8; 32],
    pub valid_not_after: DateTime<Utc>,
    pub valid_not_before: DateTime<Utc>,
}

impl KeyRegistration {
    /// Create a registration for a device public key, valid for one year
    pub fn new(device: Uuid, pub_key: [u8; 32], created: DateTime<Utc>) -> Self {
        Self {
            algorithm: ALGORITHM_ED25519.to_string(),
            created,
            hw_device_id: device,
            pub_key,
            pub_key_id: pub_key,
            valid_not_after: created + Duration::days(VALIDITY_DAYS),
            valid_not_before: created,
        }
    }

    /// Encode as the MessagePack map expected by the key service
    pub fn to_value(&self) -> Value {
        Value::Map(vec![
            (
                Value::from("algorithm"),
                Value::from(self.algorithm.as_str()),
            ),
            (Value::from("created"), Value::from(self.created.timestamp())),
            (
                Value::from("hwDeviceId"),
                Value::Binary(self.hw_device_id.as_bytes().to_vec()),
            ),
            (Value::from("pubKey"), Value::Binary(self.pub_key.to_vec())),
            (
                Value::from("pubKeyId"),
                Value::Binary(self.pub_key_id.to_vec()),
            ),
            (
                Value::from("validNotAfter"),
                Value::from(self.valid_not_after.timestamp()),
            ),
            (
                Value::from("validNotBefore"),
                Value::from(self.valid_not_before.timestamp()),
            ),
        ])
    }

    /// Decode from a MessagePack map payload
    pub fn from_value(v: &Value) -> Result<Self, PacketError> {
        let map = v.as_map().ok_or(PacketError::InvalidRegistration)?;

        let mut algorithm = None;
        let mut created = None;
        let mut hw_device_id = None;
        let mut pub_key = None;
        let mut pub_key_id = None;
        let mut valid_not_after = None;
        let mut valid_not_before = None;

        for (key, value) in map {
            match key.as_str() {
                Some("algorithm") => algorithm = value.as_str().map(str::to_string),
                Some("created") => created = timestamp(value),
                Some("hwDeviceId") => hw_device_id = uuid_bytes(value),
                Some("pubKey") => pub_key = key_bytes(value),
                Some("pubKeyId") => pub_key_id = key_bytes(value),
                Some("validNotAfter") => valid_not_after = timestamp(value),
                Some("validNotBefore") => valid_not_before = timestamp(value),
                _ => (),
            }
        }

        match (
            algorithm,
            created,
            hw_device_id,
            pub_key,
            pub_key_id,
            valid_not_after,
            valid_not_before,
        ) {
            (Some(a), Some(c), Some(h), Some(p), Some(pi), Some(va), Some(vb)) => Ok(Self {
                algorithm: a,
                created: c,
                hw_device_id: h,
                pub_key: p,
                pub_key_id: pi,
                valid_not_after: va,
                valid_not_before: vb,
            }),
            _ => Err(PacketError::InvalidRegistration),
        }
    }
}

fn timestamp(v: &Value) -> Option<DateTime<Utc>> {
    v.as_i64().and_then(|s| DateTime::from_timestamp(s, 0))
}

fn uuid_bytes(v: &Value) -> Option<Uuid> {
    let b: [u8; 16] = v.as_slice()?.try_into().ok()?;
    Some(Uuid::from_bytes(b))
}

fn key_bytes(v: &Value) -> Option<[u8; 32]> {
    v.as_slice()?.try_into().ok()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn registration_roundtrip() {
        let device = Uuid::new_v4();
        let pub_key: [u8; 32] = rand::random();
        let created = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let reg = KeyRegistration::new(device, pub_key, created);
        let decoded = KeyRegistration::from_value(&reg.to_value()).unwrap();

        assert_eq!(decoded, reg);
    }

    #[test]
    fn registration_validity_window() {
        let device = Uuid::new_v4();
        let created = DateTime::from_timestamp(1_700_000_000, 0).unwrap();

        let reg = KeyRegistration::new(device, [0u8; 32], created);

        assert_eq!(reg.algorithm, ALGORITHM_ED25519);
        assert_eq!(reg.valid_not_before, created);
        assert_eq!(reg.valid_not_after, created + Duration::days(365));
        assert_eq!(reg.pub_key_id, reg.pub_key);
    }

    #[test]
    fn registration_map_keys() {
        let reg = KeyRegistration::new(Uuid::new_v4(), [7u8; 32], Utc::now());
        let value = reg.to_value();

        let map = value.as_map().unwrap();
        let keys: Vec<&str> = map.iter().filter_map(|(k, _)| k.as_str()).collect();

        assert_eq!(
            keys,
            [
                "algorithm",
                "created",
                "hwDeviceId",
                "pubKey",
                "pubKeyId",
                "validNotAfter",
                "validNotBefore",
            ]
        );
    }

    #[test]
    fn registration_rejects_non_map() {
        assert!(matches!(
            KeyRegistration::from_value(&Value::from(42)),
            Err(PacketError::InvalidRegistration)
        ));
    }
}
