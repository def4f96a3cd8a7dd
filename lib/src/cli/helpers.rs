// Copyright (c) 2026 The Chainseal Developers

use byteorder::{ByteOrder, LittleEndian};
use uuid::Uuid;

/// Log prefixes for demo steps
pub const OK: &str = "\u{2714} ";
pub const NOK: &str = "\u{2716} ";
pub const STEP: &str = "\u{25b6} ";

#[derive(Clone, PartialEq, Debug)]
pub struct HexData<const N: usize = 32>(pub [u8; N]);

impl<const N: usize> std::str::FromStr for HexData<N> {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut b = [0u8; N];

        hex::decode_to_slice(s, &mut b)?;

        Ok(HexData(b))
    }
}

impl<const N: usize> AsRef<[u8; N]> for HexData<N> {
    fn as_ref(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> std::fmt::Display for HexData<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Shorten long proof values for display
pub fn shorten(text: &str) -> String {
    let n = text.chars().count();
    if n <= 50 {
        return text.to_string();
    }

    let head: String = text.chars().take(22).collect();
    let tail: String = text.chars().skip(n - 25).collect();

    format!("{head}...{tail}")
}

/// Shorten all top-level string fields of a proof document
pub fn shorten_fields(doc: &serde_json::Value) -> serde_json::Value {
    match doc {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = match v {
                        serde_json::Value::String(s) => serde_json::Value::String(shorten(s)),
                        other => other.clone(),
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Packed sensor reading: hardware id, timestamp millis, value
///
/// Layout matches the device firmware tooling: 8 byte node id, u64
/// little-endian milliseconds, f32 little-endian value.
pub fn sensor_reading(hw: &Uuid, timestamp_ms: u64, value: f32) -> Vec<u8> {
    let mut b = [0u8; 20];

    b[..8].copy_from_slice(&hw.as_bytes()[..8]);
    LittleEndian::write_u64(&mut b[8..16], timestamp_ms);
    LittleEndian::write_f32(&mut b[16..20], value);

    b.to_vec()
}
