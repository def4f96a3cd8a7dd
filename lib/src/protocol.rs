// Copyright (c) 2026 The Chainseal Developers

//! Chained packet construction and per-device chain state
//!
//! The backend treats each device's packets as a hash-linked sequence:
//! every chained packet signs over the previous packet's signature. The
//! chain tail must therefore survive process restarts, which is what the
//! state file provides. A missing state file simply starts a new chain.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use base64::prelude::{Engine as _, BASE64_STANDARD};
use log::{debug, warn};
use rmpv::Value;
use uuid::Uuid;

use chainseal_packet::{
    envelope::{encode_head, signing_digest, DecodedPacket, Packet},
    Variant, CHAIN_START, SIGNATURE_LEN,
};

use crate::{keystore::KeyStore, Error};

/// Chained packet builder with persistent per-device signature state
pub struct SealChain {
    keystore: KeyStore,
    signatures: HashMap<Uuid, [u8; SIGNATURE_LEN]>,
    state_path: PathBuf,
}

impl SealChain {
    /// Create a chain for a device, restoring any persisted state
    pub fn new(keystore: KeyStore, state_dir: impl AsRef<Path>, device: Uuid) -> Self {
        let state_path = state_dir.as_ref().join(format!("{}.sig", device.simple()));
        let signatures = Self::load(&state_path);

        Self {
            keystore,
            signatures,
            state_path,
        }
    }

    /// Restore chain state, falling back to an empty map
    fn load(path: &Path) -> HashMap<Uuid, [u8; SIGNATURE_LEN]> {
        let raw = match fs::read_to_string(path) {
            Ok(v) => v,
            Err(_) => {
                warn!("No saved chain state at {}", path.display());
                return HashMap::new();
            }
        };

        let stored: HashMap<Uuid, String> = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                warn!("Discarding unreadable chain state {}: {}", path.display(), e);
                return HashMap::new();
            }
        };

        let mut signatures = HashMap::new();
        for (id, b64) in stored {
            match BASE64_STANDARD.decode(&b64) {
                Ok(d) if d.len() == SIGNATURE_LEN => {
                    let mut sig = [0u8; SIGNATURE_LEN];
                    sig.copy_from_slice(&d);
                    signatures.insert(id, sig);
                }
                _ => warn!("Discarding malformed chain signature for {id}"),
            }
        }

        debug!(
            "Loaded {} chain signatures from {}",
            signatures.len(),
            path.display()
        );

        signatures
    }

    /// Persist chain state for the next run
    pub fn persist(&self) -> Result<(), Error> {
        let stored: HashMap<Uuid, String> = self
            .signatures
            .iter()
            .map(|(id, sig)| (*id, BASE64_STANDARD.encode(sig)))
            .collect();

        fs::write(&self.state_path, serde_json::to_string_pretty(&stored)?)?;

        Ok(())
    }

    /// Build an independent signed packet (does not touch the chain)
    pub fn message_signed(
        &self,
        id: &Uuid,
        payload_type: u8,
        payload: Value,
    ) -> Result<Vec<u8>, Error> {
        let head = encode_head(Variant::Signed, id, None, payload_type, &payload)?;
        let signature = self.keystore.sign_digest(id, &signing_digest(&head))?;

        let encoded = Packet::signed(*id, payload_type, payload, signature).encode()?;

        Ok(encoded)
    }

    /// Build a chained packet and advance the device's chain tail
    pub fn message_chained(
        &mut self,
        id: &Uuid,
        payload_type: u8,
        payload: Value,
    ) -> Result<Vec<u8>, Error> {
        let prev = self.signatures.get(id).copied().unwrap_or(CHAIN_START);

        let head = encode_head(Variant::Chained, id, Some(&prev), payload_type, &payload)?;
        let signature = self.keystore.sign_digest(id, &signing_digest(&head))?;

        let encoded = Packet::chained(*id, prev, payload_type, payload, signature).encode()?;

        // Only record the link once the packet exists
        self.signatures.insert(*id, signature);

        Ok(encoded)
    }

    /// Last chained signature for a device, if any packets were built
    pub fn last_signature(&self, id: &Uuid) -> Option<&[u8; SIGNATURE_LEN]> {
        self.signatures.get(id)
    }

    /// Decode a packet and verify it against the identity's public key
    pub fn verify<'a>(&self, id: &Uuid, buff: &'a [u8]) -> Result<DecodedPacket<'a>, Error> {
        let decoded = Packet::decode(buff)?;
        decoded.verify(&self.keystore.verifying_key(id)?)?;

        Ok(decoded)
    }

    /// Access the underlying keystore
    pub fn keystore(&self) -> &KeyStore {
        &self.keystore
    }

    /// Mutable access to the underlying keystore
    pub fn keystore_mut(&mut self) -> &mut KeyStore {
        &mut self.keystore
    }
}

#[cfg(test)]
mod test {
    use chainseal_packet::PayloadType;

    use super::*;

    fn chain_with_key(dir: &Path, device: Uuid) -> SealChain {
        let mut ks = KeyStore::load_or_create(dir.join("demo.keys")).unwrap();
        if !ks.contains(&device) {
            ks.create_keypair(device).unwrap();
        }
        SealChain::new(ks, dir, device)
    }

    #[test]
    fn first_packet_links_chain_start() {
        let dir = tempfile::tempdir().unwrap();
        let device = Uuid::new_v4();
        let mut chain = chain_with_key(dir.path(), device);

        let m = chain
            .message_chained(&device, PayloadType::Binary.into(), Value::from(1))
            .unwrap();

        let decoded = chain.verify(&device, &m).unwrap();
        assert_eq!(decoded.packet.prev_signature, Some(CHAIN_START));
        assert_eq!(chain.last_signature(&device), Some(&decoded.packet.signature));
    }

    #[test]
    fn chained_packets_advance_state() {
        let dir = tempfile::tempdir().unwrap();
        let device = Uuid::new_v4();
        let mut chain = chain_with_key(dir.path(), device);

        let m1 = chain
            .message_chained(&device, PayloadType::Binary.into(), Value::from(1))
            .unwrap();
        let m2 = chain
            .message_chained(&device, PayloadType::Binary.into(), Value::from(2))
            .unwrap();

        let d1 = chain.verify(&device, &m1).unwrap();
        let d2 = chain.verify(&device, &m2).unwrap();

        assert_eq!(d2.packet.prev_signature, Some(d1.packet.signature));
    }

    #[test]
    fn signed_packets_do_not_advance_state() {
        let dir = tempfile::tempdir().unwrap();
        let device = Uuid::new_v4();
        let mut chain = chain_with_key(dir.path(), device);

        let m1 = chain
            .message_chained(&device, PayloadType::Binary.into(), Value::from(1))
            .unwrap();
        let tail = *chain.last_signature(&device).unwrap();

        let _ = chain
            .message_signed(&device, PayloadType::Binary.into(), Value::from(2))
            .unwrap();
        assert_eq!(chain.last_signature(&device), Some(&tail));

        let m2 = chain
            .message_chained(&device, PayloadType::Binary.into(), Value::from(3))
            .unwrap();

        let d1 = chain.verify(&device, &m1).unwrap();
        let d2 = chain.verify(&device, &m2).unwrap();
        assert_eq!(d2.packet.prev_signature, Some(d1.packet.signature));
    }

    #[test]
    fn chain_state_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let device = Uuid::new_v4();

        let m1 = {
            let mut chain = chain_with_key(dir.path(), device);
            let m = chain
                .message_chained(&device, PayloadType::Binary.into(), Value::from(1))
                .unwrap();
            chain.persist().unwrap();
            m
        };

        // A fresh instance must continue the same chain
        let mut chain = chain_with_key(dir.path(), device);
        let m2 = chain
            .message_chained(&device, PayloadType::Binary.into(), Value::from(2))
            .unwrap();

        let d1 = chain.verify(&device, &m1).unwrap();
        let d2 = chain.verify(&device, &m2).unwrap();
        assert_eq!(d2.packet.prev_signature, Some(d1.packet.signature));
    }

    #[test]
    fn corrupt_state_starts_fresh() {
        let dir = tempfile::tempdir().unwrap();
        let device = Uuid::new_v4();

        fs::write(
            dir.path().join(format!("{}.sig", device.simple())),
            b"not json",
        )
        .unwrap();

        let mut chain = chain_with_key(dir.path(), device);
        let m = chain
            .message_chained(&device, PayloadType::Binary.into(), Value::from(1))
            .unwrap();

        let decoded = chain.verify(&device, &m).unwrap();
        assert_eq!(decoded.packet.prev_signature, Some(CHAIN_START));
    }
}
