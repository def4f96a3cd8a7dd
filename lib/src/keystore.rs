// Copyright (c) 2026 The Chainseal Developers

//! Persistent Ed25519 keystore for device identities
//!
//! Keys are held per identity uuid and persisted as a JSON document of
//! base64 seed material next to the chain state. Seed buffers are zeroized
//! once the in-memory key is constructed.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use log::{debug, info};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

use chainseal_packet::keyreg::KeyRegistration;

use crate::Error;

/// Serialized keystore entry
#[derive(Serialize, Deserialize)]
struct StoredKey {
    /// base64 Ed25519 seed
    secret: String,

    /// base64 public key, informational
    public: String,

    /// Key creation time
    created: DateTime<Utc>,
}

/// In-memory keystore entry
struct Entry {
    key: SigningKey,
    created: DateTime<Utc>,
}

/// UUID-keyed Ed25519 keystore with file persistence
pub struct KeyStore {
    path: PathBuf,
    entries: HashMap<Uuid, Entry>,
}

impl KeyStore {
    /// Load a keystore, starting empty when no file exists yet
    pub fn load_or_create(path: impl Into<PathBuf>) -> Result<Self, Error> {
        let path = path.into();

        if !path.exists() {
            debug!("No keystore at {}, starting empty", path.display());
            return Ok(Self {
                path,
                entries: HashMap::new(),
            });
        }

        let raw = fs::read_to_string(&path)?;
        let stored: HashMap<Uuid, StoredKey> = serde_json::from_str(&raw)?;

        let mut entries = HashMap::new();
        for (id, s) in stored {
            let decoded = BASE64_STANDARD
                .decode(&s.secret)
                .map_err(|_| Error::Config(format!("malformed keystore entry for {id}")))?;

            let mut seed: [u8; 32] = decoded
                .try_into()
                .map_err(|_| Error::Config(format!("malformed keystore entry for {id}")))?;

            let key = SigningKey::from_bytes(&seed);
            seed.zeroize();

            entries.insert(
                id,
                Entry {
                    key,
                    created: s.created,
                },
            );
        }

        debug!(
            "Loaded {} signing keys from {}",
            entries.len(),
            path.display()
        );

        Ok(Self { path, entries })
    }

    /// Whether a signing key exists for the identity
    pub fn contains(&self, id: &Uuid) -> bool {
        self.entries.contains_key(id)
    }

    /// Create and persist a keypair for a new identity
    pub fn create_keypair(&mut self, id: Uuid) -> Result<VerifyingKey, Error> {
        if self.entries.contains_key(&id) {
            return Err(Error::KeyExists(id));
        }

        let key = SigningKey::generate(&mut OsRng);
        let public = key.verifying_key();

        self.entries.insert(
            id,
            Entry {
                key,
                created: Utc::now(),
            },
        );
        self.store()?;

        info!("Created signing key for identity {id}");

        Ok(public)
    }

    /// Sign a packet digest with the identity's key
    pub fn sign_digest(&self, id: &Uuid, digest: &[u8; 64]) -> Result<[u8; 64], Error> {
        let entry = self.entries.get(id).ok_or(Error::UnknownKey(*id))?;
        Ok(entry.key.sign(digest).to_bytes())
    }

    /// Fetch the verifying key for an identity
    pub fn verifying_key(&self, id: &Uuid) -> Result<VerifyingKey, Error> {
        let entry = self.entries.get(id).ok_or(Error::UnknownKey(*id))?;
        Ok(entry.key.verifying_key())
    }

    /// Build the key registration payload for an identity
    pub fn registration(&self, id: &Uuid) -> Result<KeyRegistration, Error> {
        let entry = self.entries.get(id).ok_or(Error::UnknownKey(*id))?;

        Ok(KeyRegistration::new(
            *id,
            entry.key.verifying_key().to_bytes(),
            entry.created,
        ))
    }

    /// Write all entries to the backing file
    pub fn store(&self) -> Result<(), Error> {
        let stored: HashMap<Uuid, StoredKey> = self
            .entries
            .iter()
            .map(|(id, entry)| {
                (
                    *id,
                    StoredKey {
                        secret: BASE64_STANDARD.encode(entry.key.to_bytes()),
                        public: BASE64_STANDARD.encode(entry.key.verifying_key().to_bytes()),
                        created: entry.created,
                    },
                )
            })
            .collect();

        fs::write(&self.path, serde_json::to_string_pretty(&stored)?)?;

        Ok(())
    }
}
