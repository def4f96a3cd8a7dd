// Copyright (c) 2026 The Chainseal Developers

use uuid::Uuid;

use crate::transport::TransportError;

/// Chainseal client error type
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport failure (connection, TLS, timeout)
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Backend rejected a request
    #[error("backend rejected request ({status}): {body}")]
    Api { status: u16, body: String },

    /// No signing key for the requested identity
    #[error("no signing key for identity {0}")]
    UnknownKey(Uuid),

    /// Identity already has a signing key
    #[error("signing key for identity {0} already exists")]
    KeyExists(Uuid),

    /// Wire packet encode / decode failure
    #[error("packet error: {0}")]
    Packet(#[from] chainseal_packet::PacketError),

    /// Keystore or chain state file access failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed persistent state or response document
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration failure
    #[error("config error: {0}")]
    Config(String),
}
