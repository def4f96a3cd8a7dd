// Copyright (c) 2026 The Chainseal Developers

//! Chainseal device identity and data sealing client library (and CLI)
//!
//! A thin client for the chainseal backend: it provisions an Ed25519
//! identity for a device ([keystore]), registers the identity and the
//! device record with the backend ([api]), signs and chains outgoing
//! packets ([protocol]) and confirms sealed payloads via an on-premise
//! validator.
//!
//! The backend is reached through the [transport::Transport] trait so
//! tests can substitute a scripted transport for the real HTTP client.

pub mod api;
pub mod config;
pub mod keystore;
pub mod protocol;
pub mod transport;

mod error;
pub use error::Error;

/// Re-export `chainseal-packet` for consumers
pub use chainseal_packet::{self as packet};

/// Backend handle over the production HTTP transport
pub type HttpApiHandle = api::ApiHandle<transport::HttpTransport>;
