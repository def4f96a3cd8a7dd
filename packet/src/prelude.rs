// Copyright (c) 2026 The Chainseal Developers

//! Prelude to simplify downstream use of seal packet objects
//!

pub use crate::{
    envelope::{encode_head, signing_digest, DecodedPacket, Packet},
    keyreg::KeyRegistration,
    PacketError, PayloadType, Variant, CHAIN_START, PROTOCOL_VERSION, SIGNATURE_LEN,
};
