// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! CBOR encoding for inter-node messages and persisted state.
//!
//! An [`Export`] travels as a sequence of `{path, value}` entries in canonical
//! Path order; the Path is its structural Slot list. A [`StateSnapshot`] uses
//! the same layout. Nothing here frames or authenticates packets; delivery is
//! the Round Driver's concern.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

use crate::export::Export;
use crate::ident::NodeId;
use crate::state::StateSnapshot;

/// 32-byte BLAKE3 digest.
pub type Hash32 = [u8; 32];

/// Errors raised by the wire codec.
#[derive(Debug, Error)]
pub enum WireError {
    /// Serialization failed.
    #[error("cbor encode failed: {0}")]
    Encode(String),
    /// Bytes were not a valid encoding of the requested type.
    #[error("cbor decode failed: {0}")]
    Decode(String),
}

/// Encode any serializable value to CBOR bytes.
pub fn to_cbor<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, WireError> {
    let mut out = Vec::new();
    ciborium::ser::into_writer(value, &mut out).map_err(|e| WireError::Encode(e.to_string()))?;
    Ok(out)
}

/// Decode a value from CBOR bytes.
pub fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, WireError> {
    ciborium::de::from_reader(bytes).map_err(|e| WireError::Decode(e.to_string()))
}

/// Encode one Export.
pub fn encode_export(export: &Export) -> Result<Vec<u8>, WireError> {
    to_cbor(export)
}

/// Decode one Export.
pub fn decode_export(bytes: &[u8]) -> Result<Export, WireError> {
    from_cbor(bytes)
}

/// Encode a persisted state snapshot.
pub fn encode_state(state: &StateSnapshot) -> Result<Vec<u8>, WireError> {
    to_cbor(state)
}

/// Decode a persisted state snapshot.
pub fn decode_state(bytes: &[u8]) -> Result<StateSnapshot, WireError> {
    from_cbor(bytes)
}

/// BLAKE3 digest of an Export's encoding.
///
/// Entries are encoded in canonical Path order, so equal Exports hash equal.
pub fn export_digest(export: &Export) -> Result<Hash32, WireError> {
    Ok(blake3::hash(&encode_export(export)?).into())
}

/// One sender's message for one round: the Export it addressed to a single
/// recipient.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    /// Sending node.
    pub sender: NodeId,
    /// Sender's round counter when the Export was produced.
    pub round: u64,
    /// Path-keyed values for the recipient.
    pub export: Export,
}

impl Envelope {
    /// Encode to CBOR bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, WireError> {
        to_cbor(self)
    }

    /// Decode from CBOR bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, WireError> {
        from_cbor(bytes)
    }
}
