// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Type-erased payload carrier.
//!
//! Programs exchange and persist values of their own types. At the engine
//! boundary those values are encoded into a CBOR data model value so that one
//! [`crate::Export`] or [`crate::StateStore`] can hold entries of different
//! types. The engine never looks inside a payload.

use ciborium::value::Value;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while converting between program values and [`Payload`]s.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PayloadError {
    /// The value could not be represented in the CBOR data model.
    #[error("payload encode failed: {0}")]
    Encode(String),
    /// The stored payload does not have the shape of the requested type.
    #[error("payload decode failed: {0}")]
    Decode(String),
}

/// An encoded program value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(Value);

impl Payload {
    /// Encodes a program value.
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self, PayloadError> {
        Value::serialized(value)
            .map(Self)
            .map_err(|e| PayloadError::Encode(e.to_string()))
    }

    /// Decodes the payload back into a program value.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        self.0
            .deserialized()
            .map_err(|e| PayloadError::Decode(e.to_string()))
    }

    /// Borrow the underlying CBOR value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume into the underlying CBOR value.
    pub fn into_value(self) -> Value {
        self.0
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_values_survive_the_carrier() {
        let p = Payload::encode(&(1.5_f64, Some(7_u64))).unwrap();
        let back: (f64, Option<u64>) = p.decode().unwrap();
        assert_eq!(back, (1.5, Some(7)));
    }

    #[test]
    fn infinity_is_preserved() {
        let p = Payload::encode(&f64::INFINITY).unwrap();
        let back: f64 = p.decode().unwrap();
        assert!(back.is_infinite() && back.is_sign_positive());
    }

    #[test]
    fn shape_mismatch_is_a_decode_error() {
        let p = Payload::encode("text").unwrap();
        let err = p.decode::<u32>().unwrap_err();
        assert!(matches!(err, PayloadError::Decode(_)));
    }
}
