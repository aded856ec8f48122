use std::fmt;

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use starknet_ff::FieldElement;

/// A Stark-friendly field element: the common currency of leaf values, Merkle node
/// hashes, roots, and signed messages throughout this crate family.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Felt(pub FieldElement);

#[derive(Debug, thiserror::Error)]
pub enum FeltError {
    #[error("value does not fit in a field element: {0}")]
    OutOfRange(String),
    #[error("invalid hex felt literal: {0}")]
    InvalidHex(String),
}

impl Felt {
    pub const ZERO: Felt = Felt(FieldElement::ZERO);

    /// Parses a big-endian byte string into a field element, left-padding with zeros up
    /// to 32 bytes. Rejects inputs longer than 32 bytes outright.
    pub fn from_be_slice(bytes: &[u8]) -> Result<Self, FeltError> {
        if bytes.len() > 32 {
            return Err(FeltError::OutOfRange(format!("{} bytes, max 32", bytes.len())));
        }
        let mut buf = [0u8; 32];
        buf[32 - bytes.len()..].copy_from_slice(bytes);
        FieldElement::from_bytes_be(&buf)
            .map(Felt)
            .map_err(|_| FeltError::OutOfRange(hex::encode(bytes)))
    }

    pub fn from_u64(value: u64) -> Self {
        Felt(FieldElement::from(value))
    }

    pub fn to_bytes_be(self) -> [u8; 32] {
        self.0.to_bytes_be()
    }

    pub fn to_hex(self) -> String {
        format!("0x{}", hex::encode(self.to_bytes_be()))
    }

    pub fn from_hex(s: &str) -> Result<Self, FeltError> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| FeltError::InvalidHex(e.to_string()))?;
        Self::from_be_slice(&bytes)
    }
}

impl fmt::Debug for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Felt({})", self.to_hex())
    }
}

impl fmt::Display for Felt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Felt {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Felt {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Felt::from_hex(&s).map_err(DeError::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let felt = Felt::from_u64(424242);
        let hex = felt.to_hex();
        assert_eq!(Felt::from_hex(&hex).unwrap(), felt);
    }

    #[test]
    fn serde_round_trip() {
        let felt = Felt::from_u64(7);
        let json = serde_json::to_string(&felt).unwrap();
        let back: Felt = serde_json::from_str(&json).unwrap();
        assert_eq!(back, felt);
    }

    #[test]
    fn rejects_oversize_input() {
        let bytes = [0xffu8; 40];
        assert!(Felt::from_be_slice(&bytes).is_err());
    }
}
