//! Actor identities and fixed-size digests.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Errors produced while parsing hex-encoded 32-byte values.
#[derive(Debug, thiserror::Error)]
pub enum HexValueError {
    #[error("{kind} hex must be 64 characters, got {actual}")]
    InvalidLength { kind: &'static str, actual: usize },
    #[error("{kind} is not valid hexadecimal: {source}")]
    InvalidHex {
        kind: &'static str,
        #[source]
        source: hex::FromHexError,
    },
}

fn decode_32(kind: &'static str, value: &str) -> Result<[u8; 32], HexValueError> {
    if value.len() != 64 {
        return Err(HexValueError::InvalidLength {
            kind,
            actual: value.len(),
        });
    }
    let mut bytes = [0u8; 32];
    hex::decode_to_slice(value, &mut bytes)
        .map_err(|source| HexValueError::InvalidHex { kind, source })?;
    Ok(bytes)
}

/// Ed25519 public key identifying an actor (user or authority).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Identity(pub [u8; 32]);

impl Identity {
    pub fn new(key: [u8; 32]) -> Self {
        Self(key)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(value: &str) -> Result<Self, HexValueError> {
        decode_32("identity", value).map(Self)
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({})", self.to_hex())
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Identity> for String {
    fn from(value: Identity) -> Self {
        value.to_hex()
    }
}

impl TryFrom<String> for Identity {
    type Error = HexValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Identity::from_hex(&value)
    }
}

/// 32-byte digest used for file content hashes and Merkle roots.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// The all-zero digest, used for roots that have not been set.
    pub const ZERO: Digest = Digest([0u8; 32]);

    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(value: &str) -> Result<Self, HexValueError> {
        decode_32("digest", value).map(Self)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<Digest> for String {
    fn from(value: Digest) -> Self {
        value.to_hex()
    }
}

impl TryFrom<String> for Digest {
    type Error = HexValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Digest::from_hex(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_serializes_as_hex() {
        let id = Identity::new([0xab; 32]);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: Identity = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn digest_zero_default() {
        assert!(Digest::default().is_zero());
        assert_eq!(Digest::default(), Digest::ZERO);
        assert!(!Digest::from_bytes([1u8; 32]).is_zero());
    }

    #[test]
    fn short_hex_rejected() {
        let err = Digest::from_hex("00ff").unwrap_err();
        assert!(matches!(err, HexValueError::InvalidLength { actual: 4, .. }));
        let err = Identity::from_hex(&"zz".repeat(32)).unwrap_err();
        assert!(matches!(err, HexValueError::InvalidHex { .. }));
    }
}
