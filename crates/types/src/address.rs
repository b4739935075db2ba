//! Deterministic entity addressing.
//!
//! Every ledger entity lives at an address computed from a namespace tag and
//! a list of seed components. Any client holding the same seeds arrives at the
//! same address, so requests can name their targets up front and the ledger can
//! check them before touching state.

use crate::identity::Identity;
use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// Errors that can occur when parsing an address string or deriving one.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("address must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("address is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("seed component {index} is {len} bytes (max 32)")]
    SeedTooLong { index: usize, len: usize },
}

/// Number of raw bytes contained in an address.
pub const ADDRESS_BYTES: usize = 32;
/// Expected string length of an encoded address.
pub const ADDRESS_STRING_LENGTH: usize = ADDRESS_BYTES * 2;
/// Maximum length of a single seed component.
pub const MAX_SEED_LEN: usize = 32;

/// Domain prefix mixed into every derivation.
const DERIVATION_DOMAIN: &[u8] = b"SOLDRIVE_DERIVED_ADDRESS";

/// Namespace tag of the global ledger singleton.
pub const CONFIG_SEED: &[u8] = b"config";
/// Namespace tag of per-user ledgers.
pub const USER_PROFILE_SEED: &[u8] = b"user_profile";
/// Namespace tag of file records.
pub const FILE_SEED: &[u8] = b"file";

/// Address of a ledger entity.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_BYTES]);

impl Address {
    /// Derive an address from a namespace tag and seed components.
    ///
    /// Each component is length-prefixed before hashing, so distinct
    /// component lists never produce the same preimage.
    pub fn derive(tag: &[u8], seeds: &[&[u8]]) -> Result<Self, AddressError> {
        for (index, seed) in seeds.iter().enumerate() {
            if seed.len() > MAX_SEED_LEN {
                return Err(AddressError::SeedTooLong {
                    index,
                    len: seed.len(),
                });
            }
        }
        Ok(Self::hash_components(tag, seeds))
    }

    fn hash_components(tag: &[u8], seeds: &[&[u8]]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(DERIVATION_DOMAIN);
        for component in std::iter::once(tag).chain(seeds.iter().copied()) {
            hasher.update((component.len() as u32).to_le_bytes());
            hasher.update(component);
        }
        Self(hasher.finalize().into())
    }

    /// Address of the global ledger singleton.
    pub fn config() -> Self {
        Self::hash_components(CONFIG_SEED, &[])
    }

    /// Address of the ledger belonging to `owner`.
    pub fn user_profile(owner: &Identity) -> Self {
        Self::hash_components(USER_PROFILE_SEED, &[owner.as_bytes()])
    }

    /// Address of the file record `file_name` owned by `owner`.
    pub fn file(owner: &Identity, file_name: &str) -> Result<Self, AddressError> {
        Self::derive(FILE_SEED, &[owner.as_bytes(), file_name.as_bytes()])
    }

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(value: &str) -> Result<Self, AddressError> {
        if value.len() != ADDRESS_STRING_LENGTH {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_STRING_LENGTH,
                actual: value.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_BYTES];
        hex::decode_to_slice(value, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(value: [u8; ADDRESS_BYTES]) -> Self {
        Address(value)
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_hex()
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Address::from_hex(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let owner = Identity::new([7u8; 32]);
        let a = Address::file(&owner, "vacation_photo.jpg").unwrap();
        let b = Address::file(&owner, "vacation_photo.jpg").unwrap();
        assert_eq!(a, b);
        assert_eq!(Address::config(), Address::config());
    }

    #[test]
    fn namespaces_do_not_overlap() {
        let owner = Identity::new([7u8; 32]);
        let profile = Address::user_profile(&owner);
        let file = Address::file(&owner, "").unwrap();
        assert_ne!(profile, file);
        assert_ne!(profile, Address::config());
    }

    #[test]
    fn seed_boundaries_are_unambiguous() {
        // "ab" + "c" and "a" + "bc" concatenate identically; the length prefix
        // keeps them apart.
        let left = Address::derive(FILE_SEED, &[b"ab", b"c"]).unwrap();
        let right = Address::derive(FILE_SEED, &[b"a", b"bc"]).unwrap();
        assert_ne!(left, right);
    }

    #[test]
    fn different_owners_get_different_files() {
        let a = Address::file(&Identity::new([1u8; 32]), "music.mp3").unwrap();
        let b = Address::file(&Identity::new([2u8; 32]), "music.mp3").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn oversized_seed_rejected() {
        let owner = Identity::new([1u8; 32]);
        let long_name = "x".repeat(MAX_SEED_LEN + 1);
        let err = Address::file(&owner, &long_name).unwrap_err();
        assert!(matches!(err, AddressError::SeedTooLong { index: 1, .. }));
    }

    #[test]
    fn hex_parsing_rejects_bad_input() {
        let err = Address::from_hex("abcd").unwrap_err();
        assert!(matches!(err, AddressError::InvalidLength { .. }));

        let err = Address::from_hex(&"gg".repeat(ADDRESS_BYTES)).unwrap_err();
        assert!(matches!(err, AddressError::InvalidHex(_)));

        let address = Address::config();
        assert_eq!(Address::from_hex(&address.to_hex()).unwrap(), address);
    }
}
