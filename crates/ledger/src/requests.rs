//! Request payloads for the mutating ledger operations.
//!
//! Each request names the addresses it targets. The ledger re-derives them
//! and rejects the request if they differ, so a client cannot point an
//! operation at an entity its seeds do not describe.

use serde::{Deserialize, Serialize};
use soldrive_types::{Address, AddressError, Digest, Identity};

/// A request with a canonical byte encoding that identity proofs sign.
pub trait SignedRequest {
    /// Domain tag prefixed to the message; unique per operation.
    const DOMAIN: &'static [u8];

    /// Append the request's fields to `message`.
    fn encode_fields(&self, message: &mut Vec<u8>);

    fn signing_message(&self) -> Vec<u8> {
        let mut message = Vec::new();
        message.extend_from_slice(Self::DOMAIN);
        self.encode_fields(&mut message);
        message
    }
}

fn push_str(message: &mut Vec<u8>, value: &str) {
    message.extend_from_slice(&(value.len() as u32).to_le_bytes());
    message.extend_from_slice(value.as_bytes());
}

fn push_option_u64(message: &mut Vec<u8>, value: Option<u64>) {
    match value {
        Some(v) => {
            message.push(1);
            message.extend_from_slice(&v.to_le_bytes());
        }
        None => message.push(0),
    }
}

/// Create the global ledger. The signer becomes the authority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub config_address: Address,
}

impl InitializeRequest {
    pub fn new() -> Self {
        Self {
            config_address: Address::config(),
        }
    }
}

impl Default for InitializeRequest {
    fn default() -> Self {
        Self::new()
    }
}

impl SignedRequest for InitializeRequest {
    const DOMAIN: &'static [u8] = b"SOLDRIVE_INITIALIZE";

    fn encode_fields(&self, message: &mut Vec<u8>) {
        message.extend_from_slice(self.config_address.as_bytes());
    }
}

/// Change registry settings. Authority only.
///
/// `settings_version` must equal the global ledger's current version; each
/// accepted update bumps it, so a signed update applies at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSettingsRequest {
    pub config_address: Address,
    pub settings_version: u64,
    pub storage_fee_per_gb: Option<u64>,
    pub max_file_size: Option<u64>,
}

impl UpdateSettingsRequest {
    pub fn new(
        settings_version: u64,
        storage_fee_per_gb: Option<u64>,
        max_file_size: Option<u64>,
    ) -> Self {
        Self {
            config_address: Address::config(),
            settings_version,
            storage_fee_per_gb,
            max_file_size,
        }
    }
}

impl SignedRequest for UpdateSettingsRequest {
    const DOMAIN: &'static [u8] = b"SOLDRIVE_UPDATE_SETTINGS";

    fn encode_fields(&self, message: &mut Vec<u8>) {
        message.extend_from_slice(self.config_address.as_bytes());
        message.extend_from_slice(&self.settings_version.to_le_bytes());
        push_option_u64(message, self.storage_fee_per_gb);
        push_option_u64(message, self.max_file_size);
    }
}

/// Open a storage account for `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateUserProfileRequest {
    pub owner: Identity,
    pub profile_address: Address,
}

impl CreateUserProfileRequest {
    pub fn new(owner: Identity) -> Self {
        Self {
            owner,
            profile_address: Address::user_profile(&owner),
        }
    }
}

impl SignedRequest for CreateUserProfileRequest {
    const DOMAIN: &'static [u8] = b"SOLDRIVE_CREATE_USER_PROFILE";

    fn encode_fields(&self, message: &mut Vec<u8>) {
        message.extend_from_slice(self.owner.as_bytes());
        message.extend_from_slice(self.profile_address.as_bytes());
    }
}

/// Announce a new upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateFileRequest {
    pub owner: Identity,
    pub file_name: String,
    pub file_size: u64,
    pub file_hash: Digest,
    pub chunk_count: u32,
    pub created_at: i64,
    pub file_address: Address,
    pub profile_address: Address,
}

impl CreateFileRequest {
    /// Build a request with addresses derived from `owner` and `file_name`.
    pub fn new(
        owner: Identity,
        file_name: impl Into<String>,
        file_size: u64,
        file_hash: Digest,
        chunk_count: u32,
        created_at: i64,
    ) -> Result<Self, AddressError> {
        let file_name = file_name.into();
        let file_address = Address::file(&owner, &file_name)?;
        Ok(Self {
            owner,
            file_name,
            file_size,
            file_hash,
            chunk_count,
            created_at,
            file_address,
            profile_address: Address::user_profile(&owner),
        })
    }
}

impl SignedRequest for CreateFileRequest {
    const DOMAIN: &'static [u8] = b"SOLDRIVE_CREATE_FILE";

    fn encode_fields(&self, message: &mut Vec<u8>) {
        message.extend_from_slice(self.owner.as_bytes());
        push_str(message, &self.file_name);
        message.extend_from_slice(&self.file_size.to_le_bytes());
        message.extend_from_slice(self.file_hash.as_bytes());
        message.extend_from_slice(&self.chunk_count.to_le_bytes());
        message.extend_from_slice(&self.created_at.to_le_bytes());
        message.extend_from_slice(self.file_address.as_bytes());
        message.extend_from_slice(self.profile_address.as_bytes());
    }
}

/// Identifies an existing file record by its seeds and address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTarget {
    pub owner: Identity,
    pub file_name: String,
    pub file_address: Address,
}

impl FileTarget {
    pub fn new(owner: Identity, file_name: impl Into<String>) -> Result<Self, AddressError> {
        let file_name = file_name.into();
        let file_address = Address::file(&owner, &file_name)?;
        Ok(Self {
            owner,
            file_name,
            file_address,
        })
    }

    fn encode(&self, message: &mut Vec<u8>) {
        message.extend_from_slice(self.owner.as_bytes());
        push_str(message, &self.file_name);
        message.extend_from_slice(self.file_address.as_bytes());
    }
}

/// Record where an upload's content was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterStorageRequest {
    pub target: FileTarget,
    pub primary_storage: String,
    pub merkle_root: Digest,
}

impl RegisterStorageRequest {
    pub fn new(target: FileTarget, primary_storage: impl Into<String>, merkle_root: Digest) -> Self {
        Self {
            target,
            primary_storage: primary_storage.into(),
            merkle_root,
        }
    }
}

impl SignedRequest for RegisterStorageRequest {
    const DOMAIN: &'static [u8] = b"SOLDRIVE_REGISTER_STORAGE";

    fn encode_fields(&self, message: &mut Vec<u8>) {
        self.target.encode(message);
        push_str(message, &self.primary_storage);
        message.extend_from_slice(self.merkle_root.as_bytes());
    }
}

/// Mark a processed file as active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeFileRequest {
    pub target: FileTarget,
}

impl FinalizeFileRequest {
    pub fn new(target: FileTarget) -> Self {
        Self { target }
    }
}

impl SignedRequest for FinalizeFileRequest {
    const DOMAIN: &'static [u8] = b"SOLDRIVE_FINALIZE_FILE";

    fn encode_fields(&self, message: &mut Vec<u8>) {
        self.target.encode(message);
    }
}
