//! Error types for the file ledger

use crate::auth::AuthError;
use soldrive_types::{Address, FileOperation, FileStatus, Identity};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Unauthorized: {0}")]
    Unauthorized(#[from] AuthError),

    #[error("Ledger already initialized")]
    AlreadyInitialized,

    #[error("Ledger not initialized")]
    NotInitialized,

    #[error("User profile already exists for {owner}")]
    AlreadyExists { owner: Identity },

    #[error("User profile not found for {owner}")]
    ProfileNotFound { owner: Identity },

    #[error("File record already exists at {address}")]
    AddressCollision { address: Address },

    #[error("File record not found at {address}")]
    FileNotFound { address: Address },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("File of {size} bytes exceeds the {max} byte limit")]
    FileTooLarge { size: u64, max: u64 },

    #[error("Invalid file status at {address}: cannot {operation} a file in status {current}")]
    InvalidFileStatus {
        address: Address,
        current: FileStatus,
        operation: FileOperation,
    },

    #[error("Stale settings version: request targets {provided}, ledger is at {current}")]
    StaleSettingsVersion { current: u64, provided: u64 },

    #[error("Address mismatch: expected {expected}, got {provided}")]
    AddressMismatch { expected: Address, provided: Address },

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    /// Raised inside a sled transaction when another writer got there first.
    /// The transaction is retried, so this never reaches callers.
    #[error("Transaction conflict")]
    Conflict,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl LedgerError {
    pub(crate) fn invalid_input(reason: impl Into<String>) -> Self {
        LedgerError::InvalidInput {
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
