//! File records and their lifecycle.

use crate::identity::{Digest, Identity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest accepted storage locator, in bytes.
pub const MAX_LOCATOR_LEN: usize = 200;

/// Lifecycle of a file record.
///
/// `Uploading -> Processing -> Active`; no state is skipped and there is no
/// way back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    Uploading,
    Processing,
    Active,
}

/// Operations that move a record through its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileOperation {
    RegisterStorage,
    Finalize,
}

/// A lifecycle operation was applied to a record in the wrong state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cannot {operation} a file in status {current}")]
pub struct InvalidTransition {
    pub current: FileStatus,
    pub operation: FileOperation,
}

impl FileStatus {
    /// Status the record moves to when `operation` is applied, if allowed.
    pub fn advance(self, operation: FileOperation) -> Result<FileStatus, InvalidTransition> {
        match (self, operation) {
            (FileStatus::Uploading, FileOperation::RegisterStorage) => Ok(FileStatus::Processing),
            (FileStatus::Processing, FileOperation::Finalize) => Ok(FileStatus::Active),
            (current, operation) => Err(InvalidTransition { current, operation }),
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileStatus::Uploading => "uploading",
            FileStatus::Processing => "processing",
            FileStatus::Active => "active",
        };
        f.write_str(label)
    }
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FileOperation::RegisterStorage => "register storage for",
            FileOperation::Finalize => "finalize",
        };
        f.write_str(label)
    }
}

/// Metadata for one stored file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub owner: Identity,
    pub file_name: String,
    pub file_size: u64,
    /// Digest of the full file content
    pub file_hash: Digest,
    pub chunk_count: u32,
    /// Unix seconds, supplied by the uploader
    pub created_at: i64,
    pub status: FileStatus,
    /// Locator in the external content store; empty until registered
    pub primary_storage: String,
    /// Root over the chunk digests; zero until registered
    pub merkle_root: Digest,
    pub is_public: bool,
}

impl FileRecord {
    /// A freshly announced upload.
    pub fn new(
        owner: Identity,
        file_name: impl Into<String>,
        file_size: u64,
        file_hash: Digest,
        chunk_count: u32,
        created_at: i64,
    ) -> Self {
        Self {
            owner,
            file_name: file_name.into(),
            file_size,
            file_hash,
            chunk_count,
            created_at,
            status: FileStatus::Uploading,
            primary_storage: String::new(),
            merkle_root: Digest::ZERO,
            is_public: false,
        }
    }

    /// Record where the content lives and move to `Processing`.
    pub fn register_storage(
        &mut self,
        primary_storage: impl Into<String>,
        merkle_root: Digest,
    ) -> Result<(), InvalidTransition> {
        let next = self.status.advance(FileOperation::RegisterStorage)?;
        self.primary_storage = primary_storage.into();
        self.merkle_root = merkle_root;
        self.status = next;
        Ok(())
    }

    /// Move to `Active`. Locator and root stay as registered.
    pub fn finalize(&mut self) -> Result<(), InvalidTransition> {
        self.status = self.status.advance(FileOperation::Finalize)?;
        Ok(())
    }
}
