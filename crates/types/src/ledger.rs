//! Aggregate ledgers: the global singleton and per-user accounting.

use crate::identity::Identity;
use serde::{Deserialize, Serialize};

/// Default storage fee: 0.1 SOL per GB per month, in lamports.
pub const DEFAULT_STORAGE_FEE_PER_GB: u64 = 100_000_000;
/// Default maximum file size (1 GiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 1_073_741_824;
/// Reputation a user starts with.
pub const INITIAL_REPUTATION: u32 = 100;

/// A counter would have wrapped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field} would overflow")]
pub struct CounterOverflow {
    pub field: &'static str,
}

/// Registry-wide state. Exactly one instance exists once initialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalLedger {
    /// Who can update settings
    pub authority: Identity,
    /// Number of file records ever created
    pub total_files: u64,
    /// Lamports per GB per month
    pub storage_fee_per_gb: u64,
    /// Largest accepted file, in bytes
    pub max_file_size: u64,
    /// Bumped on every settings update; signed into update requests so an
    /// old request cannot be replayed.
    #[serde(default)]
    pub settings_version: u64,
}

impl GlobalLedger {
    pub fn new(authority: Identity, storage_fee_per_gb: u64, max_file_size: u64) -> Self {
        Self {
            authority,
            total_files: 0,
            storage_fee_per_gb,
            max_file_size,
            settings_version: 0,
        }
    }

    /// Count one more file record. Only called while creating a file.
    pub fn increment_file_count(&mut self) -> Result<u64, CounterOverflow> {
        self.total_files = self
            .total_files
            .checked_add(1)
            .ok_or(CounterOverflow {
                field: "total_files",
            })?;
        Ok(self.total_files)
    }

    pub fn bump_settings_version(&mut self) -> Result<u64, CounterOverflow> {
        self.settings_version = self
            .settings_version
            .checked_add(1)
            .ok_or(CounterOverflow {
                field: "settings_version",
            })?;
        Ok(self.settings_version)
    }
}

/// Storage accounting for a single user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserLedger {
    pub owner: Identity,
    pub files_owned: u64,
    /// Total bytes across all owned files
    pub storage_used: u64,
    /// Unix seconds; 0 until a payment is recorded
    pub storage_paid_until: i64,
    pub reputation_score: u32,
}

impl UserLedger {
    pub fn new(owner: Identity) -> Self {
        Self {
            owner,
            files_owned: 0,
            storage_used: 0,
            storage_paid_until: 0,
            reputation_score: INITIAL_REPUTATION,
        }
    }

    /// Account for a newly created file of `size` bytes.
    ///
    /// Both counters are checked before either is written, so a failure leaves
    /// the ledger untouched.
    pub fn record_file_creation(&mut self, size: u64) -> Result<(), CounterOverflow> {
        let files_owned = self.files_owned.checked_add(1).ok_or(CounterOverflow {
            field: "files_owned",
        })?;
        let storage_used = self.storage_used.checked_add(size).ok_or(CounterOverflow {
            field: "storage_used",
        })?;
        self.files_owned = files_owned;
        self.storage_used = storage_used;
        Ok(())
    }
}
