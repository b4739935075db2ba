//! Ledger configuration.

use serde::{Deserialize, Serialize};
use soldrive_types::{DEFAULT_MAX_FILE_SIZE, DEFAULT_STORAGE_FEE_PER_GB, MAX_LOCATOR_LEN};

/// Tunables applied when the global ledger is created and when requests are
/// validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Fee written into the global ledger at initialization.
    pub storage_fee_per_gb: u64,
    /// File size limit written into the global ledger at initialization.
    pub max_file_size: u64,
    /// Longest accepted storage locator, in bytes.
    pub max_locator_len: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            storage_fee_per_gb: DEFAULT_STORAGE_FEE_PER_GB,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_locator_len: MAX_LOCATOR_LEN,
        }
    }
}

impl LedgerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_file_size == 0 {
            return Err("max_file_size must be greater than zero".to_string());
        }
        if self.max_locator_len == 0 {
            return Err("max_locator_len must be greater than zero".to_string());
        }
        Ok(())
    }
}
