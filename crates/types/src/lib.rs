//! Core data types for the SolDrive file registry.
//!
//! Entities (global ledger, user ledgers, file records), their deterministic
//! addresses, and the identities and digests they reference.

pub mod address;
pub mod file_record;
pub mod identity;
pub mod ledger;

pub use address::*;
pub use file_record::*;
pub use identity::*;
pub use ledger::*;
