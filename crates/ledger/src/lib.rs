//! SolDrive File Ledger
//!
//! Tracks the metadata of a decentralized file registry: a global file
//! counter, per-user storage accounting, and per-file records that move from
//! upload intent (`Uploading`) through storage registration (`Processing`) to
//! `Active`. File content itself lives in an external store and is referenced
//! only by a locator string.
//!
//! Every mutating operation is authenticated with an Ed25519 identity proof
//! and committed atomically through a [`LedgerStore`].

pub mod auth;
pub mod config;
pub mod errors;
pub mod ledger;
pub mod requests;
pub mod sled_store;
pub mod store;

pub use auth::{AuthError, IdentityProof, RequestSigner};
pub use config::LedgerConfig;
pub use errors::*;
pub use ledger::{hello, FileLedger, GREETING};
pub use requests::*;
pub use sled_store::SledLedgerStore;
pub use store::{LedgerStore, LedgerTxn, MemoryLedgerStore};
