//! Sled-backed ledger storage.
//!
//! One tree per entity kind, keyed by derived address, values JSON-encoded.
//! Mutations run inside a multi-tree sled transaction.

use crate::errors::{LedgerError, Result};
use crate::store::{LedgerStore, LedgerTxn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::{
    ConflictableTransactionError, TransactionError, TransactionalTree, UnabortableTransactionError,
};
use sled::{Db, Transactional, Tree};
use soldrive_types::{Address, FileRecord, GlobalLedger, Identity, UserLedger};
use std::cell::Cell;
use std::path::Path;

/// Sled-backed implementation
pub struct SledLedgerStore {
    db: Db,
    globals: Tree,
    profiles: Tree,
    files: Tree,
}

impl SledLedgerStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Temporary database, removed on drop.
    pub fn temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> Result<Self> {
        let globals = db.open_tree("globals")?;
        let profiles = db.open_tree("user_profiles")?;
        let files = db.open_tree("files")?;
        Ok(Self {
            db,
            globals,
            profiles,
            files,
        })
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(serde_json::from_slice(bytes)?)
}

fn get_from_tree<T: DeserializeOwned>(tree: &Tree, address: &Address) -> Result<Option<T>> {
    tree.get(address.as_bytes())?
        .map(|v| decode(&v))
        .transpose()
}

struct SledTxn<'a> {
    globals: &'a TransactionalTree,
    profiles: &'a TransactionalTree,
    files: &'a TransactionalTree,
    /// Sled-level failure seen during the operation; it decides whether the
    /// transaction is retried or surfaced.
    failure: Cell<Option<UnabortableTransactionError>>,
}

impl SledTxn<'_> {
    fn record_failure(&self, err: UnabortableTransactionError) -> LedgerError {
        let mapped = match &err {
            UnabortableTransactionError::Conflict => LedgerError::Conflict,
            UnabortableTransactionError::Storage(inner) => LedgerError::Database(inner.clone()),
        };
        self.failure.set(Some(err));
        mapped
    }

    fn read<T: DeserializeOwned>(
        &self,
        tree: &TransactionalTree,
        address: &Address,
    ) -> Result<Option<T>> {
        match tree.get(address.as_bytes()) {
            Ok(Some(bytes)) => decode(&bytes).map(Some),
            Ok(None) => Ok(None),
            Err(err) => Err(self.record_failure(err)),
        }
    }

    fn write<T: Serialize>(
        &self,
        tree: &TransactionalTree,
        address: &Address,
        value: &T,
    ) -> Result<()> {
        let data = serde_json::to_vec(value)?;
        match tree.insert(&address.as_bytes()[..], data) {
            Ok(_) => Ok(()),
            Err(err) => Err(self.record_failure(err)),
        }
    }
}

impl LedgerTxn for SledTxn<'_> {
    fn global(&self) -> Result<Option<GlobalLedger>> {
        self.read(self.globals, &Address::config())
    }

    fn put_global(&mut self, ledger: &GlobalLedger) -> Result<()> {
        self.write(self.globals, &Address::config(), ledger)
    }

    fn user_profile(&self, address: &Address) -> Result<Option<UserLedger>> {
        self.read(self.profiles, address)
    }

    fn put_user_profile(&mut self, address: &Address, ledger: &UserLedger) -> Result<()> {
        self.write(self.profiles, address, ledger)
    }

    fn file(&self, address: &Address) -> Result<Option<FileRecord>> {
        self.read(self.files, address)
    }

    fn put_file(&mut self, address: &Address, record: &FileRecord) -> Result<()> {
        self.write(self.files, address, record)
    }
}

impl LedgerStore for SledLedgerStore {
    fn transact<R, F>(&self, op: F) -> Result<R>
    where
        F: Fn(&mut dyn LedgerTxn) -> Result<R>,
    {
        let outcome = (&self.globals, &self.profiles, &self.files).transaction(
            |(globals, profiles, files)| {
                let mut txn = SledTxn {
                    globals,
                    profiles,
                    files,
                    failure: Cell::new(None),
                };
                match op(&mut txn) {
                    Ok(value) => Ok(value),
                    Err(err) => match txn.failure.take() {
                        // Let sled retry conflicts and report storage faults.
                        Some(failure) => Err(failure.into()),
                        None => Err(ConflictableTransactionError::Abort(err)),
                    },
                }
            },
        );

        outcome.map_err(|err| match err {
            TransactionError::Abort(err) => err,
            TransactionError::Storage(err) => LedgerError::Database(err),
        })
    }

    fn global(&self) -> Result<Option<GlobalLedger>> {
        get_from_tree(&self.globals, &Address::config())
    }

    fn user_profile(&self, address: &Address) -> Result<Option<UserLedger>> {
        get_from_tree(&self.profiles, address)
    }

    fn file(&self, address: &Address) -> Result<Option<FileRecord>> {
        get_from_tree(&self.files, address)
    }

    fn files_by_owner(&self, owner: &Identity) -> Result<Vec<(Address, FileRecord)>> {
        let mut results = Vec::new();
        for item in self.files.iter() {
            let (key, val) = item?;
            let record: FileRecord = decode(&val)?;
            if record.owner != *owner {
                continue;
            }
            let Ok(bytes) = <[u8; 32]>::try_from(key.as_ref()) else {
                tracing::warn!(key = %hex::encode(&key), "skipping malformed file key");
                continue;
            };
            results.push((Address(bytes), record));
        }

        results.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(results)
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}
