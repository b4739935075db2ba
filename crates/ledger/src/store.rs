//! Storage backends for ledger entities.
//!
//! Entities are keyed by their derived address. All writes go through
//! [`LedgerStore::transact`]: the operation reads and stages writes on a
//! [`LedgerTxn`], and the staged writes are applied together only if the
//! operation returns `Ok`.

use crate::errors::Result;
use parking_lot::RwLock;
use soldrive_types::{Address, FileRecord, GlobalLedger, Identity, UserLedger};
use std::collections::HashMap;
use std::sync::Arc;

/// Read/write view over the ledger inside one atomic transaction.
pub trait LedgerTxn {
    fn global(&self) -> Result<Option<GlobalLedger>>;
    fn put_global(&mut self, ledger: &GlobalLedger) -> Result<()>;

    fn user_profile(&self, address: &Address) -> Result<Option<UserLedger>>;
    fn put_user_profile(&mut self, address: &Address, ledger: &UserLedger) -> Result<()>;

    fn file(&self, address: &Address) -> Result<Option<FileRecord>>;
    fn put_file(&mut self, address: &Address, record: &FileRecord) -> Result<()>;
}

/// Trait for ledger storage backends.
pub trait LedgerStore: Send + Sync {
    /// Run `op` as one atomic unit.
    ///
    /// Either every write `op` staged is committed, or (when `op` fails) none
    /// is. `op` may be invoked more than once if the backend retries on
    /// conflict, so it must not have side effects outside the transaction.
    fn transact<R, F>(&self, op: F) -> Result<R>
    where
        F: Fn(&mut dyn LedgerTxn) -> Result<R>;

    fn global(&self) -> Result<Option<GlobalLedger>>;

    fn user_profile(&self, address: &Address) -> Result<Option<UserLedger>>;

    fn file(&self, address: &Address) -> Result<Option<FileRecord>>;

    /// All file records owned by `owner`, newest first.
    fn files_by_owner(&self, owner: &Identity) -> Result<Vec<(Address, FileRecord)>>;

    /// Persist buffered writes, where the backend buffers.
    fn flush(&self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
struct MemoryState {
    global: Option<GlobalLedger>,
    profiles: HashMap<Address, UserLedger>,
    files: HashMap<Address, FileRecord>,

    /// Secondary index: Owner -> [file address]
    by_owner: HashMap<Identity, Vec<Address>>,
}

#[derive(Default)]
struct StagedWrites {
    global: Option<GlobalLedger>,
    profiles: HashMap<Address, UserLedger>,
    files: HashMap<Address, FileRecord>,
}

impl MemoryState {
    fn apply(&mut self, writes: StagedWrites) {
        if let Some(global) = writes.global {
            self.global = Some(global);
        }
        self.profiles.extend(writes.profiles);
        for (address, record) in writes.files {
            if !self.files.contains_key(&address) {
                self.by_owner.entry(record.owner).or_default().push(address);
            }
            self.files.insert(address, record);
        }
    }
}

/// Overlay of staged writes on top of the committed state.
struct MemoryTxn<'a> {
    base: &'a MemoryState,
    staged: StagedWrites,
}

impl LedgerTxn for MemoryTxn<'_> {
    fn global(&self) -> Result<Option<GlobalLedger>> {
        Ok(self
            .staged
            .global
            .clone()
            .or_else(|| self.base.global.clone()))
    }

    fn put_global(&mut self, ledger: &GlobalLedger) -> Result<()> {
        self.staged.global = Some(ledger.clone());
        Ok(())
    }

    fn user_profile(&self, address: &Address) -> Result<Option<UserLedger>> {
        Ok(self
            .staged
            .profiles
            .get(address)
            .or_else(|| self.base.profiles.get(address))
            .cloned())
    }

    fn put_user_profile(&mut self, address: &Address, ledger: &UserLedger) -> Result<()> {
        self.staged.profiles.insert(*address, ledger.clone());
        Ok(())
    }

    fn file(&self, address: &Address) -> Result<Option<FileRecord>> {
        Ok(self
            .staged
            .files
            .get(address)
            .or_else(|| self.base.files.get(address))
            .cloned())
    }

    fn put_file(&mut self, address: &Address, record: &FileRecord) -> Result<()> {
        self.staged.files.insert(*address, record.clone());
        Ok(())
    }
}

/// In-memory ledger storage (for testing and embedded use).
///
/// Transactions hold the write lock for their whole duration, so commits are
/// serialised; reads share the lock.
#[derive(Clone, Default)]
pub struct MemoryLedgerStore {
    inner: Arc<RwLock<MemoryState>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn transact<R, F>(&self, op: F) -> Result<R>
    where
        F: Fn(&mut dyn LedgerTxn) -> Result<R>,
    {
        let mut state = self.inner.write();
        let (value, writes) = {
            let mut txn = MemoryTxn {
                base: &state,
                staged: StagedWrites::default(),
            };
            let value = op(&mut txn)?;
            (value, txn.staged)
        };
        state.apply(writes);
        Ok(value)
    }

    fn global(&self) -> Result<Option<GlobalLedger>> {
        Ok(self.inner.read().global.clone())
    }

    fn user_profile(&self, address: &Address) -> Result<Option<UserLedger>> {
        Ok(self.inner.read().profiles.get(address).cloned())
    }

    fn file(&self, address: &Address) -> Result<Option<FileRecord>> {
        Ok(self.inner.read().files.get(address).cloned())
    }

    fn files_by_owner(&self, owner: &Identity) -> Result<Vec<(Address, FileRecord)>> {
        let state = self.inner.read();
        let Some(addresses) = state.by_owner.get(owner) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<(Address, FileRecord)> = addresses
            .iter()
            .filter_map(|address| {
                state
                    .files
                    .get(address)
                    .map(|record| (*address, record.clone()))
            })
            .collect();

        results.sort_by(|a, b| b.1.created_at.cmp(&a.1.created_at));
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::LedgerError;
    use soldrive_types::Digest;

    fn record(owner: Identity, name: &str, created_at: i64) -> FileRecord {
        FileRecord::new(owner, name, 100, Digest::ZERO, 1, created_at)
    }

    #[test]
    fn committed_writes_are_visible() {
        let store = MemoryLedgerStore::new();
        let owner = Identity::new([1u8; 32]);
        let address = Address::file(&owner, "a").unwrap();

        store
            .transact(|txn| txn.put_file(&address, &record(owner, "a", 1)))
            .unwrap();

        assert_eq!(store.file(&address).unwrap().unwrap().file_name, "a");
        assert_eq!(store.files_by_owner(&owner).unwrap().len(), 1);
    }

    #[test]
    fn failed_transaction_discards_staged_writes() {
        let store = MemoryLedgerStore::new();
        let owner = Identity::new([1u8; 32]);
        let address = Address::file(&owner, "a").unwrap();

        let result: Result<()> = store.transact(|txn| {
            txn.put_file(&address, &record(owner, "a", 1))?;
            txn.put_user_profile(&Address::user_profile(&owner), &UserLedger::new(owner))?;
            Err(LedgerError::NotInitialized)
        });

        assert!(matches!(result, Err(LedgerError::NotInitialized)));
        assert!(store.file(&address).unwrap().is_none());
        assert!(store
            .user_profile(&Address::user_profile(&owner))
            .unwrap()
            .is_none());
        assert!(store.files_by_owner(&owner).unwrap().is_empty());
    }

    #[test]
    fn transaction_reads_its_own_writes() {
        let store = MemoryLedgerStore::new();
        let owner = Identity::new([2u8; 32]);
        let address = Address::user_profile(&owner);

        let seen = store
            .transact(|txn| {
                txn.put_user_profile(&address, &UserLedger::new(owner))?;
                txn.user_profile(&address)
            })
            .unwrap();
        assert_eq!(seen, Some(UserLedger::new(owner)));
    }

    #[test]
    fn files_listed_newest_first() {
        let store = MemoryLedgerStore::new();
        let owner = Identity::new([3u8; 32]);

        for (name, ts) in [("old", 10), ("new", 30), ("mid", 20)] {
            let address = Address::file(&owner, name).unwrap();
            store
                .transact(|txn| txn.put_file(&address, &record(owner, name, ts)))
                .unwrap();
        }

        let names: Vec<String> = store
            .files_by_owner(&owner)
            .unwrap()
            .into_iter()
            .map(|(_, r)| r.file_name)
            .collect();
        assert_eq!(names, vec!["new", "mid", "old"]);
    }

    #[test]
    fn rewriting_a_file_does_not_duplicate_index() {
        let store = MemoryLedgerStore::new();
        let owner = Identity::new([4u8; 32]);
        let address = Address::file(&owner, "a").unwrap();

        for _ in 0..2 {
            store
                .transact(|txn| txn.put_file(&address, &record(owner, "a", 1)))
                .unwrap();
        }
        assert_eq!(store.files_by_owner(&owner).unwrap().len(), 1);
    }
}
