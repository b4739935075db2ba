//! The file ledger: every boundary operation of the registry.
//!
//! Each mutating operation follows the same shape: re-derive the target
//! addresses and compare them with the request, verify the identity proof,
//! validate the payload, then run all precondition checks and writes inside a
//! single store transaction. A failed check returns before anything is
//! committed.

use crate::auth::{self, IdentityProof};
use crate::config::LedgerConfig;
use crate::errors::{LedgerError, Result};
use crate::requests::{
    CreateFileRequest, CreateUserProfileRequest, FileTarget, FinalizeFileRequest,
    InitializeRequest, RegisterStorageRequest, UpdateSettingsRequest,
};
use crate::store::LedgerStore;
use soldrive_types::{
    Address, FileRecord, GlobalLedger, Identity, InvalidTransition, UserLedger,
};
use tracing::{debug, info};

/// Liveness greeting returned by [`hello`].
pub const GREETING: &str = "Hello from SolDrive!";

/// Liveness check. Needs no store and touches no state.
pub fn hello() -> &'static str {
    info!("{GREETING}");
    GREETING
}

/// Registry of files, user storage accounts and the global file counter.
pub struct FileLedger<S: LedgerStore> {
    store: S,
    config: LedgerConfig,
}

fn check_address(expected: Address, provided: Address) -> Result<()> {
    if expected != provided {
        return Err(LedgerError::AddressMismatch { expected, provided });
    }
    Ok(())
}

fn file_address(owner: &Identity, file_name: &str) -> Result<Address> {
    if file_name.is_empty() {
        return Err(LedgerError::invalid_input("file name cannot be empty"));
    }
    Address::file(owner, file_name)
        .map_err(|err| LedgerError::invalid_input(format!("file name: {err}")))
}

fn check_target(target: &FileTarget) -> Result<Address> {
    let expected = file_address(&target.owner, &target.file_name)?;
    check_address(expected, target.file_address)?;
    Ok(expected)
}

fn status_error(address: Address, err: InvalidTransition) -> LedgerError {
    LedgerError::InvalidFileStatus {
        address,
        current: err.current,
        operation: err.operation,
    }
}

impl<S: LedgerStore> FileLedger<S> {
    pub fn new(store: S, config: LedgerConfig) -> Result<Self> {
        config.validate().map_err(LedgerError::invalid_input)?;
        Ok(Self { store, config })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Liveness check. Touches no state.
    pub fn hello(&self) -> &'static str {
        hello()
    }

    /// Create the global ledger. The signer becomes its authority.
    pub fn initialize(
        &self,
        request: &InitializeRequest,
        proof: &IdentityProof,
    ) -> Result<GlobalLedger> {
        self.try_initialize(request, proof)
            .inspect_err(|err| debug!(%err, "initialize rejected"))
    }

    fn try_initialize(
        &self,
        request: &InitializeRequest,
        proof: &IdentityProof,
    ) -> Result<GlobalLedger> {
        check_address(Address::config(), request.config_address)?;
        let authority = auth::verify(request, proof)?;

        let global = self.store.transact(|txn| {
            if txn.global()?.is_some() {
                return Err(LedgerError::AlreadyInitialized);
            }
            let global = GlobalLedger::new(
                authority,
                self.config.storage_fee_per_gb,
                self.config.max_file_size,
            );
            txn.put_global(&global)?;
            Ok(global)
        })?;

        info!(authority = %global.authority, "SolDrive initialized");
        Ok(global)
    }

    /// Change the storage fee and/or file size limit. Authority only.
    pub fn update_settings(
        &self,
        request: &UpdateSettingsRequest,
        proof: &IdentityProof,
    ) -> Result<GlobalLedger> {
        self.try_update_settings(request, proof)
            .inspect_err(|err| debug!(%err, "update_settings rejected"))
    }

    fn try_update_settings(
        &self,
        request: &UpdateSettingsRequest,
        proof: &IdentityProof,
    ) -> Result<GlobalLedger> {
        check_address(Address::config(), request.config_address)?;
        let signer = auth::verify(request, proof)?;
        if request.max_file_size == Some(0) {
            return Err(LedgerError::invalid_input(
                "max_file_size must be greater than zero",
            ));
        }

        let global = self.store.transact(|txn| {
            let mut global = txn.global()?.ok_or(LedgerError::NotInitialized)?;
            auth::require_identity(&signer, &global.authority)?;
            if request.settings_version != global.settings_version {
                return Err(LedgerError::StaleSettingsVersion {
                    current: global.settings_version,
                    provided: request.settings_version,
                });
            }
            if let Some(fee) = request.storage_fee_per_gb {
                global.storage_fee_per_gb = fee;
            }
            if let Some(max) = request.max_file_size {
                global.max_file_size = max;
            }
            global
                .bump_settings_version()
                .map_err(|err| LedgerError::invalid_input(err.to_string()))?;
            txn.put_global(&global)?;
            Ok(global)
        })?;

        info!(
            storage_fee_per_gb = global.storage_fee_per_gb,
            max_file_size = global.max_file_size,
            settings_version = global.settings_version,
            "settings updated"
        );
        Ok(global)
    }

    /// Open a storage account. Users can only register themselves.
    pub fn create_user_profile(
        &self,
        request: &CreateUserProfileRequest,
        proof: &IdentityProof,
    ) -> Result<UserLedger> {
        self.try_create_user_profile(request, proof)
            .inspect_err(|err| debug!(%err, owner = %request.owner, "create_user_profile rejected"))
    }

    fn try_create_user_profile(
        &self,
        request: &CreateUserProfileRequest,
        proof: &IdentityProof,
    ) -> Result<UserLedger> {
        let owner = request.owner;
        let address = Address::user_profile(&owner);
        check_address(address, request.profile_address)?;
        auth::authorize(request, proof, &owner)?;

        let profile = self.store.transact(|txn| {
            if txn.user_profile(&address)?.is_some() {
                return Err(LedgerError::AlreadyExists { owner });
            }
            let profile = UserLedger::new(owner);
            txn.put_user_profile(&address, &profile)?;
            Ok(profile)
        })?;

        info!(%owner, "user profile created");
        Ok(profile)
    }

    /// Announce an upload.
    ///
    /// Creates the file record, charges it to the owner's ledger and bumps the
    /// global counter, all in one transaction.
    pub fn create_file(
        &self,
        request: &CreateFileRequest,
        proof: &IdentityProof,
    ) -> Result<FileRecord> {
        self.try_create_file(request, proof).inspect_err(|err| {
            debug!(%err, owner = %request.owner, file = %request.file_name, "create_file rejected")
        })
    }

    fn try_create_file(
        &self,
        request: &CreateFileRequest,
        proof: &IdentityProof,
    ) -> Result<FileRecord> {
        let owner = request.owner;
        let address = file_address(&owner, &request.file_name)?;
        check_address(address, request.file_address)?;
        let profile_address = Address::user_profile(&owner);
        check_address(profile_address, request.profile_address)?;

        auth::authorize(request, proof, &owner)?;

        if request.file_size == 0 {
            return Err(LedgerError::invalid_input("file size must be greater than zero"));
        }
        if request.chunk_count == 0 {
            return Err(LedgerError::invalid_input("chunk count must be greater than zero"));
        }

        let (record, profile, global) = self.store.transact(|txn| {
            let mut global = txn.global()?.ok_or(LedgerError::NotInitialized)?;
            if request.file_size > global.max_file_size {
                return Err(LedgerError::FileTooLarge {
                    size: request.file_size,
                    max: global.max_file_size,
                });
            }
            let mut profile = txn
                .user_profile(&profile_address)?
                .ok_or(LedgerError::ProfileNotFound { owner })?;
            if txn.file(&address)?.is_some() {
                return Err(LedgerError::AddressCollision { address });
            }

            let record = FileRecord::new(
                owner,
                request.file_name.clone(),
                request.file_size,
                request.file_hash,
                request.chunk_count,
                request.created_at,
            );
            profile
                .record_file_creation(request.file_size)
                .map_err(|err| LedgerError::invalid_input(err.to_string()))?;
            global
                .increment_file_count()
                .map_err(|err| LedgerError::invalid_input(err.to_string()))?;

            txn.put_file(&address, &record)?;
            txn.put_user_profile(&profile_address, &profile)?;
            txn.put_global(&global)?;
            Ok((record, profile, global))
        })?;

        info!(
            %owner,
            file = %record.file_name,
            %address,
            size = record.file_size,
            chunks = record.chunk_count,
            files_owned = profile.files_owned,
            storage_used = profile.storage_used,
            total_files = global.total_files,
            "file record created"
        );
        Ok(record)
    }

    /// Record the content locator and Merkle root: `Uploading -> Processing`.
    pub fn register_storage(
        &self,
        request: &RegisterStorageRequest,
        proof: &IdentityProof,
    ) -> Result<FileRecord> {
        self.try_register_storage(request, proof).inspect_err(|err| {
            debug!(%err, file = %request.target.file_address, "register_storage rejected")
        })
    }

    fn try_register_storage(
        &self,
        request: &RegisterStorageRequest,
        proof: &IdentityProof,
    ) -> Result<FileRecord> {
        let address = check_target(&request.target)?;
        let signer = auth::verify(request, proof)?;

        if request.primary_storage.is_empty() {
            return Err(LedgerError::invalid_input("storage locator cannot be empty"));
        }
        if request.primary_storage.len() > self.config.max_locator_len {
            return Err(LedgerError::invalid_input(format!(
                "storage locator exceeds {} bytes",
                self.config.max_locator_len
            )));
        }

        let record = self.store.transact(|txn| {
            let mut record = txn
                .file(&address)?
                .ok_or(LedgerError::FileNotFound { address })?;
            auth::require_identity(&signer, &record.owner)?;
            record
                .register_storage(request.primary_storage.clone(), request.merkle_root)
                .map_err(|err| status_error(address, err))?;
            txn.put_file(&address, &record)?;
            Ok(record)
        })?;

        info!(
            %address,
            primary_storage = %record.primary_storage,
            merkle_root = %record.merkle_root,
            "storage registered"
        );
        Ok(record)
    }

    /// Activate a processed file: `Processing -> Active`.
    pub fn finalize_file(
        &self,
        request: &FinalizeFileRequest,
        proof: &IdentityProof,
    ) -> Result<FileRecord> {
        self.try_finalize_file(request, proof).inspect_err(|err| {
            debug!(%err, file = %request.target.file_address, "finalize_file rejected")
        })
    }

    fn try_finalize_file(
        &self,
        request: &FinalizeFileRequest,
        proof: &IdentityProof,
    ) -> Result<FileRecord> {
        let address = check_target(&request.target)?;
        let signer = auth::verify(request, proof)?;

        let record = self.store.transact(|txn| {
            let mut record = txn
                .file(&address)?
                .ok_or(LedgerError::FileNotFound { address })?;
            auth::require_identity(&signer, &record.owner)?;
            record.finalize().map_err(|err| status_error(address, err))?;
            txn.put_file(&address, &record)?;
            Ok(record)
        })?;

        info!(%address, "file finalized");
        Ok(record)
    }

    /// The global ledger, if initialized.
    pub fn global(&self) -> Result<Option<GlobalLedger>> {
        self.store.global()
    }

    pub fn total_files(&self) -> Result<u64> {
        self.store
            .global()?
            .map(|global| global.total_files)
            .ok_or(LedgerError::NotInitialized)
    }

    pub fn user_profile(&self, owner: &Identity) -> Result<Option<UserLedger>> {
        self.store.user_profile(&Address::user_profile(owner))
    }

    pub fn file(&self, owner: &Identity, file_name: &str) -> Result<Option<FileRecord>> {
        let address = file_address(owner, file_name)?;
        self.store.file(&address)
    }

    pub fn file_at(&self, address: &Address) -> Result<Option<FileRecord>> {
        self.store.file(address)
    }

    /// Files owned by `owner`, newest first.
    pub fn files_by_owner(&self, owner: &Identity) -> Result<Vec<(Address, FileRecord)>> {
        self.store.files_by_owner(owner)
    }

    pub fn flush(&self) -> Result<()> {
        self.store.flush()
    }
}
