use soldrive_ledger::{
    CreateFileRequest, CreateUserProfileRequest, FileLedger, FileTarget, InitializeRequest,
    LedgerConfig, LedgerError, RegisterStorageRequest, RequestSigner, SledLedgerStore,
};
use soldrive_types::{Digest, FileRecord, FileStatus};
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

fn open(dir: &TempDir) -> FileLedger<SledLedgerStore> {
    let store = SledLedgerStore::new(dir.path()).unwrap();
    FileLedger::new(store, LedgerConfig::default()).unwrap()
}

fn add_profile(ledger: &FileLedger<SledLedgerStore>, user: &RequestSigner) {
    let profile = CreateUserProfileRequest::new(user.identity());
    ledger
        .create_user_profile(&profile, &user.sign(&profile))
        .unwrap();
}

fn bootstrap(ledger: &FileLedger<SledLedgerStore>, user: &RequestSigner) {
    let authority = RequestSigner::from_seed([1u8; 32]);
    let init = InitializeRequest::new();
    ledger.initialize(&init, &authority.sign(&init)).unwrap();
    add_profile(ledger, user);
}

fn create(
    ledger: &FileLedger<SledLedgerStore>,
    user: &RequestSigner,
    name: &str,
    size: u64,
) -> Result<FileRecord, LedgerError> {
    let request = CreateFileRequest::new(user.identity(), name, size, Digest::ZERO, 1, 0).unwrap();
    ledger.create_file(&request, &user.sign(&request))
}

#[test]
fn state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let user = RequestSigner::from_seed([20u8; 32]);

    {
        let ledger = open(&dir);
        bootstrap(&ledger, &user);

        let request = CreateFileRequest::new(
            user.identity(),
            "archive.tar",
            2_048,
            Digest::from_bytes([5u8; 32]),
            2,
            1_700_000_000,
        )
        .unwrap();
        ledger.create_file(&request, &user.sign(&request)).unwrap();

        let register = RegisterStorageRequest::new(
            FileTarget::new(user.identity(), "archive.tar").unwrap(),
            "ipfs://QmArchive",
            Digest::from_bytes([6u8; 32]),
        );
        ledger
            .register_storage(&register, &user.sign(&register))
            .unwrap();
        ledger.flush().unwrap();
    }

    let ledger = open(&dir);
    assert_eq!(ledger.total_files().unwrap(), 1);

    let profile = ledger.user_profile(&user.identity()).unwrap().unwrap();
    assert_eq!(profile.files_owned, 1);
    assert_eq!(profile.storage_used, 2_048);

    let record = ledger.file(&user.identity(), "archive.tar").unwrap().unwrap();
    assert_eq!(record.status, FileStatus::Processing);
    assert_eq!(record.primary_storage, "ipfs://QmArchive");

    // Already initialized on disk.
    let init = InitializeRequest::new();
    let err = ledger
        .initialize(&init, &user.sign(&init))
        .unwrap_err();
    assert!(matches!(err, LedgerError::AlreadyInitialized));
}

#[test]
fn rejected_create_leaves_disk_untouched() {
    let dir = TempDir::new().unwrap();
    let user = RequestSigner::from_seed([21u8; 32]);
    let ledger = open(&dir);
    bootstrap(&ledger, &user);

    let request = CreateFileRequest::new(
        user.identity(),
        "dup.bin",
        100,
        Digest::ZERO,
        1,
        0,
    )
    .unwrap();
    ledger.create_file(&request, &user.sign(&request)).unwrap();
    let err = ledger
        .create_file(&request, &user.sign(&request))
        .unwrap_err();
    assert!(matches!(err, LedgerError::AddressCollision { .. }));

    assert_eq!(ledger.total_files().unwrap(), 1);
    let profile = ledger.user_profile(&user.identity()).unwrap().unwrap();
    assert_eq!(profile.files_owned, 1);
    assert_eq!(profile.storage_used, 100);
    assert_eq!(ledger.files_by_owner(&user.identity()).unwrap().len(), 1);
}

#[test]
fn concurrent_same_name_creates_commit_once() {
    let dir = TempDir::new().unwrap();
    let user = Arc::new(RequestSigner::from_seed([22u8; 32]));
    let ledger = Arc::new(open(&dir));
    bootstrap(&ledger, &user);

    let handles: Vec<_> = (0..16)
        .map(|_| {
            let ledger = Arc::clone(&ledger);
            let user = Arc::clone(&user);
            thread::spawn(move || create(&ledger, &user, "race.bin", 64))
        })
        .collect();
    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(err, LedgerError::AddressCollision { .. }),
            "unexpected error: {err}"
        );
    }

    assert_eq!(ledger.total_files().unwrap(), 1);
    let profile = ledger.user_profile(&user.identity()).unwrap().unwrap();
    assert_eq!(profile.files_owned, 1);
    assert_eq!(profile.storage_used, 64);
    assert_eq!(ledger.files_by_owner(&user.identity()).unwrap().len(), 1);
}

#[test]
fn concurrent_distinct_creates_lose_no_updates() {
    const OWNERS: u8 = 4;
    const FILES_PER_OWNER: usize = 4;

    let dir = TempDir::new().unwrap();
    let users: Vec<Arc<RequestSigner>> = (0..OWNERS)
        .map(|i| Arc::new(RequestSigner::from_seed([30 + i; 32])))
        .collect();
    let ledger = Arc::new(open(&dir));
    bootstrap(&ledger, &users[0]);
    for user in &users[1..] {
        add_profile(&ledger, user);
    }

    let mut handles = Vec::new();
    for user in &users {
        for n in 0..FILES_PER_OWNER {
            let ledger = Arc::clone(&ledger);
            let user = Arc::clone(user);
            handles.push(thread::spawn(move || {
                create(&ledger, &user, &format!("part-{n}.bin"), 100)
            }));
        }
    }
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    let expected = OWNERS as u64 * FILES_PER_OWNER as u64;
    assert_eq!(ledger.total_files().unwrap(), expected);

    let mut owned = 0;
    for user in &users {
        let profile = ledger.user_profile(&user.identity()).unwrap().unwrap();
        assert_eq!(profile.files_owned, FILES_PER_OWNER as u64);
        assert_eq!(profile.storage_used, 100 * FILES_PER_OWNER as u64);
        owned += profile.files_owned;
    }
    assert_eq!(owned, expected);
}
