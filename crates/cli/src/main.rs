//! SolDrive Command Line Interface
//!
//! Drives a local SolDrive ledger: key management, initialization, user
//! profiles and the file upload lifecycle.

mod content;
mod keyfile;
mod settings;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use soldrive_ledger::{
    CreateFileRequest, CreateUserProfileRequest, FileLedger, FileTarget, FinalizeFileRequest,
    InitializeRequest, RegisterStorageRequest, RequestSigner, SledLedgerStore,
    UpdateSettingsRequest,
};
use soldrive_types::{Address, Digest, Identity};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::keyfile::KeyFile;
use crate::settings::Settings;

#[derive(Parser)]
#[command(name = "soldrive-cli")]
#[command(about = "SolDrive decentralized file registry", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Ledger data directory (overrides configuration)
    #[arg(long, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    /// Signing key file (overrides configuration)
    #[arg(long, value_name = "PATH")]
    key: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new signing identity
    Keygen {
        /// Where to write the key file (defaults to the configured key path)
        #[arg(long, value_name = "PATH")]
        out: Option<PathBuf>,
        /// Replace an existing key file
        #[arg(long)]
        force: bool,
    },
    /// Liveness check
    Hello,
    /// Create the global ledger; the signer becomes the authority
    Init,
    /// Update registry settings (authority only)
    Settings {
        #[arg(long)]
        storage_fee_per_gb: Option<u64>,
        #[arg(long)]
        max_file_size: Option<u64>,
    },
    /// User profile operations
    Profile {
        #[command(subcommand)]
        action: ProfileCommands,
    },
    /// File record operations
    File {
        #[command(subcommand)]
        action: FileCommands,
    },
    /// Show the global ledger
    Stats,
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// Open a storage account for the signing identity
    Create,
    /// Show a user's storage account
    Show {
        /// Owner identity (hex); defaults to the signing identity
        #[arg(long)]
        owner: Option<String>,
    },
}

#[derive(Subcommand)]
enum FileCommands {
    /// Announce a new upload
    Create(CreateFileCommand),
    /// Record the storage locator and Merkle root of an upload
    Register(RegisterCommand),
    /// Mark a processed file as active
    Finalize {
        #[arg(long)]
        name: String,
    },
    /// Show one file record
    Show {
        #[arg(long, conflicts_with = "address", required_unless_present = "address")]
        name: Option<String>,
        /// Owner identity (hex); defaults to the signing identity
        #[arg(long, requires = "name")]
        owner: Option<String>,
        /// File record address (hex)
        #[arg(long)]
        address: Option<String>,
    },
    /// List an owner's files, newest first
    List {
        /// Owner identity (hex); defaults to the signing identity
        #[arg(long)]
        owner: Option<String>,
    },
}

#[derive(Args)]
struct CreateFileCommand {
    /// Local file to summarise; name, size, hash and chunk count are derived from it
    #[arg(long, value_name = "PATH", conflicts_with_all = ["size", "hash", "chunks"])]
    path: Option<PathBuf>,
    /// Registry file name (defaults to the local file name)
    #[arg(long, required_unless_present = "path")]
    name: Option<String>,
    #[arg(long, required_unless_present = "path")]
    size: Option<u64>,
    /// Content digest (64 hex characters)
    #[arg(long, required_unless_present = "path")]
    hash: Option<String>,
    #[arg(long, required_unless_present = "path")]
    chunks: Option<u32>,
    /// Creation timestamp in unix seconds (defaults to now)
    #[arg(long)]
    created_at: Option<i64>,
}

#[derive(Args)]
struct RegisterCommand {
    #[arg(long)]
    name: String,
    /// Content locator, e.g. an IPFS CID URI
    #[arg(long)]
    locator: String,
    /// Merkle root (64 hex characters)
    #[arg(long, conflicts_with = "path", required_unless_present = "path")]
    merkle_root: Option<String>,
    /// Local file to compute the Merkle root from
    #[arg(long, value_name = "PATH")]
    path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }
    if let Some(key) = cli.key {
        settings.key_file = Some(key);
    }
    init_logging(&settings)?;

    run(&settings, cli.command)
}

fn run(settings: &Settings, command: Commands) -> Result<()> {
    match command {
        Commands::Keygen { out, force } => handle_keygen(settings, out, force),
        Commands::Hello => {
            println!("{}", soldrive_ledger::hello());
            Ok(())
        }
        Commands::Init => handle_init(settings),
        Commands::Settings {
            storage_fee_per_gb,
            max_file_size,
        } => handle_settings(settings, storage_fee_per_gb, max_file_size),
        Commands::Profile { action } => handle_profile_commands(settings, action),
        Commands::File { action } => handle_file_commands(settings, action),
        Commands::Stats => {
            let ledger = open_ledger(settings)?;
            let global = ledger
                .global()?
                .context("ledger is not initialized (run `soldrive-cli init`)")?;
            print_json(&global)
        }
    }
}

fn init_logging(settings: &Settings) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    // stdout carries command output; logs go to stderr.
    if settings.log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok(())
}

fn open_ledger(settings: &Settings) -> Result<FileLedger<SledLedgerStore>> {
    let path = settings.ledger_path();
    let store = SledLedgerStore::new(&path)
        .with_context(|| format!("failed to open ledger at {}", path.display()))?;
    Ok(FileLedger::new(store, settings.ledger.clone())?)
}

fn load_signer(settings: &Settings) -> Result<RequestSigner> {
    let path = settings.key_path();
    KeyFile::load(&path)
        .context("no signing key (run `soldrive-cli keygen` or pass --key)")?
        .signer()
}

fn resolve_owner(settings: &Settings, owner: Option<String>) -> Result<Identity> {
    match owner {
        Some(hex) => Identity::from_hex(&hex).context("invalid owner identity"),
        None => Ok(load_signer(settings)?.identity()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

fn handle_keygen(settings: &Settings, out: Option<PathBuf>, force: bool) -> Result<()> {
    let path = out.unwrap_or_else(|| settings.key_path());
    let signer = RequestSigner::generate();
    KeyFile::from_signer(&signer).save(&path, force)?;

    info!(identity = %signer.identity(), path = %path.display(), "key generated");
    println!("{}", signer.identity());
    Ok(())
}

fn handle_init(settings: &Settings) -> Result<()> {
    let signer = load_signer(settings)?;
    let ledger = open_ledger(settings)?;

    let request = InitializeRequest::new();
    let global = ledger.initialize(&request, &signer.sign(&request))?;
    ledger.flush()?;
    print_json(&global)
}

fn handle_settings(
    settings: &Settings,
    storage_fee_per_gb: Option<u64>,
    max_file_size: Option<u64>,
) -> Result<()> {
    if storage_fee_per_gb.is_none() && max_file_size.is_none() {
        anyhow::bail!("nothing to update: pass --storage-fee-per-gb and/or --max-file-size");
    }
    let signer = load_signer(settings)?;
    let ledger = open_ledger(settings)?;

    let current = ledger
        .global()?
        .context("ledger is not initialized (run `soldrive-cli init`)")?;
    let request = UpdateSettingsRequest::new(
        current.settings_version,
        storage_fee_per_gb,
        max_file_size,
    );
    let global = ledger.update_settings(&request, &signer.sign(&request))?;
    ledger.flush()?;
    print_json(&global)
}

fn handle_profile_commands(settings: &Settings, cmd: ProfileCommands) -> Result<()> {
    match cmd {
        ProfileCommands::Create => {
            let signer = load_signer(settings)?;
            let ledger = open_ledger(settings)?;

            let request = CreateUserProfileRequest::new(signer.identity());
            let profile = ledger.create_user_profile(&request, &signer.sign(&request))?;
            ledger.flush()?;
            print_json(&profile)
        }
        ProfileCommands::Show { owner } => {
            let owner = resolve_owner(settings, owner)?;
            let ledger = open_ledger(settings)?;
            let profile = ledger
                .user_profile(&owner)?
                .with_context(|| format!("no profile for {owner}"))?;
            print_json(&profile)
        }
    }
}

fn handle_file_commands(settings: &Settings, cmd: FileCommands) -> Result<()> {
    match cmd {
        FileCommands::Create(create) => handle_file_create(settings, create),
        FileCommands::Register(register) => handle_file_register(settings, register),
        FileCommands::Finalize { name } => {
            let signer = load_signer(settings)?;
            let ledger = open_ledger(settings)?;

            let request = FinalizeFileRequest::new(FileTarget::new(signer.identity(), name)?);
            let record = ledger.finalize_file(&request, &signer.sign(&request))?;
            ledger.flush()?;
            print_json(&record)
        }
        FileCommands::Show {
            name,
            owner,
            address,
        } => {
            let ledger = open_ledger(settings)?;
            let (address, record) = match (address, name) {
                (Some(hex), _) => {
                    let address = Address::from_hex(&hex).context("invalid file address")?;
                    (address, ledger.file_at(&address)?)
                }
                (None, Some(name)) => {
                    let owner = resolve_owner(settings, owner)?;
                    (Address::file(&owner, &name)?, ledger.file(&owner, &name)?)
                }
                (None, None) => anyhow::bail!("pass --name or --address"),
            };
            let record = record.with_context(|| format!("no file record at {address}"))?;
            print_json(&serde_json::json!({ "address": address, "record": record }))
        }
        FileCommands::List { owner } => {
            let owner = resolve_owner(settings, owner)?;
            let ledger = open_ledger(settings)?;
            let entries: Vec<_> = ledger
                .files_by_owner(&owner)?
                .into_iter()
                .map(|(address, record)| serde_json::json!({ "address": address, "record": record }))
                .collect();
            print_json(&entries)
        }
    }
}

fn handle_file_create(settings: &Settings, cmd: CreateFileCommand) -> Result<()> {
    let signer = load_signer(settings)?;

    let (name, size, hash, chunks) = match &cmd.path {
        Some(path) => {
            let summary = content::summarize(path, settings.chunk_size)?;
            let name = match cmd.name {
                Some(name) => name,
                None => local_file_name(path)?,
            };
            (name, summary.file_size, summary.file_hash, summary.chunk_count)
        }
        None => {
            let name = cmd.name.context("--name is required without --path")?;
            let size = cmd.size.context("--size is required without --path")?;
            let hash = cmd.hash.context("--hash is required without --path")?;
            let chunks = cmd.chunks.context("--chunks is required without --path")?;
            let hash = Digest::from_hex(&hash).context("invalid --hash")?;
            (name, size, hash, chunks)
        }
    };

    let ledger = open_ledger(settings)?;
    let request = CreateFileRequest::new(
        signer.identity(),
        name,
        size,
        hash,
        chunks,
        cmd.created_at.unwrap_or_else(now_unix),
    )?;
    let record = ledger.create_file(&request, &signer.sign(&request))?;
    ledger.flush()?;
    print_json(&serde_json::json!({ "address": request.file_address, "record": record }))
}

fn handle_file_register(settings: &Settings, cmd: RegisterCommand) -> Result<()> {
    let signer = load_signer(settings)?;

    let merkle_root = match (&cmd.merkle_root, &cmd.path) {
        (Some(hex), _) => Digest::from_hex(hex).context("invalid --merkle-root")?,
        (None, Some(path)) => content::summarize(path, settings.chunk_size)?.merkle_root,
        (None, None) => anyhow::bail!("pass --merkle-root or --path"),
    };

    let ledger = open_ledger(settings)?;
    let request = RegisterStorageRequest::new(
        FileTarget::new(signer.identity(), cmd.name)?,
        cmd.locator,
        merkle_root,
    );
    let record = ledger.register_storage(&request, &signer.sign(&request))?;
    ledger.flush()?;
    print_json(&record)
}

fn local_file_name(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .with_context(|| format!("cannot derive a file name from {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_in(dir: &TempDir) -> Settings {
        Settings {
            data_dir: dir.path().join("data"),
            ..Settings::default()
        }
    }

    #[test]
    fn hello_does_not_create_ledger() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);

        run(&settings, Commands::Hello).unwrap();
        assert!(!settings.data_dir.exists());
        assert!(!settings.ledger_path().exists());
    }

    #[test]
    fn settings_command_uses_current_version() {
        let dir = TempDir::new().unwrap();
        let settings = settings_in(&dir);

        run(
            &settings,
            Commands::Keygen {
                out: None,
                force: false,
            },
        )
        .unwrap();
        run(&settings, Commands::Init).unwrap();
        for size in [1_000, 2_000] {
            run(
                &settings,
                Commands::Settings {
                    storage_fee_per_gb: None,
                    max_file_size: Some(size),
                },
            )
            .unwrap();
        }

        let global = open_ledger(&settings).unwrap().global().unwrap().unwrap();
        assert_eq!(global.max_file_size, 2_000);
        assert_eq!(global.settings_version, 2);
    }

    #[test]
    fn now_unix_is_after_epoch() {
        assert!(now_unix() > 0);
    }
}
