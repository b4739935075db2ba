//! CLI settings: optional TOML file overlaid with `SOLDRIVE__*` environment
//! variables.

use anyhow::{Context, Result};
use config::{Config, Environment, File as ConfigFile};
use serde::Deserialize;
use soldrive_ledger::LedgerConfig;
use std::path::{Path, PathBuf};

/// Default chunk size used when summarising local files (256 KiB).
pub const DEFAULT_CHUNK_SIZE: u64 = 256 * 1024;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding the ledger database and the default key file.
    pub data_dir: PathBuf,
    /// Signing key; defaults to `<data_dir>/identity.json`.
    pub key_file: Option<PathBuf>,
    pub log_level: String,
    /// `pretty` or `json`
    pub log_format: String,
    pub chunk_size: u64,
    pub ledger: LedgerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("soldrive"),
            key_file: None,
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            ledger: LedgerConfig::default(),
        }
    }
}

impl Settings {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            if !path.exists() {
                anyhow::bail!(
                    "Configuration file {} not found (specified via --config)",
                    path.display()
                );
            }
            builder = builder.add_source(ConfigFile::from(path));
        }

        builder = builder.add_source(
            Environment::with_prefix("SOLDRIVE")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .context("failed to read configuration")?
            .try_deserialize()
            .context("invalid configuration")?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than zero");
        }
        if !matches!(self.log_format.as_str(), "pretty" | "json") {
            anyhow::bail!("log_format must be 'pretty' or 'json', got '{}'", self.log_format);
        }
        self.ledger.validate().map_err(anyhow::Error::msg)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }

    pub fn key_path(&self) -> PathBuf {
        self.key_file
            .clone()
            .unwrap_or_else(|| self.data_dir.join("identity.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn file_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("soldrive.toml");
        fs::write(
            &path,
            r#"
data_dir = "/tmp/soldrive-test"
chunk_size = 1024

[ledger]
max_file_size = 2048
"#,
        )
        .unwrap();

        let settings = Settings::load(Some(&path)).unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/soldrive-test"));
        assert_eq!(settings.chunk_size, 1024);
        assert_eq!(settings.ledger.max_file_size, 2048);
        assert_eq!(settings.ledger.storage_fee_per_gb, 100_000_000);
        assert_eq!(
            settings.key_path(),
            PathBuf::from("/tmp/soldrive-test/identity.json")
        );
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Settings::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn zero_chunk_size_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("soldrive.toml");
        fs::write(&path, "chunk_size = 0\n").unwrap();
        assert!(Settings::load(Some(&path)).is_err());
    }
}
