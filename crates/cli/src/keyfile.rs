//! On-disk signing key.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use soldrive_ledger::RequestSigner;
use soldrive_types::Identity;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current on-disk key file schema version.
const KEYFILE_VERSION: u8 = 1;

/// Serialized key file written to disk.
#[derive(Debug, Serialize, Deserialize)]
pub struct KeyFile {
    pub version: u8,
    pub identity: Identity,
    pub secret_seed_hex: String,
    /// Unix seconds
    pub created_at: u64,
}

impl KeyFile {
    pub fn from_signer(signer: &RequestSigner) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            version: KEYFILE_VERSION,
            identity: signer.identity(),
            secret_seed_hex: hex::encode(signer.seed()),
            created_at,
        }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read key file {}", path.display()))?;
        let keyfile: KeyFile = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse key file {}", path.display()))?;
        if keyfile.version != KEYFILE_VERSION {
            anyhow::bail!(
                "unsupported key file version {} (expected {})",
                keyfile.version,
                KEYFILE_VERSION
            );
        }
        Ok(keyfile)
    }

    pub fn save(&self, path: &Path, overwrite: bool) -> Result<()> {
        if path.exists() && !overwrite {
            anyhow::bail!(
                "key file {} already exists (pass --force to replace it)",
                path.display()
            );
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        // Owner-only from creation; the seed is never readable by others.
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options
            .open(path)
            .with_context(|| format!("failed to create key file {}", path.display()))?;

        // `mode` only applies to new files; tighten one being replaced.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(&serde_json::to_vec_pretty(self)?)
            .with_context(|| format!("failed to write key file {}", path.display()))?;
        file.sync_all()?;
        Ok(())
    }

    /// Rebuild the signer, checking it matches the recorded identity.
    pub fn signer(&self) -> Result<RequestSigner> {
        let mut seed = [0u8; 32];
        hex::decode_to_slice(self.secret_seed_hex.trim(), &mut seed)
            .context("secret seed must be 64 hex characters")?;
        let signer = RequestSigner::from_seed(seed);
        if signer.identity() != self.identity {
            anyhow::bail!(
                "key file identity {} does not match its secret ({})",
                self.identity,
                signer.identity()
            );
        }
        Ok(signer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn save_and_load_restore_the_same_signer() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("keys").join("identity.json");
        let signer = RequestSigner::from_seed([9u8; 32]);

        KeyFile::from_signer(&signer).save(&path, false).unwrap();
        let restored = KeyFile::load(&path).unwrap().signer().unwrap();
        assert_eq!(restored.identity(), signer.identity());
    }

    #[test]
    fn existing_key_not_overwritten_without_force() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("identity.json");
        let keyfile = KeyFile::from_signer(&RequestSigner::from_seed([1u8; 32]));

        keyfile.save(&path, false).unwrap();
        assert!(keyfile.save(&path, false).is_err());
        assert!(keyfile.save(&path, true).is_ok());
    }

    #[cfg(unix)]
    #[test]
    fn key_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("identity.json");
        let keyfile = KeyFile::from_signer(&RequestSigner::from_seed([4u8; 32]));

        keyfile.save(&path, false).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        // Replacing a world-readable file tightens it too.
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
        keyfile.save(&path, true).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn tampered_identity_detected() {
        let mut keyfile = KeyFile::from_signer(&RequestSigner::from_seed([1u8; 32]));
        keyfile.identity = RequestSigner::from_seed([2u8; 32]).identity();
        assert!(keyfile.signer().is_err());
    }
}
