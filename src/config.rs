//! Vault configuration
//!
//! A vault is a root directory holding the index snapshot and the blob
//! directory. Layout names can be overridden by a `docvault.json` file in the
//! root; without one the defaults apply.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};

/// Name of the optional override file inside the vault root
pub const CONFIG_FILE: &str = "docvault.json";

/// Layout and URL settings for one vault
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Vault root directory (not stored in the override file)
    #[serde(skip)]
    pub root: PathBuf,
    /// Snapshot file name, relative to the root
    pub data_file: String,
    /// Blob directory name, relative to the root
    pub upload_dir: String,
    /// Prefix for each record's `download_url`
    pub download_prefix: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        VaultConfig {
            root: PathBuf::from(".docvault"),
            data_file: "data.json".to_string(),
            upload_dir: "uploads".to_string(),
            download_prefix: "/files".to_string(),
        }
    }
}

impl VaultConfig {
    /// Default settings for a vault at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        VaultConfig {
            root: root.into(),
            ..Default::default()
        }
    }

    /// Load settings for the vault at `root`, applying `docvault.json` if present
    pub fn load(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let config_path = root.join(CONFIG_FILE);

        let mut config: VaultConfig = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            serde_json::from_str(&content).map_err(|e| {
                Error::Config(format!("Failed to parse {}: {}", config_path.display(), e))
            })?
        } else {
            VaultConfig::default()
        };
        config.root = root.to_path_buf();
        config.validate()?;
        Ok(config)
    }

    /// Write the settings to `<root>/docvault.json`
    pub fn save(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(self.root.join(CONFIG_FILE), content)?;
        Ok(())
    }

    /// Per-user default vault location (`<data dir>/docvault`)
    pub fn default_root() -> PathBuf {
        dirs::data_local_dir()
            .map(|dir| dir.join("docvault"))
            .unwrap_or_else(|| PathBuf::from(".docvault"))
    }

    /// Full path of the index snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join(&self.data_file)
    }

    /// Full path of the blob directory
    pub fn blob_dir(&self) -> PathBuf {
        self.root.join(&self.upload_dir)
    }

    /// Lock file serializing uploads against orphan scans
    pub fn upload_gate_path(&self) -> PathBuf {
        self.root.join(format!("{}.lock", self.upload_dir))
    }

    fn validate(&self) -> Result<()> {
        for (field, value) in [("data_file", &self.data_file), ("upload_dir", &self.upload_dir)] {
            let mut components = Path::new(value).components();
            let plain = matches!(components.next(), Some(Component::Normal(_)))
                && components.next().is_none();
            if !plain {
                return Err(Error::Config(format!(
                    "{} must be a plain name inside the vault root, got {:?}",
                    field, value
                )));
            }
        }
        if self.data_file == self.upload_dir
            || self.data_file == CONFIG_FILE
            || self.data_file == format!("{}.lock", self.upload_dir)
        {
            return Err(Error::Config(format!(
                "data_file {:?} collides with another vault entry",
                self.data_file
            )));
        }
        Ok(())
    }
}
