use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::core::models::CostProfile;
use crate::error::{Result, StrongboxError};
use crate::storage::VaultPaths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory holding `master.hash`, `crypto.params` and `entries.cipher`.
    pub data_dir: PathBuf,
    /// Argon2 passes used for new vaults and master hashes.
    pub kdf_opslimit: u64,
    /// Argon2 memory in bytes used for new vaults and master hashes.
    pub kdf_memlimit: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        let costs = CostProfile::INTERACTIVE;
        Self {
            data_dir: default_data_dir(),
            kdf_opslimit: costs.opslimit,
            kdf_memlimit: costs.memlimit,
        }
    }
}

impl AppConfig {
    pub fn cost_profile(&self) -> CostProfile {
        CostProfile {
            opslimit: self.kdf_opslimit,
            memlimit: self.kdf_memlimit,
        }
    }

    pub fn vault_paths(&self) -> VaultPaths {
        VaultPaths::in_dir(&self.data_dir)
    }

    pub fn load() -> Result<Self> {
        let path = config_file_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            let config = AppConfig::default();
            config.save()?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = config_file_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: AppConfig = toml::from_str(&content)?;
            Ok(config)
        } else {
            Err(StrongboxError::Config(format!(
                "Config file not found: {}",
                path.display()
            )))
        }
    }
}

fn config_file_path() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", "strongbox") {
        dirs.config_dir().join("config.toml")
    } else {
        PathBuf::from("strongbox.toml")
    }
}

fn default_data_dir() -> PathBuf {
    if let Some(dirs) = ProjectDirs::from("", "", "strongbox") {
        dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".")
    }
}
