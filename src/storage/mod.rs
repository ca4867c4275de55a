pub mod entries_file;
pub mod format;
pub mod master_file;
pub mod params_file;

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use format::{CRYPTO_PARAMS_FILE, ENTRIES_FILE, MASTER_HASH_FILE};

/// Locations of the three files that make up a vault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    pub master_hash: PathBuf,
    pub crypto_params: PathBuf,
    pub entries: PathBuf,
}

impl VaultPaths {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            master_hash: dir.join(MASTER_HASH_FILE),
            crypto_params: dir.join(CRYPTO_PARAMS_FILE),
            entries: dir.join(ENTRIES_FILE),
        }
    }
}

/// Replace `path` with `data` (temp → fsync → rename). The old content survives any failure.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    if !parent.as_os_str().is_empty() {
        fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{file_name}.tmp_{}", std::process::id()));

    let written = (|| -> Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);
        fs::rename(&temp_path, path)?;
        Ok(())
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }
    sync_dir(if parent.as_os_str().is_empty() {
        Path::new(".")
    } else {
        parent
    })?;

    tracing::debug!(path = %path.display(), bytes = data.len(), "file replaced");
    Ok(())
}

/// Flush a directory entry so a completed rename survives a crash.
#[cfg(unix)]
fn sync_dir(dir: &Path) -> Result<()> {
    fs::File::open(dir)?.sync_all()?;
    Ok(())
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> Result<()> {
    Ok(())
}
