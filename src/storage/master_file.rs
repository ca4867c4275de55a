use std::fs;
use std::path::{Path, PathBuf};

use crate::core::models::CostProfile;
use crate::crypto::master;
use crate::error::{Result, StrongboxError};
use crate::storage::atomic_write;
use crate::storage::format::MASTER_HASH_LENGTH;

/// Authenticates the user against the stored master hash.
///
/// The hash is only ever compared, it is unrelated to the key that encrypts entries.
#[derive(Debug, Clone)]
pub struct MasterAuthenticator {
    path: PathBuf,
    costs: CostProfile,
}

impl MasterAuthenticator {
    pub fn new(path: PathBuf, costs: CostProfile) -> Self {
        Self { path, costs }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Hash `password` and overwrite the hash file with it.
    ///
    /// Entries encrypted under the previous password stay readable only with
    /// that password until they are written again.
    pub fn hash_and_store(&self, password: &str) -> Result<()> {
        let hash = master::hash_password(password, &self.costs)?;
        if hash.len() > MASTER_HASH_LENGTH {
            return Err(StrongboxError::HashingFailed(format!(
                "hash string is {} bytes, file holds {MASTER_HASH_LENGTH}",
                hash.len()
            )));
        }

        let mut blob = [0u8; MASTER_HASH_LENGTH];
        blob[..hash.len()].copy_from_slice(hash.as_bytes());
        atomic_write(&self.path, &blob)
    }

    /// `Ok(false)` on a wrong password. An unreadable or malformed file is an error.
    pub fn verify(&self, password: &str) -> Result<bool> {
        let blob = fs::read(&self.path)?;
        if blob.len() != MASTER_HASH_LENGTH {
            return Err(StrongboxError::malformed(format!(
                "master hash file is {} bytes, expected {MASTER_HASH_LENGTH}",
                blob.len()
            )));
        }

        let end = blob.iter().position(|&b| b == 0).unwrap_or(blob.len());
        let stored = std::str::from_utf8(&blob[..end])
            .map_err(|_| StrongboxError::malformed("master hash is not valid UTF-8"))?;

        let ok = master::verify_password(password, stored)?;
        if !ok {
            tracing::debug!("master password rejected");
        }
        Ok(ok)
    }
}
