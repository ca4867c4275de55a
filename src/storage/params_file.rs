use std::fs;
use std::path::{Path, PathBuf};

use crate::core::models::{CostProfile, CryptoParameters, ALG_ARGON2ID13};
use crate::crypto::kdf;
use crate::error::{Result, StrongboxError};
use crate::storage::atomic_write;
use crate::storage::format::{CRYPTO_PARAMS_LENGTH, SALT_LENGTH};

const USIZE_LENGTH: usize = std::mem::size_of::<usize>();

/// Persists the salt and costs that the stream key is derived with.
///
/// Losing this file makes every entry unrecoverable, even with the right password.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    path: PathBuf,
    costs: CostProfile,
}

impl ParameterStore {
    pub fn new(path: PathBuf, costs: CostProfile) -> Self {
        Self { path, costs }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Write a fresh salt with the configured costs, replacing any previous parameters.
    ///
    /// Calling this on a vault that already holds entries orphans them.
    pub fn initialize(&self) -> Result<CryptoParameters> {
        let params = CryptoParameters {
            salt: kdf::generate_salt(),
            opslimit: self.costs.opslimit,
            memlimit: self.costs.memlimit,
            algorithm_id: ALG_ARGON2ID13,
        };
        self.store(&params)?;
        tracing::info!(
            opslimit = params.opslimit,
            memlimit = params.memlimit,
            "crypto parameters initialized"
        );
        Ok(params)
    }

    pub fn store(&self, params: &CryptoParameters) -> Result<()> {
        atomic_write(&self.path, &encode_params(params))
    }

    pub fn load(&self) -> Result<CryptoParameters> {
        let data = fs::read(&self.path)?;
        decode_params(&data)
    }
}

fn encode_params(params: &CryptoParameters) -> Vec<u8> {
    let mut data = Vec::with_capacity(CRYPTO_PARAMS_LENGTH);
    data.extend_from_slice(&params.salt);
    data.extend_from_slice(&params.opslimit.to_le_bytes());
    data.extend_from_slice(&params.memlimit.to_le_bytes());
    data.extend_from_slice(&params.algorithm_id.to_le_bytes());
    data
}

fn decode_params(data: &[u8]) -> Result<CryptoParameters> {
    if data.len() != CRYPTO_PARAMS_LENGTH {
        return Err(StrongboxError::malformed(format!(
            "crypto parameters file is {} bytes, expected {CRYPTO_PARAMS_LENGTH}",
            data.len()
        )));
    }

    let (salt_bytes, rest) = data.split_at(SALT_LENGTH);
    let (ops_bytes, rest) = rest.split_at(8);
    let (mem_bytes, alg_bytes) = rest.split_at(USIZE_LENGTH);

    let mut salt = [0u8; SALT_LENGTH];
    salt.copy_from_slice(salt_bytes);

    Ok(CryptoParameters {
        salt,
        opslimit: u64::from_le_bytes(fixed(ops_bytes)?),
        memlimit: usize::from_le_bytes(fixed(mem_bytes)?),
        algorithm_id: i32::from_le_bytes(fixed(alg_bytes)?),
    })
}

fn fixed<const N: usize>(bytes: &[u8]) -> Result<[u8; N]> {
    bytes
        .try_into()
        .map_err(|_| StrongboxError::malformed("crypto parameter field is truncated"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ParameterStore) {
        let dir = TempDir::new().unwrap();
        let store = ParameterStore::new(
            dir.path().join("crypto.params"),
            CostProfile::test_profile(),
        );
        (dir, store)
    }

    #[test]
    fn test_initialize_and_load() {
        let (_dir, store) = setup();
        let written = store.initialize().unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(written, loaded);
        assert_eq!(loaded.opslimit, 1);
        assert_eq!(loaded.memlimit, 1024 * 1024);
        assert_eq!(loaded.algorithm_id, ALG_ARGON2ID13);
    }

    #[test]
    fn test_file_layout() {
        let (_dir, store) = setup();
        let params = CryptoParameters {
            salt: [7u8; SALT_LENGTH],
            opslimit: 3,
            memlimit: 4096,
            algorithm_id: 2,
        };
        store.store(&params).unwrap();

        let data = fs::read(store.path()).unwrap();
        assert_eq!(data.len(), CRYPTO_PARAMS_LENGTH);
        assert_eq!(&data[..SALT_LENGTH], &[7u8; SALT_LENGTH]);
        assert_eq!(&data[SALT_LENGTH..SALT_LENGTH + 8], &3u64.to_le_bytes());
        assert_eq!(
            &data[SALT_LENGTH + 8..SALT_LENGTH + 8 + USIZE_LENGTH],
            &4096usize.to_le_bytes()
        );
        assert_eq!(&data[CRYPTO_PARAMS_LENGTH - 4..], &2i32.to_le_bytes());
    }

    #[test]
    fn test_reinitialize_changes_salt() {
        let (_dir, store) = setup();
        let first = store.initialize().unwrap();
        let second = store.initialize().unwrap();
        assert_ne!(first.salt, second.salt);
        assert_eq!(store.load().unwrap(), second);
    }

    #[test]
    fn test_missing_file() {
        let (_dir, store) = setup();
        assert!(matches!(store.load(), Err(StrongboxError::StorageFailed(_))));
    }

    #[test]
    fn test_truncated_file() {
        let (_dir, store) = setup();
        store.initialize().unwrap();
        let data = fs::read(store.path()).unwrap();
        fs::write(store.path(), &data[..data.len() - 1]).unwrap();
        assert!(matches!(store.load(), Err(StrongboxError::StorageFailed(_))));

        fs::write(store.path(), b"").unwrap();
        assert!(matches!(store.load(), Err(StrongboxError::StorageFailed(_))));
    }
}
