use std::collections::HashSet;

use crate::config::AppConfig;
use crate::core::models::{CostProfile, Entry};
use crate::core::password_generator::{self, PasswordConfig};
use crate::core::session::Session;
use crate::crypto::kdf::{self, SecretKey};
use crate::error::{Result, StrongboxError};
use crate::storage::entries_file::{DecodedEntries, EntryCodec};
use crate::storage::master_file::MasterAuthenticator;
use crate::storage::params_file::ParameterStore;
use crate::storage::VaultPaths;

/// Entry point for callers: owns the three vault files and nothing decrypted.
///
/// Every call opens, reads or writes and releases the files it needs. Callers
/// must serialize access; there is no locking.
pub struct VaultService {
    paths: VaultPaths,
    authenticator: MasterAuthenticator,
    params: ParameterStore,
    codec: EntryCodec,
}

impl VaultService {
    pub fn new(paths: VaultPaths, costs: CostProfile) -> Self {
        Self {
            authenticator: MasterAuthenticator::new(paths.master_hash.clone(), costs),
            params: ParameterStore::new(paths.crypto_params.clone(), costs),
            codec: EntryCodec::new(paths.entries.clone()),
            paths,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.vault_paths(), config.cost_profile())
    }

    pub fn paths(&self) -> &VaultPaths {
        &self.paths
    }

    pub fn is_initialized(&self) -> bool {
        self.authenticator.exists() && self.params.exists() && self.codec.exists()
    }

    /// Create a vault: fresh parameters, an empty entry stream, then the master hash.
    ///
    /// Overwrites an existing vault, whose entries become unreadable.
    pub fn initialize(&self, master: &str) -> Result<()> {
        check_master(master)?;
        self.params.initialize()?;
        self.save_entries(master, &[])?;
        self.authenticator.hash_and_store(master)?;
        tracing::info!(dir = ?self.paths.entries.parent(), "vault initialized");
        Ok(())
    }

    /// `Ok(false)` for a wrong password; an error only when the hash cannot be read.
    pub fn authenticate(&self, password: &str) -> Result<bool> {
        self.authenticator.verify(password)
    }

    pub fn derive_key(&self, password: &str) -> Result<SecretKey> {
        let params = self.params.load()?;
        kdf::derive_key(password, &params)
    }

    /// Decrypt the entry list. A wrong password is `AuthenticationFailed`.
    pub fn load_entries(&self, password: &str) -> Result<Vec<Entry>> {
        let decoded = self.read_entries(password)?;
        if decoded.skipped > 0 {
            tracing::warn!(skipped = decoded.skipped, "some entries could not be read");
        }
        Ok(decoded.entries)
    }

    /// Like [`load_entries`](Self::load_entries), also reporting how many records were skipped.
    pub fn read_entries(&self, password: &str) -> Result<DecodedEntries> {
        let key = self.derive_key(password)?;
        self.codec.read(&key)
    }

    /// Encrypt `entries` under `password` and replace the entry file.
    pub fn save_entries(&self, password: &str, entries: &[Entry]) -> Result<()> {
        check_unique(entries)?;
        let key = self.derive_key(password)?;
        self.codec.write(&key, entries)
    }

    /// Verify `old`, then re-encrypt the stored entries under `new`.
    pub fn change_master_password(&self, old: &str, new: &str) -> Result<()> {
        if !self.authenticate(old)? {
            return Err(StrongboxError::AuthenticationFailed);
        }
        let entries = self.load_entries(old)?;
        self.rekey(old, new, &entries)
    }

    /// Write `entries` under `new`, then store the hash of `new`.
    ///
    /// If the hash cannot be stored the entries are written back under `old`,
    /// so the hash file and the entry file keep agreeing on one password.
    pub(crate) fn rekey(&self, old: &str, new: &str, entries: &[Entry]) -> Result<()> {
        check_master(new)?;
        self.save_entries(new, entries)?;

        if let Err(e) = self.authenticator.hash_and_store(new) {
            tracing::warn!(error = %e, "storing new master hash failed, restoring entries");
            if let Err(restore) = self.save_entries(old, entries) {
                tracing::error!(error = %restore, "restoring entries under the old password failed");
            }
            return Err(e);
        }

        tracing::info!("master password changed");
        Ok(())
    }

    /// Authenticate and decrypt, keeping the password and entries for later writes.
    pub fn unlock(&self, password: &str) -> Result<Session<'_>> {
        if !self.authenticate(password)? {
            return Err(StrongboxError::AuthenticationFailed);
        }
        let entries = self.load_entries(password)?;
        Ok(Session::new(self, password, entries))
    }

    pub fn generate_password(config: &PasswordConfig) -> Result<String> {
        password_generator::generate_password(config)
    }
}

fn check_master(password: &str) -> Result<()> {
    if password.is_empty() {
        return Err(StrongboxError::InvalidMasterPassword);
    }
    Ok(())
}

/// No two entries may share both name and username.
pub(crate) fn check_unique(entries: &[Entry]) -> Result<()> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert((entry.entryname.as_str(), entry.username.as_str())) {
            return Err(StrongboxError::DuplicateEntry);
        }
    }
    Ok(())
}
