use secrecy::{ExposeSecret, SecretString};

use crate::core::models::Entry;
use crate::core::password_generator::{generate_password, PasswordConfig};
use crate::core::vault_service::VaultService;
use crate::error::{Result, StrongboxError};

/// An unlocked vault: the master password and the decrypted entries.
///
/// Every mutation persists the full list before it is applied in memory, so a
/// failed write leaves both the file and the session unchanged.
pub struct Session<'a> {
    service: &'a VaultService,
    master: SecretString,
    entries: Vec<Entry>,
}

impl<'a> Session<'a> {
    pub(crate) fn new(service: &'a VaultService, master: &str, entries: Vec<Entry>) -> Self {
        Self {
            service,
            master: SecretString::from(master.to_owned()),
            entries,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, entryname: &str, username: &str) -> bool {
        self.position(entryname, username).is_some()
    }

    pub fn get(&self, entryname: &str, username: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.matches(entryname, username))
    }

    /// Entries with exactly this name, in list order.
    pub fn entries_named(&self, entryname: &str) -> Vec<&Entry> {
        self.entries
            .iter()
            .filter(|e| e.entryname == entryname)
            .collect()
    }

    /// Case-insensitive multi-token AND search across entry name and username.
    pub fn search(&self, query: &str) -> Vec<&Entry> {
        let tokens: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(String::from)
            .collect();

        self.entries
            .iter()
            .filter(|entry| {
                let searchable =
                    format!("{} {}", entry.entryname, entry.username).to_lowercase();
                tokens
                    .iter()
                    .all(|token| searchable.contains(token.as_str()))
            })
            .collect()
    }

    /// Add an entry with a freshly generated password, dated today.
    pub fn add_entry(
        &mut self,
        entryname: &str,
        username: &str,
        config: &PasswordConfig,
    ) -> Result<&Entry> {
        if self.contains(entryname, username) {
            return Err(StrongboxError::DuplicateEntry);
        }
        let password = generate_password(config)?;
        self.add_entry_with_password(entryname, username, &password)
    }

    pub fn add_entry_with_password(
        &mut self,
        entryname: &str,
        username: &str,
        password: &str,
    ) -> Result<&Entry> {
        if self.contains(entryname, username) {
            return Err(StrongboxError::DuplicateEntry);
        }
        let mut staged = self.entries.clone();
        staged.push(Entry::dated_today(entryname, username, password));
        self.commit(staged)?;

        let index = self.entries.len() - 1;
        Ok(&self.entries[index])
    }

    pub fn delete_entry(&mut self, entryname: &str, username: &str) -> Result<()> {
        let index = self
            .position(entryname, username)
            .ok_or(StrongboxError::EntryNotFound)?;
        let mut staged = self.entries.clone();
        staged.remove(index);
        self.commit(staged)
    }

    /// Replace the password with a generated one and reset the date to today.
    pub fn regenerate_password(
        &mut self,
        entryname: &str,
        username: &str,
        config: &PasswordConfig,
    ) -> Result<&Entry> {
        let index = self
            .position(entryname, username)
            .ok_or(StrongboxError::EntryNotFound)?;
        let password = generate_password(config)?;

        let mut staged = self.entries.clone();
        staged[index] = Entry::dated_today(entryname, username, password);
        self.commit(staged)?;
        Ok(&self.entries[index])
    }

    /// Replace the entry identified by `(entryname, username)` in place.
    pub fn edit_entry(
        &mut self,
        entryname: &str,
        username: &str,
        replacement: Entry,
    ) -> Result<()> {
        let index = self
            .position(entryname, username)
            .ok_or(StrongboxError::EntryNotFound)?;
        let renamed = !replacement.matches(entryname, username);
        if renamed && self.contains(&replacement.entryname, &replacement.username) {
            return Err(StrongboxError::DuplicateEntry);
        }

        let mut staged = self.entries.clone();
        staged[index] = replacement;
        self.commit(staged)
    }

    /// Re-encrypt the unchanged list under `new` and make it the session password.
    pub fn change_master_password(&mut self, new: &str) -> Result<()> {
        self.service
            .rekey(self.master.expose_secret(), new, &self.entries)?;
        self.master = SecretString::from(new.to_owned());
        Ok(())
    }

    /// Drop the password and decrypted entries.
    pub fn lock(self) {}

    fn position(&self, entryname: &str, username: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.matches(entryname, username))
    }

    fn commit(&mut self, staged: Vec<Entry>) -> Result<()> {
        self.service
            .save_entries(self.master.expose_secret(), &staged)?;
        self.entries = staged;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::CostProfile;
    use crate::storage::VaultPaths;
    use std::fs;
    use tempfile::TempDir;

    fn setup() -> (TempDir, VaultService) {
        let dir = TempDir::new().unwrap();
        let svc = VaultService::new(VaultPaths::in_dir(dir.path()), CostProfile::test_profile());
        svc.initialize("master").unwrap();
        (dir, svc)
    }

    fn lowercase(length: usize) -> PasswordConfig {
        PasswordConfig {
            length,
            lowercase: true,
            uppercase: false,
            digits: false,
            specials: false,
        }
    }

    #[test]
    fn test_add_entry_persists() {
        let (_dir, svc) = setup();
        let mut session = svc.unlock("master").unwrap();

        let entry = session.add_entry("github", "alice", &lowercase(16)).unwrap();
        assert_eq!(entry.password.len(), 16);
        assert!(entry.validate().is_ok());
        session.lock();

        let reloaded = svc.load_entries("master").unwrap();
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].entryname, "github");
    }

    #[test]
    fn test_add_duplicate_rejected() {
        let (_dir, svc) = setup();
        let mut session = svc.unlock("master").unwrap();
        session.add_entry("github", "alice", &lowercase(8)).unwrap();
        assert!(matches!(
            session.add_entry("github", "alice", &lowercase(8)),
            Err(StrongboxError::DuplicateEntry)
        ));
        session.add_entry("github", "bob", &lowercase(8)).unwrap();
        session.add_entry("gitlab", "alice", &lowercase(8)).unwrap();
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_failed_write_leaves_session_unchanged() {
        let (_dir, svc) = setup();
        let mut session = svc.unlock("master").unwrap();
        let too_long = "x".repeat(61);
        assert!(matches!(
            session.add_entry_with_password("site", "user", &too_long),
            Err(StrongboxError::InvalidEntry(_))
        ));
        assert!(session.is_empty());
    }

    #[test]
    fn test_generator_error_adds_nothing() {
        let (_dir, svc) = setup();
        let mut session = svc.unlock("master").unwrap();
        assert!(matches!(
            session.add_entry("site", "user", &lowercase(0)),
            Err(StrongboxError::InvalidLength)
        ));
        assert!(session.is_empty());
    }

    #[test]
    fn test_delete_entry() {
        let (_dir, svc) = setup();
        let mut session = svc.unlock("master").unwrap();
        session.add_entry_with_password("github", "alice", "a").unwrap();
        session.add_entry_with_password("github", "bob", "b").unwrap();

        session.delete_entry("github", "alice").unwrap();
        assert_eq!(session.entries().len(), 1);
        assert_eq!(session.entries()[0].username, "bob");
        assert!(matches!(
            session.delete_entry("github", "alice"),
            Err(StrongboxError::EntryNotFound)
        ));
        assert_eq!(svc.load_entries("master").unwrap().len(), 1);
    }

    #[test]
    fn test_regenerate_password() {
        let (_dir, svc) = setup();
        let mut session = svc.unlock("master").unwrap();
        session
            .add_entry_with_password("github", "alice", "ABCDEFGH")
            .unwrap();

        let entry = session
            .regenerate_password("github", "alice", &lowercase(20))
            .unwrap();
        assert_eq!(entry.password.len(), 20);
        assert!(entry.password.chars().all(|c| c.is_ascii_lowercase()));

        let reloaded = svc.load_entries("master").unwrap();
        assert_eq!(reloaded[0].password, session.entries()[0].password);
        assert!(matches!(
            session.regenerate_password("nope", "alice", &lowercase(8)),
            Err(StrongboxError::EntryNotFound)
        ));
    }

    #[test]
    fn test_edit_entry() {
        let (_dir, svc) = setup();
        let mut session = svc.unlock("master").unwrap();
        session.add_entry_with_password("github", "alice", "a").unwrap();
        session.add_entry_with_password("github", "bob", "b").unwrap();

        let renamed = Entry::new("github", "carol", "c", "2024.03.03");
        session.edit_entry("github", "alice", renamed.clone()).unwrap();
        assert_eq!(session.entries()[0], renamed);

        let clash = Entry::new("github", "bob", "c", "2024.03.03");
        assert!(matches!(
            session.edit_entry("github", "carol", clash),
            Err(StrongboxError::DuplicateEntry)
        ));

        let same_key = Entry::new("github", "carol", "new", "2024.04.04");
        session.edit_entry("github", "carol", same_key).unwrap();
        assert_eq!(svc.load_entries("master").unwrap()[0].password, "new");
    }

    #[test]
    fn test_lookup_and_search() {
        let (_dir, svc) = setup();
        let mut session = svc.unlock("master").unwrap();
        session.add_entry_with_password("GitHub", "alice", "a").unwrap();
        session.add_entry_with_password("GitHub", "bob", "b").unwrap();
        session.add_entry_with_password("Mail", "alice", "c").unwrap();

        assert_eq!(session.entries_named("GitHub").len(), 2);
        assert!(session.entries_named("github").is_empty());
        assert_eq!(session.search("github").len(), 2);
        assert_eq!(session.search("alice").len(), 2);
        assert_eq!(session.search("git bob").len(), 1);
        assert_eq!(session.search("").len(), 3);
        assert_eq!(session.get("Mail", "alice").unwrap().password, "c");
        assert!(session.get("Mail", "bob").is_none());
    }

    #[test]
    fn test_change_master_password_then_save() {
        let (_dir, svc) = setup();
        let mut session = svc.unlock("master").unwrap();
        session.add_entry_with_password("github", "alice", "a").unwrap();

        session.change_master_password("newPass99").unwrap();
        session.add_entry_with_password("mail", "alice", "b").unwrap();
        session.lock();

        assert!(matches!(
            svc.load_entries("master"),
            Err(StrongboxError::AuthenticationFailed)
        ));
        assert_eq!(svc.load_entries("newPass99").unwrap().len(), 2);
        assert!(svc.authenticate("newPass99").unwrap());
    }

    #[test]
    fn test_hash_failure_restores_entries() {
        let (dir, svc) = setup();
        let mut session = svc.unlock("master").unwrap();
        session.add_entry_with_password("github", "alice", "a").unwrap();

        // A directory where the hash file should be makes the rename fail.
        let hash_path = dir.path().join("master.hash");
        fs::remove_file(&hash_path).unwrap();
        fs::create_dir(&hash_path).unwrap();
        fs::write(hash_path.join("occupied"), b"x").unwrap();

        assert!(matches!(
            session.change_master_password("newPass99"),
            Err(StrongboxError::StorageFailed(_))
        ));
        assert_eq!(svc.load_entries("master").unwrap().len(), 1);
        assert!(svc.load_entries("newPass99").is_err());
    }
}
