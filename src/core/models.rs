use std::fmt;

use chrono::{Datelike, Local, NaiveDate};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Result, StrongboxError};
use crate::storage::format::{
    DATE_FORMAT, DATE_LENGTH, ENTRYNAME_MAX_LENGTH, FIELD_SEPARATOR, PASSWORD_MAX_LENGTH,
    SALT_LENGTH, USERNAME_MAX_LENGTH,
};

/// Argon2i, version 1.3.
pub const ALG_ARGON2I13: i32 = 1;
/// Argon2id, version 1.3.
pub const ALG_ARGON2ID13: i32 = 2;

/// Costs used when hashing the master password and when initializing key-derivation parameters.
///
/// `opslimit` is the number of Argon2 passes, `memlimit` the memory budget in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostProfile {
    pub opslimit: u64,
    pub memlimit: usize,
}

impl CostProfile {
    pub const INTERACTIVE: CostProfile = CostProfile {
        opslimit: 2,
        memlimit: 64 * 1024 * 1024,
    };

    /// Fast costs for testing only.
    #[cfg(test)]
    pub fn test_profile() -> Self {
        Self {
            opslimit: 1,
            memlimit: 1024 * 1024, // 1 MB
        }
    }
}

impl Default for CostProfile {
    fn default() -> Self {
        Self::INTERACTIVE
    }
}

/// Persisted key-derivation parameters. Changing them orphans every entry encrypted before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CryptoParameters {
    pub salt: [u8; SALT_LENGTH],
    pub opslimit: u64,
    pub memlimit: usize,
    pub algorithm_id: i32,
}

/// How long ago an entry's password was set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordAge {
    /// Less than three months.
    Fresh,
    /// Three to six months.
    Aging,
    Stale,
}

impl PasswordAge {
    pub fn from_months(months: i32) -> Self {
        if months < 3 {
            PasswordAge::Fresh
        } else if months < 6 {
            PasswordAge::Aging
        } else {
            PasswordAge::Stale
        }
    }
}

impl fmt::Display for PasswordAge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PasswordAge::Fresh => "fresh",
            PasswordAge::Aging => "aging",
            PasswordAge::Stale => "stale",
        };
        f.write_str(label)
    }
}

/// One credential record. Entries are identified by the `(entryname, username)` pair.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Entry {
    pub entryname: String,
    pub username: String,
    pub password: String,
    pub date: String,
}

impl Entry {
    pub fn new(
        entryname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            entryname: entryname.into(),
            username: username.into(),
            password: password.into(),
            date: date.into(),
        }
    }

    /// Entry stamped with the current local date.
    pub fn dated_today(
        entryname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self::new(entryname, username, password, today_string())
    }

    pub fn matches(&self, entryname: &str, username: &str) -> bool {
        self.entryname == entryname && self.username == username
    }

    /// Check field bounds and forbidden characters before the entry is persisted.
    pub fn validate(&self) -> Result<()> {
        check_field("entryname", &self.entryname, ENTRYNAME_MAX_LENGTH)?;
        check_field("username", &self.username, USERNAME_MAX_LENGTH)?;
        check_field("password", &self.password, PASSWORD_MAX_LENGTH)?;
        if self.date.len() != DATE_LENGTH || self.parse_date().is_none() {
            return Err(StrongboxError::InvalidEntry(format!(
                "date must be formatted as yyyy.MM.dd, got {:?}",
                self.date
            )));
        }
        Ok(())
    }

    pub fn parse_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }

    /// Age class of the password relative to `today`, or `None` if the stored date is malformed.
    pub fn age(&self, today: NaiveDate) -> Option<PasswordAge> {
        let Some(set_on) = self.parse_date() else {
            tracing::warn!("entry date is malformed, cannot compute password age");
            return None;
        };
        let months = (today.year() - set_on.year()) * 12 + today.month() as i32
            - set_on.month() as i32;
        Some(PasswordAge::from_months(months))
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entry")
            .field("entryname", &self.entryname)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("date", &self.date)
            .finish()
    }
}

pub fn today_string() -> String {
    Local::now().date_naive().format(DATE_FORMAT).to_string()
}

fn check_field(name: &str, value: &str, max_chars: usize) -> Result<()> {
    if value.is_empty() {
        return Err(StrongboxError::InvalidEntry(format!("{name} must not be empty")));
    }
    let chars = value.chars().count();
    if chars > max_chars {
        return Err(StrongboxError::InvalidEntry(format!(
            "{name} is {chars} characters, limit is {max_chars}"
        )));
    }
    if value.contains(FIELD_SEPARATOR) || value.contains('\0') {
        return Err(StrongboxError::InvalidEntry(format!(
            "{name} contains a tab or NUL character"
        )));
    }
    Ok(())
}
