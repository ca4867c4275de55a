use thiserror::Error;

#[derive(Debug, Error)]
pub enum StrongboxError {
    #[error("Storage failure: {0}")]
    StorageFailed(#[from] std::io::Error),

    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    /// Wrong password or corrupted ciphertext. The two are deliberately not told apart.
    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("No character class selected")]
    EmptyAlphabet,

    #[error("Password length must be greater than zero")]
    InvalidLength,

    #[error("Master password must not be empty")]
    InvalidMasterPassword,

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Entry record is {len} bytes, limit is {max}")]
    EntryTooLong { len: usize, max: usize },

    #[error("An entry with this name and username already exists")]
    DuplicateEntry,

    #[error("Entry not found")]
    EntryNotFound,

    #[error("Stream used out of order: {0}")]
    StreamOrder(&'static str),

    #[error("Config error: {0}")]
    Config(String),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

impl StrongboxError {
    /// Storage error for a file whose content cannot be parsed.
    pub(crate) fn malformed(what: impl Into<String>) -> Self {
        StrongboxError::StorageFailed(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            what.into(),
        ))
    }
}

pub type Result<T> = std::result::Result<T, StrongboxError>;
