/// File holding the master password hash.
pub const MASTER_HASH_FILE: &str = "master.hash";

/// File holding the key-derivation salt and costs.
pub const CRYPTO_PARAMS_FILE: &str = "crypto.params";

/// File holding the encrypted entry stream.
pub const ENTRIES_FILE: &str = "entries.cipher";

/// The master hash is a NUL-padded PHC string of exactly this many bytes.
pub const MASTER_HASH_LENGTH: usize = 128;

/// Length of the key-derivation salt in bytes.
pub const SALT_LENGTH: usize = 16;

/// salt | opslimit (u64) | memlimit (usize) | algorithm id (i32), all little-endian.
pub const CRYPTO_PARAMS_LENGTH: usize =
    SALT_LENGTH + 8 + std::mem::size_of::<usize>() + 4;

/// Length of the symmetric key in bytes.
pub const KEY_LENGTH: usize = 32;

/// Random nonce prefix shared by every chunk of one stream.
pub const NONCE_PREFIX_LENGTH: usize = 19;

/// Poly1305 tag length.
pub const TAG_LENGTH: usize = 16;

/// prefix | kind | tag
pub const STREAM_HEADER_LENGTH: usize = NONCE_PREFIX_LENGTH + 1 + TAG_LENGTH;

/// Plaintext block carried by one chunk: one record, its terminator and zero padding.
pub const CHUNK_PLAINTEXT_LENGTH: usize = 128;

/// Encrypted chunk length on disk.
pub const CHUNK_LENGTH: usize = CHUNK_PLAINTEXT_LENGTH + TAG_LENGTH;

/// Field separator inside a record.
pub const FIELD_SEPARATOR: char = '\t';

/// Record terminator inside a plaintext block.
pub const RECORD_TERMINATOR: u8 = 0;

pub const ENTRYNAME_MAX_LENGTH: usize = 22;
pub const USERNAME_MAX_LENGTH: usize = 32;
pub const PASSWORD_MAX_LENGTH: usize = 60;

/// Dates are stored as `yyyy.MM.dd`.
pub const DATE_FORMAT: &str = "%Y.%m.%d";
pub const DATE_LENGTH: usize = 10;
