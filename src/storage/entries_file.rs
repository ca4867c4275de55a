use std::fs;
use std::path::{Path, PathBuf};

use zeroize::Zeroizing;

use crate::core::models::Entry;
use crate::crypto::kdf::SecretKey;
use crate::crypto::stream::{ChunkTag, StreamDecryptor, StreamEncryptor, StreamKind};
use crate::error::{Result, StrongboxError};
use crate::storage::atomic_write;
use crate::storage::format::{
    CHUNK_LENGTH, CHUNK_PLAINTEXT_LENGTH, FIELD_SEPARATOR, RECORD_TERMINATOR,
    STREAM_HEADER_LENGTH,
};

/// Entries read back from disk, plus the number of records that could not be parsed.
#[derive(Debug, Default)]
pub struct DecodedEntries {
    pub entries: Vec<Entry>,
    pub skipped: usize,
}

/// Reads and writes the encrypted entry stream. One chunk per entry, in list order.
#[derive(Debug, Clone)]
pub struct EntryCodec {
    path: PathBuf,
}

impl EntryCodec {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Encrypt `entries` under `key` and replace the whole file.
    ///
    /// Every entry is validated before anything is written, so a rejected list
    /// leaves the previous file untouched.
    pub fn write(&self, key: &SecretKey, entries: &[Entry]) -> Result<()> {
        let data = encrypt_entries(key, entries)?;
        atomic_write(&self.path, &data)?;
        tracing::debug!(count = entries.len(), "entries written");
        Ok(())
    }

    /// Decrypt the whole file. Any authentication failure discards everything read so far.
    pub fn read(&self, key: &SecretKey) -> Result<DecodedEntries> {
        let data = Zeroizing::new(fs::read(&self.path)?);
        let decoded = decrypt_entries(key, &data)?;
        tracing::debug!(
            count = decoded.entries.len(),
            skipped = decoded.skipped,
            "entries read"
        );
        Ok(decoded)
    }
}

pub fn encrypt_entries(key: &SecretKey, entries: &[Entry]) -> Result<Vec<u8>> {
    let blocks = entries
        .iter()
        .map(encode_record)
        .collect::<Result<Vec<_>>>()?;

    let mut stream = StreamEncryptor::new(key)?;
    let kind = if blocks.is_empty() {
        StreamKind::Empty
    } else {
        StreamKind::Chunked
    };

    let mut data = Vec::with_capacity(STREAM_HEADER_LENGTH + blocks.len() * CHUNK_LENGTH);
    data.extend_from_slice(&stream.init_push(kind)?);

    let last = blocks.len().saturating_sub(1);
    for (i, block) in blocks.iter().enumerate() {
        let tag = if i == last {
            ChunkTag::Final
        } else {
            ChunkTag::Continue
        };
        data.extend_from_slice(&stream.push(block, tag)?);
    }
    Ok(data)
}

pub fn decrypt_entries(key: &SecretKey, data: &[u8]) -> Result<DecodedEntries> {
    if data.len() < STREAM_HEADER_LENGTH {
        return Err(StrongboxError::malformed("entries file is truncated"));
    }
    let (header, body) = data.split_at(STREAM_HEADER_LENGTH);
    let mut stream = StreamDecryptor::init_pull(key, header)?;

    if body.len() % CHUNK_LENGTH != 0 {
        return Err(StrongboxError::malformed("entries file ends with a partial chunk"));
    }

    let mut decoded = DecodedEntries::default();
    for (index, chunk) in body.chunks(CHUNK_LENGTH).enumerate() {
        let (block, _tag) = stream.pull(chunk)?;
        match decode_record(&block[..]) {
            Some(entry) => decoded.entries.push(entry),
            None => {
                tracing::warn!(index, "malformed entry record, skipped");
                decoded.skipped += 1;
            }
        }
    }

    // A chunked stream that never reached its final chunk has been cut short.
    if !stream.is_finalized() {
        return Err(StrongboxError::AuthenticationFailed);
    }
    Ok(decoded)
}

/// `entryname\tusername\tpassword\tdate`, NUL-terminated and zero-padded to one block.
pub fn encode_record(entry: &Entry) -> Result<Zeroizing<[u8; CHUNK_PLAINTEXT_LENGTH]>> {
    entry.validate()?;

    let sep = FIELD_SEPARATOR;
    let record = Zeroizing::new(format!(
        "{}{sep}{}{sep}{}{sep}{}",
        entry.entryname, entry.username, entry.password, entry.date
    ));
    let bytes = record.as_bytes();
    if bytes.len() + 1 > CHUNK_PLAINTEXT_LENGTH {
        return Err(StrongboxError::EntryTooLong {
            len: bytes.len() + 1,
            max: CHUNK_PLAINTEXT_LENGTH,
        });
    }

    let mut block = Zeroizing::new([0u8; CHUNK_PLAINTEXT_LENGTH]);
    block[..bytes.len()].copy_from_slice(bytes);
    block[bytes.len()] = RECORD_TERMINATOR;
    Ok(block)
}

/// Parse one decrypted block. `None` when the record is not four UTF-8 fields
/// or holds an entry that could not be written back.
pub fn decode_record(block: &[u8]) -> Option<Entry> {
    let end = block.iter().position(|&b| b == RECORD_TERMINATOR)?;
    let record = std::str::from_utf8(&block[..end]).ok()?;

    let fields: Vec<&str> = record.split(FIELD_SEPARATOR).collect();
    match fields.as_slice() {
        [entryname, username, password, date] => {
            let entry = Entry::new(*entryname, *username, *password, *date);
            entry.validate().ok()?;
            Some(entry)
        }
        _ => None,
    }
}
