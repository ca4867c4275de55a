//! Chunked authenticated encryption over XChaCha20-Poly1305.
//!
//! A stream is a header followed by fixed-size chunks. Every chunk is sealed
//! under a nonce built from a random per-stream prefix, the chunk counter and a
//! flag marking the last chunk, so chunks cannot be reordered, dropped from the
//! end or appended to without failing authentication.
//!
//! ```text
//! nonce  = prefix[19] | counter u32 BE | flag u8
//! header = prefix[19] | kind u8 | tag[16]
//! chunk  = ciphertext[CHUNK_PLAINTEXT_LENGTH] | tag[16]
//! ```
//!
//! The header tag seals an empty plaintext with the header flag, so a wrong key
//! is rejected before any chunk is read. `kind` records whether chunks follow.

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use secrecy::ExposeSecret;
use zeroize::Zeroizing;

use crate::crypto::kdf::{generate_salt, SecretKey};
use crate::error::{Result, StrongboxError};
use crate::storage::format::{
    CHUNK_LENGTH, CHUNK_PLAINTEXT_LENGTH, NONCE_PREFIX_LENGTH, STREAM_HEADER_LENGTH,
};

const FLAG_CONTINUE: u8 = 0x00;
const FLAG_FINAL: u8 = 0x01;
const FLAG_HEADER: u8 = 0x02;

const KIND_EMPTY: u8 = 0;
const KIND_CHUNKED: u8 = 1;

/// Tag attached to every chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkTag {
    Continue,
    Final,
}

impl ChunkTag {
    fn flag(self) -> u8 {
        match self {
            ChunkTag::Continue => FLAG_CONTINUE,
            ChunkTag::Final => FLAG_FINAL,
        }
    }
}

/// Whether a stream carries chunks after its header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Empty,
    Chunked,
}

impl StreamKind {
    fn byte(self) -> u8 {
        match self {
            StreamKind::Empty => KIND_EMPTY,
            StreamKind::Chunked => KIND_CHUNKED,
        }
    }

    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            KIND_EMPTY => Some(StreamKind::Empty),
            KIND_CHUNKED => Some(StreamKind::Chunked),
            _ => None,
        }
    }
}

/// Position of a stream in its lifecycle. Readers and writers share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Uninitialized,
    HeaderDone,
    ChunkDone,
    Finalized,
}

fn nonce(prefix: &[u8; NONCE_PREFIX_LENGTH], counter: u32, flag: u8) -> XNonce {
    let mut bytes = [0u8; 24];
    bytes[..NONCE_PREFIX_LENGTH].copy_from_slice(prefix);
    bytes[NONCE_PREFIX_LENGTH..NONCE_PREFIX_LENGTH + 4].copy_from_slice(&counter.to_be_bytes());
    bytes[NONCE_PREFIX_LENGTH + 4] = flag;
    XNonce::clone_from_slice(&bytes)
}

fn cipher_for(key: &SecretKey) -> Result<XChaCha20Poly1305> {
    XChaCha20Poly1305::new_from_slice(key.expose_secret())
        .map_err(|e| StrongboxError::DerivationFailed(e.to_string()))
}

/// Write side: `Uninitialized -> HeaderDone -> ChunkDone* -> Finalized`.
pub struct StreamEncryptor {
    cipher: XChaCha20Poly1305,
    prefix: [u8; NONCE_PREFIX_LENGTH],
    counter: u32,
    state: StreamState,
}

impl StreamEncryptor {
    pub fn new(key: &SecretKey) -> Result<Self> {
        Ok(Self {
            cipher: cipher_for(key)?,
            prefix: generate_salt(),
            counter: 0,
            state: StreamState::Uninitialized,
        })
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Emit the header that binds the stream to the key.
    pub fn init_push(&mut self, kind: StreamKind) -> Result<[u8; STREAM_HEADER_LENGTH]> {
        if self.state != StreamState::Uninitialized {
            return Err(StrongboxError::StreamOrder("header already emitted"));
        }

        let aad = [kind.byte()];
        let tag = self
            .cipher
            .encrypt(
                &nonce(&self.prefix, 0, FLAG_HEADER),
                Payload { msg: &[], aad: &aad },
            )
            .map_err(|_| StrongboxError::AuthenticationFailed)?;

        let mut header = [0u8; STREAM_HEADER_LENGTH];
        header[..NONCE_PREFIX_LENGTH].copy_from_slice(&self.prefix);
        header[NONCE_PREFIX_LENGTH] = kind.byte();
        header[NONCE_PREFIX_LENGTH + 1..].copy_from_slice(&tag);

        self.state = match kind {
            StreamKind::Empty => StreamState::Finalized,
            StreamKind::Chunked => StreamState::HeaderDone,
        };
        Ok(header)
    }

    /// Seal one plaintext block.
    pub fn push(
        &mut self,
        block: &[u8; CHUNK_PLAINTEXT_LENGTH],
        tag: ChunkTag,
    ) -> Result<Vec<u8>> {
        match self.state {
            StreamState::HeaderDone | StreamState::ChunkDone => {}
            StreamState::Uninitialized => {
                return Err(StrongboxError::StreamOrder("chunk pushed before header"))
            }
            StreamState::Finalized => {
                return Err(StrongboxError::StreamOrder("chunk pushed after final chunk"))
            }
        }

        let sealed = self
            .cipher
            .encrypt(&nonce(&self.prefix, self.counter, tag.flag()), &block[..])
            .map_err(|_| StrongboxError::AuthenticationFailed)?;

        self.state = match tag {
            ChunkTag::Final => StreamState::Finalized,
            ChunkTag::Continue => {
                self.counter = self
                    .counter
                    .checked_add(1)
                    .ok_or(StrongboxError::StreamOrder("chunk counter exhausted"))?;
                StreamState::ChunkDone
            }
        };
        Ok(sealed)
    }

    pub fn is_finalized(&self) -> bool {
        self.state == StreamState::Finalized
    }
}

/// Read side, mirroring [`StreamEncryptor`].
pub struct StreamDecryptor {
    cipher: XChaCha20Poly1305,
    prefix: [u8; NONCE_PREFIX_LENGTH],
    counter: u32,
    kind: StreamKind,
    state: StreamState,
}

impl StreamDecryptor {
    /// Validate `header` against `key`. A wrong key and a forged header are both `AuthenticationFailed`.
    pub fn init_pull(key: &SecretKey, header: &[u8]) -> Result<Self> {
        if header.len() != STREAM_HEADER_LENGTH {
            return Err(StrongboxError::malformed("stream header is truncated"));
        }
        let cipher = cipher_for(key)?;

        let mut prefix = [0u8; NONCE_PREFIX_LENGTH];
        prefix.copy_from_slice(&header[..NONCE_PREFIX_LENGTH]);
        let kind_byte = header[NONCE_PREFIX_LENGTH];
        let tag = &header[NONCE_PREFIX_LENGTH + 1..];

        let aad = [kind_byte];
        cipher
            .decrypt(
                &nonce(&prefix, 0, FLAG_HEADER),
                Payload { msg: tag, aad: &aad },
            )
            .map_err(|_| StrongboxError::AuthenticationFailed)?;

        // Authentic, but not a kind this reader understands.
        let kind = StreamKind::from_byte(kind_byte).ok_or(StrongboxError::AuthenticationFailed)?;

        Ok(Self {
            cipher,
            prefix,
            counter: 0,
            kind,
            state: match kind {
                StreamKind::Empty => StreamState::Finalized,
                StreamKind::Chunked => StreamState::HeaderDone,
            },
        })
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn state(&self) -> StreamState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state == StreamState::Finalized
    }

    /// Authenticate and open the next chunk.
    ///
    /// The flag is not stored on disk: a chunk is tried as `Continue` first and
    /// as `Final` second, and only the one that authenticates is accepted.
    pub fn pull(
        &mut self,
        chunk: &[u8],
    ) -> Result<(Zeroizing<[u8; CHUNK_PLAINTEXT_LENGTH]>, ChunkTag)> {
        if self.state == StreamState::Finalized {
            return Err(StrongboxError::AuthenticationFailed);
        }
        if chunk.len() != CHUNK_LENGTH {
            return Err(StrongboxError::malformed("encrypted chunk is truncated"));
        }

        let (opened, tag) = [ChunkTag::Continue, ChunkTag::Final]
            .into_iter()
            .find_map(|tag| {
                self.cipher
                    .decrypt(&nonce(&self.prefix, self.counter, tag.flag()), chunk)
                    .ok()
                    .map(|plain| (Zeroizing::new(plain), tag))
            })
            .ok_or(StrongboxError::AuthenticationFailed)?;

        let mut block = Zeroizing::new([0u8; CHUNK_PLAINTEXT_LENGTH]);
        if opened.len() != CHUNK_PLAINTEXT_LENGTH {
            return Err(StrongboxError::AuthenticationFailed);
        }
        block.copy_from_slice(&opened);

        self.state = match tag {
            ChunkTag::Final => StreamState::Finalized,
            ChunkTag::Continue => {
                self.counter = self
                    .counter
                    .checked_add(1)
                    .ok_or(StrongboxError::AuthenticationFailed)?;
                StreamState::ChunkDone
            }
        };
        Ok((block, tag))
    }
}
