use argon2::{Algorithm, Argon2, Block, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;
use secrecy::SecretBox;

use crate::core::models::{CryptoParameters, ALG_ARGON2I13, ALG_ARGON2ID13};
use crate::error::{Result, StrongboxError};
use crate::storage::format::KEY_LENGTH;

/// Symmetric key derived from the master password. Never persisted.
pub type SecretKey = SecretBox<[u8; KEY_LENGTH]>;

pub fn generate_salt<const N: usize>() -> [u8; N] {
    let mut salt = [0u8; N];
    OsRng.fill_bytes(&mut salt);
    salt
}

/// Maps a libsodium-style algorithm id onto an Argon2 variant.
pub fn algorithm_for(id: i32) -> Option<Algorithm> {
    match id {
        ALG_ARGON2I13 => Some(Algorithm::Argon2i),
        ALG_ARGON2ID13 => Some(Algorithm::Argon2id),
        _ => None,
    }
}

/// Argon2 parameters for an `opslimit`/`memlimit` pair. Memory is rounded down to whole KiB.
pub fn argon2_params(
    opslimit: u64,
    memlimit: usize,
    output_len: Option<usize>,
) -> std::result::Result<Params, String> {
    let t_cost = u32::try_from(opslimit).map_err(|_| format!("opslimit {opslimit} too large"))?;
    let m_cost =
        u32::try_from(memlimit / 1024).map_err(|_| format!("memlimit {memlimit} too large"))?;
    Params::new(m_cost, t_cost, 1, output_len).map_err(|e| e.to_string())
}

/// Working memory for one Argon2 run, allocated fallibly so an oversized
/// `memlimit` surfaces as an error instead of aborting the process.
pub fn allocate_blocks(params: &Params) -> std::result::Result<Vec<Block>, String> {
    let count = params.block_count();
    let mut blocks = Vec::new();
    blocks
        .try_reserve_exact(count)
        .map_err(|e| format!("cannot allocate {count} Argon2 blocks: {e}"))?;
    blocks.resize(count, Block::default());
    Ok(blocks)
}

/// Derive the stream key from the master password. Same inputs always give the same key.
pub fn derive_key(password: &str, params: &CryptoParameters) -> Result<SecretKey> {
    let algorithm = algorithm_for(params.algorithm_id).ok_or_else(|| {
        StrongboxError::DerivationFailed(format!(
            "unknown algorithm id {}",
            params.algorithm_id
        ))
    })?;
    let argon2_params = argon2_params(params.opslimit, params.memlimit, Some(KEY_LENGTH))
        .map_err(StrongboxError::DerivationFailed)?;

    let mut blocks =
        allocate_blocks(&argon2_params).map_err(StrongboxError::DerivationFailed)?;
    let argon2 = Argon2::new(algorithm, Version::V0x13, argon2_params);

    let mut key = Box::new([0u8; KEY_LENGTH]);
    argon2
        .hash_password_into_with_memory(
            password.as_bytes(),
            &params.salt,
            &mut key[..],
            &mut blocks[..],
        )
        .map_err(|e| StrongboxError::DerivationFailed(e.to_string()))?;

    Ok(SecretBox::new(key))
}
