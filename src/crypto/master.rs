use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

use crate::core::models::CostProfile;
use crate::crypto::kdf::{allocate_blocks, argon2_params, generate_salt};
use crate::error::{Result, StrongboxError};
use crate::storage::format::SALT_LENGTH;

/// Hash the master password into an Argon2id PHC string carrying its own salt and costs.
pub fn hash_password(password: &str, costs: &CostProfile) -> Result<String> {
    let params = argon2_params(costs.opslimit, costs.memlimit, None)
        .map_err(StrongboxError::HashingFailed)?;
    // The hasher allocates its own blocks and aborts on failure; reserve them once first.
    drop(allocate_blocks(&params).map_err(StrongboxError::HashingFailed)?);
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let salt = SaltString::encode_b64(&generate_salt::<SALT_LENGTH>())
        .map_err(|e| StrongboxError::HashingFailed(e.to_string()))?;

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| StrongboxError::HashingFailed(e.to_string()))?;
    Ok(hash.to_string())
}

/// Check `password` against a stored PHC string, using the costs recorded in it.
///
/// A mismatch is `Ok(false)`. A hash that cannot be parsed or used is a storage
/// problem, not a wrong password.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| StrongboxError::malformed(format!("master hash: {e}")))?;
    if let Ok(params) = Params::try_from(&parsed) {
        let blocks = allocate_blocks(&params)
            .map_err(|e| StrongboxError::malformed(format!("master hash: {e}")))?;
        drop(blocks);
    }

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(password_hash::Error::Password) => Ok(false),
        Err(e) => Err(StrongboxError::malformed(format!("master hash: {e}"))),
    }
}
