//! Argon2id seed-phrase key derivation.
//!
//! Turns a human-memorable seed phrase into the 32-byte secret of a registry
//! owner keypair. The salt is a fixed domain string so the mapping is
//! deterministic across clients.

use argon2::{Algorithm, Argon2, Params, Version};

use crate::{CryptoError, Result};

/// Memory cost in KiB (19 MiB).
pub const SEED_M_COST: u32 = 19456;
pub const SEED_T_COST: u32 = 2;
pub const SEED_P_COST: u32 = 1;
pub const SEED_OUTPUT_LEN: usize = 32;

/// Fixed salt binding derived keys to this protocol.
pub const SEED_SALT: &[u8] = b"skyreg v1 seed-keypair";

/// Derive the 32-byte Ed25519 secret for a seed phrase.
pub fn derive_seed_key(seed: &[u8]) -> Result<[u8; SEED_OUTPUT_LEN]> {
    if seed.is_empty() {
        return Err(CryptoError::InvalidInput("empty seed".to_string()));
    }

    let params = Params::new(SEED_M_COST, SEED_T_COST, SEED_P_COST, Some(SEED_OUTPUT_LEN))
        .map_err(|e| CryptoError::Argon2(e.to_string()))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = [0u8; SEED_OUTPUT_LEN];
    argon2
        .hash_password_into(seed, SEED_SALT, &mut output)
        .map_err(|e| CryptoError::Argon2(e.to_string()))?;

    Ok(output)
}
