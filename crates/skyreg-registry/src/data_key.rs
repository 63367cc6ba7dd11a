//! Hashed data keys.
//!
//! Callers name records with arbitrary strings. The registry only ever sees
//! the 32-byte hash, so every string (including `""`, `"."`, `".."` and
//! URL-like names) maps to a distinct fixed-length key.

use std::fmt;

use skyreg_crypto::blake3::{self, contexts};

use crate::{RegistryError, Result};

/// Length of a hashed data key in bytes.
pub const DATA_KEY_LEN: usize = 32;

/// A hashed registry data key.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DataKey([u8; DATA_KEY_LEN]);

impl DataKey {
    /// Hash a caller-supplied data-key string.
    pub fn from_name(name: &str) -> Self {
        Self(blake3::derive_key(contexts::DATA_KEY, name.as_bytes()))
    }

    /// Wrap an already-hashed data key.
    pub fn from_hash(hash: [u8; DATA_KEY_LEN]) -> Self {
        Self(hash)
    }

    /// Parse an already-hashed data key from hex.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| RegistryError::InvalidDataKey(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    /// Wrap an already-hashed data key, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let hash: [u8; DATA_KEY_LEN] = bytes.try_into().map_err(|_| {
            RegistryError::InvalidDataKey(format!(
                "expected {DATA_KEY_LEN} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self(hash))
    }

    pub fn as_bytes(&self) -> &[u8; DATA_KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataKey({})", self.to_hex())
    }
}

impl fmt::Display for DataKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
