//! # skyreg-crypto
//!
//! Cryptographic primitives for the skyreg registry client.
//!
//! The suite is fixed: Ed25519 for registry entry signatures, BLAKE3 for
//! data-key hashing and entry IDs, Argon2id for seed-phrase key derivation.
//!
//! ## Modules
//!
//! - [`blake3`]: Domain-separated BLAKE3 hashing
//! - [`ed25519`]: Ed25519 signing and verification (RFC 8032)
//! - [`argon2id`]: Seed-phrase key derivation

pub mod argon2id;
pub mod blake3;
pub mod ed25519;

/// Error types for cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    /// Ed25519 signature verification failed.
    #[error("signature verification failed")]
    SignatureVerification,

    /// Invalid key length.
    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    /// Argon2id hashing failed.
    #[error("argon2id error: {0}")]
    Argon2(String),

    /// Invalid input data.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
