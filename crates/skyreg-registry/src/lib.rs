//! # skyreg-registry
//!
//! Signed, versioned pointer records over a content-addressed blob store.
//!
//! This crate implements:
//! - The 34-byte skylink address and its base64/base32 renderings
//! - Hashed data keys and registry entry IDs
//! - Registry entries with a byte-exact Ed25519 signing payload
//! - Validation of portal-supplied proof chains for entry-link resolution
//! - An in-memory entry store enforcing strictly increasing revisions
//!
//! ## Key Parameters
//!
//! | Parameter | Value |
//! |---|---|
//! | Skylink length | 34 bytes |
//! | Base64 skylink | 46 chars, URL-safe, unpadded |
//! | Base32 skylink | 55 chars, lowercase base32hex, unpadded |
//! | Max inline entry data | 70 bytes |
//! | Entry ID derivation | `BLAKE3::derive_key("skyreg v1 entry-id", owner_pk \|\| data_key)` |

pub mod data_key;
pub mod entry;
pub mod proof;
pub mod skylink;
pub mod store;

pub use data_key::DataKey;
pub use entry::{entry_id, EntryId, RegistryEntry, SignedEntry};
pub use proof::ProofHop;
pub use skylink::Skylink;

/// Raw length of a skylink in bytes.
pub const SKYLINK_LEN: usize = 34;

/// Length of a skylink's merkle root in bytes.
pub const MERKLE_ROOT_LEN: usize = 32;

/// Length of the base64 rendering of a skylink.
pub const BASE64_ENCODED_SKYLINK_LEN: usize = 46;

/// Length of the base32 rendering of a skylink.
pub const BASE32_ENCODED_SKYLINK_LEN: usize = 55;

/// Maximum number of bytes a registry entry's `data` field can hold.
pub const MAX_ENTRY_DATA_LEN: usize = 70;

/// Largest revision the registry can represent.
pub const MAX_REVISION: u64 = u64::MAX;

/// Proof hop type for a plain registry entry. No other type is accepted.
pub const ENTRY_TYPE_DEFAULT: u8 = 1;

/// Error types for registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Raw skylink bytes of the wrong length.
    #[error("invalid skylink length: expected 34 bytes, got {actual}")]
    InvalidLength { actual: usize },

    /// The skylink bitfield encodes an unsupported version.
    #[error("unsupported skylink bitfield {bitfield:#06x}")]
    InvalidVersion { bitfield: u16 },

    /// No skylink could be recognized in the input text.
    #[error("not a skylink: {0}")]
    NotASkylink(String),

    /// A data key was malformed.
    #[error("invalid data key: {0}")]
    InvalidDataKey(String),

    /// Entry data exceeds the inline capacity of a registry entry.
    #[error("entry data too large: {size} bytes exceeds maximum of {max} bytes")]
    DataTooLarge { size: usize, max: usize },

    /// Entry signature mismatch or malformed entry.
    #[error("invalid registry entry: {0}")]
    InvalidEntry(String),

    /// A proof was returned for a direct data-link request.
    #[error("unexpected proof for a data link")]
    UnexpectedProof,

    /// No proof was returned for an entry-link request.
    #[error("missing proof for an entry link")]
    MissingProof,

    /// A proof hop declared a record type other than a registry entry.
    #[error("unsupported proof type {kind} at hop {hop}")]
    UnsupportedProofType { hop: usize, kind: u8 },

    /// A proof hop failed signature verification or was malformed.
    #[error("invalid proof at hop {hop}")]
    InvalidProof { hop: usize },

    /// The proof chain does not connect the request to the resolved link.
    #[error("proof chain mismatch: {0}")]
    ProofChainMismatch(String),

    /// A stored entry already has an equal or higher revision.
    #[error("revision not increasing: got {got}, have {have}")]
    RevisionNotIncreasing { got: u64, have: u64 },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Cryptographic error from skyreg-crypto.
    #[error("crypto error: {0}")]
    Crypto(#[from] skyreg_crypto::CryptoError),
}

/// Convenience result type for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
