//! Domain-separated BLAKE3 hashing for the registry.
//!
//! Cross-domain collisions are prevented by deriving every registry-level
//! digest through BLAKE3's `derive_key` mode with a registered context string.
//!
//! ## Modes
//!
//! - [`hash`]: plain hashing, no domain separation
//! - [`derive_key`]: data keys, entry IDs and blob roots

/// Registered BLAKE3 context strings. Using an unregistered context string is
/// a protocol violation.
pub mod contexts {
    /// Hash of a caller-supplied data-key string.
    pub const DATA_KEY: &str = "skyreg v1 data-key";
    /// Registry entry ID: `derive_key(ENTRY_ID, owner_pk || data_key)`.
    pub const ENTRY_ID: &str = "skyreg v1 entry-id";
    /// Merkle root of an uploaded blob.
    pub const BLOB_ROOT: &str = "skyreg v1 blob-root";

    /// All registered context strings. Used for validation.
    pub const ALL_CONTEXTS: &[&str] = &[DATA_KEY, ENTRY_ID, BLOB_ROOT];
}

/// Compute BLAKE3 hash of the input data.
pub fn hash(data: &[u8]) -> [u8; 32] {
    *::blake3::hash(data).as_bytes()
}

/// Derive a key using BLAKE3's built-in key derivation mode.
///
/// # Arguments
///
/// * `context` - A registered context string (must start with "skyreg v1 ")
/// * `key_material` - The input key material
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    ::blake3::derive_key(context, key_material)
}

/// Derive a key from several concatenated fields without an intermediate
/// allocation.
pub fn derive_key_multi(context: &str, fields: &[&[u8]]) -> [u8; 32] {
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    for field in fields {
        hasher.update(field);
    }
    *hasher.finalize().as_bytes()
}

/// Verify that a context string is registered.
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL_CONTEXTS.contains(&context)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_context_strings_prefixed() {
        for ctx in contexts::ALL_CONTEXTS {
            assert!(
                ctx.starts_with("skyreg v1 "),
                "Context string '{ctx}' has wrong prefix"
            );
        }
    }

    #[test]
    fn test_hash_deterministic() {
        assert_eq!(hash(b"skyreg test vector 1"), hash(b"skyreg test vector 1"));
        assert_ne!(hash(b"input1"), hash(b"input2"));
    }

    #[test]
    fn test_derive_key_different_contexts() {
        let key1 = derive_key(contexts::DATA_KEY, b"app");
        let key2 = derive_key(contexts::ENTRY_ID, b"app");
        assert_ne!(key1, key2);
        assert_ne!(key1, hash(b"app"));
    }

    #[test]
    fn test_derive_key_multi_matches_concatenation() {
        let joined = derive_key(contexts::ENTRY_ID, b"helloworld");
        let split = derive_key_multi(contexts::ENTRY_ID, &[b"hello", b"world"]);
        assert_eq!(joined, split);
    }

    #[test]
    fn test_is_registered_context() {
        assert!(is_registered_context("skyreg v1 data-key"));
        assert!(!is_registered_context("skyreg v1 made-up-context"));
    }
}
