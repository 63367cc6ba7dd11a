//! Registry entries: signed, versioned pointer records.
//!
//! An entry maps `(owner, data_key)` to up to 70 bytes of data, usually a raw
//! skylink. Only the holder of the owner's Ed25519 signing key can produce a
//! valid entry, and the network only accepts an entry whose revision is
//! strictly greater than the one it already stores.
//!
//! The signed payload is
//! `data_key(32) || LE64(len(data)) || data || LE64(revision)`.

use skyreg_crypto::blake3::{self, contexts};
use skyreg_crypto::ed25519::{Signature, SigningKey, VerifyingKey};

use crate::data_key::DataKey;
use crate::skylink::Skylink;
use crate::{RegistryError, Result, MAX_ENTRY_DATA_LEN};

/// 32-byte registry entry ID.
pub type EntryId = [u8; 32];

/// Compute the registry entry ID for an owner and data key.
///
/// `entry_id = BLAKE3::derive_key("skyreg v1 entry-id", owner_pk || data_key)`
pub fn entry_id(owner: &VerifyingKey, data_key: &DataKey) -> EntryId {
    blake3::derive_key_multi(
        contexts::ENTRY_ID,
        &[owner.as_bytes().as_slice(), data_key.as_bytes().as_slice()],
    )
}

/// An unsigned registry entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegistryEntry {
    pub data_key: DataKey,
    pub data: Vec<u8>,
    pub revision: u64,
}

/// A registry entry together with its owner and detached signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedEntry {
    pub owner: VerifyingKey,
    pub entry: RegistryEntry,
    pub signature: Signature,
}

impl RegistryEntry {
    /// Create an entry, rejecting data over [`MAX_ENTRY_DATA_LEN`] bytes.
    pub fn new(data_key: DataKey, data: Vec<u8>, revision: u64) -> Result<Self> {
        if data.len() > MAX_ENTRY_DATA_LEN {
            return Err(RegistryError::DataTooLarge {
                size: data.len(),
                max: MAX_ENTRY_DATA_LEN,
            });
        }
        Ok(Self {
            data_key,
            data,
            revision,
        })
    }

    /// Create an entry whose data is a raw skylink.
    pub fn with_skylink(data_key: DataKey, skylink: &Skylink, revision: u64) -> Self {
        Self {
            data_key,
            data: skylink.to_bytes().to_vec(),
            revision,
        }
    }

    /// Byte-exact payload covered by the owner's signature.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut payload = Vec::with_capacity(32 + 8 + self.data.len() + 8);
        payload.extend_from_slice(self.data_key.as_bytes());
        payload.extend_from_slice(&(self.data.len() as u64).to_le_bytes());
        payload.extend_from_slice(&self.data);
        payload.extend_from_slice(&self.revision.to_le_bytes());
        payload
    }

    /// Sign this entry with the owner's key.
    pub fn sign(self, signing_key: &SigningKey) -> SignedEntry {
        let signature = signing_key.sign(&self.signing_payload());
        SignedEntry {
            owner: signing_key.verifying_key(),
            entry: self,
            signature,
        }
    }

    /// Verify a detached signature against `public_key`.
    pub fn verify(&self, signature: &Signature, public_key: &VerifyingKey) -> Result<()> {
        if self.data.len() > MAX_ENTRY_DATA_LEN {
            return Err(RegistryError::InvalidEntry(format!(
                "data is {} bytes, maximum is {MAX_ENTRY_DATA_LEN}",
                self.data.len()
            )));
        }
        public_key
            .verify(&self.signing_payload(), signature)
            .map_err(|_| RegistryError::InvalidEntry("signature mismatch".to_string()))
    }

    /// True if the entry's data is the deletion sentinel.
    pub fn is_deleted(&self) -> bool {
        self.data.as_slice() == Skylink::DELETED.to_bytes().as_slice()
    }
}

impl SignedEntry {
    /// Verify the signature against the embedded owner key.
    pub fn verify(&self) -> Result<()> {
        self.entry.verify(&self.signature, &self.owner)
    }

    pub fn entry_id(&self) -> EntryId {
        entry_id(&self.owner, &self.entry.data_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyreg_crypto::ed25519::KeyPair;

    #[test]
    fn test_sign_verify_roundtrip() {
        let kp = KeyPair::generate();
        let entry = RegistryEntry::new(DataKey::from_name("app"), b"hello".to_vec(), 0)
            .expect("create entry");
        let signed = entry.sign(&kp.signing_key);
        assert_eq!(signed.owner, kp.verifying_key);
        signed.verify().expect("valid signature");
    }

    #[test]
    fn test_data_too_large() {
        let result = RegistryEntry::new(
            DataKey::from_name("app"),
            vec![1u8; MAX_ENTRY_DATA_LEN + 1],
            0,
        );
        assert!(matches!(
            result,
            Err(RegistryError::DataTooLarge { size: 71, max: 70 })
        ));
        assert!(RegistryEntry::new(DataKey::from_name("app"), vec![1u8; 70], 0).is_ok());
    }

    #[test]
    fn test_tampered_fields_fail_verification() {
        let kp = KeyPair::generate();
        let signed = RegistryEntry::new(DataKey::from_name("app"), b"data".to_vec(), 5)
            .expect("create entry")
            .sign(&kp.signing_key);

        let mut tampered = signed.clone();
        tampered.entry.revision = 6;
        assert!(matches!(
            tampered.verify(),
            Err(RegistryError::InvalidEntry(_))
        ));

        let mut tampered = signed.clone();
        tampered.entry.data[0] ^= 0xFF;
        assert!(tampered.verify().is_err());

        let mut tampered = signed.clone();
        tampered.entry.data_key = DataKey::from_name("other");
        assert!(tampered.verify().is_err());

        let mut tampered = signed;
        tampered.owner = KeyPair::generate().verifying_key;
        assert!(tampered.verify().is_err());
    }

    #[test]
    fn test_oversized_data_is_invalid_entry() {
        let kp = KeyPair::generate();
        let mut signed = RegistryEntry::new(DataKey::from_name("app"), vec![], 0)
            .expect("create entry")
            .sign(&kp.signing_key);
        signed.entry.data = vec![0u8; 71];
        assert!(matches!(
            signed.verify(),
            Err(RegistryError::InvalidEntry(_))
        ));
    }

    #[test]
    fn test_signing_payload_layout() {
        let key = DataKey::from_name("app");
        let entry = RegistryEntry::new(key, vec![0xAA, 0xBB], 0x0102).expect("create entry");
        let payload = entry.signing_payload();
        assert_eq!(payload.len(), 32 + 8 + 2 + 8);
        assert_eq!(&payload[..32], key.as_bytes());
        assert_eq!(&payload[32..40], &2u64.to_le_bytes());
        assert_eq!(&payload[40..42], &[0xAA, 0xBB]);
        assert_eq!(&payload[42..], &0x0102u64.to_le_bytes());
    }

    #[test]
    fn test_entry_id_depends_on_owner_and_key() {
        let kp1 = KeyPair::from_bytes(&[1u8; 32]);
        let kp2 = KeyPair::from_bytes(&[2u8; 32]);
        let app = DataKey::from_name("app");
        let other = DataKey::from_name("other");
        assert_eq!(entry_id(&kp1.verifying_key, &app), entry_id(&kp1.verifying_key, &app));
        assert_ne!(entry_id(&kp1.verifying_key, &app), entry_id(&kp2.verifying_key, &app));
        assert_ne!(entry_id(&kp1.verifying_key, &app), entry_id(&kp1.verifying_key, &other));
    }

    #[test]
    fn test_is_deleted() {
        let key = DataKey::from_name("app");
        assert!(RegistryEntry::with_skylink(key, &Skylink::DELETED, 1).is_deleted());
        assert!(!RegistryEntry::with_skylink(key, &Skylink::data_link(b"x"), 1).is_deleted());
        assert!(!RegistryEntry::new(key, vec![], 1).expect("create").is_deleted());
    }
}
