//! In-memory registry entry store.
//!
//! Models the network side of the registry: entries are keyed by entry ID,
//! signatures are checked on insert, and an update is only accepted when its
//! revision is strictly greater than the stored one.

use std::collections::HashMap;

use skyreg_crypto::ed25519::VerifyingKey;
use tracing::debug;

use crate::data_key::DataKey;
use crate::entry::{entry_id, EntryId, SignedEntry};
use crate::{RegistryError, Result};

/// Registry entries indexed by entry ID.
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: HashMap<EntryId, SignedEntry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entry.
    ///
    /// Rejects entries with a bad signature and entries whose revision is not
    /// strictly greater than the stored one.
    pub fn put(&mut self, signed: SignedEntry) -> Result<()> {
        signed.verify()?;

        let id = signed.entry_id();
        if let Some(existing) = self.entries.get(&id) {
            if signed.entry.revision <= existing.entry.revision {
                return Err(RegistryError::RevisionNotIncreasing {
                    got: signed.entry.revision,
                    have: existing.entry.revision,
                });
            }
        }

        debug!(
            entry_id = %hex::encode(id),
            revision = signed.entry.revision,
            "Stored registry entry"
        );
        self.entries.insert(id, signed);
        Ok(())
    }

    /// Look up the entry for an owner and data key.
    pub fn get(&self, owner: &VerifyingKey, data_key: &DataKey) -> Option<&SignedEntry> {
        self.entries.get(&entry_id(owner, data_key))
    }

    /// Look up an entry by ID.
    pub fn get_by_id(&self, id: &EntryId) -> Option<&SignedEntry> {
        self.entries.get(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::RegistryEntry;
    use skyreg_crypto::ed25519::KeyPair;

    fn signed(kp: &KeyPair, key: &str, revision: u64, data: &[u8]) -> SignedEntry {
        RegistryEntry::new(DataKey::from_name(key), data.to_vec(), revision)
            .expect("create entry")
            .sign(&kp.signing_key)
    }

    #[test]
    fn test_put_get() {
        let mut store = EntryStore::new();
        let kp = KeyPair::generate();
        store.put(signed(&kp, "app", 0, b"v0")).expect("put");

        let got = store
            .get(&kp.verifying_key, &DataKey::from_name("app"))
            .expect("entry exists");
        assert_eq!(got.entry.data, b"v0");
        assert_eq!(store.len(), 1);
        assert!(store.get(&kp.verifying_key, &DataKey::from_name("other")).is_none());
    }

    #[test]
    fn test_revision_ordering() {
        let mut store = EntryStore::new();
        let kp = KeyPair::generate();

        store.put(signed(&kp, "app", 1, b"v1")).expect("put r1");
        store.put(signed(&kp, "app", 2, b"v2")).expect("put r2");

        let result = store.put(signed(&kp, "app", 1, b"stale"));
        assert!(matches!(
            result,
            Err(RegistryError::RevisionNotIncreasing { got: 1, have: 2 })
        ));

        let result = store.put(signed(&kp, "app", 2, b"equal"));
        assert!(matches!(
            result,
            Err(RegistryError::RevisionNotIncreasing { got: 2, have: 2 })
        ));

        store.put(signed(&kp, "app", 3, b"v3")).expect("put r3");
        let got = store
            .get(&kp.verifying_key, &DataKey::from_name("app"))
            .expect("entry exists");
        assert_eq!(got.entry.data, b"v3");
    }

    #[test]
    fn test_tampered_entry_rejected() {
        let mut store = EntryStore::new();
        let kp = KeyPair::generate();
        let mut entry = signed(&kp, "app", 0, b"data");
        entry.entry.data[0] ^= 0xFF;

        assert!(matches!(
            store.put(entry),
            Err(RegistryError::InvalidEntry(_))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn test_owners_are_independent() {
        let mut store = EntryStore::new();
        let kp1 = KeyPair::generate();
        let kp2 = KeyPair::generate();

        store.put(signed(&kp1, "app", 5, b"a")).expect("put");
        store.put(signed(&kp2, "app", 0, b"b")).expect("put");
        assert_eq!(store.len(), 2);

        let id = entry_id(&kp2.verifying_key, &DataKey::from_name("app"));
        assert_eq!(store.get_by_id(&id).expect("exists").entry.data, b"b");
    }
}
