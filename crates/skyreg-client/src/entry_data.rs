//! Raw entry-data records.
//!
//! The record's bytes live inline in the registry entry, so they are bounded
//! by [`MAX_ENTRY_DATA_LEN`] and never touch the blob store.

use skyreg_crypto::ed25519::{SigningKey, VerifyingKey};
use skyreg_registry::{DataKey, Skylink, MAX_ENTRY_DATA_LEN};
use tracing::debug;

use crate::portal::Portal;
use crate::{Client, ClientError, Result};

/// Checks applied before any lock is taken or any request is sent.
fn validate_entry_data(data: &[u8]) -> Result<()> {
    if data.len() > MAX_ENTRY_DATA_LEN {
        return Err(ClientError::DataTooLarge {
            size: data.len(),
            max: MAX_ENTRY_DATA_LEN,
        });
    }
    if data == Skylink::DELETED.to_bytes().as_slice() {
        return Err(ClientError::DeletionSentinelMisuse);
    }
    Ok(())
}

impl<P: Portal> Client<P> {
    /// Read the raw data stored in `(owner, data_key)`.
    ///
    /// Returns `None` when the entry does not exist or was deleted.
    pub async fn get_entry_data(
        &self,
        owner: &VerifyingKey,
        data_key: &DataKey,
    ) -> Result<Option<Vec<u8>>> {
        self.cache
            .with_lock(owner, data_key, |mut guard| async move {
                let entry = self.read_entry(&mut guard, owner, data_key).await?;
                Ok(entry.filter(|e| !e.is_deleted()).map(|e| e.data))
            })
            .await
    }

    /// Store `data` inline in the entry. Returns the published revision.
    pub async fn set_entry_data(
        &self,
        signing_key: &SigningKey,
        data_key: &DataKey,
        data: &[u8],
    ) -> Result<u64> {
        validate_entry_data(data)?;
        let owner = signing_key.verifying_key();

        self.cache
            .with_lock(&owner, data_key, |mut guard| async move {
                let revision = guard.next_revision()?;
                debug!(%data_key, revision, size = data.len(), "Writing entry data");
                self.publish(&mut guard, signing_key, data_key, data.to_vec(), revision)
                    .await?;
                Ok(revision)
            })
            .await
    }

    /// Delete the entry data by publishing the deletion sentinel.
    pub async fn delete_entry_data(
        &self,
        signing_key: &SigningKey,
        data_key: &DataKey,
    ) -> Result<u64> {
        let owner = signing_key.verifying_key();
        self.cache
            .with_lock(&owner, data_key, |mut guard| async move {
                let revision = guard.next_revision()?;
                self.publish(
                    &mut guard,
                    signing_key,
                    data_key,
                    Skylink::DELETED.to_bytes().to_vec(),
                    revision,
                )
                .await?;
                Ok(revision)
            })
            .await
    }
}
