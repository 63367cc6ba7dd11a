//! Registry steps shared by the JSON and raw-byte record protocols, and
//! verified downloads.
//!
//! The entry helpers expect the caller to hold the entry's [`RevisionGuard`].

use skyreg_crypto::ed25519::{SigningKey, VerifyingKey};
use skyreg_registry::{proof, DataKey, RegistryEntry, RegistryError, Skylink};
use tracing::{debug, info, warn};

use crate::cache::RevisionGuard;
use crate::portal::{DownloadedBlob, Portal, PortalError};
use crate::{Client, ClientError, Result};

impl<P: Portal> Client<P> {
    /// Fetch, verify and cache the current entry for `(owner, data_key)`.
    ///
    /// Returns `None` if the registry has no entry; the cache is untouched in
    /// that case. The cached revision is updated before the caller interprets
    /// the entry's data, so a deleted entry still advances the cache.
    pub(crate) async fn read_entry(
        &self,
        guard: &mut RevisionGuard,
        owner: &VerifyingKey,
        data_key: &DataKey,
    ) -> Result<Option<RegistryEntry>> {
        let found = self
            .timed(self.portal.get_registry_entry(owner, data_key))
            .await?;
        let Some(signed) = found else {
            debug!(owner = %owner, %data_key, "Registry entry not found");
            return Ok(None);
        };

        if signed.owner != *owner || signed.entry.data_key != *data_key {
            return Err(RegistryError::InvalidEntry(format!(
                "portal returned an entry for {} / {}",
                signed.owner, signed.entry.data_key
            ))
            .into());
        }
        signed.verify()?;

        let revision = signed.entry.revision;
        guard.observe(revision).inspect_err(|_| {
            warn!(
                %data_key,
                received = revision,
                cached = ?guard.revision(),
                "Portal returned a revision older than one already observed"
            );
        })?;
        debug!(%data_key, revision, "Read registry entry");
        Ok(Some(signed.entry))
    }

    /// Sign and publish `data` at `revision`, then advance the cache.
    ///
    /// The cache is left unchanged if the portal does not confirm.
    pub(crate) async fn publish(
        &self,
        guard: &mut RevisionGuard,
        signing_key: &SigningKey,
        data_key: &DataKey,
        data: Vec<u8>,
        revision: u64,
    ) -> Result<()> {
        let signed = RegistryEntry::new(*data_key, data, revision)?.sign(signing_key);

        match self.timed(self.portal.set_registry_entry(&signed)).await {
            Ok(()) => {
                guard.confirm(revision);
                info!(%data_key, revision, "Published registry entry");
                Ok(())
            }
            Err(PortalError::Rejected(reason)) => {
                warn!(%data_key, revision, %reason, "Registry rejected update");
                Err(ClientError::RegistryUpdate(reason))
            }
            Err(err) => {
                warn!(%data_key, revision, error = %err, "Registry publish failed");
                Err(err.into())
            }
        }
    }

    /// Download a skylink and authenticate what the portal returned.
    pub async fn download(&self, skylink: &Skylink) -> Result<DownloadedBlob> {
        let blob = self.timed(self.portal.download_blob(skylink)).await?;
        let resolved = proof::validate(skylink, &blob.proof, &blob.resolved)?;
        if Skylink::data_link(&blob.data).merkle_root() != resolved.merkle_root() {
            warn!(%skylink, %resolved, "Downloaded content does not match its skylink");
            return Err(ClientError::ContentMismatch(resolved));
        }
        Ok(blob)
    }
}
