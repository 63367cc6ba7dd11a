//! In-process portal.
//!
//! Stores blobs in a map keyed by merkle root and registry entries in an
//! [`EntryStore`], so revision ordering and signature checks behave like the
//! real network. Entry links are resolved hop by hop and the walked entries
//! are returned as the proof.
//!
//! Test hooks allow injecting latency, one-shot failures and a forged
//! registry state.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use skyreg_crypto::ed25519::VerifyingKey;
use skyreg_registry::store::EntryStore;
use skyreg_registry::{DataKey, ProofHop, SignedEntry, Skylink};
use tracing::debug;

use super::{DownloadedBlob, Portal, PortalError, UploadMetadata};

/// Upper bound on registry hops followed while resolving an entry link.
pub const MAX_RESOLVE_HOPS: usize = 32;

/// Number of calls the portal has served, per operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PortalCalls {
    pub uploads: usize,
    pub downloads: usize,
    pub lookups: usize,
    pub publishes: usize,
}

impl PortalCalls {
    pub fn total(&self) -> usize {
        self.uploads + self.downloads + self.lookups + self.publishes
    }
}

#[derive(Debug)]
struct StoredBlob {
    data: Vec<u8>,
    content_type: String,
}

#[derive(Debug, Default)]
struct PortalState {
    registry: EntryStore,
    /// Entries served instead of the stored ones, keyed by owner and data key.
    forged: HashMap<(VerifyingKey, DataKey), SignedEntry>,
    blobs: HashMap<[u8; 32], StoredBlob>,
    calls: PortalCalls,
    fail_next_upload: Option<PortalError>,
    fail_next_publish: Option<PortalError>,
}

/// A portal backed entirely by process memory.
#[derive(Debug, Default)]
pub struct MemoryPortal {
    state: Mutex<PortalState>,
    latency: Mutex<Option<Duration>>,
}

impl MemoryPortal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every call by `latency` before it touches portal state.
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(PoisonError::into_inner) = latency;
    }

    /// Fail the next upload with `error`.
    pub fn fail_next_upload(&self, error: PortalError) {
        self.state().fail_next_upload = Some(error);
    }

    /// Fail the next registry publish with `error`.
    pub fn fail_next_publish(&self, error: PortalError) {
        self.state().fail_next_publish = Some(error);
    }

    /// Serve `entry` for its key regardless of what the registry stores.
    pub fn forge_entry(&self, entry: SignedEntry) {
        let key = (entry.owner.clone(), entry.entry.data_key);
        self.state().forged.insert(key, entry);
    }

    /// Replace the content of a stored blob without changing its skylink.
    pub fn corrupt_blob(&self, skylink: &Skylink, data: Vec<u8>) {
        if let Some(blob) = self.state().blobs.get_mut(skylink.merkle_root()) {
            blob.data = data;
        }
    }

    /// The entry the registry currently stores.
    pub fn stored_entry(&self, owner: &VerifyingKey, data_key: &DataKey) -> Option<SignedEntry> {
        self.state().registry.get(owner, data_key).cloned()
    }

    pub fn calls(&self) -> PortalCalls {
        self.state().calls
    }

    fn state(&self) -> MutexGuard<'_, PortalState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn simulate_latency(&self) {
        let latency = *self.latency.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl PortalState {
    /// Walk registry hops from `skylink` until a data link is reached.
    fn resolve(&self, skylink: &Skylink) -> Result<(Skylink, Vec<ProofHop>), PortalError> {
        let mut current = *skylink;
        let mut proof = Vec::new();

        while current.is_entry_link() {
            if proof.len() == MAX_RESOLVE_HOPS {
                return Err(PortalError::Download(format!(
                    "{skylink} exceeds {MAX_RESOLVE_HOPS} registry hops"
                )));
            }
            let entry = self
                .registry
                .get_by_id(current.merkle_root())
                .ok_or(PortalError::NotFound(current))?;
            proof.push(ProofHop::from_entry(entry));
            current = Skylink::decode(&entry.entry.data)
                .map_err(|e| PortalError::Download(e.to_string()))?;
        }

        if current.is_deletion_sentinel() {
            return Err(PortalError::NotFound(*skylink));
        }
        Ok((current, proof))
    }
}

impl Portal for MemoryPortal {
    async fn upload_blob(
        &self,
        data: Vec<u8>,
        metadata: UploadMetadata,
    ) -> Result<Skylink, PortalError> {
        self.simulate_latency().await;
        let mut state = self.state();
        state.calls.uploads += 1;
        if let Some(err) = state.fail_next_upload.take() {
            return Err(err);
        }

        let skylink = Skylink::data_link(&data);
        debug!(%skylink, size = data.len(), filename = %metadata.filename, "Stored blob");
        state.blobs.insert(
            *skylink.merkle_root(),
            StoredBlob {
                data,
                content_type: metadata.content_type,
            },
        );
        Ok(skylink)
    }

    async fn download_blob(&self, skylink: &Skylink) -> Result<DownloadedBlob, PortalError> {
        self.simulate_latency().await;
        let mut state = self.state();
        state.calls.downloads += 1;

        let (resolved, proof) = state.resolve(skylink)?;
        let blob = state
            .blobs
            .get(resolved.merkle_root())
            .ok_or(PortalError::NotFound(resolved))?;
        Ok(DownloadedBlob {
            data: blob.data.clone(),
            content_type: Some(blob.content_type.clone()),
            resolved,
            proof,
        })
    }

    async fn get_registry_entry(
        &self,
        owner: &VerifyingKey,
        data_key: &DataKey,
    ) -> Result<Option<SignedEntry>, PortalError> {
        self.simulate_latency().await;
        let mut state = self.state();
        state.calls.lookups += 1;

        if let Some(forged) = state.forged.get(&(owner.clone(), *data_key)) {
            return Ok(Some(forged.clone()));
        }
        Ok(state.registry.get(owner, data_key).cloned())
    }

    async fn set_registry_entry(&self, entry: &SignedEntry) -> Result<(), PortalError> {
        self.simulate_latency().await;
        let mut state = self.state();
        state.calls.publishes += 1;
        if let Some(err) = state.fail_next_publish.take() {
            return Err(err);
        }

        state
            .registry
            .put(entry.clone())
            .map_err(|e| PortalError::Rejected(e.to_string()))
    }
}
