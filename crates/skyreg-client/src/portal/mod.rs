//! Portal abstraction.
//!
//! A portal is the untrusted HTTP gateway to the blob store and the registry.
//! Implementors provide the network I/O; everything they return is verified
//! by the client before use.

use std::future::Future;
use std::sync::Arc;

use skyreg_crypto::ed25519::VerifyingKey;
use skyreg_registry::{DataKey, ProofHop, SignedEntry, Skylink};

pub mod memory;

pub use memory::MemoryPortal;

/// Errors reported by a portal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PortalError {
    /// The upload was not accepted.
    #[error("upload failed: {0}")]
    Upload(String),

    /// The requested skylink does not exist.
    #[error("skylink not found: {0}")]
    NotFound(Skylink),

    /// The download failed for a reason other than a missing skylink.
    #[error("download failed: {0}")]
    Download(String),

    /// Registry lookup failed at the transport level.
    #[error("registry lookup failed: {0}")]
    Lookup(String),

    /// The registry refused the entry, typically because its revision was
    /// already used.
    #[error("registry rejected entry: {0}")]
    Rejected(String),

    /// Transport failure while publishing.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Metadata sent alongside an upload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadMetadata {
    pub filename: String,
    pub content_type: String,
}

impl UploadMetadata {
    pub fn json(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            content_type: "application/json".to_string(),
        }
    }
}

/// A downloaded blob and the portal's claim about how it was resolved.
#[derive(Clone, Debug)]
pub struct DownloadedBlob {
    pub data: Vec<u8>,
    pub content_type: Option<String>,
    /// The data link the request resolved to.
    pub resolved: Skylink,
    /// Registry hops walked to reach `resolved`. Empty for data links.
    pub proof: Vec<ProofHop>,
}

/// Network operations against a portal.
pub trait Portal: Send + Sync {
    /// Upload an immutable blob and return its data link.
    fn upload_blob(
        &self,
        data: Vec<u8>,
        metadata: UploadMetadata,
    ) -> impl Future<Output = Result<Skylink, PortalError>> + Send;

    /// Download the blob behind a data link or entry link.
    fn download_blob(
        &self,
        skylink: &Skylink,
    ) -> impl Future<Output = Result<DownloadedBlob, PortalError>> + Send;

    /// Fetch the latest entry for `(owner, data_key)`. `Ok(None)` if the
    /// registry has no such entry.
    fn get_registry_entry(
        &self,
        owner: &VerifyingKey,
        data_key: &DataKey,
    ) -> impl Future<Output = Result<Option<SignedEntry>, PortalError>> + Send;

    /// Publish a signed entry.
    fn set_registry_entry(
        &self,
        entry: &SignedEntry,
    ) -> impl Future<Output = Result<(), PortalError>> + Send;
}

impl<P: Portal> Portal for Arc<P> {
    fn upload_blob(
        &self,
        data: Vec<u8>,
        metadata: UploadMetadata,
    ) -> impl Future<Output = Result<Skylink, PortalError>> + Send {
        (**self).upload_blob(data, metadata)
    }

    fn download_blob(
        &self,
        skylink: &Skylink,
    ) -> impl Future<Output = Result<DownloadedBlob, PortalError>> + Send {
        (**self).download_blob(skylink)
    }

    fn get_registry_entry(
        &self,
        owner: &VerifyingKey,
        data_key: &DataKey,
    ) -> impl Future<Output = Result<Option<SignedEntry>, PortalError>> + Send {
        (**self).get_registry_entry(owner, data_key)
    }

    fn set_registry_entry(
        &self,
        entry: &SignedEntry,
    ) -> impl Future<Output = Result<(), PortalError>> + Send {
        (**self).set_registry_entry(entry)
    }
}
