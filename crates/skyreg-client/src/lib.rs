//! # skyreg-client
//!
//! Mutable JSON and byte records on top of an immutable blob store and a
//! signed, versioned registry.
//!
//! A [`Client`] owns a [`Portal`] and a [`RevisionCache`]. Every record
//! operation runs inside the per-entry lock of the cache:
//!
//! ```text
//! get:    lock -> fetch entry -> verify -> check revision -> cache -> download
//! set:    lock -> next = cached + 1 -> upload -> sign -> publish -> cache
//! delete: lock -> next = cached + 1 -> sign(sentinel) -> publish -> cache
//! ```
//!
//! The next revision is always derived from the cached value, never from a
//! fresh read inside the write, and the cache only advances after the portal
//! confirms the publish.

pub mod cache;
pub mod config;
pub mod entry_data;
pub mod json;
pub mod logging;
pub mod portal;
mod registry;

use std::future::Future;
use std::time::Duration;

use skyreg_crypto::ed25519::VerifyingKey;
use skyreg_registry::{DataKey, RegistryError, Skylink};
use url::Url;

pub use cache::{RevisionCache, RevisionGuard};
pub use config::ClientConfig;
pub use json::JsonResponse;
pub use portal::{MemoryPortal, Portal, PortalError};

/// Error types for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Raw entry data exceeds the inline capacity of a registry entry.
    #[error("entry data too large: {size} bytes exceeds maximum of {max} bytes")]
    DataTooLarge { size: usize, max: usize },

    /// The deletion sentinel was passed to a non-delete write.
    #[error("the deletion sentinel can only be written through a delete operation")]
    DeletionSentinelMisuse,

    /// The cached revision is already the maximum representable revision.
    #[error("revision overflow for data key {data_key}")]
    RevisionOverflow { data_key: DataKey },

    /// Another operation on this client holds the entry's lock.
    #[error("concurrent access to data key {data_key}")]
    ConcurrentAccess { data_key: DataKey },

    /// The portal returned a revision lower than one this client already saw.
    #[error("stale revision: portal returned {received}, already observed {cached}")]
    StaleRevision { cached: u64, received: u64 },

    /// The registry refused the update. Refresh with a read and retry.
    #[error("registry update rejected: {0}")]
    RegistryUpdate(String),

    /// A JSON record was not structured data.
    #[error("invalid JSON record: {0}")]
    InvalidJson(String),

    /// Downloaded content does not hash to the resolved skylink.
    #[error("content does not match skylink {0}")]
    ContentMismatch(Skylink),

    /// Invalid client configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Verification or encoding error.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Portal transport error.
    #[error(transparent)]
    Portal(#[from] PortalError),
}

/// Convenience result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// A registry client bound to one portal.
#[derive(Debug)]
pub struct Client<P> {
    portal: P,
    config: ClientConfig,
    /// Portal URL, resolved once when the client is built.
    portal_url: Url,
    request_timeout: Duration,
    cache: RevisionCache,
}

impl<P: Portal> Client<P> {
    /// Build a client, resolving the configured portal URL.
    pub fn new(portal: P, config: ClientConfig) -> Result<Self> {
        let portal_url = config.portal.resolve_url()?;
        let request_timeout = Duration::from_secs(config.portal.request_timeout_secs);
        tracing::info!(portal = %portal_url, "Registry client ready");
        Ok(Self {
            portal,
            config,
            portal_url,
            request_timeout,
            cache: RevisionCache::new(),
        })
    }

    pub fn portal(&self) -> &P {
        &self.portal
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn portal_url(&self) -> &Url {
        &self.portal_url
    }

    pub fn cache(&self) -> &RevisionCache {
        &self.cache
    }

    /// The v2 entry link for `(owner, data_key)`.
    pub fn entry_link(&self, owner: &VerifyingKey, data_key: &DataKey) -> Skylink {
        Skylink::entry_link(owner, data_key)
    }

    /// URL of a skylink on this client's portal.
    ///
    /// With `subdomain_links` enabled the base32 form becomes the first host
    /// label; otherwise the base64 form is the first path segment.
    pub fn skylink_url(&self, skylink: &Skylink) -> Result<Url> {
        let mut url = self.portal_url.clone();
        if self.config.portal.subdomain_links {
            let host = url
                .host_str()
                .ok_or_else(|| ClientError::Config(format!("{url} has no host")))?
                .to_string();
            url.set_host(Some(&format!("{}.{host}", skylink.to_base32())))
                .map_err(|e| ClientError::Config(e.to_string()))?;
            url.set_path("/");
        } else {
            url.set_path(&format!("/{}", skylink.to_base64()));
        }
        Ok(url)
    }

    /// Bound a portal call by the configured request timeout.
    ///
    /// A timed-out call is dropped, which cancels it.
    async fn timed<T>(
        &self,
        call: impl Future<Output = std::result::Result<T, PortalError>>,
    ) -> std::result::Result<T, PortalError> {
        match tokio::time::timeout(self.request_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(PortalError::Transport(format!(
                "portal call timed out after {:?}",
                self.request_timeout
            ))),
        }
    }
}
