//! Integration test crate for skyreg.
//!
//! Holds fixtures shared by the end-to-end scenarios in `tests/`, which drive
//! one or more [`Client`]s against a shared in-process portal.
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p skyreg-integration-tests
//! ```

use std::sync::{Arc, Once};
use std::time::Duration;

use skyreg_client::config::PortalConfig;
use skyreg_client::{Client, ClientConfig, MemoryPortal};
use skyreg_crypto::ed25519::KeyPair;

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A portal that several clients can share.
pub fn shared_portal() -> Arc<MemoryPortal> {
    Arc::new(MemoryPortal::new())
}

/// A client with default settings on `portal`.
pub fn client_on(portal: &Arc<MemoryPortal>) -> Client<Arc<MemoryPortal>> {
    init_tracing();
    Client::new(Arc::clone(portal), ClientConfig::default()).expect("default config is valid")
}

/// A client whose portal calls time out after `timeout`.
pub fn client_with_timeout(
    portal: &Arc<MemoryPortal>,
    timeout: Duration,
) -> Client<Arc<MemoryPortal>> {
    init_tracing();
    let config = ClientConfig {
        portal: PortalConfig {
            request_timeout_secs: timeout.as_secs(),
            ..Default::default()
        },
        ..Default::default()
    };
    Client::new(Arc::clone(portal), config).expect("valid config")
}

/// Deterministic key pair for a named test user.
pub fn user(name: &str) -> KeyPair {
    let digest = skyreg_crypto::blake3::hash(name.as_bytes());
    KeyPair::from_bytes(&digest)
}
