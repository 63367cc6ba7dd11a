//! JSON records.
//!
//! A JSON record is a registry entry whose data is the skylink of an uploaded
//! blob. The blob holds the payload wrapped in a versioned envelope:
//!
//! ```json
//! {"_data": <payload>, "_v": 2}
//! ```
//!
//! Blobs without `_v` predate the envelope and are returned unwrapped.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use skyreg_crypto::ed25519::{SigningKey, VerifyingKey};
use skyreg_registry::{DataKey, Skylink};
use tracing::debug;

use crate::portal::{Portal, UploadMetadata};
use crate::{Client, ClientError, Result};

/// Current envelope format version.
pub const JSON_FORMAT_VERSION: u8 = 2;

/// Filename attached to uploaded JSON blobs.
const JSON_FILENAME: &str = "dk:data.json";

/// Result of reading or writing a JSON record.
///
/// - `data: None, data_link: None`: no value (never written, or deleted).
/// - `data: None, data_link: Some(_)`: unchanged since the caller's cached
///   data link; nothing was downloaded.
/// - `data: Some(_), data_link: Some(_)`: the payload and the data link it
///   was read from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsonResponse {
    pub data: Option<Value>,
    pub data_link: Option<Skylink>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    #[serde(rename = "_data")]
    payload: &'a Value,
    #[serde(rename = "_v")]
    format_version: u8,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "_data")]
    payload: Value,
    #[serde(rename = "_v")]
    format_version: u8,
}

/// Serialize a payload inside the current envelope.
pub fn encode_envelope(payload: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(&EnvelopeRef {
        payload,
        format_version: JSON_FORMAT_VERSION,
    })
    .map_err(|e| ClientError::InvalidJson(e.to_string()))
}

/// Parse a downloaded blob, unwrapping the envelope when present.
pub fn decode_envelope(bytes: &[u8]) -> Result<Value> {
    let value: Value =
        serde_json::from_slice(bytes).map_err(|e| ClientError::InvalidJson(e.to_string()))?;

    let is_envelope = value.as_object().is_some_and(|map| map.contains_key("_v"));
    let payload = if is_envelope {
        let envelope: Envelope =
            serde_json::from_value(value).map_err(|e| ClientError::InvalidJson(e.to_string()))?;
        if envelope.format_version > JSON_FORMAT_VERSION {
            return Err(ClientError::InvalidJson(format!(
                "unsupported envelope version {}",
                envelope.format_version
            )));
        }
        envelope.payload
    } else {
        value
    };
    ensure_structured(&payload)?;
    Ok(payload)
}

/// Records must be JSON objects or arrays.
fn ensure_structured(value: &Value) -> Result<()> {
    match value {
        Value::Object(_) | Value::Array(_) => Ok(()),
        other => Err(ClientError::InvalidJson(format!(
            "expected an object or array, got {other}"
        ))),
    }
}

impl<P: Portal> Client<P> {
    /// Read the JSON record for `(owner, data_key)`.
    ///
    /// If `cached_data_link` equals the record's current data link the
    /// download is skipped and only the link is returned.
    pub async fn get_json(
        &self,
        owner: &VerifyingKey,
        data_key: &DataKey,
        cached_data_link: Option<&Skylink>,
    ) -> Result<JsonResponse> {
        self.cache
            .with_lock(owner, data_key, |mut guard| async move {
                let Some(entry) = self.read_entry(&mut guard, owner, data_key).await? else {
                    return Ok(JsonResponse::default());
                };
                if entry.is_deleted() {
                    debug!(%data_key, revision = entry.revision, "JSON record is deleted");
                    return Ok(JsonResponse::default());
                }

                let data_link = Skylink::decode(&entry.data)?;
                if cached_data_link == Some(&data_link) {
                    debug!(%data_key, %data_link, "JSON record unchanged, skipping download");
                    return Ok(JsonResponse {
                        data: None,
                        data_link: Some(data_link),
                    });
                }

                let blob = self.download(&data_link).await?;
                let data = decode_envelope(&blob.data)?;
                Ok(JsonResponse {
                    data: Some(data),
                    data_link: Some(data_link),
                })
            })
            .await
    }

    /// Write `json` as the record for `(signing_key, data_key)`.
    pub async fn set_json(
        &self,
        signing_key: &SigningKey,
        data_key: &DataKey,
        json: &Value,
    ) -> Result<JsonResponse> {
        ensure_structured(json)?;
        let body = encode_envelope(json)?;
        let owner = signing_key.verifying_key();

        self.cache
            .with_lock(&owner, data_key, |mut guard| async move {
                let revision = guard.next_revision()?;
                let data_link = self
                    .timed(
                        self.portal
                            .upload_blob(body, UploadMetadata::json(JSON_FILENAME)),
                    )
                    .await?;
                self.publish(
                    &mut guard,
                    signing_key,
                    data_key,
                    data_link.to_bytes().to_vec(),
                    revision,
                )
                .await?;
                Ok(JsonResponse {
                    data: Some(json.clone()),
                    data_link: Some(data_link),
                })
            })
            .await
    }

    /// Delete the JSON record by publishing the deletion sentinel.
    pub async fn delete_json(&self, signing_key: &SigningKey, data_key: &DataKey) -> Result<()> {
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
                .await
            })
            .await
    }

    /// Point the record at an existing skylink without uploading anything.
    pub async fn set_data_link(
        &self,
        signing_key: &SigningKey,
        data_key: &DataKey,
        data_link: &Skylink,
    ) -> Result<()> {
        if data_link.is_deletion_sentinel() {
            return Err(ClientError::DeletionSentinelMisuse);
        }
        let owner = signing_key.verifying_key();
        self.cache
            .with_lock(&owner, data_key, |mut guard| async move {
                let revision = guard.next_revision()?;
                self.publish(
                    &mut guard,
                    signing_key,
                    data_key,
                    data_link.to_bytes().to_vec(),
                    revision,
                )
                .await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use skyreg_crypto::ed25519::KeyPair;
    use skyreg_registry::RegistryEntry;

    use crate::portal::{MemoryPortal, PortalError};
    use crate::ClientConfig;

    fn client() -> Client<MemoryPortal> {
        Client::new(MemoryPortal::new(), ClientConfig::default()).expect("client")
    }

    #[test]
    fn test_envelope_roundtrip() {
        let payload = json!({"message": 1});
        let bytes = encode_envelope(&payload).expect("encode");
        let raw: Value = serde_json::from_slice(&bytes).expect("valid json");
        assert_eq!(raw, json!({"_data": {"message": 1}, "_v": 2}));
        assert_eq!(decode_envelope(&bytes).expect("decode"), payload);
    }

    #[test]
    fn test_legacy_payload_unwrapped() {
        let legacy = br#"{"message": "old"}"#;
        assert_eq!(
            decode_envelope(legacy).expect("decode"),
            json!({"message": "old"})
        );
    }

    #[test]
    fn test_decode_rejects_unstructured() {
        let cases: [&[u8]; 5] = [
            b"not json",
            b"42",
            b"\"text\"",
            b"null",
            br#"{"_data": 1, "_v": 2}"#,
        ];
        for bad in cases {
            assert!(
                matches!(decode_envelope(bad), Err(ClientError::InvalidJson(_))),
                "{}",
                String::from_utf8_lossy(bad)
            );
        }
        assert!(decode_envelope(br#"{"_data": {}, "_v": 9}"#).is_err());
    }

    #[tokio::test]
    async fn test_get_missing_leaves_cache_untouched() {
        let client = client();
        let kp = KeyPair::generate();
        let key = DataKey::from_name("app");

        let response = client
            .get_json(&kp.verifying_key, &key, None)
            .await
            .expect("get");
        assert_eq!(response, JsonResponse::default());
        assert_eq!(client.cache().cached_revision(&kp.verifying_key, &key), None);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let client = client();
        let kp = KeyPair::generate();
        let key = DataKey::from_name("app");

        let written = client
            .set_json(&kp.signing_key, &key, &json!({"message": 1}))
            .await
            .expect("set");
        assert_eq!(client.cache().cached_revision(&kp.verifying_key, &key), Some(0));

        let read = client
            .get_json(&kp.verifying_key, &key, None)
            .await
            .expect("get");
        assert_eq!(read.data, Some(json!({"message": 1})));
        assert_eq!(read.data_link, written.data_link);
    }

    #[tokio::test]
    async fn test_cached_data_link_skips_download() {
        let client = client();
        let kp = KeyPair::generate();
        let key = DataKey::from_name("app");

        let written = client
            .set_json(&kp.signing_key, &key, &json!({"a": true}))
            .await
            .expect("set");
        let downloads_before = client.portal().calls().downloads;

        let read = client
            .get_json(&kp.verifying_key, &key, written.data_link.as_ref())
            .await
            .expect("get");
        assert_eq!(read.data, None);
        assert_eq!(read.data_link, written.data_link);
        assert_eq!(client.portal().calls().downloads, downloads_before);
    }

    #[tokio::test]
    async fn test_set_rejects_scalar_before_network() {
        let client = client();
        let kp = KeyPair::generate();
        let result = client
            .set_json(&kp.signing_key, &DataKey::from_name("app"), &json!(5))
            .await;
        assert!(matches!(result, Err(ClientError::InvalidJson(_))));
        assert_eq!(client.portal().calls().total(), 0);
    }

    #[tokio::test]
    async fn test_failed_publish_leaves_cache() {
        let client = client();
        let kp = KeyPair::generate();
        let key = DataKey::from_name("app");

        client
            .set_json(&kp.signing_key, &key, &json!({"v": 0}))
            .await
            .expect("set");

        client
            .portal()
            .fail_next_publish(PortalError::Transport("connection reset".to_string()));
        let result = client.set_json(&kp.signing_key, &key, &json!({"v": 1})).await;
        assert!(matches!(result, Err(ClientError::Portal(PortalError::Transport(_)))));
        assert_eq!(client.cache().cached_revision(&kp.verifying_key, &key), Some(0));

        client
            .set_json(&kp.signing_key, &key, &json!({"v": 1}))
            .await
            .expect("retry");
        assert_eq!(client.cache().cached_revision(&kp.verifying_key, &key), Some(1));
    }

    #[tokio::test]
    async fn test_failed_upload_skips_publish() {
        let client = client();
        let kp = KeyPair::generate();
        let key = DataKey::from_name("app");

        client
            .portal()
            .fail_next_upload(PortalError::Upload("503".to_string()));
        let result = client.set_json(&kp.signing_key, &key, &json!({})).await;
        assert!(matches!(result, Err(ClientError::Portal(PortalError::Upload(_)))));
        assert_eq!(client.portal().calls().publishes, 0);
        assert_eq!(client.cache().cached_revision(&kp.verifying_key, &key), None);
    }

    #[tokio::test]
    async fn test_delete_then_get() {
        let client = client();
        let kp = KeyPair::generate();
        let key = DataKey::from_name("app");

        client
            .set_json(&kp.signing_key, &key, &json!({"x": 1}))
            .await
            .expect("set");
        client.delete_json(&kp.signing_key, &key).await.expect("delete");

        let read = client
            .get_json(&kp.verifying_key, &key, None)
            .await
            .expect("get");
        assert_eq!(read, JsonResponse::default());
        assert_eq!(client.cache().cached_revision(&kp.verifying_key, &key), Some(1));
    }

    #[tokio::test]
    async fn test_set_data_link() {
        let client = client();
        let kp = KeyPair::generate();
        let source = DataKey::from_name("source");
        let alias = DataKey::from_name("alias");

        let written = client
            .set_json(&kp.signing_key, &source, &json!({"shared": true}))
            .await
            .expect("set");
        let link = written.data_link.expect("data link");
        client
            .set_data_link(&kp.signing_key, &alias, &link)
            .await
            .expect("set data link");

        let read = client
            .get_json(&kp.verifying_key, &alias, None)
            .await
            .expect("get alias");
        assert_eq!(read.data, Some(json!({"shared": true})));

        assert!(matches!(
            client
                .set_data_link(&kp.signing_key, &alias, &Skylink::DELETED)
                .await,
            Err(ClientError::DeletionSentinelMisuse)
        ));
    }

    #[tokio::test]
    async fn test_entry_pointing_at_non_skylink() {
        let client = client();
        let kp = KeyPair::generate();
        let key = DataKey::from_name("raw");
        let entry = RegistryEntry::new(key, b"short".to_vec(), 0)
            .expect("entry")
            .sign(&kp.signing_key);
        client.portal().forge_entry(entry);

        let result = client.get_json(&kp.verifying_key, &key, None).await;
        assert!(matches!(result, Err(ClientError::Registry(_))));
    }
}
