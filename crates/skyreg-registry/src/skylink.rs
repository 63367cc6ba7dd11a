//! Skylinks: 34-byte content addresses.
//!
//! Layout: a little-endian `u16` bitfield followed by a 32-byte merkle root.
//! The two low bits of the bitfield encode `version - 1`:
//!
//! - **Version 1 (data link)**: the merkle root identifies an uploaded blob.
//! - **Version 2 (entry link)**: the bitfield is exactly `1` and the merkle
//!   root is the ID of a registry entry, which a portal resolves hop by hop.
//!
//! The all-zero skylink is the deletion sentinel. It decodes like any other
//! v1 link but must never be downloaded.

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use data_encoding::BASE32HEX_NOPAD;
use skyreg_crypto::blake3::{self, contexts};
use skyreg_crypto::ed25519::VerifyingKey;

use crate::data_key::DataKey;
use crate::{
    RegistryError, Result, BASE32_ENCODED_SKYLINK_LEN, BASE64_ENCODED_SKYLINK_LEN,
    MERKLE_ROOT_LEN, SKYLINK_LEN,
};

/// URI scheme accepted in front of a skylink.
const SCHEME: &str = "sia:";

/// A decoded skylink.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Skylink {
    bitfield: u16,
    merkle_root: [u8; MERKLE_ROOT_LEN],
}

impl Skylink {
    /// The deletion sentinel: 34 zero bytes.
    pub const DELETED: Skylink = Skylink {
        bitfield: 0,
        merkle_root: [0u8; MERKLE_ROOT_LEN],
    };

    const ENTRY_LINK_BITFIELD: u16 = 1;

    /// Decode raw skylink bytes.
    pub fn decode(raw: &[u8]) -> Result<Self> {
        if raw.len() != SKYLINK_LEN {
            return Err(RegistryError::InvalidLength { actual: raw.len() });
        }

        let bitfield = u16::from_le_bytes([raw[0], raw[1]]);
        match bitfield & 0b11 {
            0 => {}
            1 if bitfield == Self::ENTRY_LINK_BITFIELD => {}
            _ => return Err(RegistryError::InvalidVersion { bitfield }),
        }

        let mut merkle_root = [0u8; MERKLE_ROOT_LEN];
        merkle_root.copy_from_slice(&raw[2..]);
        Ok(Self {
            bitfield,
            merkle_root,
        })
    }

    /// Build a v1 data link for blob content.
    pub fn data_link(content: &[u8]) -> Self {
        Self {
            bitfield: 0,
            merkle_root: blake3::derive_key(contexts::BLOB_ROOT, content),
        }
    }

    /// Build the v2 entry link that resolves through the entry owned by
    /// `owner` under `data_key`.
    pub fn entry_link(owner: &VerifyingKey, data_key: &DataKey) -> Self {
        Self {
            bitfield: Self::ENTRY_LINK_BITFIELD,
            merkle_root: crate::entry::entry_id(owner, data_key),
        }
    }

    /// Parse a skylink out of text.
    ///
    /// Accepts the bare base64 or base32 form, `sia:` and `sia://` prefixes,
    /// an http(s) URL whose path starts with the skylink, or an http(s) URL
    /// whose first host label is the base32 form. Anything after the skylink
    /// (trailing path, query, fragment) is ignored.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let rest = trimmed
            .strip_prefix(SCHEME)
            .map(|r| r.strip_prefix("//").unwrap_or(r))
            .unwrap_or(trimmed);

        if rest.starts_with("http://") || rest.starts_with("https://") {
            return Self::parse_url(rest);
        }

        let segment = rest
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        Self::decode_text(segment)
    }

    fn parse_url(input: &str) -> Result<Self> {
        let url =
            url::Url::parse(input).map_err(|e| RegistryError::NotASkylink(e.to_string()))?;

        let from_path = url
            .path_segments()
            .and_then(|mut segments| segments.next())
            .filter(|segment| !segment.is_empty())
            .and_then(|segment| Self::decode_text(segment).ok());
        if let Some(skylink) = from_path {
            return Ok(skylink);
        }

        url.host_str()
            .and_then(|host| host.split('.').next())
            .filter(|label| label.len() == BASE32_ENCODED_SKYLINK_LEN)
            .ok_or_else(|| RegistryError::NotASkylink(input.to_string()))
            .and_then(Self::decode_text)
    }

    /// Decode a bare base64 or base32 skylink, selected by length.
    fn decode_text(text: &str) -> Result<Self> {
        let raw = match text.len() {
            BASE64_ENCODED_SKYLINK_LEN => URL_SAFE_NO_PAD
                .decode(text)
                .map_err(|e| RegistryError::NotASkylink(e.to_string()))?,
            BASE32_ENCODED_SKYLINK_LEN => BASE32HEX_NOPAD
                .decode(text.to_ascii_uppercase().as_bytes())
                .map_err(|e| RegistryError::NotASkylink(e.to_string()))?,
            _ => return Err(RegistryError::NotASkylink(text.to_string())),
        };
        Self::decode(&raw)
    }

    /// Raw 34-byte encoding.
    pub fn to_bytes(&self) -> [u8; SKYLINK_LEN] {
        let mut raw = [0u8; SKYLINK_LEN];
        raw[..2].copy_from_slice(&self.bitfield.to_le_bytes());
        raw[2..].copy_from_slice(&self.merkle_root);
        raw
    }

    /// Canonical URL-safe unpadded base64 form.
    pub fn to_base64(&self) -> String {
        URL_SAFE_NO_PAD.encode(self.to_bytes())
    }

    /// Lowercase unpadded base32hex form, usable as a DNS label.
    pub fn to_base32(&self) -> String {
        BASE32HEX_NOPAD
            .encode(&self.to_bytes())
            .to_ascii_lowercase()
    }

    pub fn bitfield(&self) -> u16 {
        self.bitfield
    }

    pub fn merkle_root(&self) -> &[u8; MERKLE_ROOT_LEN] {
        &self.merkle_root
    }

    /// Skylink version (1 or 2).
    pub fn version(&self) -> u8 {
        (self.bitfield & 0b11) as u8 + 1
    }

    /// True for v2 links that resolve through the registry.
    pub fn is_entry_link(&self) -> bool {
        self.version() == 2
    }

    /// True iff all 34 bytes are zero.
    pub fn is_deletion_sentinel(&self) -> bool {
        *self == Self::DELETED
    }
}

impl fmt::Display for Skylink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base64())
    }
}

impl fmt::Debug for Skylink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Skylink({})", self.to_base64())
    }
}

impl FromStr for Skylink {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&[u8]> for Skylink {
    type Error = RegistryError;

    fn try_from(raw: &[u8]) -> Result<Self> {
        Self::decode(raw)
    }
}
