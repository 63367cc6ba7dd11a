//! Proof chains for entry-link resolution.
//!
//! A portal resolving a v2 entry link returns the final data link together
//! with the registry entries it walked through. The portal is untrusted, so
//! every hop is checked before the resolved link is accepted:
//!
//! 1. The hop's type must be a plain registry entry.
//! 2. The hop's entry ID must equal the merkle root of the link being resolved.
//! 3. The hop's signature must verify against its owner key.
//! 4. The hop's data, decoded as a skylink, becomes the next link.
//!
//! The walk must end exactly at the data link the portal claims.

use serde::{Deserialize, Serialize};
use skyreg_crypto::ed25519::{Signature, VerifyingKey};
use tracing::{debug, warn};

use crate::data_key::DataKey;
use crate::entry::{RegistryEntry, SignedEntry};
use crate::skylink::Skylink;
use crate::{RegistryError, Result, ENTRY_TYPE_DEFAULT};

/// One hop of a proof chain as supplied by a portal.
///
/// Byte fields are kept raw because they come from an untrusted source;
/// malformed lengths are reported during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofHop {
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    pub revision: u64,
    #[serde(rename = "datakey", with = "hex_bytes")]
    pub data_key: Vec<u8>,
    #[serde(rename = "publickey", with = "hex_bytes")]
    pub public_key: Vec<u8>,
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
    #[serde(rename = "type")]
    pub kind: u8,
}

impl ProofHop {
    /// Build a hop from a stored entry.
    pub fn from_entry(signed: &SignedEntry) -> Self {
        Self {
            data: signed.entry.data.clone(),
            revision: signed.entry.revision,
            data_key: signed.entry.data_key.as_bytes().to_vec(),
            public_key: signed.owner.as_bytes().to_vec(),
            signature: signed.signature.to_bytes().to_vec(),
            kind: ENTRY_TYPE_DEFAULT,
        }
    }

    /// Reassemble the signed entry this hop claims to be.
    pub fn to_signed_entry(&self) -> Result<SignedEntry> {
        Ok(SignedEntry {
            owner: VerifyingKey::from_slice(&self.public_key)?,
            entry: RegistryEntry::new(
                DataKey::from_slice(&self.data_key)?,
                self.data.clone(),
                self.revision,
            )?,
            signature: Signature::from_slice(&self.signature)?,
        })
    }
}

/// Parse a portal's JSON proof array.
pub fn parse_proof(json: &str) -> Result<Vec<ProofHop>> {
    serde_json::from_str(json).map_err(|e| RegistryError::Serialization(e.to_string()))
}

/// Validate that `proof` resolves `requested` to `resolved`.
///
/// Returns the authenticated data link on success.
pub fn validate(requested: &Skylink, proof: &[ProofHop], resolved: &Skylink) -> Result<Skylink> {
    if !requested.is_entry_link() {
        if !proof.is_empty() {
            return Err(RegistryError::UnexpectedProof);
        }
        if requested != resolved {
            return Err(RegistryError::ProofChainMismatch(format!(
                "requested data link {requested} but portal returned {resolved}"
            )));
        }
        return Ok(*resolved);
    }

    if proof.is_empty() {
        return Err(RegistryError::MissingProof);
    }

    let mut current = *requested;
    for (hop, step) in proof.iter().enumerate() {
        if step.kind != ENTRY_TYPE_DEFAULT {
            return Err(RegistryError::UnsupportedProofType {
                hop,
                kind: step.kind,
            });
        }
        if !current.is_entry_link() {
            return Err(RegistryError::ProofChainMismatch(format!(
                "hop {hop} follows data link {current}"
            )));
        }

        let signed = step.to_signed_entry().map_err(|e| {
            warn!(hop, error = %e, "Malformed proof hop");
            RegistryError::InvalidProof { hop }
        })?;
        if signed.entry_id() != *current.merkle_root() {
            return Err(RegistryError::ProofChainMismatch(format!(
                "hop {hop} does not match entry link {current}"
            )));
        }
        signed.verify().map_err(|_| {
            warn!(hop, "Proof hop signature verification failed");
            RegistryError::InvalidProof { hop }
        })?;

        current = Skylink::decode(&signed.entry.data).map_err(|e| {
            RegistryError::ProofChainMismatch(format!("hop {hop} data is not a skylink: {e}"))
        })?;
    }

    if current != *resolved {
        return Err(RegistryError::ProofChainMismatch(format!(
            "chain ends at {current} but portal returned {resolved}"
        )));
    }
    if resolved.is_entry_link() {
        return Err(RegistryError::ProofChainMismatch(format!(
            "chain ends at entry link {resolved}"
        )));
    }

    debug!(hops = proof.len(), %requested, %resolved, "Validated proof chain");
    Ok(current)
}

/// Serde support for byte vectors as hex strings.
mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}
