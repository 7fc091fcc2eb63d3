//! Snapshot codec.
//!
//! Layout: `b"LFND"` magic, one version byte, then the postcard-encoded
//! [`Snapshot`].

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{LostFoundError, Result};
use crate::model::{Claim, Item, ItemMatch, User};

/// File magic.
pub const SNAPSHOT_MAGIC: &[u8; 4] = b"LFND";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u8 = 1;

const HEADER_LEN: usize = SNAPSHOT_MAGIC.len() + 1;

/// Next identifier to hand out, per record kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub user: u64,
    pub item: u64,
    pub claim: u64,
    pub item_match: u64,
}

impl Default for Counters {
    fn default() -> Self {
        Self {
            user: 1,
            item: 1,
            claim: 1,
            item_match: 1,
        }
    }
}

/// Full catalog contents, each table in id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub counters: Counters,
    pub users: Vec<User>,
    pub items: Vec<Item>,
    pub claims: Vec<Claim>,
    pub matches: Vec<ItemMatch>,
}

/// Encode a snapshot with its header.
pub fn encode_snapshot(snapshot: &Snapshot) -> Result<Vec<u8>> {
    let payload = encode_record(snapshot)?;
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(SNAPSHOT_MAGIC);
    out.push(SNAPSHOT_VERSION);
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decode a snapshot, validating magic and version.
pub fn decode_snapshot(bytes: &[u8]) -> Result<Snapshot> {
    if bytes.len() < HEADER_LEN || &bytes[..SNAPSHOT_MAGIC.len()] != SNAPSHOT_MAGIC {
        return Err(LostFoundError::Serialization(
            "not a catalog snapshot (bad magic)".to_string(),
        ));
    }
    let version = bytes[SNAPSHOT_MAGIC.len()];
    if version != SNAPSHOT_VERSION {
        return Err(LostFoundError::Serialization(format!(
            "unsupported snapshot version {} (expected {})",
            version, SNAPSHOT_VERSION
        )));
    }
    decode_record(&bytes[HEADER_LEN..])
}

/// Encode one record with postcard.
pub fn encode_record<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    Ok(postcard::to_allocvec(record)?)
}

/// Decode one postcard record.
pub fn decode_record<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(postcard::from_bytes(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_roundtrip() {
        let snapshot = Snapshot::default();
        let bytes = encode_snapshot(&snapshot);
        assert!(bytes.is_ok());
        let bytes = bytes.unwrap_or_default();
        assert_eq!(&bytes[..4], SNAPSHOT_MAGIC);
        assert_eq!(decode_snapshot(&bytes), Ok(snapshot));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let result = decode_snapshot(b"NOPE\x01rest");
        assert!(matches!(result, Err(LostFoundError::Serialization(_))));
    }

    #[test]
    fn future_version_is_rejected() {
        let mut bytes = SNAPSHOT_MAGIC.to_vec();
        bytes.push(SNAPSHOT_VERSION + 1);
        let result = decode_snapshot(&bytes);
        assert!(matches!(result, Err(LostFoundError::Serialization(msg)) if msg.contains("version")));
    }

    #[test]
    fn truncated_input_is_rejected() {
        assert!(decode_snapshot(b"LF").is_err());
    }
}
