//! CqID type and synthesizer

use crate::error::{Error, Result};
use crate::types::JsonValue;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

// Encoding tags. Every value starts with one of these so that no two distinct
// value sequences share an encoding.
const TAG_ABSENT: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_UINT: u8 = 0x03;
const TAG_FLOAT: u8 = 0x04;
const TAG_STRING: u8 = 0x05;
const TAG_ROOT: u8 = 0xF0;
const TAG_PARENT: u8 = 0xF1;

/// A synthesized 16-byte row identity
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CqId([u8; 16]);

impl CqId {
    /// Wrap raw key bytes
    pub const fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// View the key as a UUID
    pub fn to_uuid(&self) -> Uuid {
        Uuid::from_bytes(self.0)
    }
}

impl std::fmt::Display for CqId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_uuid().hyphenated())
    }
}

impl std::fmt::Debug for CqId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CqId({self})")
    }
}

impl FromStr for CqId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s).map_err(|e| Error::key(format!("invalid key '{s}': {e}")))?;
        Ok(Self(*uuid.as_bytes()))
    }
}

impl From<CqId> for Uuid {
    fn from(id: CqId) -> Self {
        id.to_uuid()
    }
}

impl From<CqId> for JsonValue {
    fn from(id: CqId) -> Self {
        JsonValue::String(id.to_string())
    }
}

impl Serialize for CqId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for CqId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Synthesize a key from natural-key values and the parent's key.
///
/// `None` and JSON `null` both mean "absent" and encode as a sentinel.
/// Objects and arrays are not valid natural-key values.
pub fn synthesize(natural_key: &[Option<&JsonValue>], parent: Option<&CqId>) -> Result<CqId> {
    let mut hasher = Sha256::new();
    hasher.update((natural_key.len() as u64).to_be_bytes());

    for value in natural_key {
        encode_value(&mut hasher, *value)?;
    }

    match parent {
        Some(parent) => {
            hasher.update([TAG_PARENT]);
            hasher.update(parent.as_bytes());
        }
        None => hasher.update([TAG_ROOT]),
    }

    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Ok(CqId(bytes))
}

fn encode_value(hasher: &mut Sha256, value: Option<&JsonValue>) -> Result<()> {
    match value {
        None | Some(JsonValue::Null) => hasher.update([TAG_ABSENT]),
        Some(JsonValue::Bool(b)) => {
            hasher.update([TAG_BOOL, u8::from(*b)]);
        }
        Some(JsonValue::Number(n)) => {
            if let Some(i) = n.as_i64() {
                hasher.update([TAG_INT]);
                hasher.update(i.to_be_bytes());
            } else if let Some(u) = n.as_u64() {
                hasher.update([TAG_UINT]);
                hasher.update(u.to_be_bytes());
            } else if let Some(f) = n.as_f64() {
                hasher.update([TAG_FLOAT]);
                hasher.update(f.to_bits().to_be_bytes());
            } else {
                return Err(Error::key(format!("unrepresentable number {n}")));
            }
        }
        Some(JsonValue::String(s)) => {
            hasher.update([TAG_STRING]);
            hasher.update((s.len() as u64).to_be_bytes());
            hasher.update(s.as_bytes());
        }
        Some(JsonValue::Array(_)) => {
            return Err(Error::key("arrays cannot be part of a natural key"));
        }
        Some(JsonValue::Object(_)) => {
            return Err(Error::key("objects cannot be part of a natural key"));
        }
    }
    Ok(())
}

/// Two rows of one table that synthesized the same key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyCollision {
    /// The shared key
    pub key: CqId,
    /// Position of the first row with this key
    pub first: usize,
    /// Position of the later row with the same key
    pub duplicate: usize,
}

/// Report rows whose keys collide.
///
/// Rows with identical natural keys and lineage are accepted as the same
/// resource; this lets callers log or reject them explicitly.
pub fn find_key_collisions<'a>(keys: impl IntoIterator<Item = &'a CqId>) -> Vec<KeyCollision> {
    let mut seen: HashMap<CqId, usize> = HashMap::new();
    let mut collisions = Vec::new();

    for (idx, key) in keys.into_iter().enumerate() {
        match seen.get(key) {
            Some(&first) => collisions.push(KeyCollision {
                key: *key,
                first,
                duplicate: idx,
            }),
            None => {
                seen.insert(*key, idx);
            }
        }
    }

    collisions
}
