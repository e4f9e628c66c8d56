//! Versioned, checksummed container for persisted indexes.

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Envelope magic bytes.
pub(crate) const MAGIC: &[u8; 5] = b"DEFIX";

/// Version of the envelope and of every payload layout inside it.
pub const INDEX_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 5 + 1 + 4 + 8 + Checksum::LEN;

/// Which index a persisted envelope holds.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexKind {
    /// Case-insensitive name prefix index.
    DefQuery = 1,
    /// Exact source unit index.
    Unit = 2,
}

impl IndexKind {
    /// Every kind this build knows.
    pub const ALL: [IndexKind; 2] = [IndexKind::DefQuery, IndexKind::Unit];

    /// Stable name, used in config files, manifests and file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::DefQuery => "def_query",
            IndexKind::Unit => "unit",
        }
    }

    fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(IndexKind::DefQuery),
            2 => Some(IndexKind::Unit),
            _ => None,
        }
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for IndexKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        IndexKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| StoreError::UnknownIndex(s.to_string()))
    }
}

/// A 32-byte BLAKE3 hash of an envelope payload.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Checksum([u8; 32]);

impl Checksum {
    /// The length of a checksum in bytes.
    pub const LEN: usize = 32;

    /// Hashes `payload`.
    pub fn of(payload: &[u8]) -> Self {
        Self(*blake3::hash(payload).as_bytes())
    }

    /// Returns this checksum as a lowercase hex string.
    pub fn as_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parses a checksum from its hex form.
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s.trim()).map_err(|e| StoreError::corrupt(e.to_string()))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| StoreError::corrupt("checksum has wrong length"))?;
        Ok(Self(arr))
    }
}

impl fmt::Display for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_hex())
    }
}

impl fmt::Debug for Checksum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Checksum({}...)", &self.as_hex()[..12])
    }
}

/// Wraps `payload` in an envelope.
///
/// Format:
/// - Magic: "DEFIX" (5 bytes)
/// - Kind: u8 (1 byte)
/// - Version: u32 LE (4 bytes)
/// - Length: u64 LE (8 bytes)
/// - Checksum: BLAKE3 of payload (32 bytes)
/// - Payload: variable bytes
pub(crate) fn seal(kind: IndexKind, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(MAGIC);
    out.push(kind as u8);
    out.extend_from_slice(&INDEX_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
    out.extend_from_slice(&Checksum::of(payload).0);
    out.extend_from_slice(payload);
    out
}

/// Verifies an envelope of the expected kind and returns its payload.
pub(crate) fn open(expected: IndexKind, bytes: &[u8]) -> Result<&[u8]> {
    if bytes.len() < HEADER_LEN {
        return Err(StoreError::corrupt(format!(
            "index too small: {} bytes",
            bytes.len()
        )));
    }

    if &bytes[..5] != MAGIC {
        return Err(StoreError::corrupt("invalid magic bytes"));
    }

    match IndexKind::from_tag(bytes[5]) {
        Some(kind) if kind == expected => {}
        Some(kind) => {
            return Err(StoreError::corrupt(format!(
                "expected {} index, got {}",
                expected, kind
            )))
        }
        None => return Err(StoreError::corrupt(format!("unknown kind: {}", bytes[5]))),
    }

    let version = u32::from_le_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]);
    if version != INDEX_FORMAT_VERSION {
        return Err(StoreError::VersionMismatch {
            found: version,
            expected: INDEX_FORMAT_VERSION,
        });
    }

    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&bytes[10..18]);
    let len = u64::from_le_bytes(len_bytes);

    let mut recorded = [0u8; 32];
    recorded.copy_from_slice(&bytes[18..HEADER_LEN]);
    let recorded = Checksum(recorded);

    let payload = &bytes[HEADER_LEN..];
    if payload.len() as u64 != len {
        return Err(StoreError::corrupt(format!(
            "length mismatch: header says {}, got {}",
            len,
            payload.len()
        )));
    }

    let actual = Checksum::of(payload);
    if actual != recorded {
        return Err(StoreError::ChecksumMismatch {
            expected: recorded.as_hex(),
            actual: actual.as_hex(),
        });
    }

    Ok(payload)
}

/// Checksum recorded in a sealed envelope, without verifying it.
pub(crate) fn recorded_checksum(bytes: &[u8]) -> Option<Checksum> {
    let raw = bytes.get(18..HEADER_LEN)?;
    let mut arr = [0u8; 32];
    arr.copy_from_slice(raw);
    Some(Checksum(arr))
}
