//! Backing blob of serialized def records.
//!
//! Each record is `varint(len) ++ postcard(Def)`. A record's offset is the
//! position of its length prefix, which is what indexes store.

use crate::encoding::{decode_varint, encode_varint};
use crate::error::{Result, StoreError};
use crate::types::{ByteOffset, Def};

/// Appends def records and hands out their offsets.
#[derive(Debug, Default)]
pub struct DefBlobWriter {
    buf: Vec<u8>,
    offsets: Vec<ByteOffset>,
}

impl DefBlobWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `def` and returns its offset.
    pub fn push(&mut self, def: &Def) -> Result<ByteOffset> {
        let record =
            postcard::to_allocvec(def).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let offset = self.buf.len() as ByteOffset;
        encode_varint(record.len() as u64, &mut self.buf);
        self.buf.extend_from_slice(&record);
        self.offsets.push(offset);
        Ok(offset)
    }

    /// Appends every def, returning offsets aligned with `defs`.
    pub fn extend(&mut self, defs: &[Def]) -> Result<Vec<ByteOffset>> {
        defs.iter().map(|d| self.push(d)).collect()
    }

    /// Finishes the blob.
    pub fn finish(self) -> DefBlob {
        DefBlob {
            bytes: self.buf,
            offsets: self.offsets,
        }
    }
}

/// Read-only def records, addressable by offset.
///
/// # Examples
///
/// ```
/// use defstore_core::{Def, DefBlobWriter};
///
/// let mut w = DefBlobWriter::new();
/// let ofs = w.push(&Def::new("p/F", "F")).unwrap();
/// let blob = w.finish();
/// assert_eq!(blob.get(ofs).unwrap().name, "F");
/// ```
#[derive(Debug, Clone)]
pub struct DefBlob {
    bytes: Vec<u8>,
    /// Start of every record, ascending.
    offsets: Vec<ByteOffset>,
}

impl DefBlob {
    /// Parses a blob, validating every record.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        let mut offsets = Vec::new();
        let mut pos = 0usize;
        while pos < bytes.len() {
            let (len, used) = decode_varint(&bytes[pos..]).ok_or_else(|| {
                StoreError::corrupt(format!("def blob: bad record length at {}", pos))
            })?;
            let end = usize::try_from(len)
                .ok()
                .and_then(|len| (pos + used).checked_add(len))
                .filter(|&end| end <= bytes.len())
                .ok_or_else(|| {
                    StoreError::corrupt(format!("def blob: record at {} runs past end", pos))
                })?;
            postcard::from_bytes::<Def>(&bytes[pos + used..end]).map_err(|e| {
                StoreError::corrupt(format!("def blob: record at {}: {}", pos, e))
            })?;
            offsets.push(pos as ByteOffset);
            pos = end;
        }
        Ok(Self { bytes, offsets })
    }

    /// Raw blob bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// True if the blob holds no records.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Offsets of every record, in blob order.
    pub fn offsets(&self) -> &[ByteOffset] {
        &self.offsets
    }

    /// Decodes the record starting at `offset`.
    pub fn get(&self, offset: ByteOffset) -> Result<Def> {
        if self.offsets.binary_search(&offset).is_err() {
            return Err(StoreError::BadOffset {
                offset,
                reason: "not the start of a record".to_string(),
            });
        }
        // Offsets were validated when the blob was written or parsed.
        let pos = offset as usize;
        let (len, used) = decode_varint(&self.bytes[pos..]).ok_or_else(|| StoreError::BadOffset {
            offset,
            reason: "bad record length".to_string(),
        })?;
        let start = pos + used;
        let end = start + len as usize;
        postcard::from_bytes(&self.bytes[start..end])
            .map_err(|e| StoreError::Deserialization(e.to_string()))
    }

    /// Decodes every record, in blob order.
    pub fn iter(&self) -> impl Iterator<Item = Result<(ByteOffset, Def)>> + '_ {
        self.offsets
            .iter()
            .map(move |&ofs| self.get(ofs).map(|def| (ofs, def)))
    }

    /// Decodes every record into memory.
    pub fn defs(&self) -> Result<Vec<Def>> {
        self.iter().map(|r| r.map(|(_, def)| def)).collect()
    }
}
