//! Secondary indexes over the def blob.
//!
//! An index advertises which filters it can accelerate through
//! [`Index::covers`], answers lookups through [`DefIndex::defs`] and persists
//! itself through [`PersistedIndex::write`]. Indexes come into existence only
//! through a [`DefIndexBuilder`], either by building from a complete def
//! snapshot or by reading a persisted blob, and are immutable afterwards.
//!
//! [`IndexSlot`] is the one-shot cell a store keeps per configured index. It
//! reports readiness and turns "queried before built" into
//! [`StoreError::NotReady`] instead of an empty answer.

use crate::error::{Result, StoreError};
use crate::filter::DefFilter;
use crate::types::{ByteOffset, ByteOffsetList, Def};
use std::io::{Read, Write};
use std::sync::OnceLock;

mod def_query;
mod envelope;
mod mafsa;
mod set;
mod unit;

pub use def_query::{DefQueryIndex, DefQueryIndexBuilder};
pub use envelope::{Checksum, IndexKind, INDEX_FORMAT_VERSION};
pub use set::{IndexSet, Lookup};
pub use unit::{DefUnitIndex, DefUnitIndexBuilder};

pub(crate) use envelope::recorded_checksum;

/// Size summary of a built index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexStats {
    /// Which index.
    pub kind: IndexKind,
    /// Distinct keys (names, units).
    pub keys: usize,
    /// Offsets stored across all keys.
    pub offsets: usize,
}

/// Something that can speed up some filters.
pub trait Index: Send + Sync {
    /// Which index this is.
    fn kind(&self) -> IndexKind;

    /// Counts the filters in `filters` this index can accelerate.
    ///
    /// Zero means the index cannot help with this query.
    fn covers(&self, filters: &[DefFilter]) -> usize;

    /// Size summary.
    fn stats(&self) -> IndexStats;
}

/// An index that answers def lookups with offsets into the def blob.
pub trait DefIndex: Index {
    /// Evaluates the filters this index understands.
    ///
    /// Returns `Ok(None)` when none of `filters` is one this index handles,
    /// or when the query provably matches nothing. Errors are reserved for
    /// unreadable internal state.
    fn defs(&self, filters: &[DefFilter]) -> Result<Option<ByteOffsetList>>;
}

/// An index that can serialize itself.
pub trait PersistedIndex {
    /// Writes the index as one self-describing record.
    fn write(&self, w: &mut dyn Write) -> Result<()>;
}

/// Produces a built index, from defs or from persisted bytes.
pub trait DefIndexBuilder {
    /// The built, read-only index.
    type Output: DefIndex + PersistedIndex;

    /// Builds from a complete def snapshot.
    ///
    /// `defs` and `offsets` are positionally aligned. An empty snapshot
    /// builds a valid, empty index.
    fn build(&self, defs: &[Def], offsets: &[ByteOffset]) -> Result<Self::Output>;

    /// Reads an index written by [`PersistedIndex::write`].
    fn read(&self, r: &mut dyn Read) -> Result<Self::Output>;
}

/// Object-safe union of the index traits, as held by stores and index sets.
pub trait StoreIndex: DefIndex + PersistedIndex {}

impl<T: DefIndex + PersistedIndex> StoreIndex for T {}

impl<T: Index + ?Sized> Index for Box<T> {
    fn kind(&self) -> IndexKind {
        (**self).kind()
    }

    fn covers(&self, filters: &[DefFilter]) -> usize {
        (**self).covers(filters)
    }

    fn stats(&self) -> IndexStats {
        (**self).stats()
    }
}

impl<T: DefIndex + ?Sized> DefIndex for Box<T> {
    fn defs(&self, filters: &[DefFilter]) -> Result<Option<ByteOffsetList>> {
        (**self).defs(filters)
    }
}

impl<T: PersistedIndex + ?Sized> PersistedIndex for Box<T> {
    fn write(&self, w: &mut dyn Write) -> Result<()> {
        (**self).write(w)
    }
}

pub(crate) fn check_aligned(defs: &[Def], offsets: &[ByteOffset]) -> Result<()> {
    if defs.len() != offsets.len() {
        return Err(StoreError::OffsetCountMismatch {
            defs: defs.len(),
            offsets: offsets.len(),
        });
    }
    Ok(())
}

/// One-shot holder for an index that may not be built yet.
///
/// Filling the slot (by build or by read) is the readiness barrier: once
/// [`ready`](Self::ready) returns true the index is immutable and can be
/// shared freely between readers.
pub struct IndexSlot<T> {
    kind: IndexKind,
    cell: OnceLock<T>,
}

impl<T: StoreIndex> IndexSlot<T> {
    /// Creates an empty, not-ready slot.
    pub fn new(kind: IndexKind) -> Self {
        Self {
            kind,
            cell: OnceLock::new(),
        }
    }

    /// Creates a slot that is already filled.
    pub fn with_index(index: T) -> Self {
        let slot = Self::new(index.kind());
        // A fresh cell always accepts the value.
        let _ = slot.cell.set(index);
        slot
    }

    /// Which index the slot is for.
    pub fn kind(&self) -> IndexKind {
        self.kind
    }

    /// True once the index has been built or successfully read.
    pub fn ready(&self) -> bool {
        self.cell.get().is_some()
    }

    /// The index, or [`StoreError::NotReady`].
    pub fn get(&self) -> Result<&T> {
        self.cell
            .get()
            .ok_or_else(|| StoreError::NotReady(self.kind.to_string()))
    }

    /// Fills the slot. Fails if it is already filled.
    pub fn fill(&self, index: T) -> Result<&T> {
        self.cell
            .set(index)
            .map_err(|_| StoreError::AlreadyReady(self.kind.to_string()))?;
        self.get()
    }

    /// Builds the index into the slot.
    pub fn build_with<B>(&self, builder: &B, defs: &[Def], offsets: &[ByteOffset]) -> Result<&T>
    where
        B: DefIndexBuilder<Output = T>,
    {
        if self.ready() {
            return Err(StoreError::AlreadyReady(self.kind.to_string()));
        }
        self.fill(builder.build(defs, offsets)?)
    }

    /// Reads the index into the slot. On failure the slot stays not ready.
    pub fn read_with<B>(&self, builder: &B, r: &mut dyn Read) -> Result<&T>
    where
        B: DefIndexBuilder<Output = T>,
    {
        if self.ready() {
            return Err(StoreError::AlreadyReady(self.kind.to_string()));
        }
        self.fill(builder.read(r)?)
    }

    /// Coverage of the filled index; zero while not ready.
    pub fn covers(&self, filters: &[DefFilter]) -> usize {
        self.cell.get().map_or(0, |index| index.covers(filters))
    }

    /// Looks up defs. Fails with [`StoreError::NotReady`] before build/read.
    pub fn defs(&self, filters: &[DefFilter]) -> Result<Option<ByteOffsetList>> {
        self.get()?.defs(filters)
    }

    /// Writes the index. Fails with [`StoreError::NotReady`] before build/read.
    pub fn write(&self, w: &mut dyn Write) -> Result<()> {
        self.get()?.write(w)
    }
}

impl<T> std::fmt::Debug for IndexSlot<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IndexSlot({}, ready={})", self.kind, self.cell.get().is_some())
    }
}
