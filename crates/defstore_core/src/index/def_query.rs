//! Case-insensitive name prefix index.
//!
//! Lower-cased def names are keys of a minimal automaton; a value table
//! holds, per key and in key order, the offsets of every def with that name.
//! All keys sharing a prefix sit in one contiguous run of the table, so a
//! prefix query is one automaton walk plus a slice copy.

use super::envelope::{self, IndexKind};
use super::mafsa::{MafsaBuilder, MinTree};
use super::{check_aligned, DefIndex, DefIndexBuilder, Index, IndexStats, PersistedIndex};
use crate::error::{Result, StoreError};
use crate::filter::{lower, AllDefs, DefFilter, DefSelector};
use crate::types::{ByteOffset, ByteOffsetList, Def};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use tracing::{debug, trace};

/// Builds and reads [`DefQueryIndex`]es.
pub struct DefQueryIndexBuilder {
    selector: Box<dyn DefSelector>,
}

impl Default for DefQueryIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DefQueryIndexBuilder {
    /// A builder that indexes every def.
    pub fn new() -> Self {
        Self::with_selector(AllDefs)
    }

    /// A builder that indexes only the defs `selector` accepts.
    pub fn with_selector(selector: impl DefSelector + 'static) -> Self {
        Self {
            selector: Box::new(selector),
        }
    }
}

impl DefIndexBuilder for DefQueryIndexBuilder {
    type Output = DefQueryIndex;

    fn build(&self, defs: &[Def], offsets: &[ByteOffset]) -> Result<DefQueryIndex> {
        check_aligned(defs, offsets)?;
        debug!(defs = defs.len(), "def query index: building");

        let mut entries: Vec<(String, ByteOffset)> = defs
            .iter()
            .zip(offsets)
            .filter(|(def, _)| self.selector.select_def(def))
            .map(|(def, &ofs)| (lower(&def.name), ofs))
            .collect();
        // Stable, so defs sharing a name keep their input order.
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        debug!(entries = entries.len(), "def query index: sorted by lower name");

        let mut automaton = MafsaBuilder::new();
        let mut values: Vec<ByteOffsetList> = Vec::with_capacity(entries.len());
        let mut previous: Option<&str> = None;
        for (name, ofs) in &entries {
            match values.last_mut() {
                Some(list) if previous == Some(name.as_str()) => list.push(*ofs),
                _ => {
                    automaton.insert(name)?;
                    values.push(vec![*ofs]);
                    previous = Some(name.as_str());
                }
            }
        }
        automaton.finish();
        debug!(
            names = automaton.len(),
            entries = entries.len(),
            "def query index: automaton minimized"
        );

        let bytes = automaton.to_bytes()?;
        let tree = MinTree::decode(&bytes)
            .map_err(|e| StoreError::Encoding(format!("re-decoding automaton: {}", e)))?;
        debug!(bytes = bytes.len(), nodes = tree.node_count(), "def query index: built");

        Ok(DefQueryIndex {
            tree,
            automaton: bytes,
            values,
        })
    }

    fn read(&self, r: &mut dyn Read) -> Result<DefQueryIndex> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        DefQueryIndex::from_bytes(&bytes)
    }
}

#[derive(Serialize)]
struct TableRef<'a> {
    automaton: &'a [u8],
    values: &'a [ByteOffsetList],
}

#[derive(Deserialize)]
struct Table {
    automaton: Vec<u8>,
    values: Vec<ByteOffsetList>,
}

/// Case-insensitive name prefix index over defs.
///
/// # Examples
///
/// ```
/// use defstore_core::{Def, DefFilter, DefIndex, DefIndexBuilder, DefQueryIndexBuilder};
///
/// let defs = vec![Def::new("p/Foo", "Foo"), Def::new("p/FooBar", "FooBar")];
/// let index = DefQueryIndexBuilder::new().build(&defs, &[0, 40]).unwrap();
///
/// let hits = index.defs(&[DefFilter::by_def_query("foo")]).unwrap();
/// assert_eq!(hits, Some(vec![0, 40]));
/// ```
#[derive(Debug, Clone)]
pub struct DefQueryIndex {
    tree: MinTree,
    /// Encoded form of `tree`, kept for persistence.
    automaton: Vec<u8>,
    values: Vec<ByteOffsetList>,
}

impl DefQueryIndex {
    /// Reads an index from the bytes written by [`PersistedIndex::write`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let payload = envelope::open(IndexKind::DefQuery, bytes)?;
        let table: Table = postcard::from_bytes(payload)
            .map_err(|e| StoreError::Deserialization(e.to_string()))?;
        let tree = MinTree::decode(&table.automaton)?;
        if tree.len() != table.values.len() as u64 {
            return Err(StoreError::corrupt(format!(
                "automaton accepts {} names but value table has {} entries",
                tree.len(),
                table.values.len()
            )));
        }
        Ok(Self {
            tree,
            automaton: table.automaton,
            values: table.values,
        })
    }

    /// Offsets of every def whose lower-cased name starts with `lower(q)`.
    ///
    /// `None` means no indexed name has that prefix.
    pub fn get_by_query(&self, q: &str) -> Result<Option<ByteOffsetList>> {
        let q = lower(q);
        let Some(t) = self.tree.indexed_traverse(&q) else {
            trace!(query = %q, "def query index: no path");
            return Ok(None);
        };

        let mut start = t.rank;
        let mut count = t.below;
        if t.is_final {
            start -= 1;
            count += 1;
        }

        let range = usize::try_from(start)
            .ok()
            .zip(usize::try_from(start + count).ok())
            .and_then(|(lo, hi)| self.values.get(lo..hi))
            .ok_or_else(|| {
                StoreError::corrupt(format!(
                    "rank range {}..{} outside value table of {}",
                    start,
                    start + count,
                    self.values.len()
                ))
            })?;

        let ofs: ByteOffsetList = range.iter().flatten().copied().collect();
        trace!(query = %q, found = ofs.len(), "def query index: found defs");
        Ok(Some(ofs))
    }

    /// Offsets of the defs whose lower-cased name is exactly `lower(name)`.
    pub fn get_exact(&self, name: &str) -> Option<&[ByteOffset]> {
        let rank = self.tree.index_of(&lower(name))?;
        self.values.get(usize::try_from(rank).ok()?).map(Vec::as_slice)
    }

    /// Number of distinct lower-cased names.
    pub fn name_count(&self) -> usize {
        self.values.len()
    }

    /// Size of the encoded automaton in bytes.
    pub fn automaton_len(&self) -> usize {
        self.automaton.len()
    }
}

impl Index for DefQueryIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::DefQuery
    }

    fn covers(&self, filters: &[DefFilter]) -> usize {
        filters
            .iter()
            .filter(|f| f.as_def_query().is_some())
            .count()
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            kind: IndexKind::DefQuery,
            keys: self.values.len(),
            offsets: self.values.iter().map(Vec::len).sum(),
        }
    }
}

impl DefIndex for DefQueryIndex {
    fn defs(&self, filters: &[DefFilter]) -> Result<Option<ByteOffsetList>> {
        match filters.iter().find_map(DefFilter::as_def_query) {
            Some(q) => self.get_by_query(q),
            None => Ok(None),
        }
    }
}

impl PersistedIndex for DefQueryIndex {
    fn write(&self, w: &mut dyn Write) -> Result<()> {
        let payload = postcard::to_allocvec(&TableRef {
            automaton: &self.automaton,
            values: &self.values,
        })
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
        w.write_all(&envelope::seal(IndexKind::DefQuery, &payload))?;
        Ok(())
    }
}
