//! Choosing an index for a query.

use super::{DefIndex, Index, IndexKind, IndexSlot, StoreIndex};
use crate::error::Result;
use crate::filter::DefFilter;
use crate::types::ByteOffsetList;
use tracing::{debug, trace};

/// How a query should be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    /// An index narrowed the candidates to these offsets.
    Indexed {
        /// The index that answered.
        index: IndexKind,
        /// Candidate offsets; may be empty.
        offsets: ByteOffsetList,
    },
    /// No ready index covers any filter; scan every def.
    FullScan,
}

/// The indexes registered for one def store, in registration order.
#[derive(Debug, Default)]
pub struct IndexSet {
    slots: Vec<IndexSlot<Box<dyn StoreIndex>>>,
}

impl IndexSet {
    /// An empty set; every lookup is a full scan.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a slot, ready or not.
    pub fn register_slot(&mut self, slot: IndexSlot<Box<dyn StoreIndex>>) {
        self.slots.push(slot);
    }

    /// Registers a built index.
    pub fn register(&mut self, index: Box<dyn StoreIndex>) {
        self.register_slot(IndexSlot::with_index(index));
    }

    /// Registered slots, in registration order.
    pub fn slots(&self) -> &[IndexSlot<Box<dyn StoreIndex>>] {
        &self.slots
    }

    /// The slot for `kind`, if one is registered.
    pub fn slot(&self, kind: IndexKind) -> Option<&IndexSlot<Box<dyn StoreIndex>>> {
        self.slots.iter().find(|s| s.kind() == kind)
    }

    /// The ready index with the highest positive coverage of `filters`.
    ///
    /// Ties go to the index registered first, so the same query always
    /// picks the same index.
    pub fn best(&self, filters: &[DefFilter]) -> Option<(&dyn StoreIndex, usize)> {
        let mut best: Option<(&dyn StoreIndex, usize)> = None;
        for slot in &self.slots {
            let Ok(index) = slot.get() else {
                trace!(index = %slot.kind(), "skipping index that is not ready");
                continue;
            };
            let cov = index.covers(filters);
            if cov > best.map_or(0, |(_, c)| c) {
                best = Some((index.as_ref(), cov));
            }
        }
        best
    }

    /// Narrows `filters` to candidate offsets using the best index.
    pub fn lookup(&self, filters: &[DefFilter]) -> Result<Lookup> {
        let Some((index, cov)) = self.best(filters) else {
            debug!(filters = filters.len(), "no index covers query, full scan");
            return Ok(Lookup::FullScan);
        };

        let offsets = index.defs(filters)?.unwrap_or_default();
        debug!(
            index = %index.kind(),
            coverage = cov,
            candidates = offsets.len(),
            "index lookup"
        );
        Ok(Lookup::Indexed {
            index: index.kind(),
            offsets,
        })
    }
}
