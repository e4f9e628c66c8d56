//! Exact-match index from source unit to defs.

use super::envelope::{self, IndexKind};
use super::{check_aligned, DefIndex, DefIndexBuilder, Index, IndexStats, PersistedIndex};
use crate::error::{Result, StoreError};
use crate::filter::DefFilter;
use crate::types::{ByteOffset, ByteOffsetList, Def};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use tracing::debug;

type UnitKey = (String, String);

/// Builds and reads [`DefUnitIndex`]es.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefUnitIndexBuilder;

impl DefIndexBuilder for DefUnitIndexBuilder {
    type Output = DefUnitIndex;

    fn build(&self, defs: &[Def], offsets: &[ByteOffset]) -> Result<DefUnitIndex> {
        check_aligned(defs, offsets)?;

        let mut units: BTreeMap<UnitKey, ByteOffsetList> = BTreeMap::new();
        for (def, &ofs) in defs.iter().zip(offsets) {
            units
                .entry((def.unit_type.clone(), def.unit.clone()))
                .or_default()
                .push(ofs);
        }
        debug!(defs = defs.len(), units = units.len(), "unit index: built");

        Ok(DefUnitIndex { units })
    }

    fn read(&self, r: &mut dyn Read) -> Result<DefUnitIndex> {
        let mut bytes = Vec::new();
        r.read_to_end(&mut bytes)?;
        let payload = envelope::open(IndexKind::Unit, &bytes)?;
        let units = postcard::from_bytes(payload)
            .map_err(|e| StoreError::Deserialization(e.to_string()))?;
        Ok(DefUnitIndex { units })
    }
}

/// Offsets of the defs in each source unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefUnitIndex {
    units: BTreeMap<UnitKey, ByteOffsetList>,
}

impl DefUnitIndex {
    /// Offsets of every def in the unit, if the unit has any.
    pub fn get(&self, unit_type: &str, unit: &str) -> Option<&[ByteOffset]> {
        self.units
            .get(&(unit_type.to_string(), unit.to_string()))
            .map(Vec::as_slice)
    }

    /// Iterates `(unit_type, unit)` pairs in sorted order.
    pub fn units(&self) -> impl Iterator<Item = (&str, &str)> {
        self.units.keys().map(|(t, u)| (t.as_str(), u.as_str()))
    }
}

impl Index for DefUnitIndex {
    fn kind(&self) -> IndexKind {
        IndexKind::Unit
    }

    fn covers(&self, filters: &[DefFilter]) -> usize {
        filters.iter().filter(|f| f.as_unit().is_some()).count()
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            kind: IndexKind::Unit,
            keys: self.units.len(),
            offsets: self.units.values().map(Vec::len).sum(),
        }
    }
}

impl DefIndex for DefUnitIndex {
    fn defs(&self, filters: &[DefFilter]) -> Result<Option<ByteOffsetList>> {
        Ok(filters
            .iter()
            .find_map(DefFilter::as_unit)
            .and_then(|(unit_type, unit)| self.get(unit_type, unit))
            .map(<[ByteOffset]>::to_vec))
    }
}

impl PersistedIndex for DefUnitIndex {
    fn write(&self, w: &mut dyn Write) -> Result<()> {
        let payload = postcard::to_allocvec(&self.units)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        w.write_all(&envelope::seal(IndexKind::Unit, &payload))?;
        Ok(())
    }
}
