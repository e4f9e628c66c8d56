//! Query filters over defs.
//!
//! Filters are a closed set. Each one can be evaluated directly against a
//! [`Def`] (used when scanning), and indexes look for the variants they know
//! how to accelerate through accessors such as [`DefFilter::as_def_query`].

use crate::types::{Def, DefKind};
use serde::{Deserialize, Serialize};

/// A predicate over defs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefFilter {
    /// Case-insensitive name prefix query.
    ByDefQuery(String),
    /// Defs in the given source unit.
    ByUnit {
        /// Source unit type.
        unit_type: String,
        /// Source unit name.
        unit: String,
    },
    /// The def with this exact path.
    ByDefPath(String),
    /// Defs declared in this file.
    ByFile(String),
    /// Defs of this kind.
    ByKind(DefKind),
    /// Only exported defs.
    Exported,
}

impl DefFilter {
    /// Builds a name query filter.
    pub fn by_def_query(q: impl Into<String>) -> Self {
        Self::ByDefQuery(q.into())
    }

    /// Builds a source unit filter.
    pub fn by_unit(unit_type: impl Into<String>, unit: impl Into<String>) -> Self {
        Self::ByUnit {
            unit_type: unit_type.into(),
            unit: unit.into(),
        }
    }

    /// The text query, if this filter carries one.
    pub fn as_def_query(&self) -> Option<&str> {
        match self {
            Self::ByDefQuery(q) => Some(q),
            _ => None,
        }
    }

    /// The source unit, if this filter selects one.
    pub fn as_unit(&self) -> Option<(&str, &str)> {
        match self {
            Self::ByUnit { unit_type, unit } => Some((unit_type, unit)),
            _ => None,
        }
    }
}

/// Extracts the name queries from an arbitrary filter set.
///
/// Returns an empty vec when no filter carries a query; that is a normal
/// outcome and means the name index has nothing to contribute.
pub fn def_query_filters(filters: &[DefFilter]) -> Vec<&str> {
    filters.iter().filter_map(DefFilter::as_def_query).collect()
}

/// Decides whether a def belongs in an index.
pub trait DefSelector: Send + Sync {
    /// Returns true if `def` is selected.
    fn select_def(&self, def: &Def) -> bool;
}

impl DefSelector for DefFilter {
    fn select_def(&self, def: &Def) -> bool {
        match self {
            Self::ByDefQuery(q) => lower(&def.name).starts_with(&lower(q)),
            Self::ByUnit { unit_type, unit } => &def.unit_type == unit_type && &def.unit == unit,
            Self::ByDefPath(path) => &def.path == path,
            Self::ByFile(file) => &def.file == file,
            Self::ByKind(kind) => def.kind == *kind,
            Self::Exported => def.exported,
        }
    }
}

impl<F> DefSelector for F
where
    F: Fn(&Def) -> bool + Send + Sync,
{
    fn select_def(&self, def: &Def) -> bool {
        self(def)
    }
}

/// Selects every def.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllDefs;

impl DefSelector for AllDefs {
    fn select_def(&self, _def: &Def) -> bool {
        true
    }
}

/// Lower-cases `s` one character at a time.
///
/// Unlike `str::to_lowercase` this ignores word position, so a final
/// capital sigma folds to `σ` like any other and prefixes stay prefixes.
pub(crate) fn lower(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Returns true if `def` passes every filter.
pub fn select_all(filters: &[DefFilter], def: &Def) -> bool {
    filters.iter().all(|f| f.select_def(def))
}
