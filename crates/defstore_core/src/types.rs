//! Core data types for defstore.

use crate::error::StoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Position of one serialized def record inside the def blob.
pub type ByteOffset = u64;

/// Candidate defs matching a query, as offsets into the def blob.
///
/// Order is whatever the index grouped them in; it is not a ranking.
pub type ByteOffsetList = Vec<ByteOffset>;

/// A named source-code definition.
///
/// Only `name` participates in the name index. The remaining fields ride
/// along in the def blob and are used by post-filtering and by the unit
/// index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Def {
    /// Source unit type (e.g. "GoPackage", "CargoPackage").
    #[serde(default)]
    pub unit_type: String,
    /// Source unit name.
    #[serde(default)]
    pub unit: String,
    /// Def path, unique within its unit.
    pub path: String,
    /// Display identifier. Compared case-insensitively by the name index.
    pub name: String,
    /// What sort of entity this is.
    #[serde(default)]
    pub kind: DefKind,
    /// File containing the definition.
    #[serde(default)]
    pub file: String,
    /// Whether the def is visible outside its unit.
    #[serde(default)]
    pub exported: bool,
    /// Byte offset where the definition starts in `file`.
    #[serde(default)]
    pub start: u32,
    /// Byte offset where the definition ends in `file` (exclusive).
    #[serde(default)]
    pub end: u32,
}

impl Def {
    /// Creates a def with just a path and name; everything else defaulted.
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            unit_type: String::new(),
            unit: String::new(),
            path: path.into(),
            name: name.into(),
            kind: DefKind::default(),
            file: String::new(),
            exported: false,
            start: 0,
            end: 0,
        }
    }

    /// Sets the source unit.
    pub fn in_unit(mut self, unit_type: impl Into<String>, unit: impl Into<String>) -> Self {
        self.unit_type = unit_type.into();
        self.unit = unit.into();
        self
    }

    /// Sets the kind.
    pub fn with_kind(mut self, kind: DefKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the containing file.
    pub fn in_file(mut self, file: impl Into<String>) -> Self {
        self.file = file.into();
        self
    }

    /// Marks the def as exported.
    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }
}

/// Kind of definition.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum DefKind {
    /// Free function.
    Func,
    /// Method on a type.
    Method,
    /// Type declaration (struct, class, interface, ...).
    Type,
    /// Struct or class field.
    Field,
    /// Variable.
    Var,
    /// Constant.
    Const,
    /// Module or namespace.
    Module,
    /// Package.
    Package,
    /// Anything the grapher could not classify.
    #[default]
    Other,
}

impl DefKind {
    /// All kinds, in declaration order.
    pub const ALL: [DefKind; 9] = [
        DefKind::Func,
        DefKind::Method,
        DefKind::Type,
        DefKind::Field,
        DefKind::Var,
        DefKind::Const,
        DefKind::Module,
        DefKind::Package,
        DefKind::Other,
    ];

    /// Lowercase name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            DefKind::Func => "func",
            DefKind::Method => "method",
            DefKind::Type => "type",
            DefKind::Field => "field",
            DefKind::Var => "var",
            DefKind::Const => "const",
            DefKind::Module => "module",
            DefKind::Package => "package",
            DefKind::Other => "other",
        }
    }
}

impl fmt::Display for DefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DefKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        DefKind::ALL
            .into_iter()
            .find(|k| k.as_str() == lower)
            .ok_or_else(|| StoreError::ConfigError(format!("unknown def kind: {}", s)))
    }
}
