//! Configuration for def stores.

use crate::error::{Result, StoreError};
use crate::filter::DefSelector;
use crate::index::IndexKind;
use crate::types::{Def, DefKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Name of the config file inside a store directory.
pub const CONFIG_FILE: &str = "config.toml";

/// Comprehensive configuration for a def store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// Which indexes to build and how.
    #[serde(default)]
    pub indexes: IndexConfig,

    /// Storage-related configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

impl StoreConfig {
    /// Load configuration from `<store_root>/config.toml`, or defaults if absent.
    pub fn load(store_root: &Path) -> Result<Self> {
        let path = store_root.join(CONFIG_FILE);
        if path.exists() {
            let content = fs::read_to_string(&path)
                .map_err(|e| StoreError::ConfigError(format!("failed to read config: {}", e)))?;
            Self::from_toml(&content)
        } else {
            Ok(StoreConfig::default())
        }
    }

    /// Parse and validate configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: StoreConfig = toml::from_str(content)
            .map_err(|e| StoreError::ConfigError(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `<store_root>/config.toml`.
    pub fn save(&self, store_root: &Path) -> Result<()> {
        let path = store_root.join(CONFIG_FILE);
        let content = toml::to_string_pretty(self)
            .map_err(|e| StoreError::ConfigError(format!("failed to serialize config: {}", e)))?;
        fs::write(&path, content)
            .map_err(|e| StoreError::ConfigError(format!("failed to write config: {}", e)))?;
        Ok(())
    }

    /// Checks value ranges serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if !(1..=22).contains(&self.storage.compression_level) {
            return Err(StoreError::ConfigError(format!(
                "compression_level must be between 1 and 22, got {}",
                self.storage.compression_level
            )));
        }
        for (i, kind) in self.indexes.enabled.iter().enumerate() {
            if self.indexes.enabled[..i].contains(kind) {
                return Err(StoreError::ConfigError(format!(
                    "index {} enabled more than once",
                    kind
                )));
            }
        }
        Ok(())
    }
}

/// Index configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Indexes to build, in query-priority order (default: def_query, unit).
    pub enabled: Vec<IndexKind>,

    /// Which defs the name index covers (default: all).
    pub name_selection: NameSelection,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            enabled: vec![IndexKind::DefQuery, IndexKind::Unit],
            name_selection: NameSelection::All,
        }
    }
}

/// Which defs get a name index entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NameSelection {
    /// Every def.
    #[default]
    All,
    /// Only exported defs.
    Exported,
    /// Only defs of the listed kinds.
    Kinds(Vec<DefKind>),
}

impl DefSelector for NameSelection {
    fn select_def(&self, def: &Def) -> bool {
        match self {
            NameSelection::All => true,
            NameSelection::Exported => def.exported,
            NameSelection::Kinds(kinds) => kinds.contains(&def.kind),
        }
    }
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Compression level for zstd index files (1-22, default: 3).
    /// Higher values mean better compression but slower builds.
    pub compression_level: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            compression_level: 3,
        }
    }
}
