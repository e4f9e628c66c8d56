//! Defstore Core Library
//!
//! Storage and lookup for code definitions ("defs"), providing:
//! - A compact blob of def records addressed by byte offset
//! - Case-insensitive name prefix search over a minimized automaton
//! - Exact lookup by source unit
//! - Automatic choice between indexes and a full scan
//!
//! # Quick Start
//!
//! ```
//! use defstore_core::{Def, DefFilter, DefKind, DefStore, StoreConfig};
//! use tempfile::TempDir;
//!
//! let tmp = TempDir::new().unwrap();
//! let defs = vec![
//!     Def::new("net/http/Serve", "Serve").with_kind(DefKind::Func),
//!     Def::new("net/http/Server", "Server").with_kind(DefKind::Type),
//!     Def::new("net/url/Parse", "Parse").with_kind(DefKind::Func),
//! ];
//! DefStore::build(tmp.path(), &defs, &StoreConfig::default()).unwrap();
//!
//! let store = DefStore::open(tmp.path()).unwrap();
//! let found = store.defs(&[DefFilter::by_def_query("serve")]).unwrap();
//! assert_eq!(found.len(), 2);
//! ```
//!
//! # Features
//!
//! ## Building an index by hand
//!
//! Indexes only need defs and their offsets, so they work over any backing
//! storage:
//!
//! ```
//! use defstore_core::{Def, DefFilter, DefIndex, DefIndexBuilder, DefQueryIndexBuilder};
//!
//! let defs = vec![Def::new("p/Open", "Open"), Def::new("p/OpenFile", "OpenFile")];
//! let index = DefQueryIndexBuilder::new().build(&defs, &[0, 64]).unwrap();
//!
//! let hits = index.defs(&[DefFilter::by_def_query("OPEN")]).unwrap();
//! assert_eq!(hits, Some(vec![0, 64]));
//! ```
//!
//! ## Persisting an index
//!
//! Every persisted index is a versioned, checksummed record:
//!
//! ```
//! use defstore_core::{Def, DefIndexBuilder, DefUnitIndexBuilder, PersistedIndex};
//!
//! let defs = vec![Def::new("a/F", "F").in_unit("GoPackage", "a")];
//! let index = DefUnitIndexBuilder.build(&defs, &[0]).unwrap();
//!
//! let mut bytes = Vec::new();
//! index.write(&mut bytes).unwrap();
//! let read = DefUnitIndexBuilder.read(&mut bytes.as_slice()).unwrap();
//! assert_eq!(read.get("GoPackage", "a"), Some(&[0u64][..]));
//! ```

mod config;
mod def_blob;
mod encoding;
mod error;
mod filter;
mod index;
mod store;
mod types;

pub use config::{IndexConfig, NameSelection, StorageConfig, StoreConfig, CONFIG_FILE};
pub use def_blob::{DefBlob, DefBlobWriter};
pub use error::{Result, StoreError};
pub use filter::{def_query_filters, select_all, AllDefs, DefFilter, DefSelector};
pub use index::{
    Checksum, DefIndex, DefIndexBuilder, DefQueryIndex, DefQueryIndexBuilder, DefUnitIndex,
    DefUnitIndexBuilder, Index, IndexKind, IndexSet, IndexSlot, IndexStats, Lookup,
    PersistedIndex, StoreIndex, INDEX_FORMAT_VERSION,
};
pub use store::{DefStore, Manifest, ManifestIndex, DEFS_FILE, MANIFEST_FILE};
pub use types::*;
