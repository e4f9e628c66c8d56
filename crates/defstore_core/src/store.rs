//! On-disk def store: the def blob plus its persisted indexes.
//!
//! Layout of a store directory:
//!
//! ```text
//! <root>/config.toml          configuration used for the build
//! <root>/defs.bin             def blob
//! <root>/indexes/<kind>.idx   zstd-compressed index envelope, one per kind
//! <root>/manifest.json        format version, def count, index checksums
//! <root>/LOCK                 held exclusively while building
//! ```

use crate::config::StoreConfig;
use crate::def_blob::{DefBlob, DefBlobWriter};
use crate::error::{Result, StoreError};
use crate::filter::{select_all, DefFilter};
use crate::index::{
    recorded_checksum, Checksum, DefIndexBuilder, DefQueryIndexBuilder, DefUnitIndexBuilder,
    IndexKind, IndexSet, IndexSlot, Lookup, PersistedIndex, StoreIndex, INDEX_FORMAT_VERSION,
};
use crate::types::{ByteOffset, Def};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Def blob file name.
pub const DEFS_FILE: &str = "defs.bin";
/// Manifest file name.
pub const MANIFEST_FILE: &str = "manifest.json";
const INDEX_DIR: &str = "indexes";
const LOCK_FILE: &str = "LOCK";

/// What a store directory contains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Index format version the store was written with.
    pub format_version: u32,
    /// Number of def records in the blob.
    pub def_count: usize,
    /// Persisted indexes, in query-priority order.
    pub indexes: Vec<ManifestIndex>,
}

/// One persisted index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestIndex {
    /// Which index.
    pub kind: IndexKind,
    /// File name relative to the store root.
    pub file: String,
    /// Hex checksum of the index payload.
    pub checksum: String,
}

/// A def blob with its indexes, queryable by filter.
///
/// # Examples
///
/// ```
/// use defstore_core::{Def, DefFilter, DefStore, StoreConfig};
/// use tempfile::TempDir;
///
/// let tmp = TempDir::new().unwrap();
/// let defs = vec![Def::new("p/Open", "Open"), Def::new("p/Close", "Close")];
/// DefStore::build(tmp.path(), &defs, &StoreConfig::default()).unwrap();
///
/// let store = DefStore::open(tmp.path()).unwrap();
/// let found = store.defs(&[DefFilter::by_def_query("op")]).unwrap();
/// assert_eq!(found[0].name, "Open");
/// ```
#[derive(Debug)]
pub struct DefStore {
    root: PathBuf,
    manifest: Manifest,
    blob: DefBlob,
    indexes: IndexSet,
}

impl DefStore {
    /// Writes a new store for `defs` into `root`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns `StoreLocked` if another build holds the store, and any
    /// encoding or I/O error from writing the blob and indexes.
    pub fn build(root: impl AsRef<Path>, defs: &[Def], config: &StoreConfig) -> Result<Self> {
        config.validate()?;
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(root.join(INDEX_DIR))?;
        let _lock = BuildLock::acquire(&root.join(LOCK_FILE))?;

        let mut writer = DefBlobWriter::new();
        let offsets = writer.extend(defs)?;
        let blob = writer.finish();
        write_atomic(&root.join(DEFS_FILE), blob.as_bytes())?;
        debug!(defs = defs.len(), bytes = blob.as_bytes().len(), "wrote def blob");

        let mut indexes = IndexSet::new();
        let mut entries = Vec::with_capacity(config.indexes.enabled.len());
        for &kind in &config.indexes.enabled {
            let index = build_index(kind, config, defs, &offsets)?;

            let mut sealed = Vec::new();
            index.write(&mut sealed)?;
            let checksum = recorded_checksum(&sealed)
                .ok_or_else(|| StoreError::Encoding(format!("{} index has no header", kind)))?;
            let compressed = zstd::encode_all(sealed.as_slice(), config.storage.compression_level)
                .map_err(|e| StoreError::Compression(e.to_string()))?;

            let file = index_file_name(kind);
            write_atomic(&root.join(&file), &compressed)?;
            debug!(
                index = %kind,
                bytes = sealed.len(),
                compressed = compressed.len(),
                "wrote index"
            );

            entries.push(ManifestIndex {
                kind,
                file,
                checksum: checksum.as_hex(),
            });
            indexes.register(index);
        }

        let manifest = Manifest {
            format_version: INDEX_FORMAT_VERSION,
            def_count: blob.len(),
            indexes: entries,
        };
        let json = serde_json::to_vec_pretty(&manifest)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        write_atomic(&root.join(MANIFEST_FILE), &json)?;
        config.save(&root)?;

        info!(
            root = %root.display(),
            defs = manifest.def_count,
            indexes = manifest.indexes.len(),
            "built def store"
        );

        Ok(Self {
            root,
            manifest,
            blob,
            indexes,
        })
    }

    /// Opens an existing store.
    ///
    /// An index that fails to load is logged and left not ready; queries
    /// then fall back to the remaining indexes or to a full scan. A missing
    /// or incompatible manifest, or an unreadable def blob, is an error.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        let manifest: Manifest = serde_json::from_slice(&fs::read(root.join(MANIFEST_FILE))?)
            .map_err(|e| StoreError::Deserialization(format!("manifest: {}", e)))?;
        if manifest.format_version != INDEX_FORMAT_VERSION {
            return Err(StoreError::VersionMismatch {
                found: manifest.format_version,
                expected: INDEX_FORMAT_VERSION,
            });
        }

        let blob = DefBlob::from_bytes(fs::read(root.join(DEFS_FILE))?)?;
        if blob.len() != manifest.def_count {
            return Err(StoreError::corrupt(format!(
                "manifest lists {} defs, blob holds {}",
                manifest.def_count,
                blob.len()
            )));
        }

        let mut indexes = IndexSet::new();
        for entry in &manifest.indexes {
            let slot = IndexSlot::new(entry.kind);
            match load_index(&root, entry) {
                Ok(index) => {
                    slot.fill(index)?;
                }
                Err(e) => {
                    warn!(
                        index = %entry.kind,
                        file = %entry.file,
                        error = %e,
                        "failed to load index, queries will not use it"
                    );
                }
            }
            indexes.register_slot(slot);
        }

        info!(
            root = %root.display(),
            defs = blob.len(),
            ready = indexes.slots().iter().filter(|s| s.ready()).count(),
            "opened def store"
        );

        Ok(Self {
            root,
            manifest,
            blob,
            indexes,
        })
    }

    /// Returns the store directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the manifest the store was opened or built with.
    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Returns the def blob.
    pub fn blob(&self) -> &DefBlob {
        &self.blob
    }

    /// Returns the registered indexes.
    pub fn indexes(&self) -> &IndexSet {
        &self.indexes
    }

    /// Narrows `filters` to candidate offsets, or reports a full scan.
    pub fn lookup(&self, filters: &[DefFilter]) -> Result<Lookup> {
        self.indexes.lookup(filters)
    }

    /// Defs matching every filter, in blob order.
    ///
    /// Index candidates are re-checked against all filters, since an index
    /// only accounts for the filters it covers.
    pub fn defs(&self, filters: &[DefFilter]) -> Result<Vec<Def>> {
        self.query(filters).map(|(_, defs)| defs)
    }

    /// Like [`defs`](Self::defs), also returning the lookup that produced
    /// the candidates.
    pub fn query(&self, filters: &[DefFilter]) -> Result<(Lookup, Vec<Def>)> {
        let lookup = self.lookup(filters)?;
        let mut offsets: Vec<ByteOffset> = match &lookup {
            Lookup::Indexed { offsets, .. } => offsets.clone(),
            Lookup::FullScan => self.blob.offsets().to_vec(),
        };
        offsets.sort_unstable();
        offsets.dedup();

        let mut out = Vec::new();
        for ofs in offsets {
            let def = self.blob.get(ofs)?;
            if select_all(filters, &def) {
                out.push(def);
            }
        }
        Ok((lookup, out))
    }
}

fn index_file_name(kind: IndexKind) -> String {
    format!("{}/{}.idx", INDEX_DIR, kind.as_str())
}

fn build_index(
    kind: IndexKind,
    config: &StoreConfig,
    defs: &[Def],
    offsets: &[ByteOffset],
) -> Result<Box<dyn StoreIndex>> {
    Ok(match kind {
        IndexKind::DefQuery => Box::new(
            DefQueryIndexBuilder::with_selector(config.indexes.name_selection.clone())
                .build(defs, offsets)?,
        ),
        IndexKind::Unit => Box::new(DefUnitIndexBuilder.build(defs, offsets)?),
    })
}

fn read_index(kind: IndexKind, mut bytes: &[u8]) -> Result<Box<dyn StoreIndex>> {
    Ok(match kind {
        IndexKind::DefQuery => Box::new(DefQueryIndexBuilder::new().read(&mut bytes)?),
        IndexKind::Unit => Box::new(DefUnitIndexBuilder.read(&mut bytes)?),
    })
}

fn load_index(root: &Path, entry: &ManifestIndex) -> Result<Box<dyn StoreIndex>> {
    let compressed = fs::read(root.join(&entry.file))?;
    let sealed = zstd::decode_all(compressed.as_slice())
        .map_err(|e| StoreError::Compression(e.to_string()))?;

    let expected = Checksum::from_hex(&entry.checksum)?;
    match recorded_checksum(&sealed) {
        Some(recorded) if recorded == expected => {}
        recorded => {
            return Err(StoreError::ChecksumMismatch {
                expected: expected.as_hex(),
                actual: recorded.map(|c| c.as_hex()).unwrap_or_default(),
            })
        }
    }

    read_index(entry.kind, &sealed)
}

/// Writes `bytes` to `path` via temp file + fsync + rename.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Exclusive advisory lock on the store's LOCK file, released on drop.
struct BuildLock {
    file: File,
}

impl BuildLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)?;
        file.try_lock_exclusive()
            .map_err(|_| StoreError::StoreLocked {
                path: path.to_path_buf(),
            })?;
        Ok(Self { file })
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}
