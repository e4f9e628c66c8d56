use anyhow::{Context, Result};
use defstore_core::{Def, DefStore, StoreConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Directory, relative to the workspace, that scenarios build stores into.
pub const STORE_DIR: &str = "store";

/// Input file scenarios build stores from.
pub const DEFS_INPUT: &str = "defs.json";

/// Manages isolated test environments with tempfile
pub struct TestWorkspace {
    dir: TempDir,
}

impl TestWorkspace {
    /// Create an empty workspace
    pub fn empty() -> Result<Self> {
        let dir = TempDir::new().context("Failed to create temp directory")?;
        Ok(Self { dir })
    }

    /// Load workspace from fixtures directory
    pub fn from_fixture(name: &str) -> Result<Self> {
        let workspace = Self::empty()?;
        let fixture_path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("fixtures")
            .join(name);

        if !fixture_path.exists() {
            anyhow::bail!("Fixture not found: {}", fixture_path.display());
        }

        // Recursively copy fixture files
        copy_dir_recursive(&fixture_path, workspace.path())?;

        Ok(workspace)
    }

    /// Get workspace path
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of the store directory
    pub fn store_path(&self) -> PathBuf {
        self.path().join(STORE_DIR)
    }

    /// Read the defs input file
    pub fn read_defs(&self) -> Result<Vec<Def>> {
        let bytes = self.read_file(DEFS_INPUT)?;
        serde_json::from_slice(&bytes).context("Failed to parse defs input")
    }

    /// Replace the defs input file
    pub fn write_defs(&self, defs: &[Def]) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(defs)?;
        self.write_file(DEFS_INPUT, &bytes)
    }

    /// Build a store from the defs input file
    pub fn build_store(&self, config: &StoreConfig) -> Result<DefStore> {
        let defs = self.read_defs()?;
        Ok(DefStore::build(self.store_path(), &defs, config)?)
    }

    /// Open the existing store
    pub fn open_store(&self) -> Result<DefStore> {
        Ok(DefStore::open(self.store_path())?)
    }

    /// Write file to workspace
    pub fn write_file(&self, path: &str, content: &[u8]) -> Result<()> {
        let full_path = self.path().join(path);

        // Create parent directories
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directories for {}", path))?;
        }

        fs::write(&full_path, content)
            .with_context(|| format!("Failed to write file: {}", path))?;

        Ok(())
    }

    /// Read file from workspace
    pub fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.path().join(path);
        fs::read(&full_path).with_context(|| format!("Failed to read file: {}", path))
    }

    /// Delete file from workspace
    pub fn remove_file(&self, path: &str) -> Result<()> {
        let full_path = self.path().join(path);
        fs::remove_file(&full_path).with_context(|| format!("Failed to delete file: {}", path))
    }

    /// Check if file exists
    pub fn file_exists(&self, path: &str) -> bool {
        self.path().join(path).exists()
    }
}

/// Recursively copy directory contents
fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());

        if file_type.is_dir() {
            fs::create_dir_all(&dst_path)?;
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}
