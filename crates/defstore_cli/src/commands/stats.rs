//! Stats command - show store contents.

use anyhow::{Context, Result};
use console::style;
use defstore_core::{DefStore, Index};
use std::path::Path;

/// Print the manifest and per-index statistics.
pub fn run(store: &Path) -> Result<()> {
    let store = DefStore::open(store).context("Failed to open store")?;
    let manifest = store.manifest();

    println!("{}", style("Store:").bold());
    println!("  Root:            {}", store.root().display());
    println!("  Format version:  {}", manifest.format_version);
    println!("  Defs:            {}", style(manifest.def_count).cyan());
    println!("  Blob bytes:      {}", style(store.blob().as_bytes().len()).cyan());

    println!();
    println!("{}", style("Indexes:").bold());
    if store.indexes().slots().is_empty() {
        println!("  (none)");
    }
    for (slot, entry) in store.indexes().slots().iter().zip(&manifest.indexes) {
        match slot.get() {
            Ok(index) => {
                let stats = index.stats();
                println!(
                    "  {} {:<10} keys: {:<8} offsets: {}",
                    style("✓").green(),
                    slot.kind(),
                    style(stats.keys).cyan(),
                    style(stats.offsets).cyan()
                );
            }
            Err(_) => {
                println!(
                    "  {} {:<10} not loaded ({})",
                    style("×").red(),
                    slot.kind(),
                    entry.file
                );
            }
        }
        println!("    checksum: {}", style(&entry.checksum[..16.min(entry.checksum.len())]).dim());
    }

    Ok(())
}
