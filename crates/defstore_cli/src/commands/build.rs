//! Build command - write a store from a defs file.

use anyhow::{Context, Result};
use console::style;
use defstore_core::{Def, DefStore, StoreConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;

/// Build a store at `store` from the JSON defs in `input`.
pub fn run(input: &Path, store: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = match config_path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            StoreConfig::from_toml(&text)?
        }
        None => StoreConfig::load(store)?,
    };

    let text = fs::read_to_string(input)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let defs: Vec<Def> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse defs from {}", input.display()))?;
    tracing::debug!(input = %input.display(), defs = defs.len(), "parsed defs input");

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(format!("Indexing {} defs...", defs.len()));
    pb.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = DefStore::build(store, &defs, &config);
    pb.finish_and_clear();
    let built = result.context("Failed to build store")?;

    println!(
        "{} Built store at {}",
        style("✓").green(),
        style(store.display()).cyan()
    );
    println!("  Defs:     {}", style(built.manifest().def_count).cyan());
    for entry in &built.manifest().indexes {
        println!("  Index:    {} ({})", style(entry.kind).cyan(), entry.file);
    }

    Ok(())
}
