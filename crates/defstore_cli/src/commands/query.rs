//! Query command - look up defs by filter.

use anyhow::{Context, Result};
use console::style;
use defstore_core::{Def, DefFilter, DefKind, DefStore, Lookup};
use std::path::Path;

/// Filters collected from the command line.
pub struct QueryArgs {
    pub name: Option<String>,
    pub unit: Option<(String, String)>,
    pub kind: Option<String>,
    pub path: Option<String>,
    pub file: Option<String>,
    pub exported: bool,
    pub limit: Option<usize>,
}

impl QueryArgs {
    fn filters(&self) -> Result<Vec<DefFilter>> {
        let mut filters = Vec::new();
        if let Some(name) = &self.name {
            filters.push(DefFilter::by_def_query(name.as_str()));
        }
        if let Some((unit_type, unit)) = &self.unit {
            filters.push(DefFilter::by_unit(unit_type.as_str(), unit.as_str()));
        }
        if let Some(kind) = &self.kind {
            let kind: DefKind = kind.parse()?;
            filters.push(DefFilter::ByKind(kind));
        }
        if let Some(path) = &self.path {
            filters.push(DefFilter::ByDefPath(path.clone()));
        }
        if let Some(file) = &self.file {
            filters.push(DefFilter::ByFile(file.clone()));
        }
        if self.exported {
            filters.push(DefFilter::Exported);
        }
        Ok(filters)
    }
}

/// Run a query against the store at `store`.
pub fn run(store: &Path, args: &QueryArgs, format: &str) -> Result<()> {
    if format != "json" && format != "text" {
        anyhow::bail!("Unsupported format: {}. Use 'json' or 'text'.", format);
    }

    let store = DefStore::open(store).context("Failed to open store")?;
    let filters = args.filters()?;

    let (lookup, mut defs) = store.query(&filters).context("Query failed")?;
    let total = defs.len();
    if let Some(limit) = args.limit {
        defs.truncate(limit);
    }

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&defs).context("Failed to serialize to JSON")?;
            println!("{}", json);
        }
        _ => print_text(&defs, total, &lookup),
    }

    Ok(())
}

fn print_text(defs: &[Def], total: usize, lookup: &Lookup) {
    for def in defs {
        let exported = if def.exported { "" } else { " (unexported)" };
        println!(
            "{:<8} {}{}",
            style(def.kind).dim(),
            style(&def.path).bold(),
            style(exported).dim()
        );
        if !def.file.is_empty() {
            println!("         {}:{}-{}", def.file, def.start, def.end);
        }
    }

    let via = match lookup {
        Lookup::Indexed { index, .. } => format!("{} index", index),
        Lookup::FullScan => "full scan".to_string(),
    };
    println!();
    if defs.len() < total {
        println!(
            "{} of {} defs (via {})",
            style(defs.len()).cyan(),
            style(total).cyan(),
            via
        );
    } else {
        println!("{} defs (via {})", style(total).cyan(), via);
    }
}
