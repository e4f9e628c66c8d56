//! Defstore CLI - build and query def stores.

use anyhow::Result;
use clap::{Parser, Subcommand};
use defstore_core::StoreError;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "defstore")]
#[command(about = "Indexed storage for code definitions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a store from a JSON array of defs
    Build {
        /// Input file (JSON array of defs)
        input: PathBuf,
        /// Store directory
        #[arg(short, long)]
        store: PathBuf,
        /// Config file (defaults to <store>/config.toml if present)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Query defs in a store
    Query {
        /// Store directory
        #[arg(short, long)]
        store: PathBuf,
        /// Case-insensitive name prefix
        #[arg(long)]
        name: Option<String>,
        /// Source unit type (requires --unit)
        #[arg(long, requires = "unit")]
        unit_type: Option<String>,
        /// Source unit (requires --unit-type)
        #[arg(long, requires = "unit_type")]
        unit: Option<String>,
        /// Def kind (func, method, type, ...)
        #[arg(long)]
        kind: Option<String>,
        /// Exact def path
        #[arg(long)]
        path: Option<String>,
        /// Declaring file
        #[arg(long)]
        file: Option<String>,
        /// Only exported defs
        #[arg(long)]
        exported: bool,
        /// Maximum number of defs to print
        #[arg(long)]
        limit: Option<usize>,
        /// Output format (json, text)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show store and index statistics
    Stats {
        /// Store directory
        #[arg(short, long)]
        store: PathBuf,
    },
}

fn main() -> Result<()> {
    // Initialize tracing subscriber
    // Respects RUST_LOG environment variable (e.g., RUST_LOG=debug)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Build {
            input,
            store,
            config,
        } => commands::build::run(&input, &store, config.as_deref()),
        Commands::Query {
            store,
            name,
            unit_type,
            unit,
            kind,
            path,
            file,
            exported,
            limit,
            format,
        } => {
            let args = commands::query::QueryArgs {
                name,
                unit: unit_type.zip(unit),
                kind,
                path,
                file,
                exported,
                limit,
            };
            commands::query::run(&store, &args, &format)
        }
        Commands::Stats { store } => commands::stats::run(&store),
    };

    if let Err(e) = &result {
        if let Some(hint) = e
            .downcast_ref::<StoreError>()
            .and_then(StoreError::recovery_suggestion)
        {
            eprintln!("{} {}", console::style("hint:").yellow().bold(), hint);
        }
    }
    result
}
