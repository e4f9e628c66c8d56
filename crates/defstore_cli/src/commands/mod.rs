//! CLI commands.

pub mod build;
pub mod query;
pub mod stats;
