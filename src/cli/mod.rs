//! CLI module
//!
//! Command-line interface over a catalog file.
//!
//! # Commands
//!
//! - `tables` - List tables and columns produced by the schema pipeline
//! - `render` - Render (or golden-check) destination statements
//! - `sync` - Fetch resources and emit materialized rows
//! - `validate` - Build the catalog and report problems
//! - `infer` - Derive field definitions from a sample response

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
