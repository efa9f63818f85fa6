// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Solidafy Tables
//!
//! Normalizes nested provider API resources into keyed relational tables.
//!
//! ## Features
//!
//! - **Schema Pipeline**: Structs inline, become child tables or stay JSON; lists always become child tables
//! - **Deterministic Keys**: `_cq_id` synthesized from natural key and parent lineage
//! - **Transparent Pagination**: Cursor, offset, page number, link header and next URL behind one `Transport`
//! - **Arrow Output**: RecordBatch per table
//! - **DDL Rendering**: ClickHouse and Postgres templates with golden verification
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use solidafy_tables::{load_catalog_config, SyncEngine};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> solidafy_tables::Result<()> {
//!     let config = load_catalog_config("catalogs/gcp.yaml")?;
//!     let catalog = config.build()?;
//!
//!     let engine = SyncEngine::from_config(config)?;
//!     let output = engine
//!         .sync_resource(&catalog, "compute_instances", &CancellationToken::new())
//!         .await?;
//!
//!     for (table, batch) in output.batches(&catalog)? {
//!         println!("{table}: {} rows", batch.num_rows());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  CatalogConfig (YAML) ──► schema pipeline ──► Catalog            │
//! │  transform_tables → apply (naming) → add_cq_ids                  │
//! └──────────────────────────────────────────────────────────────────┘
//!                                 │
//! ┌───────────┬──────────────┬────┴──────────┬───────────┬───────────┐
//! │   HTTP    │  Paginate    │     Rows      │  Output   │  Render   │
//! ├───────────┼──────────────┼───────────────┼───────────┼───────────┤
//! │ Transport │ Cursor       │ materialize   │ Arrow     │ Templates │
//! │ Retry     │ Offset/Page  │ coerce        │ schema    │ Dialects  │
//! │ Backoff   │ Link/NextUrl │ CqID wiring   │ batches   │ Golden    │
//! └───────────┴──────────────┴───────────────┴───────────┴───────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Catalog configuration files
pub mod config;

/// Tables, columns and the schema transformer pipeline
pub mod schema;

/// CqID key synthesis
pub mod key;

/// Transport trait and HTTP client with retry
pub mod http;

/// Pagination strategies and the paginating transport
pub mod pagination;

/// Row materialization
pub mod rows;

/// Arrow output
pub mod output;

/// Template rendering and golden verification
pub mod render;

/// Sync engine
pub mod engine;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{load_catalog_config, load_catalog_config_from_str, CatalogConfig};
pub use engine::{SyncEngine, SyncOutput};
pub use key::{synthesize, CqId};
pub use schema::{Catalog, Column, ColumnType, Table};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
