//! Output module
//!
//! Hands materialized rows to callers as Arrow RecordBatches.
//!
//! # Overview
//!
//! - [`table_schema`] maps a finalized table onto an Arrow schema
//! - [`rows_to_batch`] converts one table's rows into a RecordBatch
//! - [`batch_to_rows`] reads a RecordBatch back into rows
//!
//! `Uuid` and `Json` columns travel as UTF-8; timestamps as microseconds in UTC.

mod schema;

pub use schema::{arrow_type, batch_to_rows, rows_to_batch, table_schema};
