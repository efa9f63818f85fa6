//! Engine types

use crate::error::Result;
use crate::output::rows_to_batch;
use crate::rows::TableRows;
use crate::schema::Catalog;
use arrow::record_batch::RecordBatch;
use indexmap::IndexMap;
use serde::Serialize;

/// Configuration for sync operation
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Maximum records to materialize per resource (0 = unlimited)
    pub max_records: usize,
    /// Page cap when the resource sets none
    pub max_pages: Option<usize>,
    /// Resources fetched at once by `sync_all`
    pub concurrency: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_records: 0,
            max_pages: None,
            concurrency: 4,
        }
    }
}

impl SyncConfig {
    /// Create a new sync config
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max records
    #[must_use]
    pub fn with_max_records(mut self, max: usize) -> Self {
        self.max_records = max;
        self
    }

    /// Set the default page cap
    #[must_use]
    pub fn with_max_pages(mut self, max: usize) -> Self {
        self.max_pages = Some(max);
        self
    }

    /// Set how many resources sync concurrently
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }
}

/// Statistics from syncing one resource
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncStats {
    /// Resource name
    pub resource: String,
    /// Root table name
    pub table: String,
    /// Pages fetched
    pub pages: usize,
    /// Raw records fetched
    pub records: usize,
    /// Rows materialized per table
    pub rows: IndexMap<String, usize>,
    /// Rows whose key repeats an earlier row of the same table
    pub key_collisions: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl SyncStats {
    /// Total rows over all tables
    pub fn total_rows(&self) -> usize {
        self.rows.values().sum()
    }
}

/// Result of syncing one resource
#[derive(Debug, Clone)]
pub struct SyncOutput {
    /// Rows per table, root first
    pub rows: TableRows,
    /// Statistics
    pub stats: SyncStats,
}

impl SyncOutput {
    /// One RecordBatch per table, in table order
    pub fn batches(&self, catalog: &Catalog) -> Result<Vec<(String, RecordBatch)>> {
        self.rows
            .iter()
            .map(|(name, rows)| {
                let table = catalog.require(name)?;
                Ok((name.to_string(), rows_to_batch(table, rows)?))
            })
            .collect()
    }
}
