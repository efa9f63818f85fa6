//! Execution engine module
//!
//! Fetches resources through the pagination transport and materializes rows.
//!
//! # Overview
//!
//! The engine module provides:
//! - `SyncEngine` - fetches one or all resources of a catalog configuration
//! - `SyncConfig` - limits for sync operations
//! - `SyncOutput` / `SyncStats` - rows per table and what it took to get them

mod types;

pub use types::{SyncConfig, SyncOutput, SyncStats};

use crate::config::CatalogConfig;
use crate::error::Result;
use crate::http::{HttpClient, Transport};
use crate::key::{find_key_collisions, CqId};
use crate::pagination::{PaginatingTransport, DEFAULT_MAX_PAGES};
use crate::rows::{materialize, TableRows};
use crate::schema::{Catalog, CQ_ID_COLUMN};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Sync engine for resources of one catalog configuration
pub struct SyncEngine<T> {
    /// Base transport shared by every logical request
    transport: Arc<T>,
    /// Resource definitions
    catalog_config: Arc<CatalogConfig>,
    /// Sync limits
    config: SyncConfig,
}

impl SyncEngine<HttpClient> {
    /// Engine over a reqwest client built from the catalog's HTTP settings
    pub fn from_config(catalog_config: CatalogConfig) -> Result<Self> {
        let client = HttpClient::with_config(catalog_config.http_client_config())?;
        Ok(Self::new(client, catalog_config))
    }
}

impl<T: Transport + 'static> SyncEngine<T> {
    /// Create a new sync engine
    pub fn new(transport: T, catalog_config: CatalogConfig) -> Self {
        Self {
            transport: Arc::new(transport),
            catalog_config: Arc::new(catalog_config),
            config: SyncConfig::default(),
        }
    }

    /// Set sync configuration
    #[must_use]
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Resource definitions
    pub fn catalog_config(&self) -> &CatalogConfig {
        &self.catalog_config
    }

    /// Sync limits
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Fetch one resource and materialize its rows
    pub async fn sync_resource(
        &self,
        catalog: &Catalog,
        resource_name: &str,
        cancel: &CancellationToken,
    ) -> Result<SyncOutput> {
        let start = Instant::now();
        let resource = self.catalog_config.resource(resource_name)?;
        let table_name = self.catalog_config.table_name(resource);
        let table = catalog.require(&table_name)?;

        let max_pages = resource
            .max_pages
            .or(self.config.max_pages)
            .unwrap_or(DEFAULT_MAX_PAGES);
        let transport = PaginatingTransport::new(
            Arc::clone(&self.transport),
            self.catalog_config.pagination_for(resource),
        )
        .with_records_path(&resource.records_path)
        .with_max_pages(max_pages);

        info!(resource = resource_name, table = %table_name, "starting sync");

        let fetched = transport
            .fetch_records_with_cancel(resource.request(), cancel)
            .await?;
        let mut records = fetched.records;
        if self.config.max_records > 0 && records.len() > self.config.max_records {
            records.truncate(self.config.max_records);
        }

        let rows = materialize(table, &records)?;
        let key_collisions = count_collisions(&rows);

        let stats = SyncStats {
            resource: resource_name.to_string(),
            table: table_name,
            pages: fetched.pages,
            records: records.len(),
            rows: rows.counts(),
            key_collisions,
            duration_ms: start.elapsed().as_millis() as u64,
        };

        info!(
            resource = resource_name,
            pages = stats.pages,
            records = stats.records,
            rows = stats.total_rows(),
            "completed sync"
        );

        Ok(SyncOutput { rows, stats })
    }

    /// Sync every resource, a few at a time. Results keep resource order.
    pub async fn sync_all(
        &self,
        catalog: &Catalog,
        cancel: &CancellationToken,
    ) -> Result<Vec<SyncOutput>> {
        let names: Vec<&str> = self
            .catalog_config
            .resources
            .iter()
            .map(|r| r.name.as_str())
            .collect();

        let mut completed = futures::stream::iter(names.into_iter().enumerate().map(
            |(idx, name)| async move { (idx, self.sync_resource(catalog, name, cancel).await) },
        ))
        .buffer_unordered(self.config.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;
        completed.sort_by_key(|(idx, _)| *idx);

        completed.into_iter().map(|(_, output)| output).collect()
    }
}

/// Count rows whose `_cq_id` repeats an earlier row of the same table
fn count_collisions(rows: &TableRows) -> usize {
    let mut total = 0;
    for (table, table_rows) in rows.iter() {
        let keys: Vec<CqId> = table_rows
            .iter()
            .filter_map(|row| row.get(CQ_ID_COLUMN)?.as_str()?.parse().ok())
            .collect();
        let collisions = find_key_collisions(&keys);
        for collision in &collisions {
            debug!(
                table,
                key = %collision.key,
                first = collision.first,
                duplicate = collision.duplicate,
                "key collision"
            );
        }
        total += collisions.len();
    }
    total
}
