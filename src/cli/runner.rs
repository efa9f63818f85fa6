//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{load_catalog_config, CatalogConfig};
use crate::engine::{SyncConfig, SyncEngine, SyncOutput};
use crate::error::{Error, Result, ResultExt};
use crate::render::{Dialect, GoldenDir, TemplateSet};
use crate::schema::{infer_columns, Catalog, Table};
use crate::types::lookup_path;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Tables => self.tables(),
            Commands::Render {
                dialect,
                template,
                table,
                golden,
            } => self.render(*dialect, template, table.as_deref(), golden.as_deref()),
            Commands::Sync {
                resources,
                max_records,
                max_pages,
                concurrency,
            } => {
                let mut config = SyncConfig::new().with_concurrency(*concurrency);
                if let Some(max) = max_records {
                    config = config.with_max_records(*max);
                }
                if let Some(max) = max_pages {
                    config = config.with_max_pages(*max);
                }
                self.sync(resources.as_deref(), config).await
            }
            Commands::Validate => self.validate(),
            Commands::Infer {
                sample,
                records_path,
            } => self.infer(sample, records_path),
        }
    }

    /// Load catalog configuration
    fn load_config(&self) -> Result<CatalogConfig> {
        let path = self
            .cli
            .catalog
            .as_ref()
            .ok_or_else(|| Error::config("Catalog file not specified (use -c flag)"))?;
        load_catalog_config(path)
    }

    /// Load configuration and build its catalog
    fn load_catalog(&self) -> Result<(CatalogConfig, Catalog)> {
        let config = self.load_config()?;
        let catalog = config.build()?;
        Ok((config, catalog))
    }

    /// List tables
    fn tables(&self) -> Result<()> {
        let (_, catalog) = self.load_catalog()?;

        for table in catalog.all_tables() {
            self.output_message(&json!({
                "type": "TABLE",
                "table": table_summary(table),
            }));
        }
        Ok(())
    }

    /// Render or golden-check a template for every table
    fn render(
        &self,
        dialect: Dialect,
        template: &str,
        only: Option<&str>,
        golden: Option<&Path>,
    ) -> Result<()> {
        let (_, catalog) = self.load_catalog()?;
        let templates = TemplateSet::builtin(dialect)?;

        let tables = match only {
            Some(name) => vec![catalog.require(name)?],
            None => catalog.all_tables(),
        };

        let golden = golden.map(GoldenDir::new);
        for table in tables {
            let rendered = templates.render_table(template, table, dialect)?;
            match golden {
                Some(ref dir) => {
                    let relative = format!("{}/{}.{template}.sql", dialect.as_str(), table.name);
                    dir.verify(&relative, rendered.as_bytes())?;
                    info!(table = %table.name, reference = %relative, "golden match");
                }
                None => print!("{rendered}"),
            }
        }
        Ok(())
    }

    /// Fetch resources and emit rows
    async fn sync(&self, resources: Option<&str>, sync_config: SyncConfig) -> Result<()> {
        let (config, catalog) = self.load_catalog()?;
        let wanted: Vec<String> = match resources {
            Some(list) => list
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => Vec::new(),
        };

        let engine = SyncEngine::from_config(config)?.with_config(sync_config);
        let cancel = CancellationToken::new();
        let ctrl_c = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctrl_c.cancel();
            }
        });

        let outputs = if wanted.is_empty() {
            engine.sync_all(&catalog, &cancel).await?
        } else {
            let mut outputs = Vec::with_capacity(wanted.len());
            for name in &wanted {
                outputs.push(engine.sync_resource(&catalog, name, &cancel).await?);
            }
            outputs
        };

        for output in &outputs {
            self.emit_output(output);
        }
        Ok(())
    }

    fn emit_output(&self, output: &SyncOutput) {
        for (table, rows) in output.rows.iter() {
            for row in rows {
                self.output_message(&json!({
                    "type": "RECORD",
                    "table": table,
                    "data": row,
                }));
            }
        }
        self.output_message(&json!({
            "type": "STATS",
            "stats": output.stats,
        }));
    }

    /// Validate catalog definition
    fn validate(&self) -> Result<()> {
        let (config, catalog) = self.load_catalog()?;

        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Catalog for '{}' is valid: {} resources, {} tables",
                    config.provider.as_deref().unwrap_or(&config.base_url),
                    config.resources.len(),
                    catalog.all_tables().len()
                )
            }
        }));
        Ok(())
    }

    /// Infer columns from a sample response
    fn infer(&self, sample: &Path, records_path: &str) -> Result<()> {
        let content = fs::read_to_string(sample)
            .with_context(|| format!("Failed to read sample '{}'", sample.display()))?;
        let body: Value = serde_json::from_str(&content)?;

        let records = match lookup_path(&body, records_path) {
            Some(Value::Array(items)) => items.clone(),
            Some(record @ Value::Object(_)) => vec![record.clone()],
            _ => {
                return Err(Error::extraction(
                    records_path,
                    "sample has no records at this path",
                ))
            }
        };

        self.output_message(&json!({
            "type": "COLUMNS",
            "columns": infer_columns(&records),
        }));
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Name, title, parent and columns of a finalized table
fn table_summary(table: &Table) -> Value {
    json!({
        "name": table.name,
        "title": table.title,
        "parent": table.parent,
        "description": table.description,
        "primary_key": table.primary_key(),
        "columns": table
            .columns
            .iter()
            .map(|c| json!({
                "name": c.name,
                "type": c.column_type.to_string(),
                "nullable": c.nullable,
            }))
            .collect::<Vec<_>>(),
    })
}
