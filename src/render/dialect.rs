//! Destination dialects and render contexts
//!
//! A dialect maps semantic column types to destination type names and selects
//! the built-in template sources.

use crate::schema::{ColumnType, Table};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Supported destination dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// ClickHouse
    #[value(name = "clickhouse")]
    #[serde(rename = "clickhouse")]
    ClickHouse,
    /// PostgreSQL
    Postgres,
}

impl Dialect {
    /// Directory-style name used for golden files
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::ClickHouse => "clickhouse",
            Dialect::Postgres => "postgres",
        }
    }

    /// Destination type for a column
    pub fn column_type(&self, column_type: &ColumnType, nullable: bool) -> String {
        match self {
            Dialect::ClickHouse => {
                let base = match column_type {
                    ColumnType::String | ColumnType::Json => "String",
                    ColumnType::Int64 => "Int64",
                    ColumnType::Float64 => "Float64",
                    ColumnType::Bool => "Bool",
                    ColumnType::Timestamp => "DateTime64(6)",
                    ColumnType::Uuid => "UUID",
                    // Flattened away before rendering; keep a lossless fallback.
                    ColumnType::Struct(_) | ColumnType::List(_) => "String",
                };
                if nullable {
                    format!("Nullable({base})")
                } else {
                    base.to_string()
                }
            }
            Dialect::Postgres => match column_type {
                ColumnType::String => "text",
                ColumnType::Int64 => "bigint",
                ColumnType::Float64 => "double precision",
                ColumnType::Bool => "boolean",
                ColumnType::Timestamp => "timestamptz",
                ColumnType::Json | ColumnType::Struct(_) | ColumnType::List(_) => "jsonb",
                ColumnType::Uuid => "uuid",
            }
            .to_string(),
        }
    }

    /// Built-in template sources as (name, source)
    pub fn builtin_templates(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            Dialect::ClickHouse => &[
                (
                    "create_table",
                    include_str!("templates/clickhouse/create_table.sql.tmpl"),
                ),
                (
                    "drop_table",
                    include_str!("templates/clickhouse/drop_table.sql.tmpl"),
                ),
                ("insert", include_str!("templates/clickhouse/insert.sql.tmpl")),
            ],
            Dialect::Postgres => &[
                (
                    "create_table",
                    include_str!("templates/postgres/create_table.sql.tmpl"),
                ),
                (
                    "drop_table",
                    include_str!("templates/postgres/drop_table.sql.tmpl"),
                ),
                ("insert", include_str!("templates/postgres/insert.sql.tmpl")),
            ],
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build the render context for one finalized table.
///
/// Shape: `{ "table": { name, title, description, parent, columns: [...],
/// primary_key: [...] } }`, each column carrying `name`, `type`, `nullable`,
/// `primary_key`, `description` and its 1-based `position`.
pub fn table_context(table: &Table, dialect: Dialect) -> Value {
    let columns: Vec<Value> = table
        .columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            json!({
                "name": c.name,
                "type": dialect.column_type(&c.column_type, c.nullable),
                "nullable": c.nullable,
                "primary_key": c.primary_key,
                "description": c.description,
                "position": i + 1,
            })
        })
        .collect();

    json!({
        "table": {
            "name": table.name,
            "title": table.title,
            "description": table.description,
            "parent": table.parent,
            "columns": columns,
            "primary_key": table.primary_key(),
        }
    })
}
