//! Cosmetic naming pass
//!
//! Sets human-readable table titles and renders templated descriptions.
//! Names and types are never touched.

use super::types::Table;
use crate::error::{Error, Result};
use crate::render::{has_templates, render_str};
use heck::ToTitleCase;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Words that title-casing would otherwise mangle
const DEFAULT_EXCEPTIONS: &[(&str, &str)] = &[
    ("api", "API"),
    ("arn", "ARN"),
    ("aws", "AWS"),
    ("dns", "DNS"),
    ("gcp", "GCP"),
    ("iam", "IAM"),
    ("id", "ID"),
    ("ids", "IDs"),
    ("ip", "IP"),
    ("kms", "KMS"),
    ("sql", "SQL"),
    ("ssl", "SSL"),
    ("url", "URL"),
    ("vpc", "VPC"),
];

/// Naming style applied by the cosmetic pass
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "style", rename_all = "snake_case")]
pub enum NamingTransformer {
    /// Title equals the table name
    #[default]
    Identity,
    /// `gcp_compute_instances` -> `GCP Compute Instances`
    Title {
        /// Lowercase word -> replacement, merged over the defaults
        #[serde(default)]
        exceptions: BTreeMap<String, String>,
    },
}

impl NamingTransformer {
    /// Title style with the default acronym exceptions
    pub fn title() -> Self {
        Self::Title {
            exceptions: BTreeMap::new(),
        }
    }

    /// Compute the title for a table name
    pub fn table_title(&self, name: &str) -> String {
        match self {
            Self::Identity => name.to_string(),
            Self::Title { exceptions } => name
                .to_title_case()
                .split(' ')
                .map(|word| {
                    let lower = word.to_lowercase();
                    if let Some(custom) = exceptions.get(&lower) {
                        return custom.clone();
                    }
                    DEFAULT_EXCEPTIONS
                        .iter()
                        .find(|(from, _)| *from == lower)
                        .map_or_else(|| word.to_string(), |(_, to)| (*to).to_string())
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

/// Apply the naming transformer to every table and its descendants
pub fn apply(tables: &mut [Table], naming: &NamingTransformer) -> Result<()> {
    for table in tables {
        apply_table(table, naming)?;
    }
    Ok(())
}

fn apply_table(table: &mut Table, naming: &NamingTransformer) -> Result<()> {
    let title = naming.table_title(&table.name);
    table.title = Some(title.clone());

    let table_ctx = json!({
        "name": table.name,
        "title": title,
        "parent": table.parent,
    });

    if let Some(description) = &table.description {
        let ctx = json!({ "table": table_ctx });
        table.description = Some(render_description(&table.name, description, &ctx)?);
    }

    for column in &mut table.columns {
        if let Some(description) = &column.description {
            let ctx = json!({
                "table": table_ctx,
                "column": { "name": column.name, "type": column.column_type.to_string() },
            });
            column.description = Some(render_description(&table.name, description, &ctx)?);
        }
    }

    for relation in &mut table.relations {
        apply_table(&mut relation.table, naming)?;
    }
    Ok(())
}

fn render_description(table: &str, description: &str, ctx: &Value) -> Result<String> {
    if !has_templates(description) {
        return Ok(description.to_string());
    }
    render_str(table, description, ctx).map_err(|e| Error::schema(table, e.to_string()))
}
