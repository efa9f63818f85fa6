//! Table catalog and the schema build pipeline

use super::naming::{apply, NamingTransformer};
use super::transform::{add_cq_ids, transform_tables};
use super::types::{Column, Table, TypeRegistry};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use serde::Serialize;
use tracing::info;

/// Run the full schema pipeline: structural pass, cosmetic pass, key installation.
///
/// Any failure aborts the build; no partially transformed tables are returned.
pub fn build_tables(
    mut tables: Vec<Table>,
    registry: &TypeRegistry,
    naming: &NamingTransformer,
) -> Result<Vec<Table>> {
    transform_tables(&mut tables, registry)?;
    apply(&mut tables, naming)?;
    for table in &mut tables {
        add_cq_ids(table);
    }
    Ok(tables)
}

/// An immutable set of finalized tables.
///
/// Constructed once at startup and shared read-only by fetchers and renderers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    tables: IndexMap<String, Table>,
}

impl Catalog {
    /// Start building a catalog
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Root table by name
    pub fn root(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Any table (root or child) by name
    pub fn get(&self, name: &str) -> Option<&Table> {
        self.all_tables().into_iter().find(|t| t.name == name)
    }

    /// Any table (root or child) by name, or a `TableNotFound` error
    pub fn require(&self, name: &str) -> Result<&Table> {
        self.get(name).ok_or_else(|| Error::TableNotFound {
            table: name.to_string(),
        })
    }

    /// Root tables in registration order
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Every table, each root followed by its descendants
    pub fn all_tables(&self) -> Vec<&Table> {
        self.tables.values().flat_map(Table::walk).collect()
    }

    /// Number of root tables
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the catalog is empty
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Take the root tables out of the catalog
    pub fn into_tables(self) -> Vec<Table> {
        self.tables.into_values().collect()
    }
}

/// Collects raw table definitions and builds a [`Catalog`]
#[derive(Debug, Clone, Default)]
pub struct CatalogBuilder {
    tables: Vec<Table>,
    registry: TypeRegistry,
    naming: NamingTransformer,
}

impl CatalogBuilder {
    /// Add a raw table definition
    #[must_use]
    pub fn table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    /// Add several raw table definitions
    #[must_use]
    pub fn tables(mut self, tables: impl IntoIterator<Item = Table>) -> Self {
        self.tables.extend(tables);
        self
    }

    /// Define a named struct type
    #[must_use]
    pub fn define_type(mut self, name: impl Into<String>, fields: Vec<Column>) -> Self {
        self.registry.define(name, fields);
        self
    }

    /// Replace the type registry
    #[must_use]
    pub fn registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the naming transformer
    #[must_use]
    pub fn naming(mut self, naming: NamingTransformer) -> Self {
        self.naming = naming;
        self
    }

    /// Run the pipeline and freeze the result
    pub fn build(self) -> Result<Catalog> {
        let tables = build_tables(self.tables, &self.registry, &self.naming)?;

        let mut catalog = IndexMap::with_capacity(tables.len());
        for table in tables {
            catalog.insert(table.name.clone(), table);
        }

        let catalog = Catalog { tables: catalog };
        info!(
            roots = catalog.len(),
            tables = catalog.all_tables().len(),
            "built table catalog"
        );
        Ok(catalog)
    }
}
