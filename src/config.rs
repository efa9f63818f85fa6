//! Catalog configuration
//!
//! A catalog file describes one provider: where its API lives, how to talk to
//! it, which named struct types exist and which resources become tables.

use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, HttpRequest, RequestConfig};
use crate::pagination::PaginationConfig;
use crate::schema::{Catalog, Column, ColumnType, Nesting, NamingTransformer, Table, TypeRegistry};
use crate::types::{BackoffType, JsonValue, Method};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

// ============================================================================
// Top-Level Catalog Config
// ============================================================================

/// Complete catalog configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Provider name, prefixed to table names (e.g. "gcp")
    #[serde(default)]
    pub provider: Option<String>,

    /// Base URL for API requests
    pub base_url: String,

    /// HTTP client configuration
    #[serde(default)]
    pub http: HttpConfig,

    /// Default pagination for every resource
    #[serde(default)]
    pub pagination: PaginationConfig,

    /// Naming style for table titles
    #[serde(default)]
    pub naming: NamingTransformer,

    /// Named struct types referenced by fields
    #[serde(default)]
    pub types: IndexMap<String, Vec<FieldDefinition>>,

    /// Resource definitions
    #[serde(default)]
    pub resources: Vec<ResourceConfig>,
}

impl CatalogConfig {
    /// Get a resource by name
    pub fn resource(&self, name: &str) -> Result<&ResourceConfig> {
        self.resources
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| {
                let known: Vec<&str> = self.resources.iter().map(|r| r.name.as_str()).collect();
                Error::config(format!(
                    "Unknown resource '{name}'. Available: {}",
                    known.join(", ")
                ))
            })
    }

    /// Table name of a resource
    pub fn table_name(&self, resource: &ResourceConfig) -> String {
        if let Some(ref table) = resource.table {
            return table.clone();
        }
        match self.provider.as_deref() {
            Some(provider) if !provider.is_empty() => format!("{provider}_{}", resource.name),
            _ => resource.name.clone(),
        }
    }

    /// Pagination of a resource (its own, or the catalog default)
    pub fn pagination_for(&self, resource: &ResourceConfig) -> PaginationConfig {
        resource
            .pagination
            .clone()
            .unwrap_or_else(|| self.pagination.clone())
    }

    /// Named type registry
    pub fn registry(&self) -> Result<TypeRegistry> {
        let mut registry = TypeRegistry::new();
        for (name, fields) in &self.types {
            let columns = fields
                .iter()
                .map(FieldDefinition::to_column)
                .collect::<Result<Vec<_>>>()?;
            registry.define(name.clone(), columns);
        }
        Ok(registry)
    }

    /// Raw (untransformed) tables, one per resource
    pub fn raw_tables(&self) -> Result<Vec<Table>> {
        self.resources
            .iter()
            .map(|r| r.to_table(self.table_name(r)))
            .collect()
    }

    /// Run the schema pipeline over every resource
    pub fn build(&self) -> Result<Catalog> {
        Catalog::builder()
            .tables(self.raw_tables()?)
            .registry(self.registry()?)
            .naming(self.naming.clone())
            .build()
    }

    /// HTTP client configuration
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(&self.base_url)
            .timeout(Duration::from_secs(self.http.timeout_secs))
            .max_retries(self.http.max_retries)
            .backoff(
                self.http.backoff.backoff_type,
                Duration::from_millis(self.http.backoff.initial_ms),
                Duration::from_millis(self.http.backoff.max_ms),
            );
        for (key, value) in &self.http.headers {
            builder = builder.header(key, value);
        }
        if let Some(ref agent) = self.http.user_agent {
            builder = builder.user_agent(agent);
        }
        builder.build()
    }

    fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::config("Catalog base_url cannot be empty"));
        }

        let mut seen = HashSet::new();
        for resource in &self.resources {
            if resource.name.is_empty() {
                return Err(Error::config("Resource name cannot be empty"));
            }
            if resource.path.is_empty() {
                return Err(Error::config(format!(
                    "Resource '{}' must have a path",
                    resource.name
                )));
            }
            if !seen.insert(resource.name.as_str()) {
                return Err(Error::config(format!(
                    "Duplicate resource name: {}",
                    resource.name
                )));
            }
            if resource.fields.is_empty() {
                return Err(Error::config(format!(
                    "Resource '{}' must declare at least one field",
                    resource.name
                )));
            }
            if let PaginationConfig::Offset { limit: 0, .. } = self.pagination_for(resource) {
                return Err(Error::config(format!(
                    "Resource '{}' uses offset pagination with limit 0",
                    resource.name
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// HTTP Config
// ============================================================================

/// HTTP client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum number of retries
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry backoff configuration
    #[serde(default)]
    pub backoff: BackoffConfig,

    /// Headers sent with every request
    #[serde(default)]
    pub headers: IndexMap<String, String>,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            backoff: BackoffConfig::default(),
            headers: IndexMap::new(),
            user_agent: None,
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

/// Backoff configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Type of backoff
    #[serde(rename = "type", default)]
    pub backoff_type: BackoffType,

    /// Initial delay in milliseconds
    #[serde(default = "default_initial_ms")]
    pub initial_ms: u64,

    /// Maximum delay in milliseconds
    #[serde(default = "default_max_ms")]
    pub max_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            backoff_type: BackoffType::Exponential,
            initial_ms: default_initial_ms(),
            max_ms: default_max_ms(),
        }
    }
}

fn default_initial_ms() -> u64 {
    100
}

fn default_max_ms() -> u64 {
    60000
}

// ============================================================================
// Resource Config
// ============================================================================

/// One API resource, materialized as a root table and its children
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Unique resource name
    pub name: String,

    /// Table name override (default `{provider}_{name}`)
    #[serde(default)]
    pub table: Option<String>,

    /// API endpoint path, relative to `base_url`
    pub path: String,

    /// HTTP method
    #[serde(default)]
    pub method: Method,

    /// Query parameters
    #[serde(default)]
    pub params: IndexMap<String, String>,

    /// Additional headers
    #[serde(default)]
    pub headers: IndexMap<String, String>,

    /// JSON request body
    #[serde(default)]
    pub body: Option<JsonValue>,

    /// Dotted path to the record array (empty = the body is the array)
    #[serde(default)]
    pub records_path: String,

    /// Natural key column names
    #[serde(default)]
    pub natural_key: Vec<String>,

    /// Table description (may use `{{ table.title }}` and friends)
    #[serde(default)]
    pub description: Option<String>,

    /// Pagination override
    #[serde(default)]
    pub pagination: Option<PaginationConfig>,

    /// Page cap for one sync
    #[serde(default)]
    pub max_pages: Option<usize>,

    /// Field definitions
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

impl ResourceConfig {
    /// The raw table this resource declares
    pub fn to_table(&self, table_name: String) -> Result<Table> {
        let mut columns = self
            .fields
            .iter()
            .map(FieldDefinition::to_column)
            .collect::<Result<Vec<_>>>()?;

        for key in &self.natural_key {
            let column = columns
                .iter_mut()
                .find(|c| &c.name == key)
                .ok_or_else(|| Error::UnknownNaturalKey {
                    table: table_name.clone(),
                    column: key.clone(),
                })?;
            column.natural_key = true;
        }

        let mut table = Table::new(table_name).with_columns(columns);
        table.description.clone_from(&self.description);
        Ok(table)
    }

    /// The first request of a sync
    pub fn request(&self) -> HttpRequest {
        let mut config = RequestConfig::new();
        for (key, value) in &self.params {
            config = config.query(key, value);
        }
        for (key, value) in &self.headers {
            config = config.header(key, value);
        }
        if let Some(ref body) = self.body {
            config = config.json(body.clone());
        }
        HttpRequest::new(self.method, &self.path).with_config(config)
    }
}

// ============================================================================
// Field Definitions
// ============================================================================

/// Field type keyword in YAML
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    #[serde(alias = "integer")]
    Int64,
    #[serde(alias = "number")]
    Float64,
    #[serde(alias = "boolean")]
    Bool,
    Timestamp,
    Json,
    Uuid,
    #[serde(alias = "object")]
    Struct,
    #[serde(alias = "array")]
    List,
}

/// A field of a resource, named type or list element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name (unused for list items)
    #[serde(default)]
    pub name: String,

    /// Field type
    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// Whether nulls are allowed
    #[serde(default = "default_nullable")]
    pub nullable: bool,

    /// Field description
    #[serde(default)]
    pub description: Option<String>,

    /// Dotted source path, when it differs from the name
    #[serde(default)]
    pub path: Option<String>,

    /// Layout of struct fields
    #[serde(default)]
    pub nesting: Option<Nesting>,

    /// Inline struct fields
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,

    /// Named struct type
    #[serde(default, rename = "ref")]
    pub type_ref: Option<String>,

    /// List element
    #[serde(default)]
    pub items: Option<Box<FieldDefinition>>,

    /// Part of the natural key
    #[serde(default)]
    pub natural_key: bool,
}

fn default_nullable() -> bool {
    true
}

impl FieldDefinition {
    /// Semantic type of the field
    pub fn column_type(&self) -> Result<ColumnType> {
        Ok(match self.field_type {
            FieldType::String => ColumnType::String,
            FieldType::Int64 => ColumnType::Int64,
            FieldType::Float64 => ColumnType::Float64,
            FieldType::Bool => ColumnType::Bool,
            FieldType::Timestamp => ColumnType::Timestamp,
            FieldType::Json => ColumnType::Json,
            FieldType::Uuid => ColumnType::Uuid,
            FieldType::Struct => match (&self.type_ref, self.fields.is_empty()) {
                (Some(name), true) => ColumnType::named(name),
                (None, false) => ColumnType::inline_struct(
                    self.fields
                        .iter()
                        .map(Self::to_column)
                        .collect::<Result<Vec<_>>>()?,
                ),
                (Some(_), false) => {
                    return Err(Error::config(format!(
                        "Field '{}' declares both 'ref' and 'fields'",
                        self.name
                    )))
                }
                (None, true) => {
                    return Err(Error::config(format!(
                        "Struct field '{}' needs 'ref' or 'fields'",
                        self.name
                    )))
                }
            },
            FieldType::List => {
                let items = self.items.as_ref().ok_or_else(|| {
                    Error::config(format!("List field '{}' needs 'items'", self.name))
                })?;
                ColumnType::list(items.column_type()?)
            }
        })
    }

    /// Column for this field
    pub fn to_column(&self) -> Result<Column> {
        if self.name.is_empty() {
            return Err(Error::config("Field name cannot be empty"));
        }

        let mut column = Column::new(&self.name, self.column_type()?);
        column.nullable = self.nullable;
        column.natural_key = self.natural_key;
        column.description.clone_from(&self.description);
        if let Some(nesting) = self.nesting {
            column.nesting = nesting;
        }
        if let Some(ref path) = self.path {
            column = column.with_path(path);
        }
        Ok(column)
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Load a catalog configuration from a YAML file
pub fn load_catalog_config(path: impl AsRef<Path>) -> Result<CatalogConfig> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        Error::config(format!(
            "Failed to read catalog file '{}': {e}",
            path.display()
        ))
    })?;
    load_catalog_config_from_str(&content)
}

/// Load a catalog configuration from a YAML string
pub fn load_catalog_config_from_str(yaml: &str) -> Result<CatalogConfig> {
    let config: CatalogConfig = serde_yaml::from_str(yaml)
        .map_err(|e| Error::config(format!("Failed to parse catalog YAML: {e}")))?;
    config.validate()?;
    Ok(config)
}
