//! Schema types
//!
//! Tables, columns and relations as they flow through the transformer
//! pipeline. Structural column types (`Struct`, `List`) only exist before the
//! structural pass; a finalized table holds scalar columns only.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Synthesized primary key column
pub const CQ_ID_COLUMN: &str = "_cq_id";
/// Foreign key to the parent row's `_cq_id`
pub const CQ_PARENT_ID_COLUMN: &str = "_cq_parent_id";
/// Position of an element inside its source array
pub const CQ_ORDINAL_COLUMN: &str = "_cq_ordinal";
/// Column holding a scalar array element
pub const VALUE_COLUMN: &str = "value";

/// Returns true for columns whose values are produced by the materializer
/// rather than read from the raw record.
pub fn is_reserved(name: &str) -> bool {
    matches!(
        name,
        CQ_ID_COLUMN | CQ_PARENT_ID_COLUMN | CQ_ORDINAL_COLUMN
    )
}

/// Semantic column type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    String,
    Int64,
    Float64,
    Bool,
    Timestamp,
    Json,
    Uuid,
    /// Nested object, resolved by the structural pass
    Struct(StructType),
    /// Repeated value, always promoted to a child table
    List(Box<ColumnType>),
}

impl ColumnType {
    /// Structural types must be rewritten before a table is final
    pub fn is_structural(&self) -> bool {
        matches!(self, ColumnType::Struct(_) | ColumnType::List(_))
    }

    /// Inline struct with the given fields
    pub fn inline_struct(fields: Vec<Column>) -> Self {
        ColumnType::Struct(StructType::Inline(fields))
    }

    /// Reference to a named type in the registry
    pub fn named(name: impl Into<String>) -> Self {
        ColumnType::Struct(StructType::Named(name.into()))
    }

    /// List of the given element type
    pub fn list(element: ColumnType) -> Self {
        ColumnType::List(Box::new(element))
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnType::String => write!(f, "string"),
            ColumnType::Int64 => write!(f, "int64"),
            ColumnType::Float64 => write!(f, "float64"),
            ColumnType::Bool => write!(f, "bool"),
            ColumnType::Timestamp => write!(f, "timestamp"),
            ColumnType::Json => write!(f, "json"),
            ColumnType::Uuid => write!(f, "uuid"),
            ColumnType::Struct(StructType::Named(name)) => write!(f, "struct<{name}>"),
            ColumnType::Struct(StructType::Inline(_)) => write!(f, "struct"),
            ColumnType::List(element) => write!(f, "list<{element}>"),
        }
    }
}

/// Shape of a nested object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructType {
    /// Fields declared in place
    Inline(Vec<Column>),
    /// Fields looked up in the [`TypeRegistry`]
    Named(String),
}

/// How an object-valued column is laid out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Nesting {
    /// Flatten fields into the parent as `{column}_{field}`
    Inline,
    /// Promote to a child table keyed by the parent
    #[default]
    ChildTable,
    /// Keep the object as a single JSON column
    Json,
}

/// A column definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Semantic type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Whether the column accepts nulls
    pub nullable: bool,
    /// Part of the synthesized primary key
    #[serde(default)]
    pub primary_key: bool,
    /// Part of the natural key used for key synthesis
    #[serde(default)]
    pub natural_key: bool,
    /// Values are unique within the table
    #[serde(default)]
    pub unique: bool,
    /// Human-readable description (may contain templates until the cosmetic pass)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Layout policy for struct columns
    #[serde(default)]
    pub nesting: Nesting,
    /// Location of the value inside the raw record (empty = the record itself)
    #[serde(default)]
    pub path: Vec<String>,
}

impl Column {
    /// Create a nullable column read from the field of the same name
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        let name = name.into();
        Self {
            path: vec![name.clone()],
            name,
            column_type,
            nullable: true,
            primary_key: false,
            natural_key: false,
            unique: false,
            description: None,
            nesting: Nesting::default(),
        }
    }

    /// The synthesized primary key column
    pub fn cq_id() -> Self {
        Self {
            nullable: false,
            primary_key: true,
            unique: true,
            path: Vec::new(),
            description: Some("Internal identifier synthesized from the natural key".into()),
            ..Self::new(CQ_ID_COLUMN, ColumnType::Uuid)
        }
    }

    /// Foreign key referencing the parent row
    pub fn cq_parent_id() -> Self {
        Self {
            nullable: false,
            path: Vec::new(),
            description: Some("Identifier of the parent row".into()),
            ..Self::new(CQ_PARENT_ID_COLUMN, ColumnType::Uuid)
        }
    }

    /// Element position inside the source array
    pub fn cq_ordinal() -> Self {
        Self {
            nullable: false,
            path: Vec::new(),
            ..Self::new(CQ_ORDINAL_COLUMN, ColumnType::Int64)
        }
    }

    /// Scalar array element
    pub fn element_value(column_type: ColumnType) -> Self {
        Self {
            path: Vec::new(),
            ..Self::new(VALUE_COLUMN, column_type)
        }
    }

    /// Mark the column as not nullable
    #[must_use]
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Mark the column as part of the natural key
    #[must_use]
    pub fn natural_key(mut self) -> Self {
        self.natural_key = true;
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the nesting policy
    #[must_use]
    pub fn with_nesting(mut self, nesting: Nesting) -> Self {
        self.nesting = nesting;
        self
    }

    /// Read the value from a dotted source path instead of the column name
    #[must_use]
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.split('.').map(str::to_string).collect();
        self
    }
}

/// How a child table relates to its parent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// One child row per array element
    Array,
    /// At most one child row per parent
    Object,
}

/// A parent -> child link created by the structural pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    /// Name of the field that produced the child table
    pub field: String,
    /// Location of the nested value inside the parent record
    pub path: Vec<String>,
    /// Relation kind
    pub kind: RelationKind,
    /// The child table
    pub table: Table,
}

/// A relational table definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    /// Unique table name
    pub name: String,
    /// Human-readable title, set by the cosmetic pass
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Ordered columns
    pub columns: Vec<Column>,
    /// Child tables
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<Relation>,
    /// Parent table name (child tables only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl Table {
    /// Create an empty root table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            columns: Vec::new(),
            relations: Vec::new(),
            parent: None,
        }
    }

    /// Add a column
    #[must_use]
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    /// Add several columns
    #[must_use]
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = Column>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Get a column by name
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check whether a column exists
    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Column names in order
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Columns flagged as natural key, in column order
    pub fn natural_key(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.natural_key).collect()
    }

    /// Primary key column names
    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.primary_key)
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Whether this table is a root (has no parent)
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Get a direct child table by the field that created it
    pub fn relation(&self, field: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.field == field)
    }

    /// This table followed by all descendants, depth-first
    pub fn walk(&self) -> Vec<&Table> {
        let mut out = vec![self];
        for relation in &self.relations {
            out.extend(relation.table.walk());
        }
        out
    }

    /// True when no structural columns remain and every table carries a key
    pub fn is_finalized(&self) -> bool {
        self.walk().iter().all(|t| {
            t.has_column(CQ_ID_COLUMN) && t.columns.iter().all(|c| !c.column_type.is_structural())
        })
    }
}

/// Named struct shapes that columns may reference
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeRegistry {
    types: IndexMap<String, Vec<Column>>,
}

impl TypeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Define (or replace) a named type
    pub fn define(&mut self, name: impl Into<String>, fields: Vec<Column>) -> &mut Self {
        self.types.insert(name.into(), fields);
        self
    }

    /// Look up a named type
    pub fn get(&self, name: &str) -> Option<&[Column]> {
        self.types.get(name).map(Vec::as_slice)
    }

    /// Number of named types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
