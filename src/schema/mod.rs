//! Schema module
//!
//! Turns raw table definitions with nested columns into a catalog of flat,
//! keyed relational tables.
//!
//! # Pipeline
//!
//! 1. [`transform_tables`] - structural pass: struct columns are inlined,
//!    kept as JSON or promoted to child tables; list columns always become
//!    child tables carrying `_cq_parent_id` and `_cq_ordinal`
//! 2. [`apply`] - cosmetic pass: titles and templated descriptions
//! 3. [`add_cq_ids`] - installs the synthesized `_cq_id` primary key
//!
//! [`CatalogBuilder`] runs all three in order. Column inference from sample
//! records lives in [`SchemaInferrer`].

mod catalog;
mod inference;
mod naming;
mod transform;
mod types;

pub use catalog::{build_tables, Catalog, CatalogBuilder};
pub use inference::{infer_columns, SchemaInferrer};
pub use naming::{apply, NamingTransformer};
pub use transform::{add_cq_ids, transform_tables};
pub use types::{
    is_reserved, Column, ColumnType, Nesting, Relation, RelationKind, StructType, Table,
    TypeRegistry, CQ_ID_COLUMN, CQ_ORDINAL_COLUMN, CQ_PARENT_ID_COLUMN, VALUE_COLUMN,
};
