//! Structural transform pass and key installation
//!
//! `transform_tables` rewrites every struct and list column into flattened
//! columns or child tables. `add_cq_ids` installs the synthesized key once all
//! structural rewriting is done.

use super::types::{
    Column, ColumnType, Nesting, Relation, RelationKind, StructType, Table, TypeRegistry,
    CQ_ID_COLUMN, CQ_PARENT_ID_COLUMN,
};
use crate::error::{Error, Result};
use std::collections::HashSet;
use tracing::debug;

/// Flatten nested columns of every table into child tables or inlined columns.
///
/// Running the pass on already-transformed tables changes nothing.
pub fn transform_tables(tables: &mut [Table], registry: &TypeRegistry) -> Result<()> {
    for table in tables.iter_mut() {
        let mut resolving = Vec::new();
        transform_table(table, registry, &mut resolving)?;
    }
    validate_tables(tables)
}

/// Append `_cq_id` to a table and all its descendants, marking it as primary key.
pub fn add_cq_ids(table: &mut Table) {
    if !table.has_column(CQ_ID_COLUMN) {
        table.columns.push(Column::cq_id());
    }
    for relation in &mut table.relations {
        add_cq_ids(&mut relation.table);
    }
}

fn transform_table(
    table: &mut Table,
    registry: &TypeRegistry,
    resolving: &mut Vec<String>,
) -> Result<()> {
    let columns = std::mem::take(&mut table.columns);
    let mut flat = Vec::with_capacity(columns.len());
    let mut relations = Vec::new();

    for column in columns {
        expand_column(
            &table.name,
            column,
            registry,
            resolving,
            &mut flat,
            &mut relations,
        )?;
    }

    table.columns = flat;

    // Children created in earlier runs are already flat; revisit them so that
    // hand-built relations get the same treatment.
    for relation in &mut table.relations {
        transform_table(&mut relation.table, registry, resolving)?;
    }
    table.relations.extend(relations);
    Ok(())
}

fn expand_column(
    table_name: &str,
    column: Column,
    registry: &TypeRegistry,
    resolving: &mut Vec<String>,
    flat: &mut Vec<Column>,
    relations: &mut Vec<Relation>,
) -> Result<()> {
    match &column.column_type {
        ColumnType::Struct(shape) => match column.nesting {
            Nesting::Json => {
                flat.push(Column {
                    column_type: ColumnType::Json,
                    ..column
                });
            }
            Nesting::Inline => {
                let (fields, pushed) = resolve(table_name, shape, registry, resolving)?;
                for field in fields {
                    let mut path = column.path.clone();
                    path.extend(field.path.iter().cloned());
                    let inlined = Column {
                        name: format!("{}_{}", column.name, field.name),
                        nullable: field.nullable || column.nullable,
                        path,
                        ..field
                    };
                    expand_column(table_name, inlined, registry, resolving, flat, relations)?;
                }
                if pushed {
                    resolving.pop();
                }
            }
            Nesting::ChildTable => {
                let (fields, pushed) = resolve(table_name, shape, registry, resolving)?;
                let mut child = child_table(table_name, &column.name, RelationKind::Object);
                child.columns.extend(fields);
                transform_table(&mut child, registry, resolving)?;
                if pushed {
                    resolving.pop();
                }
                debug!(parent = table_name, child = %child.name, "promoted object to child table");
                relations.push(Relation {
                    field: column.name.clone(),
                    path: column.path.clone(),
                    kind: RelationKind::Object,
                    table: child,
                });
            }
        },
        ColumnType::List(element) => {
            let mut child = child_table(table_name, &column.name, RelationKind::Array);
            let mut pushed = false;
            match element.as_ref() {
                ColumnType::Struct(shape) => {
                    let (fields, did_push) = resolve(table_name, shape, registry, resolving)?;
                    pushed = did_push;
                    child.columns.extend(fields);
                }
                other => child.columns.push(Column::element_value(other.clone())),
            }
            transform_table(&mut child, registry, resolving)?;
            if pushed {
                resolving.pop();
            }
            debug!(parent = table_name, child = %child.name, "promoted array to child table");
            relations.push(Relation {
                field: column.name.clone(),
                path: column.path.clone(),
                kind: RelationKind::Array,
                table: child,
            });
        }
        _ => flat.push(column),
    }
    Ok(())
}

fn child_table(parent: &str, field: &str, kind: RelationKind) -> Table {
    let mut child = Table::new(format!("{parent}_{field}"));
    child.parent = Some(parent.to_string());
    child.columns.push(Column::cq_parent_id());
    if kind == RelationKind::Array {
        child.columns.push(Column::cq_ordinal());
    }
    child
}

/// Resolve a struct shape to its fields. Named shapes are pushed onto the
/// resolution stack; the caller pops when `true` is returned.
fn resolve(
    table_name: &str,
    shape: &StructType,
    registry: &TypeRegistry,
    resolving: &mut Vec<String>,
) -> Result<(Vec<Column>, bool)> {
    match shape {
        StructType::Inline(fields) => Ok((fields.clone(), false)),
        StructType::Named(name) => {
            if let Some(pos) = resolving.iter().position(|n| n == name) {
                let mut path = resolving[pos..].to_vec();
                path.push(name.clone());
                return Err(Error::CyclicNesting { path });
            }
            let fields = registry.get(name).ok_or_else(|| {
                Error::schema(table_name, format!("unknown type '{name}'"))
            })?;
            resolving.push(name.clone());
            Ok((fields.to_vec(), true))
        }
    }
}

/// Check the invariants of a transformed table set
fn validate_tables(tables: &[Table]) -> Result<()> {
    let mut table_names = HashSet::new();

    for table in tables.iter().flat_map(Table::walk) {
        if !table_names.insert(table.name.as_str()) {
            return Err(Error::DuplicateTable {
                table: table.name.clone(),
            });
        }

        let mut column_names = HashSet::new();
        for column in &table.columns {
            if !column_names.insert(column.name.as_str()) {
                return Err(Error::DuplicateColumn {
                    table: table.name.clone(),
                    column: column.name.clone(),
                });
            }
            if column.column_type.is_structural() {
                return Err(Error::schema(
                    &table.name,
                    format!("column '{}' was not flattened", column.name),
                ));
            }
            if column.natural_key && column.column_type == ColumnType::Json {
                return Err(Error::schema(
                    &table.name,
                    format!("JSON column '{}' cannot be part of the natural key", column.name),
                ));
            }
        }

        if let Some(parent) = &table.parent {
            if !table.has_column(CQ_PARENT_ID_COLUMN) {
                return Err(Error::schema(
                    &table.name,
                    format!("child of '{parent}' has no parent key column"),
                ));
            }
        }
    }

    Ok(())
}
