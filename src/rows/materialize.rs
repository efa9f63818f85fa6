//! Row materialization
//!
//! Walks raw records alongside a finalized table tree and produces one row set
//! per table, wiring synthesized keys from parents into children.

use super::coerce::coerce;
use crate::error::{Error, Result};
use crate::key::{synthesize, CqId};
use crate::render::canonical_json;
use crate::schema::{
    is_reserved, Column, ColumnType, Relation, RelationKind, Table, CQ_ID_COLUMN,
    CQ_ORDINAL_COLUMN, CQ_PARENT_ID_COLUMN,
};
use crate::types::JsonValue;
use indexmap::IndexMap;

/// One materialized row: column name -> value, in column order
pub type Row = IndexMap<String, JsonValue>;

/// Rows of a table tree, keyed by table name in tree order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableRows {
    tables: IndexMap<String, Vec<Row>>,
}

impl TableRows {
    /// Empty row sets for every table of the tree
    pub fn for_table(table: &Table) -> Self {
        Self {
            tables: table
                .walk()
                .into_iter()
                .map(|t| (t.name.clone(), Vec::new()))
                .collect(),
        }
    }

    /// Rows of one table
    pub fn get(&self, table: &str) -> &[Row] {
        self.tables.get(table).map_or(&[], Vec::as_slice)
    }

    /// Table names in tree order
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// (table, rows) pairs in tree order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Row])> {
        self.tables.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Row count per table
    pub fn counts(&self) -> IndexMap<String, usize> {
        self.tables
            .iter()
            .map(|(k, v)| (k.clone(), v.len()))
            .collect()
    }

    /// Total rows over all tables
    pub fn total_rows(&self) -> usize {
        self.tables.values().map(Vec::len).sum()
    }

    /// Consume into the underlying map
    pub fn into_inner(self) -> IndexMap<String, Vec<Row>> {
        self.tables
    }

    fn push(&mut self, table: &str, row: Row) {
        self.tables.entry(table.to_string()).or_default().push(row);
    }
}

/// Materialize raw records of a root table and all its descendants
pub fn materialize(table: &Table, records: &[JsonValue]) -> Result<TableRows> {
    let mut out = TableRows::for_table(table);
    for record in records {
        materialize_row(table, record, None, None, &mut out)?;
    }
    Ok(out)
}

fn materialize_row(
    table: &Table,
    source: &JsonValue,
    parent: Option<&CqId>,
    ordinal: Option<usize>,
    out: &mut TableRows,
) -> Result<CqId> {
    let mut row = Row::with_capacity(table.columns.len());

    for column in &table.columns {
        let value = match column.name.as_str() {
            CQ_ID_COLUMN => JsonValue::Null,
            CQ_PARENT_ID_COLUMN => parent.map_or(JsonValue::Null, |p| JsonValue::from(*p)),
            CQ_ORDINAL_COLUMN => ordinal.map_or(JsonValue::Null, |o| JsonValue::from(o as i64)),
            _ => coerce(column, lookup(source, &column.path))?,
        };
        row.insert(column.name.clone(), value);
    }

    let id = row_key(table, &row, parent, ordinal)?;
    if table.has_column(CQ_ID_COLUMN) {
        row.insert(CQ_ID_COLUMN.to_string(), JsonValue::from(id));
    }
    out.push(&table.name, row);

    for relation in &table.relations {
        materialize_relation(relation, source, &id, out)?;
    }
    Ok(id)
}

fn materialize_relation(
    relation: &Relation,
    source: &JsonValue,
    parent: &CqId,
    out: &mut TableRows,
) -> Result<()> {
    let nested = match lookup(source, &relation.path) {
        None | Some(JsonValue::Null) => return Ok(()),
        Some(nested) => nested,
    };

    match (relation.kind, nested) {
        (RelationKind::Array, JsonValue::Array(items)) => {
            for (i, item) in items.iter().enumerate() {
                materialize_row(&relation.table, item, Some(parent), Some(i), out)?;
            }
            Ok(())
        }
        (RelationKind::Object, JsonValue::Object(_)) => {
            materialize_row(&relation.table, nested, Some(parent), None, out).map(|_| ())
        }
        (kind, other) => Err(Error::extraction(
            relation.path.join("."),
            format!("expected {} for table '{}', found {other}", kind_name(kind), relation.table.name),
        )),
    }
}

/// Synthesize a row's key.
///
/// With a declared natural key: natural key + parent. Without one: every
/// non-reserved column, plus the element ordinal for array children.
fn row_key(table: &Table, row: &Row, parent: Option<&CqId>, ordinal: Option<usize>) -> Result<CqId> {
    let declared = table.natural_key();

    let mut values: Vec<JsonValue> = if declared.is_empty() {
        table
            .columns
            .iter()
            .filter(|c| !is_reserved(&c.name))
            .map(|c| key_value(c, row))
            .collect()
    } else {
        declared.iter().map(|c| key_value(c, row)).collect()
    };

    if declared.is_empty() {
        if let Some(ordinal) = ordinal {
            values.push(JsonValue::from(ordinal as i64));
        }
    }

    let refs: Vec<Option<&JsonValue>> = values.iter().map(Some).collect();
    synthesize(&refs, parent)
}

/// JSON columns take part in default keys through their canonical text
fn key_value(column: &Column, row: &Row) -> JsonValue {
    let value = row.get(&column.name).cloned().unwrap_or(JsonValue::Null);
    match (&column.column_type, &value) {
        (ColumnType::Json, JsonValue::Array(_) | JsonValue::Object(_)) => {
            JsonValue::String(canonical_json(&value))
        }
        _ => value,
    }
}

fn lookup<'a>(value: &'a JsonValue, path: &[String]) -> Option<&'a JsonValue> {
    path.iter().try_fold(value, |current, part| current.get(part))
}

fn kind_name(kind: RelationKind) -> &'static str {
    match kind {
        RelationKind::Array => "an array",
        RelationKind::Object => "an object",
    }
}
