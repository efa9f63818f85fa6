//! Column inference from sample JSON records
//!
//! Produces raw (pre-transform) columns: nested objects become inline struct
//! types and arrays become list types, so the structural pass decides layout.

use super::types::{Column, ColumnType, StructType};
use crate::types::JsonValue;
use indexmap::IndexMap;
use regex::Regex;
use std::sync::LazyLock;

static DATETIME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}[T ]\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?$")
        .expect("valid regex")
});

static UUID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("valid regex")
});

/// Column inferrer with configuration options
#[derive(Debug, Clone)]
pub struct SchemaInferrer {
    /// Detect RFC 3339 timestamps in strings
    detect_datetime: bool,
    /// Detect UUIDs in strings
    detect_uuid: bool,
    /// Objects nested deeper than this become JSON columns
    max_depth: usize,
}

impl Default for SchemaInferrer {
    fn default() -> Self {
        Self::new()
    }
}

/// Intermediate per-field state while merging records
#[derive(Debug, Clone)]
struct Inferred {
    column_type: ColumnType,
    nullable: bool,
}

impl SchemaInferrer {
    /// Create a new inferrer with default settings
    pub fn new() -> Self {
        Self {
            detect_datetime: true,
            detect_uuid: true,
            max_depth: 5,
        }
    }

    /// Enable/disable timestamp detection
    #[must_use]
    pub fn with_datetime_detection(mut self, enabled: bool) -> Self {
        self.detect_datetime = enabled;
        self
    }

    /// Enable/disable UUID detection
    #[must_use]
    pub fn with_uuid_detection(mut self, enabled: bool) -> Self {
        self.detect_uuid = enabled;
        self
    }

    /// Set maximum depth for nested objects
    #[must_use]
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Infer columns from a set of records.
    ///
    /// Fields missing from some records, or null in any, are nullable.
    /// Non-object records are ignored.
    pub fn infer(&self, records: &[JsonValue]) -> Vec<Column> {
        let objects: Vec<_> = records.iter().filter_map(JsonValue::as_object).collect();
        self.infer_fields(&objects, 0)
    }

    fn infer_fields(
        &self,
        objects: &[&serde_json::Map<String, JsonValue>],
        depth: usize,
    ) -> Vec<Column> {
        let mut fields: IndexMap<String, (Inferred, usize)> = IndexMap::new();

        for object in objects {
            for (key, value) in *object {
                let inferred = self.infer_value(value, depth);
                match fields.get_mut(key) {
                    Some((existing, seen)) => {
                        *existing = merge(existing, &inferred);
                        *seen += 1;
                    }
                    None => {
                        fields.insert(key.clone(), (inferred, 1));
                    }
                }
            }
        }

        // Nested struct fields were inferred one value at a time; re-infer
        // them across every sample so their nullability is merged too.
        fields
            .into_iter()
            .map(|(name, (inferred, seen))| {
                let column_type = match inferred.column_type {
                    ColumnType::Struct(StructType::Inline(_)) => {
                        let nested: Vec<_> = objects
                            .iter()
                            .filter_map(|o| o.get(&name).and_then(JsonValue::as_object))
                            .collect();
                        ColumnType::inline_struct(self.infer_fields(&nested, depth + 1))
                    }
                    other => other,
                };
                let mut column = Column::new(name, column_type);
                column.nullable = inferred.nullable || seen < objects.len();
                column
            })
            .collect()
    }

    fn infer_value(&self, value: &JsonValue, depth: usize) -> Inferred {
        let column_type = match value {
            JsonValue::Null => {
                return Inferred {
                    column_type: ColumnType::String,
                    nullable: true,
                }
            }
            JsonValue::Bool(_) => ColumnType::Bool,
            JsonValue::Number(n) if n.is_i64() || n.is_u64() => ColumnType::Int64,
            JsonValue::Number(_) => ColumnType::Float64,
            JsonValue::String(s) => self.infer_string(s),
            JsonValue::Array(items) => ColumnType::list(self.infer_element(items, depth)),
            JsonValue::Object(map) => {
                if depth >= self.max_depth {
                    ColumnType::Json
                } else {
                    ColumnType::inline_struct(self.infer_fields(&[map], depth + 1))
                }
            }
        };
        Inferred {
            column_type,
            nullable: false,
        }
    }

    fn infer_element(&self, items: &[JsonValue], depth: usize) -> ColumnType {
        let non_null: Vec<_> = items.iter().filter(|v| !v.is_null()).collect();
        if non_null.is_empty() {
            return ColumnType::Json;
        }

        let objects: Vec<_> = non_null.iter().filter_map(|v| v.as_object()).collect();
        if objects.len() == non_null.len() && depth < self.max_depth {
            return ColumnType::inline_struct(self.infer_fields(&objects, depth + 1));
        }

        non_null
            .iter()
            .map(|v| self.infer_value(v, depth + 1))
            .reduce(|a, b| merge(&a, &b))
            .map_or(ColumnType::Json, |i| match i.column_type {
                // Arrays of arrays are not promoted further
                ColumnType::List(_) => ColumnType::Json,
                other => other,
            })
    }

    fn infer_string(&self, s: &str) -> ColumnType {
        if self.detect_datetime && DATETIME_RE.is_match(s) {
            ColumnType::Timestamp
        } else if self.detect_uuid && UUID_RE.is_match(s) {
            ColumnType::Uuid
        } else {
            ColumnType::String
        }
    }
}

/// Infer columns with default settings (convenience function)
pub fn infer_columns(records: &[JsonValue]) -> Vec<Column> {
    SchemaInferrer::new().infer(records)
}

/// Merge two observations of the same field
fn merge(a: &Inferred, b: &Inferred) -> Inferred {
    // A null observation carries no type information
    if a.nullable && a.column_type == ColumnType::String && b.column_type != ColumnType::String {
        return Inferred {
            column_type: b.column_type.clone(),
            nullable: true,
        };
    }
    if b.nullable && b.column_type == ColumnType::String && a.column_type != ColumnType::String {
        return Inferred {
            column_type: a.column_type.clone(),
            nullable: true,
        };
    }

    Inferred {
        column_type: merge_types(&a.column_type, &b.column_type),
        nullable: a.nullable || b.nullable,
    }
}

fn merge_types(a: &ColumnType, b: &ColumnType) -> ColumnType {
    use ColumnType::*;
    match (a, b) {
        _ if a == b => a.clone(),
        (Int64, Float64) | (Float64, Int64) => Float64,
        (Timestamp | Uuid, String) | (String, Timestamp | Uuid) | (Timestamp, Uuid)
        | (Uuid, Timestamp) => String,
        // Struct fields are re-inferred across all samples by the caller
        (Struct(_), Struct(_)) => a.clone(),
        (List(x), List(y)) => match merge_types(x, y) {
            List(_) => Json,
            merged => ColumnType::list(merged),
        },
        _ => Json,
    }
}
