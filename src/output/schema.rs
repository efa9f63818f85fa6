//! Arrow schema mapping and row to Arrow conversion
//!
//! Maps finalized tables onto Arrow schemas and materialized rows onto
//! RecordBatches.

use crate::error::{Error, Result};
use crate::rows::{to_timestamp, Row};
use crate::schema::{Column, ColumnType, Table};
use crate::types::JsonValue;
use arrow::array::{
    Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray, TimestampMicrosecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, SecondsFormat};
use std::sync::Arc;

const UTC: &str = "UTC";

/// Arrow data type of a finalized column
pub fn arrow_type(column_type: &ColumnType) -> Result<DataType> {
    Ok(match column_type {
        ColumnType::String | ColumnType::Uuid | ColumnType::Json => DataType::Utf8,
        ColumnType::Int64 => DataType::Int64,
        ColumnType::Float64 => DataType::Float64,
        ColumnType::Bool => DataType::Boolean,
        ColumnType::Timestamp => DataType::Timestamp(TimeUnit::Microsecond, Some(UTC.into())),
        ColumnType::Struct(_) | ColumnType::List(_) => {
            return Err(Error::output(format!(
                "structural type {column_type} has no Arrow mapping"
            )))
        }
    })
}

/// Arrow schema of a finalized table (children excluded)
pub fn table_schema(table: &Table) -> Result<Schema> {
    let fields = table
        .columns
        .iter()
        .map(|c| Ok(Field::new(&c.name, arrow_type(&c.column_type)?, c.nullable)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Schema::new(fields))
}

/// Convert materialized rows of one table to a RecordBatch
pub fn rows_to_batch(table: &Table, rows: &[Row]) -> Result<RecordBatch> {
    let schema = Arc::new(table_schema(table)?);

    if rows.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let mut columns: Vec<ArrayRef> = Vec::with_capacity(table.columns.len());

    for column in &table.columns {
        let values: Vec<Option<&JsonValue>> = rows
            .iter()
            .map(|row| row.get(&column.name).filter(|v| !v.is_null()))
            .collect();

        let array = build_array(&values, column)?;
        if !column.nullable && array.null_count() > 0 {
            return Err(Error::output(format!(
                "column '{}' of table '{}' is not nullable but has {} null values",
                column.name,
                table.name,
                array.null_count()
            )));
        }
        columns.push(array);
    }

    RecordBatch::try_new(schema, columns).map_err(|e| Error::Output {
        message: format!("Failed to create RecordBatch for '{}': {e}", table.name),
    })
}

/// Build an Arrow array from row values
fn build_array(values: &[Option<&JsonValue>], column: &Column) -> Result<ArrayRef> {
    match &column.column_type {
        ColumnType::Bool => {
            let arr: BooleanArray = values.iter().map(|v| v.and_then(JsonValue::as_bool)).collect();
            Ok(Arc::new(arr))
        }

        ColumnType::Int64 => {
            let arr: Int64Array = values.iter().map(|v| v.and_then(JsonValue::as_i64)).collect();
            Ok(Arc::new(arr))
        }

        ColumnType::Float64 => {
            #[allow(clippy::cast_precision_loss)]
            let arr: Float64Array = values
                .iter()
                .map(|v| v.and_then(|v| v.as_f64().or_else(|| v.as_i64().map(|i| i as f64))))
                .collect();
            Ok(Arc::new(arr))
        }

        ColumnType::Timestamp => {
            let micros = values
                .iter()
                .map(|v| match v {
                    None => Ok(None),
                    Some(v) => to_timestamp(v)
                        .map(|ts| Some(ts.timestamp_micros()))
                        .ok_or_else(|| {
                            Error::output(format!("invalid timestamp {v} in column '{}'", column.name))
                        }),
                })
                .collect::<Result<Vec<_>>>()?;
            let arr = TimestampMicrosecondArray::from(micros).with_timezone(UTC);
            Ok(Arc::new(arr))
        }

        ColumnType::String | ColumnType::Uuid | ColumnType::Json => {
            let arr: StringArray = values
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        JsonValue::String(s) => s.clone(),
                        _ => v.to_string(),
                    })
                })
                .collect();
            Ok(Arc::new(arr))
        }

        ColumnType::Struct(_) | ColumnType::List(_) => Err(Error::output(format!(
            "column '{}' is still structural",
            column.name
        ))),
    }
}

/// Convert an Arrow RecordBatch back to rows
///
/// Timestamps come back as RFC 3339 strings, the form rows carry them in.
pub fn batch_to_rows(batch: &RecordBatch) -> Result<Vec<Row>> {
    let schema = batch.schema();
    let mut rows = Vec::with_capacity(batch.num_rows());

    for row_idx in 0..batch.num_rows() {
        let mut row = Row::with_capacity(schema.fields().len());
        for (col_idx, field) in schema.fields().iter().enumerate() {
            let value = array_value_to_json(batch.column(col_idx).as_ref(), row_idx)?;
            row.insert(field.name().clone(), value);
        }
        rows.push(row);
    }

    Ok(rows)
}

/// Convert a single array element to JSON
fn array_value_to_json(array: &dyn Array, row: usize) -> Result<JsonValue> {
    if array.is_null(row) {
        return Ok(JsonValue::Null);
    }

    match array.data_type() {
        DataType::Boolean => Ok(JsonValue::Bool(downcast::<BooleanArray>(array)?.value(row))),

        DataType::Int64 => Ok(JsonValue::from(downcast::<Int64Array>(array)?.value(row))),

        DataType::Float64 => {
            let val = downcast::<Float64Array>(array)?.value(row);
            Ok(serde_json::Number::from_f64(val).map_or(JsonValue::Null, JsonValue::Number))
        }

        DataType::Utf8 => Ok(JsonValue::String(
            downcast::<StringArray>(array)?.value(row).to_string(),
        )),

        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            let micros = downcast::<TimestampMicrosecondArray>(array)?.value(row);
            let ts = DateTime::from_timestamp_micros(micros)
                .ok_or_else(|| Error::output(format!("timestamp out of range: {micros}")))?;
            Ok(JsonValue::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true)))
        }

        other => Err(Error::output(format!("unsupported Arrow type {other}"))),
    }
}

fn downcast<A: Array + 'static>(array: &dyn Array) -> Result<&A> {
    array.as_any().downcast_ref::<A>().ok_or_else(|| Error::Output {
        message: format!(
            "Failed to downcast {} to {}",
            array.data_type(),
            std::any::type_name::<A>()
        ),
    })
}
