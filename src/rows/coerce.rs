//! Value coercion against column types

use crate::error::{Error, Result};
use crate::render::canonical_json;
use crate::schema::{Column, ColumnType};
use crate::types::JsonValue;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use uuid::Uuid;

/// Coerce a raw value into the representation stored in a row.
///
/// Missing and null values become null. Timestamps are normalized to RFC 3339
/// with microseconds in UTC, UUIDs to lowercase hyphenated form.
pub fn coerce(column: &Column, raw: Option<&JsonValue>) -> Result<JsonValue> {
    let value = match raw {
        None | Some(JsonValue::Null) => return Ok(JsonValue::Null),
        Some(value) => value,
    };

    let coerced = match &column.column_type {
        ColumnType::Json => Some(value.clone()),
        ColumnType::String => Some(JsonValue::String(match value {
            JsonValue::String(s) => s.clone(),
            JsonValue::Array(_) | JsonValue::Object(_) => canonical_json(value),
            other => other.to_string(),
        })),
        ColumnType::Int64 => to_i64(value).map(JsonValue::from),
        ColumnType::Float64 => to_f64(value).map(JsonValue::from),
        ColumnType::Bool => to_bool(value).map(JsonValue::Bool),
        ColumnType::Timestamp => to_timestamp(value)
            .map(|ts| JsonValue::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true))),
        ColumnType::Uuid => value
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .map(|u| JsonValue::String(u.hyphenated().to_string())),
        ColumnType::Struct(_) | ColumnType::List(_) => {
            return Err(Error::schema(
                column.name.clone(),
                "structural column reached row materialization",
            ))
        }
    };

    coerced.ok_or_else(|| {
        Error::extraction(
            column.path.join("."),
            format!("cannot convert {value} to {}", column.column_type),
        )
    })
}

fn to_i64(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        JsonValue::String(s) => s.trim().parse().ok(),
        JsonValue::Bool(b) => Some(i64::from(*b)),
        _ => None,
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn to_bool(value: &JsonValue) -> Option<bool> {
    match value {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        JsonValue::Number(n) => n.as_i64().map(|i| i != 0),
        _ => None,
    }
}

/// Parse RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or unix seconds
pub(crate) fn to_timestamp(value: &JsonValue) -> Option<DateTime<Utc>> {
    match value {
        JsonValue::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc())
            }),
        JsonValue::Number(n) => {
            if let Some(secs) = n.as_i64() {
                DateTime::from_timestamp(secs, 0)
            } else {
                let f = n.as_f64()?;
                let secs = f.floor();
                let nanos = ((f - secs) * 1e9).round() as u32;
                DateTime::from_timestamp(secs as i64, nanos.min(999_999_999))
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    fn column(ty: ColumnType) -> Column {
        Column::new("c", ty)
    }

    #[test_case(ColumnType::Int64, json!("42"), json!(42) ; "int from string")]
    #[test_case(ColumnType::Int64, json!(3.0), json!(3) ; "int from integral float")]
    #[test_case(ColumnType::Float64, json!(2), json!(2.0) ; "float from int")]
    #[test_case(ColumnType::Bool, json!("true"), json!(true) ; "bool from string")]
    #[test_case(ColumnType::String, json!(7), json!("7") ; "string from number")]
    #[test_case(ColumnType::String, json!({"b": 1, "a": 2}), json!(r#"{"a":2,"b":1}"#) ; "string from object")]
    #[test_case(ColumnType::Json, json!({"a": [1]}), json!({"a": [1]}) ; "json kept raw")]
    #[test_case(ColumnType::Timestamp, json!("2024-01-15T10:30:00+02:00"), json!("2024-01-15T08:30:00.000000Z") ; "timestamp rfc3339")]
    #[test_case(ColumnType::Timestamp, json!("2024-01-15 10:30:00"), json!("2024-01-15T10:30:00.000000Z") ; "timestamp naive")]
    #[test_case(ColumnType::Timestamp, json!(0), json!("1970-01-01T00:00:00.000000Z") ; "timestamp unix seconds")]
    #[test_case(ColumnType::Uuid, json!("550E8400-E29B-41D4-A716-446655440000"), json!("550e8400-e29b-41d4-a716-446655440000") ; "uuid lowercased")]
    fn test_coerce(ty: ColumnType, raw: JsonValue, expected: JsonValue) {
        assert_eq!(coerce(&column(ty), Some(&raw)).unwrap(), expected);
    }

    #[test]
    fn test_missing_and_null_become_null() {
        let col = column(ColumnType::Int64);
        assert_eq!(coerce(&col, None).unwrap(), JsonValue::Null);
        assert_eq!(coerce(&col, Some(&JsonValue::Null)).unwrap(), JsonValue::Null);
    }

    #[test]
    fn test_unconvertible_value_is_an_error() {
        let err = coerce(&column(ColumnType::Int64), Some(&json!("abc"))).unwrap_err();
        assert!(matches!(err, Error::RecordExtraction { ref path, .. } if path == "c"));

        assert!(coerce(&column(ColumnType::Uuid), Some(&json!("not-a-uuid"))).is_err());
    }
}
