//! Schema conformance for normalized records.
//!
//! [`conform`] is a single pass over one record: fields the catalog
//! deselected or the schema does not declare are removed, and every
//! remaining value is coerced to its declared JSON-schema type.

use serde_json::{Number, Value};

use dynamics_core::catalog::{field_selected, MetadataMap};
use dynamics_core::{format_datetime, parse_datetime, Record, Schema};

use crate::error::SyncError;

/// A record that fits its stream's schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Conformed {
    pub record: Record,
    /// Fields dropped because they were deselected or undeclared.
    pub removed: Vec<String>,
}

/// Fit `record` to `schema`, honouring field selection in `mdata`.
///
/// Every field that cannot be coerced is reported in one
/// [`SyncError::SchemaMismatch`].
pub fn conform(
    stream: &str,
    record: Record,
    schema: &Schema,
    mdata: &MetadataMap,
) -> Result<Conformed, SyncError> {
    let mut out = Record::new();
    let mut removed = Vec::new();
    let mut errors = Vec::new();

    for (field, value) in record {
        let Some(field_schema) = schema.properties.get(&field) else {
            removed.push(field);
            continue;
        };
        if !field_selected(mdata, &field) {
            removed.push(field);
            continue;
        }
        match coerce(value, field_schema, &field) {
            Ok(v) => {
                out.insert(field, v);
            }
            Err(e) => errors.push(e),
        }
    }

    if !errors.is_empty() {
        return Err(SyncError::SchemaMismatch {
            stream: stream.to_string(),
            errors,
        });
    }
    Ok(Conformed {
        record: out,
        removed,
    })
}

/// Declared types of a property schema, in declaration order.
fn declared_types(schema: &Value) -> Vec<&str> {
    match schema.get("type") {
        Some(Value::String(t)) => vec![t.as_str()],
        Some(Value::Array(ts)) => ts.iter().filter_map(Value::as_str).collect(),
        _ => Vec::new(),
    }
}

fn coerce(value: Value, schema: &Value, path: &str) -> Result<Value, String> {
    let types = declared_types(schema);
    if types.is_empty() {
        return Ok(value);
    }
    if value.is_null() {
        return if types.contains(&"null") {
            Ok(Value::Null)
        } else {
            Err(format!("{path}: null is not allowed (expected {})", types.join("|")))
        };
    }
    for ty in types.iter().filter(|t| **t != "null") {
        if let Some(v) = coerce_to(&value, ty, schema, path)? {
            return Ok(v);
        }
    }
    Err(format!("{path}: {value} is not of type {}", types.join("|")))
}

/// `Ok(None)` means "not this type, try the next one".
fn coerce_to(value: &Value, ty: &str, schema: &Value, path: &str) -> Result<Option<Value>, String> {
    let coerced = match ty {
        "string" => {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => return Ok(None),
            };
            if schema.get("format").and_then(Value::as_str) == Some("date-time") {
                parse_datetime(&text).map(|dt| Value::String(format_datetime(dt)))
            } else {
                Some(Value::String(text))
            }
        }
        "integer" => match value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(value.clone()),
            Value::Number(n) => n
                .as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| Value::from(f as i64)),
            Value::String(s) => s.trim().parse::<i64>().ok().map(Value::from),
            _ => None,
        },
        "number" => match value {
            Value::Number(_) => Some(value.clone()),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(Number::from_f64)
                .map(Value::Number),
            _ => None,
        },
        "boolean" => match value {
            Value::Bool(_) => Some(value.clone()),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(Value::Bool(false)),
                Some(1) => Some(Value::Bool(true)),
                _ => None,
            },
            Value::String(s) => match s.to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            _ => None,
        },
        "object" => match value {
            Value::Object(_) => Some(value.clone()),
            _ => None,
        },
        "array" => match value {
            Value::Array(items) => match schema.get("items") {
                Some(item_schema) => {
                    let mut out = Vec::with_capacity(items.len());
                    for (i, item) in items.iter().enumerate() {
                        out.push(coerce(item.clone(), item_schema, &format!("{path}[{i}]"))?);
                    }
                    Some(Value::Array(out))
                }
                None => Some(value.clone()),
            },
            _ => None,
        },
        _ => Some(value.clone()),
    };
    Ok(coerced)
}
