// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

//! Record schemas in Avro JSON notation, as pipelines describe them, and
//! conversion of incoming batches to that shape.
//!
//! A nullable field is the union of `"null"` and one other type. Logical
//! types `date`, `time-millis`, `time-micros`, `timestamp-millis`,
//! `timestamp-micros`, `decimal` and `datetime` map to the matching Arrow
//! temporal and decimal types.

use std::collections::HashSet;
use std::sync::Arc;

use arrow::array::{ArrayRef, new_null_array};
use arrow::compute::cast;
use arrow_array::RecordBatch;
use arrow_schema::{DataType, Field, Fields, Schema, SchemaRef, TimeUnit};
use serde_json::Value;

use crate::error::{PluginError, Result};

/// Time zone of timestamp fields.
const UTC: &str = "UTC";

/// Parse a record schema.
pub fn parse_schema(json: &str) -> Result<Schema> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| PluginError::InvalidSchema(e.to_string()))?;
    match parse_type(&value)? {
        (DataType::Struct(fields), false) => Ok(Schema::new(fields)),
        _ => Err(invalid("the top level type must be a record")),
    }
}

fn invalid<S: Into<String>>(message: S) -> PluginError {
    PluginError::InvalidSchema(message.into())
}

/// The Arrow type of an Avro type, and whether it admits null.
fn parse_type(value: &Value) -> Result<(DataType, bool)> {
    match value {
        Value::String(name) => Ok((primitive(name)?, name == "null")),
        Value::Array(members) => union(members),
        Value::Object(map) => {
            let kind = map
                .get("type")
                .ok_or_else(|| invalid("type definition without 'type'"))?;
            if let Some(logical) = map.get("logicalType").and_then(Value::as_str) {
                return logical_type(logical, map).map(|t| (t, false));
            }
            match kind.as_str() {
                Some("record") => record(map).map(|t| (t, false)),
                Some("array") => {
                    let items = map
                        .get("items")
                        .ok_or_else(|| invalid("array without 'items'"))?;
                    let (item, nullable) = parse_type(items)?;
                    Ok((DataType::List(Arc::new(Field::new("item", item, nullable))), false))
                }
                Some("map") => {
                    let values = map
                        .get("values")
                        .ok_or_else(|| invalid("map without 'values'"))?;
                    let (key, _) = match map.get("keys") {
                        Some(keys) => parse_type(keys)?,
                        None => (DataType::Utf8, false),
                    };
                    let (value, nullable) = parse_type(values)?;
                    let entries = Field::new(
                        "entries",
                        DataType::Struct(Fields::from(vec![
                            Field::new("keys", key, false),
                            Field::new("values", value, nullable),
                        ])),
                        false,
                    );
                    Ok((DataType::Map(Arc::new(entries), false), false))
                }
                Some("enum") => {
                    let symbols = map.get("symbols").and_then(Value::as_array);
                    if symbols.is_none_or(|s| s.is_empty()) {
                        return Err(invalid("enum without 'symbols'"));
                    }
                    Ok((DataType::Utf8, false))
                }
                Some(name) => Ok((primitive(name)?, name == "null")),
                None => parse_type(kind),
            }
        }
        other => Err(invalid(format!("unexpected type definition {}", other))),
    }
}

fn primitive(name: &str) -> Result<DataType> {
    Ok(match name {
        "null" => DataType::Null,
        "boolean" => DataType::Boolean,
        "int" => DataType::Int32,
        "long" => DataType::Int64,
        "float" => DataType::Float32,
        "double" => DataType::Float64,
        "bytes" => DataType::Binary,
        "string" => DataType::Utf8,
        other => return Err(invalid(format!("unknown type '{}'", other))),
    })
}

fn union(members: &[Value]) -> Result<(DataType, bool)> {
    let mut nullable = false;
    let mut types = Vec::new();
    for member in members {
        match member.as_str() {
            Some("null") => nullable = true,
            _ => types.push(parse_type(member)?.0),
        }
    }
    match types.as_slice() {
        [] if nullable => Ok((DataType::Null, true)),
        [single] => Ok((single.clone(), nullable)),
        _ => Err(invalid(
            "unions other than a type combined with 'null' are not supported",
        )),
    }
}

fn logical_type(name: &str, map: &serde_json::Map<String, Value>) -> Result<DataType> {
    Ok(match name {
        "date" => DataType::Date32,
        "time-millis" => DataType::Time32(TimeUnit::Millisecond),
        "time-micros" => DataType::Time64(TimeUnit::Microsecond),
        "timestamp-millis" => DataType::Timestamp(TimeUnit::Millisecond, Some(UTC.into())),
        "timestamp-micros" => DataType::Timestamp(TimeUnit::Microsecond, Some(UTC.into())),
        "datetime" => DataType::Timestamp(TimeUnit::Microsecond, None),
        "decimal" => {
            let precision = map
                .get("precision")
                .and_then(Value::as_u64)
                .ok_or_else(|| invalid("decimal without 'precision'"))?;
            let scale = map.get("scale").and_then(Value::as_i64).unwrap_or(0);
            let precision = u8::try_from(precision)
                .ok()
                .filter(|p| (1..=38).contains(p))
                .ok_or_else(|| invalid(format!("decimal precision {} out of range", precision)))?;
            let scale = i8::try_from(scale)
                .ok()
                .filter(|s| *s >= 0 && i16::from(*s) <= i16::from(precision))
                .ok_or_else(|| invalid(format!("decimal scale {} out of range", scale)))?;
            DataType::Decimal128(precision, scale)
        }
        other => return Err(invalid(format!("unknown logical type '{}'", other))),
    })
}

fn record(map: &serde_json::Map<String, Value>) -> Result<DataType> {
    let fields = map
        .get("fields")
        .and_then(Value::as_array)
        .ok_or_else(|| invalid("record without 'fields'"))?;
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let name = field
            .get("name")
            .and_then(Value::as_str)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| invalid("field without 'name'"))?;
        if !seen.insert(name) {
            return Err(invalid(format!("duplicate field '{}'", name)));
        }
        let kind = field
            .get("type")
            .ok_or_else(|| invalid(format!("field '{}' without 'type'", name)))?;
        let (data_type, nullable) = parse_type(kind)?;
        out.push(Field::new(name, data_type, nullable));
    }
    Ok(DataType::Struct(Fields::from(out)))
}

/// Select and cast the columns of `batch` to match `schema`.
///
/// Columns are matched by name. A missing nullable column is filled with
/// nulls; a missing or null-holding required column is an error.
pub fn conform(batch: &RecordBatch, schema: &SchemaRef) -> Result<RecordBatch> {
    let rows = batch.num_rows();
    let input = batch.schema();
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());

    for field in schema.fields() {
        let column = match input.index_of(field.name()) {
            Ok(index) => {
                let column = batch.column(index);
                if column.data_type() == field.data_type() {
                    column.clone()
                } else {
                    cast(column, field.data_type())?
                }
            }
            Err(_) if field.is_nullable() => new_null_array(field.data_type(), rows),
            Err(_) => {
                return Err(PluginError::record(format!(
                    "Missing required field '{}'",
                    field.name()
                )));
            }
        };
        if !field.is_nullable() && column.null_count() > 0 {
            return Err(PluginError::record(format!(
                "Field '{}' is not nullable but holds null values",
                field.name()
            )));
        }
        columns.push(column);
    }

    Ok(RecordBatch::try_new(schema.clone(), columns)?)
}
