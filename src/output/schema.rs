//! JSON ↔ Arrow conversion
//!
//! Column types are inferred per key across all records. Columns keep the
//! order in which their keys are first seen.

use crate::error::{Error, Result};
use arrow::array::{
    ArrayRef, BooleanArray, Float64Array, Int64Array, ListArray, NullArray, StringArray,
    StructArray,
};
use arrow::buffer::OffsetBuffer;
use arrow::datatypes::{DataType, Field, Fields, Schema};
use arrow::json::writer::{JsonArray, WriterBuilder};
use arrow::record_batch::RecordBatch;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Infer an Arrow schema from JSON objects
///
/// Every column is nullable. Conflicting types widen: integers and floats
/// to `Float64`, anything else to `Utf8`.
pub fn infer_schema(records: &[Value]) -> Result<Schema> {
    let mut names: Vec<String> = Vec::new();
    let mut types: HashMap<String, DataType> = HashMap::new();

    for record in records {
        let Value::Object(obj) = record else {
            return Err(Error::decode(format!(
                "Expected a JSON object, got: {}",
                type_name(record)
            )));
        };
        for (key, value) in obj {
            let inferred = infer_type(value);
            match types.get_mut(key) {
                Some(existing) => *existing = widen(existing, &inferred),
                None => {
                    names.push(key.clone());
                    types.insert(key.clone(), inferred);
                }
            }
        }
    }

    let fields: Vec<Field> = names
        .into_iter()
        .map(|name| {
            let dtype = types.remove(&name).unwrap_or(DataType::Null);
            Field::new(name, dtype, true)
        })
        .collect();
    Ok(Schema::new(fields))
}

/// Build a record batch from JSON objects
///
/// With `schema` set, only its columns are built, in its order; keys the
/// schema does not name are ignored.
pub fn json_to_arrow(records: &[Value], schema: Option<&Schema>) -> Result<RecordBatch> {
    let schema = match schema {
        Some(schema) => schema.clone(),
        None => infer_schema(records)?,
    };
    let schema = Arc::new(schema);

    if records.is_empty() {
        return Ok(RecordBatch::new_empty(schema));
    }

    let columns = schema
        .fields()
        .iter()
        .map(|field| {
            let cells: Vec<Option<&Value>> = records
                .iter()
                .map(|record| record.get(field.name()).filter(|v| !v.is_null()))
                .collect();
            build_array(&cells, field.data_type())
        })
        .collect::<Result<Vec<_>>>()?;

    RecordBatch::try_new(schema, columns)
        .map_err(|e| Error::output(format!("Failed to assemble record batch: {e}")))
}

/// Convert a record batch to JSON objects, one per row
///
/// Null cells are kept as explicit `null`s.
pub fn arrow_to_json(batch: &RecordBatch) -> Result<Vec<Value>> {
    if batch.num_rows() == 0 {
        return Ok(Vec::new());
    }

    let mut writer = WriterBuilder::new()
        .with_explicit_nulls(true)
        .build::<_, JsonArray>(Vec::new());
    writer.write(batch)?;
    writer.finish()?;

    let bytes = writer.into_inner();
    Ok(serde_json::from_slice(&bytes)?)
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn infer_type(value: &Value) -> DataType {
    match value {
        Value::Null => DataType::Null,
        Value::Bool(_) => DataType::Boolean,
        Value::Number(n) if n.is_i64() => DataType::Int64,
        Value::Number(_) => DataType::Float64,
        Value::String(_) => DataType::Utf8,
        Value::Array(items) => {
            let item = items
                .iter()
                .map(infer_type)
                .reduce(|a, b| widen(&a, &b))
                .unwrap_or(DataType::Null);
            DataType::List(Arc::new(Field::new("item", item, true)))
        }
        Value::Object(obj) => DataType::Struct(
            obj.iter()
                .map(|(k, v)| Field::new(k, infer_type(v), true))
                .collect::<Fields>(),
        ),
    }
}

fn widen(a: &DataType, b: &DataType) -> DataType {
    match (a, b) {
        (a, b) if a == b => a.clone(),
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),
        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }
        _ => DataType::Utf8,
    }
}

fn build_array(cells: &[Option<&Value>], data_type: &DataType) -> Result<ArrayRef> {
    let array: ArrayRef = match data_type {
        DataType::Null => Arc::new(NullArray::new(cells.len())),
        DataType::Boolean => Arc::new(
            cells
                .iter()
                .map(|v| v.and_then(Value::as_bool))
                .collect::<BooleanArray>(),
        ),
        DataType::Int64 => Arc::new(
            cells
                .iter()
                .map(|v| v.and_then(Value::as_i64))
                .collect::<Int64Array>(),
        ),
        DataType::Float64 => Arc::new(
            cells
                .iter()
                .map(|v| v.and_then(Value::as_f64))
                .collect::<Float64Array>(),
        ),
        DataType::List(item) => list_array(cells, item)?,
        DataType::Struct(fields) => struct_array(cells, fields)?,
        // Utf8 and anything without a native builder
        _ => Arc::new(
            cells
                .iter()
                .map(|v| {
                    v.map(|v| match v {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                })
                .collect::<StringArray>(),
        ),
    };
    Ok(array)
}

fn list_array(cells: &[Option<&Value>], item: &Arc<Field>) -> Result<ArrayRef> {
    let mut items: Vec<Option<&Value>> = Vec::new();
    let mut offsets: Vec<i32> = Vec::with_capacity(cells.len() + 1);
    offsets.push(0);

    for cell in cells {
        if let Some(Value::Array(values)) = cell {
            items.extend(values.iter().map(|v| Some(v).filter(|v| !v.is_null())));
        }
        let end = i32::try_from(items.len())
            .map_err(|_| Error::output("List column exceeds i32 offsets"))?;
        offsets.push(end);
    }

    let nulls = cells
        .iter()
        .map(|c| matches!(c, Some(Value::Array(_))))
        .collect::<Vec<bool>>();
    let values = build_array(&items, item.data_type())?;
    Ok(Arc::new(ListArray::new(
        Arc::clone(item),
        OffsetBuffer::new(offsets.into()),
        values,
        Some(nulls.into()),
    )))
}

fn struct_array(cells: &[Option<&Value>], fields: &Fields) -> Result<ArrayRef> {
    let nulls = cells
        .iter()
        .map(|c| matches!(c, Some(Value::Object(_))))
        .collect::<Vec<bool>>();
    if fields.is_empty() {
        return Ok(Arc::new(StructArray::new_empty_fields(
            cells.len(),
            Some(nulls.into()),
        )));
    }

    let children = fields
        .iter()
        .map(|field| {
            let child: Vec<Option<&Value>> = cells
                .iter()
                .map(|v| v.and_then(|v| v.get(field.name())).filter(|v| !v.is_null()))
                .collect();
            build_array(&child, field.data_type())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Arc::new(StructArray::new(
        fields.clone(),
        children,
        Some(nulls.into()),
    )))
}
