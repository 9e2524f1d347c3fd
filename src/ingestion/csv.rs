//! CSV ingestion of source rows.

use std::path::Path;

use crate::error::{TransformError, TransformResult};
use crate::types::{DataSet, DataType, FieldRole, Row, Schema, Value};

/// Ingest a CSV file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - CSV must have headers.
/// - Headers must contain every input field of the schema (order can differ).
/// - Calculated fields are not read; they start as [`Value::Null`].
/// - Each value is parsed according to the field type.
pub fn ingest_csv_from_path(path: impl AsRef<Path>, schema: &Schema) -> TransformResult<DataSet> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)?;
    ingest_csv_from_reader(&mut rdr, schema)
}

/// Ingest CSV data from an existing CSV reader.
pub fn ingest_csv_from_reader<R: std::io::Read>(
    rdr: &mut csv::Reader<R>,
    schema: &Schema,
) -> TransformResult<DataSet> {
    let headers = rdr.headers()?.clone();

    // (row slot, csv column) for every input field.
    let mut columns = Vec::new();
    for (id, field) in schema.iter() {
        if field.role == FieldRole::Calculated {
            continue;
        }
        match headers.iter().position(|h| h == field.name) {
            Some(idx) => columns.push((id, idx)),
            None => {
                return Err(TransformError::SchemaMismatch {
                    message: format!(
                        "missing required column '{field}'. headers={:?}",
                        headers.iter().collect::<Vec<_>>(),
                        field = field.name
                    ),
                });
            }
        }
    }

    let mut rows = Vec::new();
    for (row_idx0, result) in rdr.records().enumerate() {
        // 1-based, and the header is row 1.
        let user_row = row_idx0 + 2;
        let record = result?;

        let mut row = schema.new_row();
        for &(id, csv_idx) in &columns {
            let Some(field) = schema.field(id) else {
                continue;
            };
            let raw = record.get(csv_idx).unwrap_or("");
            row.set(id, parse_typed_value(user_row, &field.name, field.data_type, raw)?);
        }
        rows.push(row);
    }

    Ok(DataSet::new(schema.clone(), rows))
}

/// Build rows from plain query strings for a schema whose `field` is the transform input.
pub fn rows_from_queries<'a>(
    schema: &Schema,
    field: &str,
    queries: impl IntoIterator<Item = &'a str>,
) -> TransformResult<Vec<Row>> {
    let id = schema.field_id(field).ok_or_else(|| TransformError::SchemaMismatch {
        message: format!("unknown field '{field}'"),
    })?;
    Ok(queries
        .into_iter()
        .map(|q| {
            let mut row = schema.new_row();
            row.set(id, q);
            row
        })
        .collect())
}

fn parse_typed_value(
    row: usize,
    column: &str,
    data_type: DataType,
    raw: &str,
) -> TransformResult<Value> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(Value::Null);
    }

    let parse_error = |message: String| TransformError::ParseError {
        row,
        column: column.to_owned(),
        raw: raw.to_owned(),
        message,
    };

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(trimmed.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| parse_error(e.to_string())),
        DataType::Bool => parse_bool(trimmed).map(Value::Bool).map_err(parse_error),
    }
}

fn parse_bool(s: &str) -> Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "1" | "yes" | "y" => Ok(true),
        "false" | "f" | "0" | "no" | "n" => Ok(false),
        _ => Err("expected bool (true/false/1/0/yes/no)".to_string()),
    }
}
