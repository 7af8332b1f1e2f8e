use crate::models::column_set::ColumnSet;
use crate::models::log_record::LogRecord;
use crate::models::schema::Schema;
use rusqlite::types::Value as SqlValue;
use serde_json::Value;

/// Record fields copied one-to-one when no schema is configured.
pub const DEFAULT_FIELDS: [&str; 6] = ["name", "level", "hostname", "msg", "pid", "time"];

/// Column that receives the whole serialized record when no schema is configured.
pub const CONTENT_COLUMN: &str = "content";

/// Doubles every single quote.
pub fn escape_quotes(text: &str) -> String {
    text.replace('\'', "''")
}

/// `null`, `false`, zero and `""` are falsy. Arrays and objects are always truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Builds the row for `record`, using `schema` when one is configured.
pub fn map_to_columns(record: &LogRecord, schema: Option<&Schema>) -> ColumnSet {
    match schema {
        Some(schema) => schema_columns(record, schema),
        None => default_columns(record),
    }
}

fn default_columns(record: &LogRecord) -> ColumnSet {
    let mut columns = ColumnSet::new();
    for field in DEFAULT_FIELDS {
        let value = record
            .get(field)
            .map(|v| column_value(v, false))
            .unwrap_or(SqlValue::Null);
        columns.push(field, value);
    }
    columns.push(CONTENT_COLUMN, SqlValue::Text(escape_quotes(&record.to_json())));
    columns
}

fn schema_columns(record: &LogRecord, schema: &Schema) -> ColumnSet {
    let mut columns = ColumnSet::new();
    for entry in schema.columns() {
        if let Some(value) = entry.path.resolve(record.as_value()) {
            if is_truthy(value) {
                columns.push(&entry.column, column_value(value, true));
            }
        }
    }
    columns
}

fn column_value(value: &Value, escape_structured: bool) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        // u64 values past i64::MAX keep their digits as text.
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None if n.is_u64() => SqlValue::Text(n.to_string()),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Array(_) | Value::Object(_) => {
            let text = value.to_string();
            if escape_structured {
                SqlValue::Text(escape_quotes(&text))
            } else {
                SqlValue::Text(text)
            }
        }
    }
}
