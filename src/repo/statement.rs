use crate::models::column_set::ColumnSet;
use crate::models::error::{LogSinkError, Result};
use crate::models::log_record::WriteOutcome;
use log::debug;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, Row};
use serde_json::{Map, Number, Value};

/// A parameterized INSERT ready to run.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub sql: String,
    pub params: Vec<SqlValue>,
    pub returning: bool,
}

/// Builds `INSERT INTO {table} (..) VALUES (?1, ..)` for the columns present.
///
/// The table and column names are written into the SQL verbatim; values are always bound.
pub fn build_insert(table: &str, columns: &ColumnSet, returning: bool) -> Result<InsertStatement> {
    if columns.is_empty() {
        return Err(LogSinkError::EmptyRow {
            table: table.to_string(),
        });
    }

    let names: Vec<&str> = columns.names().collect();
    let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        names.join(", "),
        placeholders.join(", ")
    );
    if returning {
        sql.push_str(" RETURNING *");
    }

    Ok(InsertStatement {
        sql,
        params: columns.values().cloned().collect(),
        returning,
    })
}

/// Runs `statement` on `conn`, collecting returned rows when requested.
pub fn execute(
    conn: &Connection,
    table: &str,
    statement: &InsertStatement,
) -> Result<WriteOutcome> {
    let insert_error = |cause| LogSinkError::DatabaseInsert {
        table: table.to_string(),
        cause,
    };

    debug!("Executing: {}", statement.sql);

    if !statement.returning {
        let rows_affected = conn
            .execute(&statement.sql, params_from_iter(statement.params.iter()))
            .map_err(insert_error)?;
        return Ok(WriteOutcome {
            rows_affected,
            rows: Vec::new(),
        });
    }

    let mut stmt = conn.prepare(&statement.sql).map_err(insert_error)?;
    let names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt
        .query_map(params_from_iter(statement.params.iter()), |row| {
            row_to_map(row, &names)
        })
        .map_err(insert_error)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(insert_error)?;

    Ok(WriteOutcome {
        rows_affected: rows.len(),
        rows,
    })
}

fn row_to_map(row: &Row, names: &[String]) -> rusqlite::Result<Map<String, Value>> {
    let mut map = Map::with_capacity(names.len());
    for (idx, name) in names.iter().enumerate() {
        let value = match row.get_ref(idx)? {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::from(i),
            ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
            ValueRef::Text(text) => Value::String(String::from_utf8_lossy(text).into_owned()),
            ValueRef::Blob(blob) => Value::String(hex::encode(blob)),
        };
        map.insert(name.clone(), value);
    }
    Ok(map)
}
