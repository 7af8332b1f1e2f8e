//! Shared fixtures for stream tests.

use crate::models::column_set::ColumnSet;
use crate::models::config::{PoolConfig, StreamOptions};
use crate::models::error::{LogSinkError, Result};
use crate::repo::builder::{BuilderHandle, QueryBuilder};
use rusqlite::types::Value as SqlValue;
use rusqlite::Connection;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

pub fn pool_options(dir: &TempDir, table: &str) -> StreamOptions {
    let db_file = dir.path().join("logs.db");
    StreamOptions::new()
        .with_pool(PoolConfig::new(db_file.to_str().unwrap()).with_max_size(2))
        .with_table(table)
}

pub fn create_default_table(db_file: &str, table: &str) {
    let conn = Connection::open(db_file).unwrap();
    conn.execute_batch(&format!(
        "CREATE TABLE {} (
            name     TEXT,
            level    INTEGER,
            hostname TEXT,
            msg      TEXT,
            pid      INTEGER,
            time     TEXT,
            content  TEXT);",
        table
    ))
    .unwrap();
}

/// The write-ahead log next to `db_file`. SQLite removes it when the last connection closes.
pub fn wal_file(db_file: &str) -> PathBuf {
    PathBuf::from(format!("{}-wal", db_file))
}

pub fn read_rows(db_file: &str, sql: &str) -> Vec<Vec<SqlValue>> {
    let conn = Connection::open(db_file).unwrap();
    let mut stmt = conn.prepare(sql).unwrap();
    let width = stmt.column_count();
    stmt.query_map([], |row| {
        (0..width)
            .map(|idx| row.get::<_, SqlValue>(idx))
            .collect::<rusqlite::Result<Vec<_>>>()
    })
    .unwrap()
    .collect::<rusqlite::Result<Vec<_>>>()
    .unwrap()
}

/// A query builder that records inserts in memory, optionally sleeping before each one.
#[derive(Default)]
pub struct RecordingBuilder {
    inserted: Mutex<Vec<(String, ColumnSet)>>,
    delays: Mutex<VecDeque<Duration>>,
}

impl RecordingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delays(delays: Vec<Duration>) -> Self {
        RecordingBuilder {
            inserted: Mutex::new(Vec::new()),
            delays: Mutex::new(delays.into()),
        }
    }

    pub fn handle(self: &Arc<Self>) -> BuilderHandle {
        BuilderHandle::from(Arc::clone(self))
    }

    pub fn inserted(&self) -> Vec<(String, ColumnSet)> {
        self.inserted.lock().unwrap().clone()
    }
}

impl QueryBuilder for RecordingBuilder {
    fn name(&self) -> &str {
        "recording"
    }

    fn execute_insert(&self, table: &str, columns: &ColumnSet) -> Result<usize> {
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }
        if table == "broken" {
            return Err(LogSinkError::Builder("table is broken".to_string()));
        }
        self.inserted
            .lock()
            .unwrap()
            .push((table.to_string(), columns.clone()));
        Ok(1)
    }
}
