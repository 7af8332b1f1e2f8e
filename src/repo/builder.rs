//! Query-builder transport.
//!
//! The caller owns the builder and whatever connection sits behind it; the stream only
//! asks it to insert one row at a time and never opens or closes anything.

use crate::models::column_set::ColumnSet;
use crate::models::error::{LogSinkError, Result};
use crate::models::log_record::WriteOutcome;
use crate::repo::statement::{build_insert, execute};
use log::debug;
use rusqlite::Connection;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Something that can insert a row into a named table.
pub trait QueryBuilder: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Inserts `columns` into `table`, returning the number of affected rows.
    fn execute_insert(&self, table: &str, columns: &ColumnSet) -> Result<usize>;
}

/// Shared, caller-owned handle to a [`QueryBuilder`].
#[derive(Clone)]
pub struct BuilderHandle {
    inner: Arc<dyn QueryBuilder>,
}

impl BuilderHandle {
    pub fn new(builder: Arc<dyn QueryBuilder>) -> Self {
        BuilderHandle { inner: builder }
    }

    /// Starts an insert of `columns`; finish with [`InsertQuery::into_table`] and
    /// [`InsertQuery::execute`].
    pub fn insert(&self, columns: ColumnSet) -> InsertQuery<'_> {
        InsertQuery {
            builder: self.inner.as_ref(),
            columns,
            table: None,
        }
    }
}

impl fmt::Debug for BuilderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuilderHandle")
            .field("builder", &self.inner.name())
            .finish()
    }
}

impl<B: QueryBuilder + 'static> From<Arc<B>> for BuilderHandle {
    fn from(builder: Arc<B>) -> Self {
        BuilderHandle::new(builder)
    }
}

/// A pending insert built through a [`BuilderHandle`].
pub struct InsertQuery<'a> {
    builder: &'a dyn QueryBuilder,
    columns: ColumnSet,
    table: Option<String>,
}

impl InsertQuery<'_> {
    pub fn into_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn execute(self) -> Result<WriteOutcome> {
        let table = self.table.ok_or_else(|| {
            LogSinkError::Builder("insert has no target table".to_string())
        })?;
        if self.columns.is_empty() {
            return Err(LogSinkError::EmptyRow { table });
        }
        let rows_affected = self.builder.execute_insert(&table, &self.columns)?;
        debug!(
            "Inserted {} row(s) into {} via {}",
            rows_affected,
            table,
            self.builder.name()
        );
        Ok(WriteOutcome {
            rows_affected,
            rows: Vec::new(),
        })
    }
}

/// A [`QueryBuilder`] over a single SQLite connection shared with the caller.
pub struct SqliteQueryBuilder {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteQueryBuilder {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        SqliteQueryBuilder { conn }
    }

    pub fn open(db_file: &str) -> Result<Self> {
        let conn = Connection::open(db_file).map_err(|cause| LogSinkError::DatabaseConnection {
            path: db_file.to_string(),
            cause,
        })?;
        Ok(Self::new(Arc::new(Mutex::new(conn))))
    }

    /// The connection behind this builder; it stays usable after the stream ends.
    pub fn connection(&self) -> Arc<Mutex<Connection>> {
        Arc::clone(&self.conn)
    }
}

impl QueryBuilder for SqliteQueryBuilder {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn execute_insert(&self, table: &str, columns: &ColumnSet) -> Result<usize> {
        let statement = build_insert(table, columns, false)?;
        let conn = self
            .conn
            .lock()
            .map_err(|_| LogSinkError::Builder("sqlite connection lock poisoned".to_string()))?;
        Ok(execute(&conn, table, &statement)?.rows_affected)
    }
}
