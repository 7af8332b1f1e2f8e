use crate::models::column_set::ColumnSet;
use crate::models::config::PoolConfig;
use crate::models::error::{LogSinkError, Result};
use crate::models::log_record::WriteOutcome;
use crate::repo::statement::{build_insert, execute};
use log::{debug, info};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::time::Duration;

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn build_pool(config: &PoolConfig) -> Result<DbPool> {
    info!(
        "Initializing database connection pool: {}",
        config.database_file
    );

    let db_file = config.database_file.as_str();
    let is_in_memory = db_file == ":memory:" || db_file.starts_with("file::memory:");
    let use_wal = !is_in_memory;
    let busy_timeout_ms = config.busy_timeout_ms;

    let manager = SqliteConnectionManager::file(db_file).with_init(move |conn| {
        let mut pragmas = format!(
            "PRAGMA busy_timeout = {};
                 PRAGMA synchronous = NORMAL;",
            busy_timeout_ms
        );

        if use_wal {
            pragmas.push_str(" PRAGMA journal_mode = WAL;");
        }

        conn.execute_batch(&pragmas)
    });

    let pool = Pool::builder()
        .max_size(config.max_size)
        .min_idle(config.min_idle)
        .connection_timeout(Duration::from_millis(config.connection_timeout_ms))
        .build(manager)
        .map_err(LogSinkError::PoolBuild)?;

    info!(
        "Database pool created with up to {} connections",
        config.max_size
    );
    Ok(pool)
}

/// Writes rows through a pool the stream created and owns.
pub struct PoolWriter {
    pool: DbPool,
}

impl PoolWriter {
    pub fn new(config: &PoolConfig) -> Result<Self> {
        Ok(PoolWriter {
            pool: build_pool(config)?,
        })
    }

    fn get_connection(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(LogSinkError::PoolAcquire)
    }

    /// Inserts one row. The connection goes back to the pool when this returns,
    /// whether or not the insert succeeded.
    pub fn write(
        &self,
        table: &str,
        columns: &ColumnSet,
        returning: bool,
    ) -> Result<WriteOutcome> {
        let statement = build_insert(table, columns, returning)?;
        let conn = self.get_connection()?;
        let outcome = execute(&conn, table, &statement)?;
        debug!(
            "Inserted {} row(s) into {} via pool",
            outcome.rows_affected, table
        );
        Ok(outcome)
    }

    pub fn state(&self) -> r2d2::State {
        self.pool.state()
    }

    /// Drops the pool, closing every pooled connection once no borrower holds one.
    pub fn close(self) {
        let state = self.pool.state();
        info!(
            "Closing database pool ({} connections, {} idle)",
            state.connections, state.idle_connections
        );
    }
}
