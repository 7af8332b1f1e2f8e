use crate::models::config::StreamOptions;
use crate::models::config_validator::{validate_pool, validate_stream_settings};
use crate::models::error::{LogSinkError, Result};
use crate::models::log_record::{LogRecord, WriteOutcome};
use crate::models::schema::Schema;
use crate::repo::builder::BuilderHandle;
use crate::repo::pool::PoolWriter;
use crate::service::mapper::map_to_columns;
use log::{info, warn};

/// The transport a stream was bound to at construction.
pub enum Backend {
    /// A pool this stream created and closes when it finishes.
    Pool(PoolWriter),
    /// A caller-owned query builder.
    Builder(BuilderHandle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Pool,
    Builder,
}

/// Persists one JSON log record per write as a row of `table_name`.
pub struct LogStream {
    backend: Option<Backend>,
    table_name: String,
    schema: Option<Schema>,
    returning: bool,
}

/// Same as [`LogStream::new`].
pub fn create_stream(options: StreamOptions) -> Result<LogStream> {
    LogStream::new(options)
}

impl LogStream {
    /// Resolves the transport once: a supplied builder always wins, and only when there is
    /// none is a pool built from `connection`. The pool settings are only validated when
    /// a pool is actually built.
    pub fn new(options: StreamOptions) -> Result<Self> {
        validate_stream_settings(&options)?;

        let StreamOptions {
            connection,
            table_name,
            schema,
            returning,
            builder,
        } = options;

        let missing =
            || LogSinkError::Config("connection and table_name are required".to_string());

        let table_name = table_name.ok_or_else(missing)?;

        let backend = match (builder, connection) {
            (Some(builder), _) => {
                info!("Log stream for '{}' bound to {:?}", table_name, builder);
                if returning {
                    warn!("'returning' is ignored on the query builder path");
                }
                Backend::Builder(builder)
            }
            (None, Some(pool)) => {
                info!(
                    "Log stream for '{}' bound to a new pool on {}",
                    table_name, pool.database_file
                );
                validate_pool(&pool)?;
                Backend::Pool(PoolWriter::new(&pool)?)
            }
            (None, None) => return Err(missing()),
        };

        Ok(LogStream {
            backend: Some(backend),
            table_name,
            schema,
            returning,
        })
    }

    pub fn backend_kind(&self) -> Option<BackendKind> {
        self.backend.as_ref().map(|backend| match backend {
            Backend::Pool(_) => BackendKind::Pool,
            Backend::Builder(_) => BackendKind::Builder,
        })
    }

    pub fn owns_pool(&self) -> bool {
        matches!(self.backend, Some(Backend::Pool(_)))
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Decodes one chunk and inserts it. Every chunk gets exactly one result, and a
    /// failed insert leaves the stream usable for the next chunk.
    pub fn write(&self, chunk: &[u8]) -> Result<WriteOutcome> {
        let record = LogRecord::decode(chunk)?;
        self.write_record(&record)
    }

    pub fn write_record(&self, record: &LogRecord) -> Result<WriteOutcome> {
        let columns = map_to_columns(record, self.schema.as_ref());
        match self.backend.as_ref().ok_or(LogSinkError::StreamClosed)? {
            Backend::Pool(writer) => writer.write(&self.table_name, &columns, self.returning),
            Backend::Builder(builder) => builder
                .insert(columns)
                .into_table(self.table_name.as_str())
                .execute(),
        }
    }

    /// Ends the stream, closing the pool if this stream created one.
    pub fn finish(mut self) {
        self.close();
    }

    fn close(&mut self) {
        match self.backend.take() {
            Some(Backend::Pool(writer)) => writer.close(),
            Some(Backend::Builder(_)) => {
                info!("Log stream for '{}' finished", self.table_name)
            }
            None => {}
        }
    }
}

impl Drop for LogStream {
    fn drop(&mut self) {
        self.close();
    }
}
