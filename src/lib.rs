//! Persist JSON log records as rows of a SQL table.
//!
//! A [`LogStream`] decodes one JSON object per chunk, maps it to columns (a fixed default
//! set, or a user [`Schema`] of field paths) and inserts a single row, either through a
//! connection pool it owns or through a caller-owned [`QueryBuilder`]. [`StreamWriter`]
//! runs a stream on a background thread and acknowledges each chunk in order.

pub mod models;
pub mod repo;
pub mod service;
pub mod utils;

pub use models::config::{setup_config, PoolConfig, StreamOptions};
pub use models::error::{LogSinkError, Result};
pub use models::log_record::{LogRecord, WriteOutcome};
pub use models::schema::Schema;
pub use repo::builder::{BuilderHandle, QueryBuilder, SqliteQueryBuilder};
pub use service::log_stream::{create_stream, BackendKind, LogStream};
pub use service::stream_writer::{StreamHandle, StreamWriter};
pub use utils::record_logger::{init_record_logger, RecordLogger};
