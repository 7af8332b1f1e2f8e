use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LogSinkError {
    #[error("Invalid log stream configuration: {0}")]
    Config(String),

    #[error("Failed to read config file '{path}': {cause}")]
    ConfigRead { path: PathBuf, cause: io::Error },

    #[error("Failed to parse config file '{path}': {cause}")]
    ConfigParse {
        path: PathBuf,
        cause: serde_json::Error,
    },

    #[error("Invalid field path '{path}': {reason}")]
    InvalidFieldPath { path: String, reason: String },

    #[error("Failed to decode log record: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Log record must be a JSON object")]
    NotAnObject,

    #[error("Failed to open or create database file '{path}': {cause}")]
    DatabaseConnection {
        path: String,
        cause: rusqlite::Error,
    },

    #[error("Failed to create database connection pool: {0}")]
    PoolBuild(#[source] r2d2::Error),

    #[error("Failed to get database connection from pool: {0}")]
    PoolAcquire(#[source] r2d2::Error),

    #[error("Failed to insert into {table}: {cause}")]
    DatabaseInsert {
        table: String,
        cause: rusqlite::Error,
    },

    #[error("Query builder failed: {0}")]
    Builder(String),

    #[error("No columns to insert into {table}: every schema field was empty")]
    EmptyRow { table: String },

    #[error("Log stream has already ended")]
    StreamClosed,

    #[error("Log stream worker thread panicked")]
    WorkerPanicked,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl LogSinkError {
    /// True when the chunk itself was malformed, as opposed to a database failure.
    pub fn is_decode(&self) -> bool {
        matches!(self, LogSinkError::Decode(_) | LogSinkError::NotAnObject)
    }
}

pub type Result<T> = std::result::Result<T, LogSinkError>;
