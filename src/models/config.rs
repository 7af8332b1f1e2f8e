use crate::models::config_validator::validate_options;
use crate::models::error::{LogSinkError, Result};
use crate::models::schema::Schema;
use crate::repo::builder::BuilderHandle;
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

/// Settings for the connection pool the stream creates and owns.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PoolConfig {
    pub database_file: String,
    #[serde(default = "default_max_size")]
    pub max_size: u32,
    #[serde(default)]
    pub min_idle: Option<u32>,
    #[serde(default = "default_connection_timeout_ms")]
    pub connection_timeout_ms: u64,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

const fn default_max_size() -> u32 {
    10
}
const fn default_connection_timeout_ms() -> u64 {
    30_000
}
const fn default_busy_timeout_ms() -> u64 {
    5_000
}
const fn bool_false() -> bool {
    false
}

impl PoolConfig {
    pub fn new(database_file: impl Into<String>) -> Self {
        PoolConfig {
            database_file: database_file.into(),
            max_size: default_max_size(),
            min_idle: None,
            connection_timeout_ms: default_connection_timeout_ms(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }

    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    pub fn with_min_idle(mut self, min_idle: Option<u32>) -> Self {
        self.min_idle = min_idle;
        self
    }

    pub fn with_connection_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connection_timeout_ms = timeout_ms;
        self
    }
}

/// Construction options for a [`LogStream`](crate::service::log_stream::LogStream).
///
/// `connection` and `table_name` are optional here so that a config file can be loaded
/// and completed programmatically; their absence is reported when the stream is built.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamOptions {
    #[serde(default)]
    pub connection: Option<PoolConfig>,
    #[serde(default, alias = "tableName")]
    pub table_name: Option<String>,
    #[serde(default)]
    pub schema: Option<Schema>,
    #[serde(default = "bool_false")]
    pub returning: bool,
    /// Caller-owned query builder. Takes precedence over `connection`.
    #[serde(skip)]
    pub builder: Option<BuilderHandle>,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.connection = Some(pool);
        self
    }

    pub fn with_builder(mut self, builder: BuilderHandle) -> Self {
        self.builder = Some(builder);
        self
    }

    pub fn with_table(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = Some(table_name.into());
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_returning(mut self, returning: bool) -> Self {
        self.returning = returning;
        self
    }
}

pub fn setup_config(config_file: &str) -> Result<StreamOptions> {
    let config_path = PathBuf::from(config_file);
    info!("Loading config from: {}", config_path.display());

    let config_str =
        fs::read_to_string(&config_path).map_err(|cause| LogSinkError::ConfigRead {
            path: config_path.clone(),
            cause,
        })?;

    let options: StreamOptions =
        serde_json::from_str(&config_str).map_err(|cause| LogSinkError::ConfigParse {
            path: config_path,
            cause,
        })?;

    validate_options(&options)?;

    Ok(options)
}
