use crate::models::config::{PoolConfig, StreamOptions};
use crate::models::error::{LogSinkError, Result};
use log::{debug, warn};

/// Validates the parts of the options that are present.
///
/// Missing `connection` or `table_name` is not an error here; the stream reports
/// that when it is constructed.
pub fn validate_options(options: &StreamOptions) -> Result<()> {
    debug!("Validating log stream options...");

    validate_stream_settings(options)?;

    if let Some(pool) = &options.connection {
        validate_pool(pool)?;
    }

    Ok(())
}

/// Checks everything except `connection`, which only matters once a pool is built.
pub fn validate_stream_settings(options: &StreamOptions) -> Result<()> {
    if let Some(table_name) = &options.table_name {
        validate_table_name(table_name)?;
    }

    if let Some(schema) = &options.schema {
        if schema.is_empty() {
            warn!("Schema is empty; every record will be rejected as an empty row");
        }
    }

    Ok(())
}

fn validate_table_name(table_name: &str) -> Result<()> {
    if table_name.trim().is_empty() {
        return Err(LogSinkError::Config(
            "table_name must not be empty".to_string(),
        ));
    }
    // The name is written into the statement verbatim.
    if table_name.contains(';') {
        warn!(
            "table_name '{}' contains ';' and will be interpolated into SQL as-is",
            table_name
        );
    }
    Ok(())
}

pub fn validate_pool(pool: &PoolConfig) -> Result<()> {
    if pool.database_file.is_empty() {
        return Err(LogSinkError::Config(
            "connection.database_file must not be empty. Provide a valid path or use ':memory:'"
                .to_string(),
        ));
    }

    if pool.max_size == 0 {
        return Err(LogSinkError::Config(
            "connection.max_size must be greater than 0".to_string(),
        ));
    }

    if let Some(min_idle) = pool.min_idle {
        if min_idle > pool.max_size {
            return Err(LogSinkError::Config(format!(
                "connection.min_idle ({}) must not exceed connection.max_size ({})",
                min_idle, pool.max_size
            )));
        }
    }

    if pool.connection_timeout_ms == 0 {
        return Err(LogSinkError::Config(
            "connection.connection_timeout_ms must be greater than 0".to_string(),
        ));
    }

    if pool.database_file == ":memory:" && pool.max_size > 1 {
        warn!(
            "':memory:' gives every pooled connection its own database; \
             use 'file::memory:?cache=shared' to share one"
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options_with_pool(pool: PoolConfig) -> StreamOptions {
        StreamOptions::new().with_pool(pool).with_table("logs")
    }

    #[test]
    fn test_valid_options_pass() {
        assert!(validate_options(&options_with_pool(PoolConfig::new("logs.db"))).is_ok());
    }

    #[test]
    fn test_missing_parts_are_not_validation_errors() {
        assert!(validate_options(&StreamOptions::new()).is_ok());
    }

    #[test]
    fn test_empty_table_name_fails() {
        let options = StreamOptions::new().with_table("  ");
        assert!(matches!(
            validate_options(&options),
            Err(LogSinkError::Config(_))
        ));
    }

    #[test]
    fn test_empty_database_file_fails() {
        let result = validate_options(&options_with_pool(PoolConfig::new("")));
        assert!(matches!(result, Err(LogSinkError::Config(_))));
    }

    #[test]
    fn test_min_idle_above_max_size_fails() {
        let pool = PoolConfig::new("logs.db")
            .with_max_size(2)
            .with_min_idle(Some(3));
        match validate_options(&options_with_pool(pool)) {
            Err(LogSinkError::Config(message)) => assert!(message.contains("min_idle")),
            _ => panic!("Expected Config error"),
        }
    }

    #[test]
    fn test_zero_connection_timeout_fails() {
        let pool = PoolConfig::new("logs.db").with_connection_timeout_ms(0);
        assert!(validate_options(&options_with_pool(pool)).is_err());
    }
}
