pub mod column_set;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod field_path;
pub mod log_record;
pub mod schema;
