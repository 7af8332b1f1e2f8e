pub mod record_logger;
