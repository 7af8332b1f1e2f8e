use crate::service::stream_writer::StreamHandle;
use log::{Level, LevelFilter, Log, Metadata, Record};
use once_cell::sync::Lazy;
use serde_json::{json, Map, Value};
use std::env;
use std::fs;

/// Targets never sent to the database; writing them would log again from the worker.
const SKIPPED_TARGETS: [&str; 2] = ["rusty_log_sink", "r2d2"];

static HOSTNAME: Lazy<String> = Lazy::new(resolve_hostname);

/// `HOSTNAME`, then `/etc/hostname`, then `localhost`.
pub fn resolve_hostname() -> String {
    env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .or_else(|| {
            fs::read_to_string("/etc/hostname")
                .ok()
                .map(|h| h.trim().to_string())
                .filter(|h| !h.is_empty())
        })
        .unwrap_or_else(|| "localhost".to_string())
}

/// Numeric levels used in the `level` field of a log record.
pub fn numeric_level(level: Level) -> u8 {
    match level {
        Level::Trace => 10,
        Level::Debug => 20,
        Level::Info => 30,
        Level::Warn => 40,
        Level::Error => 50,
    }
}

/// Logger that turns every `log` record into a JSON log record and queues it on a stream
pub struct RecordLogger {
    name: String,
    level: LevelFilter,
    handle: StreamHandle,
    echo_stderr: bool,
}

impl RecordLogger {
    pub fn new(name: impl Into<String>, level: LevelFilter, handle: StreamHandle) -> Self {
        RecordLogger {
            name: name.into(),
            level,
            handle,
            echo_stderr: false,
        }
    }

    /// Also print each record to stderr
    pub fn with_stderr_echo(mut self, echo: bool) -> Self {
        self.echo_stderr = echo;
        self
    }

    /// Get the log level filter
    pub fn level(&self) -> LevelFilter {
        self.level
    }

    /// Serialized form of `record`, one JSON object.
    pub fn to_chunk(&self, record: &Record) -> Vec<u8> {
        let mut fields = Map::new();
        fields.insert("name".into(), Value::from(self.name.as_str()));
        fields.insert("hostname".into(), Value::from(HOSTNAME.as_str()));
        fields.insert("pid".into(), Value::from(std::process::id()));
        fields.insert("level".into(), Value::from(numeric_level(record.level())));
        fields.insert("msg".into(), Value::from(record.args().to_string()));
        fields.insert(
            "time".into(),
            Value::from(
                chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            ),
        );
        fields.insert("target".into(), Value::from(record.target()));
        if let (Some(file), Some(line)) = (record.file(), record.line()) {
            fields.insert("src".into(), json!({"file": file, "line": line}));
        }
        fields.insert("v".into(), Value::from(0));
        Value::Object(fields).to_string().into_bytes()
    }

    fn is_skipped(target: &str) -> bool {
        SKIPPED_TARGETS.iter().any(|skipped| {
            target
                .strip_prefix(*skipped)
                .map_or(false, |rest| rest.is_empty() || rest.starts_with("::"))
        })
    }
}

impl Log for RecordLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        if self.echo_stderr {
            eprintln!(
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            );
        }

        if Self::is_skipped(record.target()) {
            return;
        }

        // Queue without waiting; ignore errors once the stream has ended
        let _ = self.handle.submit(self.to_chunk(record));
    }

    fn flush(&self) {
        // Records are queued on the stream as they arrive
    }
}

/// Install a record logger as the global logger
pub fn init_record_logger(logger: RecordLogger) -> Result<(), log::SetLoggerError> {
    log::set_max_level(logger.level());
    log::set_boxed_logger(Box::new(logger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::StreamOptions;
    use crate::service::log_stream::LogStream;
    use crate::service::stream_writer::StreamWriter;
    use crate::service::testing::RecordingBuilder;
    use rusqlite::types::Value as SqlValue;
    use serial_test::serial;
    use std::sync::Arc;

    fn writer_for(builder: &Arc<RecordingBuilder>) -> StreamWriter {
        let stream = LogStream::new(
            StreamOptions::new()
                .with_builder(builder.handle())
                .with_table("logs"),
        )
        .unwrap();
        StreamWriter::spawn(stream)
    }

    #[test]
    fn test_chunk_has_log_record_fields() {
        let builder = Arc::new(RecordingBuilder::new());
        let writer = writer_for(&builder);
        let logger = RecordLogger::new("svc", LevelFilter::Info, writer.handle());

        let chunk = logger.to_chunk(
            &Record::builder()
                .args(format_args!("it's {}", "up"))
                .level(Level::Warn)
                .target("app::server")
                .file(Some("src/server.rs"))
                .line(Some(12))
                .build(),
        );
        let value: Value = serde_json::from_slice(&chunk).unwrap();

        assert_eq!(value["name"], "svc");
        assert_eq!(value["level"], 40);
        assert_eq!(value["msg"], "it's up");
        assert_eq!(value["pid"], std::process::id());
        assert_eq!(value["target"], "app::server");
        assert_eq!(value["src"]["line"], 12);
        assert!(value["hostname"].as_str().is_some());
        assert!(chrono::DateTime::parse_from_rfc3339(value["time"].as_str().unwrap()).is_ok());
        writer.end().unwrap();
    }

    #[test]
    fn test_log_queues_enabled_records() {
        let builder = Arc::new(RecordingBuilder::new());
        let writer = writer_for(&builder);
        let logger = RecordLogger::new("svc", LevelFilter::Info, writer.handle());

        logger.log(
            &Record::builder()
                .args(format_args!("kept"))
                .level(Level::Error)
                .target("app")
                .build(),
        );
        logger.log(
            &Record::builder()
                .args(format_args!("too verbose"))
                .level(Level::Debug)
                .target("app")
                .build(),
        );
        writer.end().unwrap();

        let inserted = builder.inserted();
        assert_eq!(inserted.len(), 1);
        assert_eq!(
            inserted[0].1.get("msg"),
            Some(&SqlValue::Text("kept".into()))
        );
        assert_eq!(inserted[0].1.get("level"), Some(&SqlValue::Integer(50)));
    }

    #[test]
    fn test_own_targets_are_not_persisted() {
        let builder = Arc::new(RecordingBuilder::new());
        let writer = writer_for(&builder);
        let logger = RecordLogger::new("svc", LevelFilter::Trace, writer.handle());

        for target in [
            "rusty_log_sink::service::stream_writer",
            "rusty_log_sink",
            "r2d2",
            "r2d2x",
            "r2d2_sqlite",
        ] {
            logger.log(
                &Record::builder()
                    .args(format_args!("internal"))
                    .level(Level::Info)
                    .target(target)
                    .build(),
            );
        }
        writer.end().unwrap();

        // "r2d2x" and "r2d2_sqlite" only share a prefix.
        assert_eq!(builder.inserted().len(), 2);
    }

    #[test]
    fn test_log_after_stream_end_is_ignored() {
        let builder = Arc::new(RecordingBuilder::new());
        let writer = writer_for(&builder);
        let logger = RecordLogger::new("svc", LevelFilter::Info, writer.handle());
        writer.end().unwrap();

        logger.log(
            &Record::builder()
                .args(format_args!("late"))
                .level(Level::Info)
                .target("app")
                .build(),
        );
        assert!(builder.inserted().is_empty());
    }

    #[test]
    fn test_numeric_levels() {
        assert_eq!(numeric_level(Level::Trace), 10);
        assert_eq!(numeric_level(Level::Info), 30);
        assert_eq!(numeric_level(Level::Error), 50);
    }

    #[test]
    #[serial]
    fn test_resolve_hostname_prefers_env() {
        let previous = env::var("HOSTNAME").ok();
        env::set_var("HOSTNAME", "log-host-1");

        assert_eq!(resolve_hostname(), "log-host-1");

        match previous {
            Some(value) => env::set_var("HOSTNAME", value),
            None => env::remove_var("HOSTNAME"),
        }
    }
}
