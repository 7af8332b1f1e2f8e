use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use rusty_log_sink::{setup_config, BuilderHandle, LogStream, SqliteQueryBuilder, StreamWriter};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "rusty-log-sink")]
#[command(about = "Write newline-delimited JSON log records into a SQL table", long_about = None)]
struct Cli {
    #[arg(
        short = 'c',
        long = "config",
        default_value = "config.json",
        env = "RUSTYLOGSINK_CONFIG"
    )]
    config_file: String,

    /// Read records from this file instead of stdin
    #[arg(short = 'i', long = "input")]
    input: Option<String>,

    /// Override the table from the config file
    #[arg(short = 't', long = "table")]
    table: Option<String>,

    #[arg(
        short = 'l',
        long = "log-level",
        default_value = "info",
        env = "LOG_LEVEL"
    )]
    log_level: String,

    /// Warn about lines that are not JSON objects instead of stopping
    #[arg(long = "skip-invalid")]
    skip_invalid: bool,

    /// Write through one caller-owned connection instead of a pool
    #[arg(long = "single-connection")]
    single_connection: bool,
}

#[derive(Debug, Default, PartialEq)]
struct Summary {
    written: usize,
    failed: usize,
    skipped: usize,
}

fn main() -> Result<()> {
    let args = Cli::parse();

    env_logger::Builder::from_default_env()
        .filter_level(parse_level(&args.log_level))
        .format_timestamp_secs()
        .init();

    info!("RustyLogSink starting...");
    let mut options = setup_config(&args.config_file).context("Failed to load configuration")?;

    if let Some(table) = args.table {
        options.table_name = Some(table);
    }

    if args.single_connection {
        let db_file = options
            .connection
            .as_ref()
            .map(|pool| pool.database_file.clone())
            .context("--single-connection needs connection.database_file in the config")?;
        let builder = SqliteQueryBuilder::open(&db_file).context("Failed to open database")?;
        options = options.with_builder(BuilderHandle::from(Arc::new(builder)));
    }
    debug!("Loaded options: {:?}", &options);

    let stream = LogStream::new(options).context("Failed to create log stream")?;
    let writer = StreamWriter::spawn(stream);

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open input: {}", path))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let summary = pipe_lines(reader, &writer, args.skip_invalid);
    writer.end().context("Failed to finish log stream")?;
    let summary = summary?;

    info!(
        "Done: {} written, {} failed, {} skipped",
        summary.written, summary.failed, summary.skipped
    );
    Ok(())
}

fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    }
}

/// Sends every non-blank line as one chunk. Database failures are counted and skipped;
/// a malformed line stops the run unless `skip_invalid` is set.
fn pipe_lines<R: BufRead>(
    reader: R,
    writer: &StreamWriter,
    skip_invalid: bool,
) -> Result<Summary> {
    let mut summary = Summary::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.context("Failed to read input")?;
        if line.trim().is_empty() {
            continue;
        }

        match writer.write(line) {
            Ok(outcome) => {
                summary.written += 1;
                debug!("Line {}: {} row(s) inserted", line_no, outcome.rows_affected);
            }
            Err(e) if e.is_decode() => {
                if !skip_invalid {
                    return Err(e)
                        .with_context(|| format!("Invalid log record on line {}", line_no));
                }
                warn!("Skipping line {}: {}", line_no, e);
                summary.skipped += 1;
            }
            Err(e) => {
                warn!("Failed to write line {}: {}", line_no, e);
                summary.failed += 1;
            }
        }
    }

    Ok(summary)
}
