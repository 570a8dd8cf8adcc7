use std::{fs, path::Path};

use tracing_appender::rolling::Rotation;
use tracing_subscriber::fmt::{format::FmtSpan, writer::MakeWriterExt};

use crate::{
    constants::FILE_PATHS,
    error::{Result, StopwatchError},
};

pub const CLI_PREFIX: &str = "cli";
pub const UI_PREFIX: &str = "ui";

const DEFAULT_LEVEL: &str = "info";

/// Pick the log level: explicit verbosity, then config, then `RUST_LOG`.
pub fn resolve_level(verbose: bool, configured: Option<&str>) -> String {
    if verbose {
        return "debug".to_string();
    }
    configured
        .map(str::to_string)
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

/// Install the global subscriber: daily log files under `<data_dir>/logs`,
/// optionally mirrored to stderr.
pub fn enable_logging(prefix: &str, data_dir: &Path, level: &str, show_std: bool) -> Result<()> {
    let log_dir = data_dir.join(FILE_PATHS.logs);
    fs::create_dir_all(&log_dir)?;

    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(5)
        .filename_prefix(prefix)
        .build(&log_dir)
        .map_err(|e| StopwatchError::Logging(e.to_string()))?;

    let stderr = std::io::stderr.with_filter(move |_| show_std);

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(format!(
            "{}={level}",
            env!("CARGO_PKG_NAME").replace('-', "_"),
        )))
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .with_writer(stderr.and(appender))
        .try_init()
        .map_err(|e| StopwatchError::Logging(e.to_string()))
}
