// Tracing setup: logs go to a file so the terminal stays free for output.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing_subscriber::fmt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

/// Name of the log file created inside the configured log directory.
pub const LOG_FILE_NAME: &str = "crease.log";

/// Initialize tracing to log to `<base_dir>/<settings.directory>/crease.log`.
///
/// `RUST_LOG` takes precedence over the configured filter. Returns the path
/// of the log file.
pub fn init_tracing(base_dir: &Path, settings: &LoggingSettings) -> anyhow::Result<PathBuf> {
    let log_dir = base_dir.join(&settings.directory);
    std::fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let log_path = log_dir.join(LOG_FILE_NAME);
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.filter)),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(log_path)
}
