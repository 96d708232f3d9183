//! Console and rolling-file logging for attrclean.
//!
//! Console output goes to stderr so that commands printing JSON to stdout
//! stay pipeable. Two daily files are kept in the log directory:
//! `attrclean.<date>.log` with everything the filter lets through and
//! `error.<date>.log` with warnings and errors only.
//!
//! ```no_run
//! attrclean::logging::init(None)?;
//! tracing::info!("Cleaning started");
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const LOG_PREFIX: &str = "attrclean";
const MAX_LOG_FILES: usize = 10;

/// The platform data directory plus `attrclean/logs`, e.g.
/// `~/.local/share/attrclean/logs` on Linux.
pub fn default_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(base_dir.join(LOG_PREFIX).join("logs"))
}

/// Resolves and creates the log directory.
pub fn get_log_dir(override_dir: Option<&Path>) -> Result<PathBuf> {
    let log_dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => default_log_dir()?,
    };

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }
    Ok(log_dir)
}

fn appender(log_dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("Failed to create {prefix} file appender"))
}

/// Installs the global subscriber. The level defaults to `info` and can be
/// overridden with `RUST_LOG`.
///
/// # Errors
///
/// Returns error if the log directory cannot be created or a file appender
/// fails to open.
pub fn init(log_dir: Option<&Path>) -> Result<()> {
    let log_dir = get_log_dir(log_dir)?;
    let all_logs_appender = appender(&log_dir, LOG_PREFIX)?;
    let error_logs_appender = appender(&log_dir, "error")?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_writer(std::io::stderr)
        .pretty();

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(all_logs_appender);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(error_logs_appender)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .init();

    tracing::info!(
        "Logging initialized, writing to {}",
        current_log_path(&log_dir).display()
    );
    Ok(())
}

/// Path of today's main log file in `log_dir`.
pub fn current_log_path(log_dir: &Path) -> PathBuf {
    let today = chrono::Local::now().format("%Y-%m-%d");
    log_dir.join(format!("{LOG_PREFIX}.{today}.log"))
}
