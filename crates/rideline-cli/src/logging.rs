//! Logging initialization and configuration.
//!
//! Command output goes to stdout, so every log layer writes to stderr or
//! files:
//! - **Production**: JSON logs to rolling files + compact logs to stderr
//! - **Development**: Pretty logs to stderr

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::{bail, Context};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter.
pub const LOG_LEVEL_VAR: &str = "RIDELINE_LOG_LEVEL";

/// Guard keeping the non-blocking file writer alive for the whole program.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize the logging system with environment-appropriate configuration.
///
/// The filter comes from `RIDELINE_LOG_LEVEL`, then `RUST_LOG`, and defaults
/// to `warn` so that command output stays readable.
///
/// # Production Mode
///
/// - Logs to rolling daily files in `/var/log/rideline/`
/// - JSON format for structured logging in files
/// - Compact format on stderr (no ANSI colors)
///
/// # Development Mode
///
/// - Logs to stderr only with pretty formatting
///
/// # Errors
///
/// Returns an error if the env filter cannot be parsed or a global
/// subscriber is already installed.
pub fn init(is_production: bool) -> anyhow::Result<()> {
    let env_filter = build_filter()?;

    if is_production {
        init_production(env_filter)
    } else {
        init_development(env_filter)
    }
}

fn build_filter() -> anyhow::Result<EnvFilter> {
    let directive = std::env::var(LOG_LEVEL_VAR)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .unwrap_or_else(|_| "warn".to_string());
    Ok(EnvFilter::try_new(directive)?)
}

/// Initialize production logging with file + stderr output.
fn init_production(env_filter: EnvFilter) -> anyhow::Result<()> {
    let log_dir = log_directory();
    prepare_log_directory(&log_dir)?;

    // Rolling file appender - creates new file daily
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("rideline")
        .build(&log_dir)
        .with_context(|| format!("cannot open log files in {}", log_dir.display()))?;
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    if FILE_GUARD.set(file_guard).is_err() {
        bail!("production logging was already initialized");
    }

    Ok(())
}

/// Initialize development logging with pretty stderr output.
fn init_development(env_filter: EnvFilter) -> anyhow::Result<()> {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .try_init()?;

    Ok(())
}

fn prepare_log_directory(dir: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("cannot create log directory {}", dir.display()))
}

/// Returns the appropriate log directory for the current platform.
fn log_directory() -> PathBuf {
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/log/rideline")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "rideline")
            .map_or_else(|| PathBuf::from("./logs"), |dirs| dirs.data_dir().join("logs"))
    }
}
