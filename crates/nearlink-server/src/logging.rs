//! Logging initialization and configuration.
//!
//! This module provides environment-aware logging setup:
//! - **Production**: JSON logs to rolling files + compact logs to stdout
//! - **Development**: Pretty logs to stdout with span events

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable selecting the default log level.
pub const LOG_LEVEL_ENV: &str = "NEARLINK_LOG_LEVEL";

/// Environment variable overriding the log directory.
pub const LOG_DIR_ENV: &str = "NEARLINK_LOG_DIR";

/// Keep the non-blocking writers alive for the lifetime of the program.
static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static STDOUT_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Initialize the logging system with environment-appropriate configuration.
///
/// `RUST_LOG` takes precedence; otherwise `NEARLINK_LOG_LEVEL` (default
/// `info`) is used as the filter.
///
/// # Production Mode
///
/// - Logs to rolling daily files in `/var/log/nearlink/`
/// - Also logs to stdout for systemd journal capture
/// - JSON format in files, compact format without ANSI colors on stdout
///
/// # Development Mode
///
/// - Pretty stdout output with span open/close events
///
/// # Errors
///
/// Returns an error if the env filter cannot be parsed or a global
/// subscriber is already installed.
pub fn init(is_production: bool) -> anyhow::Result<()> {
    let log_level = std::env::var(LOG_LEVEL_ENV).unwrap_or_else(|_| "info".to_string());

    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    if is_production {
        init_production(env_filter)
    } else {
        init_development(env_filter)
    }
}

fn init_production(env_filter: EnvFilter) -> anyhow::Result<()> {
    let log_dir = log_directory();
    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("cannot create log directory {}: {e}", log_dir.display());
    }

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "nearlinkd");
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);
    let (non_blocking_stdout, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // journald does its own coloring
    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(non_blocking_stdout)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    let _ = FILE_GUARD.set(file_guard);
    let _ = STDOUT_GUARD.set(stdout_guard);

    Ok(())
}

fn init_development(env_filter: EnvFilter) -> anyhow::Result<()> {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .try_init()?;

    Ok(())
}

/// Log directory: `NEARLINK_LOG_DIR`, else the platform default.
fn log_directory() -> PathBuf {
    if let Some(dir) = std::env::var_os(LOG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/log/nearlink")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "nearlink")
            .map(|dirs| dirs.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("./logs"))
    }
}
