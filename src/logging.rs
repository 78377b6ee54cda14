//! Logging Module
//!
//! Tracing setup for the client: a daily log file under the storage
//! directory, plus pretty console output while developing.

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::storage::default_storage_dir;

const LOG_FILE_PREFIX: &str = "invoicer.log";

/// Install the global subscriber, writing files under [`log_directory`]
pub fn init() {
    init_in(&log_directory());
}

/// Install the global subscriber with log files under `dir`.
///
/// Returns `false` when another subscriber was installed first.
pub fn init_in(dir: &Path) -> bool {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!("Cannot create log directory {}: {}", dir.display(), e);
    }

    let file = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(file_writer(dir));

    #[cfg(debug_assertions)]
    let console = Some(fmt::layer().with_target(true).pretty());
    #[cfg(not(debug_assertions))]
    let console: Option<fmt::Layer<_>> = None;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    tracing_subscriber::registry()
        .with(filter)
        .with(file)
        .with(console)
        .try_init()
        .is_ok()
}

fn file_writer(dir: &Path) -> RollingFileAppender {
    RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX)
}

fn default_filter() -> EnvFilter {
    let level = if cfg!(debug_assertions) { "debug" } else { "info" };
    EnvFilter::new(format!("{},hyper=warn,reqwest=warn", level))
}

/// Directory the log files are written to
pub fn log_directory() -> PathBuf {
    default_storage_dir().join("logs")
}
