//! Logging Setup
//!
//! Library code logs through the `log` facade. Binaries call [`init`] once to
//! route those records through `tracing`: human-readable lines on stderr,
//! plus daily-rotated JSON files when a log directory is configured.

use std::fs;
use std::io;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::config::LoggingConfig;

/// Base name of the rotated log files
pub const LOG_FILE_NAME: &str = "dictag.log";

/// `RUST_LOG` wins over the configured level.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the logging system.
///
/// Keep the returned guard alive for as long as logs should be flushed to
/// the file. Calling this twice leaves the first subscriber in place.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    // 1. Optional JSON file layer
    let (file_layer, guard) = match &config.log_dir {
        Some(log_dir) => match fs::create_dir_all(log_dir) {
            Ok(()) => {
                let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                let layer = tracing_subscriber::fmt::layer()
                    .with_writer(non_blocking)
                    .json()
                    .with_file(true)
                    .with_line_number(true)
                    .with_thread_ids(true)
                    .with_target(true)
                    .with_filter(env_filter(&config.level));
                (Some(layer), Some(guard))
            }
            Err(e) => {
                eprintln!("Failed to create log directory {}: {}", log_dir.display(), e);
                (None, None)
            }
        },
        None => (None, None),
    };

    // 2. Stderr layer; stdout carries command output
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_target(false)
        .with_filter(env_filter(&config.level));

    // 3. Initialize registry
    if let Err(e) = tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
    {
        eprintln!("Logging already initialized: {}", e);
        return None;
    }

    // 4. Redirect `log` macros to `tracing` (no-op if the subscriber did it)
    let _ = tracing_log::LogTracer::init();

    match &config.log_dir {
        Some(dir) if guard.is_some() => log::debug!(
            "Logging initialized. Writing to: {:?} (daily rolling)",
            dir.join(LOG_FILE_NAME)
        ),
        _ => log::debug!("Logging initialized (stderr only)"),
    }

    guard
}
