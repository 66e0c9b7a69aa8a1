//! # feedback-logging
//!
//! Logging for the feedback collector.
//!
//! Stdout belongs to the MCP transport (and, in dialog processes, to the
//! reply line), so everything here writes to stderr or to log files.
//!
//! ## Key Types
//!
//! - [`Logger`] - Structured round lifecycle events
//! - [`LogEvent`] - Log event types
//! - [`LogFormat`] - Output formats (Pretty, JSON, Compact)

mod events;

pub use events::{LogEvent, LogFormat, Logger, RoundKind};

use std::path::{Path, PathBuf};

use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

/// Prefix for rolling log files
pub const LOG_FILE_PREFIX: &str = "feedback-collector.log";

/// Default directory for rolling log files
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("feedback-collector").join("logs"))
}

/// Initialize tracing for the application.
///
/// When `log_dir` is given, a daily rolling JSON file is written there as
/// well. The returned guard must be held until shutdown so buffered lines
/// are flushed.
pub fn init_tracing(level: &str, format: LogFormat, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_writer, guard) = match log_dir.map(open_log_dir) {
        Some(Some((writer, guard))) => (Some(writer), Some(guard)),
        _ => (None, None),
    };

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .with(file_layer(file_writer))
                .init();
        }
        LogFormat::Pretty | LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .with(file_layer(file_writer))
                .init();
        }
    }

    guard
}

fn open_log_dir(dir: &Path) -> Option<(NonBlocking, WorkerGuard)> {
    if let Err(e) = std::fs::create_dir_all(dir) {
        eprintln!(
            "Failed to create log directory {}: {} (file logging disabled)",
            dir.display(),
            e
        );
        return None;
    }
    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
    Some(tracing_appender::non_blocking(appender))
}

fn file_layer<S>(writer: Option<NonBlocking>) -> Option<impl Layer<S>>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    writer.map(|writer| fmt::layer().json().with_ansi(false).with_writer(writer))
}
