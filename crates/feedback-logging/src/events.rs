use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

/// What a round is collecting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundKind {
    Feedback,
    PickImage,
}

impl std::fmt::Display for RoundKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundKind::Feedback => write!(f, "feedback"),
            RoundKind::PickImage => write!(f, "pick-image"),
        }
    }
}

/// Structured log events for collection rounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    ServerStarted {
        version: String,
        default_timeout_secs: Option<u64>,
    },
    RoundStarted {
        round_id: String,
        kind: RoundKind,
        summary_preview: String,
        timeout_secs: Option<u64>,
    },
    PresenterStarted {
        round_id: String,
        presenter: String,
    },
    /// The round produced a usable result
    OutcomeDelivered {
        round_id: String,
        text_chars: usize,
        image_count: usize,
        duration_secs: f64,
    },
    /// The presenter returned a submission the collector refused
    SubmissionRejected {
        round_id: String,
        reason: String,
    },
    RoundCancelled {
        round_id: String,
        reason: String,
        duration_secs: f64,
    },
    RoundTimedOut {
        round_id: String,
        elapsed_secs: f64,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for round events - writes to stderr and optionally to a JSONL file
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to stderr
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        let _ = writeln!(std::io::stderr(), "{}", event.with_timestamp());
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::ServerStarted {
                version,
                default_timeout_secs,
            } => {
                let timeout = match default_timeout_secs {
                    Some(secs) => format!("{}s dialog timeout", secs),
                    None => "no dialog timeout".to_string(),
                };
                let _ = writeln!(
                    stderr,
                    "{} {} {} {}",
                    "●".bright_blue(),
                    "feedback-collector".bold().bright_white(),
                    version.dimmed(),
                    format!("({})", timeout).dimmed()
                );
            }
            LogEvent::RoundStarted {
                round_id,
                kind,
                summary_preview,
                timeout_secs,
            } => {
                let _ = writeln!(
                    stderr,
                    "{} {} {} {}",
                    "▶".bright_cyan(),
                    format!("{} round", kind).bright_cyan().bold(),
                    short_id(round_id).dimmed(),
                    match timeout_secs {
                        Some(secs) => format!("(timeout {}s)", secs),
                        None => "(no timeout)".to_string(),
                    }
                    .dimmed()
                );
                if !summary_preview.is_empty() {
                    let _ = writeln!(
                        stderr,
                        "    {} {}",
                        "│".dimmed(),
                        truncate(summary_preview, 70).dimmed()
                    );
                }
            }
            LogEvent::PresenterStarted { presenter, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} {}",
                    "│".dimmed(),
                    format!("presenter: {}", presenter).dimmed()
                );
            }
            LogEvent::OutcomeDelivered {
                text_chars,
                image_count,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Submitted: {} {}, {} {} ({:.1}s)",
                    "✓".bright_green(),
                    text_chars,
                    if *text_chars == 1 { "char" } else { "chars" },
                    image_count,
                    if *image_count == 1 { "image" } else { "images" },
                    duration_secs
                );
            }
            LogEvent::SubmissionRejected { reason, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Rejected: {}",
                    "✗".bright_red(),
                    reason.bright_red()
                );
            }
            LogEvent::RoundCancelled {
                reason,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Cancelled: {} ({:.1}s)",
                    "→".bright_yellow(),
                    reason,
                    duration_secs
                );
            }
            LogEvent::RoundTimedOut { elapsed_secs, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Timed out after {:.1}s",
                    "⚠".bright_yellow(),
                    elapsed_secs
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::ServerStarted { version, .. } => {
                format!("[{}] server:start {}", timestamp, version)
            }
            LogEvent::RoundStarted { round_id, kind, .. } => {
                format!("[{}] round:start:{} {}", timestamp, short_id(round_id), kind)
            }
            LogEvent::PresenterStarted {
                round_id,
                presenter,
            } => format!(
                "[{}] presenter:{} {}",
                timestamp,
                short_id(round_id),
                presenter
            ),
            LogEvent::OutcomeDelivered {
                round_id,
                text_chars,
                image_count,
                duration_secs,
            } => format!(
                "[{}] round:done:{} text={} images={} {:.1}s",
                timestamp,
                short_id(round_id),
                text_chars,
                image_count,
                duration_secs
            ),
            LogEvent::SubmissionRejected { round_id, reason } => {
                format!("[{}] round:rejected:{} {}", timestamp, short_id(round_id), reason)
            }
            LogEvent::RoundCancelled {
                round_id, reason, ..
            } => format!(
                "[{}] round:cancelled:{} {}",
                timestamp,
                short_id(round_id),
                reason
            ),
            LogEvent::RoundTimedOut {
                round_id,
                elapsed_secs,
            } => format!(
                "[{}] round:timeout:{} {:.1}s",
                timestamp,
                short_id(round_id),
                elapsed_secs
            ),
        };
        let _ = writeln!(stderr, "{}", msg);
    }
}

fn short_id(round_id: &str) -> &str {
    round_id.get(..8).unwrap_or(round_id)
}

/// Truncate on a char boundary, appending "..." when shortened
fn truncate(s: &str, max_chars: usize) -> String {
    let single_line = s.lines().next().unwrap_or_default();
    if single_line.chars().count() > max_chars || single_line.len() < s.trim_end().len() {
        let kept: String = single_line.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        single_line.to_string()
    }
}
