mod config;
mod presenter;
mod server;

use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::SecondsFormat;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use rmcp::ServiceExt;
use serde_json::json;
use tracing::{info, warn};

use feedback_core::{resolve_timeout, FeedbackCollector, FeedbackOutcome, FeedbackRequest};
use feedback_logging::{default_log_dir, init_tracing, LogEvent, LogFormat, Logger};

use crate::config::Settings;
use crate::presenter::ProcessPresenter;
use crate::server::FeedbackServer;

/// File name for the structured round log, next to the rolling tracing logs
const ROUND_LOG_FILE: &str = "rounds.jsonl";

#[derive(Parser, Debug)]
#[command(
    name = "feedback-collector",
    about = "MCP server that collects human feedback through a desktop dialog",
    version,
    author
)]
struct Cli {
    /// Path to config file (default: $MCP_CONFIG_PATH or the platform config dir)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format (overrides the config file)
    #[arg(long, value_enum, global = true)]
    log_format: Option<LogFormatChoice>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the MCP server over stdio (default)
    Serve,

    /// Describe an image file
    Info {
        /// Image to inspect
        path: PathBuf,
    },

    /// Run one feedback round from the terminal and print the outcome as JSON
    Collect {
        /// Markdown work summary to show
        #[arg(short, long, default_value = "")]
        summary: String,

        /// Seconds to wait (0 = no timeout, default from config)
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Dialog process entry point, spawned by the server
    #[command(hide = true)]
    Dialog,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve);

    // The dialog child gets its settings from the host over stdin
    if let Command::Dialog = command {
        let level = std::env::var("MCP_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
        let format = cli.log_format.map(Into::into).unwrap_or(LogFormat::Compact);
        let _guard = init_tracing(&level, format, None);
        return run_dialog();
    }

    let (settings, warnings) = Settings::load(cli.config.as_deref())?;
    let format = match cli.log_format {
        Some(choice) => choice.into(),
        None => settings.log_format()?,
    };
    let log_dir = if settings.log.file {
        settings.log.dir.clone().or_else(default_log_dir)
    } else {
        None
    };

    let _guard = init_tracing(&settings.log.level, format, log_dir.as_deref());
    for warning in &warnings {
        warn!("{}", warning);
    }

    match command {
        Command::Info { path } => {
            println!("{}", server::image_info_text(&path));
            Ok(())
        }
        Command::Collect { summary, timeout } => {
            let logger = create_logger(format, log_dir.as_deref())?;
            run_collect(&settings, logger, summary, timeout)
        }
        Command::Serve => {
            let logger = create_logger(format, log_dir.as_deref())?;
            run_server(&settings, logger)
        }
        Command::Dialog => Ok(()),
    }
}

fn create_logger(format: LogFormat, log_dir: Option<&Path>) -> Result<Arc<Logger>> {
    let logger = match log_dir {
        Some(dir) => {
            let path = dir.join(ROUND_LOG_FILE);
            Logger::with_file(format, &path)
                .with_context(|| format!("Failed to open round log {}", path.display()))?
        }
        None => Logger::new(format),
    };
    Ok(Arc::new(logger))
}

fn build_collector(settings: &Settings, logger: Arc<Logger>) -> Result<Arc<FeedbackCollector>> {
    let presenter = ProcessPresenter::current_exe()
        .context("Failed to locate the feedback-collector executable")?
        .with_limits(settings.limits())
        .with_ingest(settings.ingest())
        .with_window(settings.window())
        .with_grace(settings.dialog.stop_grace);

    let collector = FeedbackCollector::new(Arc::new(presenter), logger)
        .with_limits(settings.limits())
        .with_default_timeout(settings.default_timeout());
    Ok(Arc::new(collector))
}

fn run_server(settings: &Settings, logger: Arc<Logger>) -> Result<()> {
    let collector = build_collector(settings, Arc::clone(&logger))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async move {
        logger.log(&LogEvent::ServerStarted {
            version: env!("CARGO_PKG_VERSION").to_string(),
            default_timeout_secs: collector.default_timeout().map(|t| t.as_secs()),
        });

        let service = FeedbackServer::new(collector)
            .serve(rmcp::transport::stdio())
            .await
            .context("Failed to start MCP server")?;
        service.waiting().await.context("MCP server stopped unexpectedly")?;

        info!("MCP client disconnected, shutting down");
        Ok(())
    })
}

fn run_collect(
    settings: &Settings,
    logger: Arc<Logger>,
    summary: String,
    timeout: Option<u64>,
) -> Result<()> {
    let collector = build_collector(settings, logger)?;
    let request = FeedbackRequest::new(summary)
        .with_timeout(resolve_timeout(timeout, collector.default_timeout()));

    let outcome = collector.collect(request);
    let headline = match &outcome {
        FeedbackOutcome::Submitted { .. } => "=== SUBMITTED ===".green().bold(),
        FeedbackOutcome::Cancelled { .. } => "=== CANCELLED ===".yellow().bold(),
        FeedbackOutcome::TimedOut { .. } => "=== TIMED OUT ===".red().bold(),
    };
    eprintln!("{}", headline);
    println!("{}", serde_json::to_string_pretty(&outcome_summary(&outcome))?);

    std::process::exit(if outcome.is_submitted() { 0 } else { 1 });
}

/// Outcome as printed by `collect`; image bytes are summarised, not dumped
fn outcome_summary(outcome: &FeedbackOutcome) -> serde_json::Value {
    match outcome {
        FeedbackOutcome::Submitted {
            text,
            images,
            submitted_at,
        } => json!({
            "status": outcome.status(),
            "text": text,
            "submitted_at": submitted_at.to_rfc3339_opts(SecondsFormat::Secs, false),
            "images": images
                .iter()
                .map(|image| json!({
                    "source": image.source_label(),
                    "dimensions": image.dimensions_label(),
                    "bytes": image.byte_len(),
                }))
                .collect::<Vec<_>>(),
        }),
        FeedbackOutcome::Cancelled { reason } => json!({
            "status": outcome.status(),
            "reason": reason.to_string(),
        }),
        FeedbackOutcome::TimedOut { elapsed } => json!({
            "status": outcome.status(),
            "elapsed_secs": elapsed.as_secs_f64(),
        }),
    }
}

fn run_dialog() -> Result<()> {
    let input = BufReader::new(io::stdin());
    let output = io::stdout().lock();
    feedback_dialog::run_child(input, output).context("Dialog failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedback_core::CancelReason;
    use std::time::Duration;

    #[test]
    fn test_cli_defaults_to_serve() {
        let cli = Cli::try_parse_from(["feedback-collector"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_collect_args() {
        let cli = Cli::try_parse_from([
            "feedback-collector",
            "--log-format",
            "json",
            "collect",
            "--summary",
            "Did things",
            "--timeout",
            "0",
        ])
        .unwrap();
        assert!(matches!(cli.log_format, Some(LogFormatChoice::Json)));
        match cli.command {
            Some(Command::Collect { summary, timeout }) => {
                assert_eq!(summary, "Did things");
                assert_eq!(timeout, Some(0));
            }
            other => panic!("Expected Collect, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_global_config_after_subcommand() {
        let cli =
            Cli::try_parse_from(["feedback-collector", "info", "shot.png", "--config", "fc.toml"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("fc.toml")));
        assert!(matches!(cli.command, Some(Command::Info { .. })));
    }

    #[test]
    fn test_outcome_summary() {
        let summary = outcome_summary(&FeedbackOutcome::cancelled(CancelReason::WindowClosed));
        assert_eq!(summary["status"], "cancelled");
        assert_eq!(summary["reason"], "User closed the dialog window");

        let summary = outcome_summary(&FeedbackOutcome::timed_out(Duration::from_secs(5)));
        assert_eq!(summary["status"], "timed_out");
        assert_eq!(summary["elapsed_secs"], 5.0);

        let summary = outcome_summary(&FeedbackOutcome::submitted(Some("ok".to_string()), vec![]));
        assert_eq!(summary["text"], "ok");
        assert_eq!(summary["images"], json!([]));
    }
}
