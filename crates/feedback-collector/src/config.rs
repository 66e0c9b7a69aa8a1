//! Configuration file support for feedback-collector.
//!
//! Settings come from a TOML file and are then overridden by environment
//! variables. They are read once at startup.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use feedback_core::Limits;
use feedback_dialog::WindowSize;
use feedback_images::{IngestConfig, DEFAULT_MAX_IMAGE_BYTES};
use feedback_logging::LogFormat;
use serde::Deserialize;

use crate::presenter::DEFAULT_GRACE;

/// The config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "MCP_CONFIG_PATH";

const TIMEOUT_ENV: &str = "MCP_DIALOG_TIMEOUT";
const WIDTH_ENV: &str = "MCP_WINDOW_WIDTH";
const HEIGHT_ENV: &str = "MCP_WINDOW_HEIGHT";
const LOG_LEVEL_ENV: &str = "MCP_LOG_LEVEL";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    #[serde(default)]
    pub dialog: DialogSettings,
    #[serde(default)]
    pub images: ImageSettings,
    #[serde(default)]
    pub feedback: FeedbackSettings,
    #[serde(default)]
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DialogSettings {
    /// Default wait for the user, e.g. `"5m"`. `"0s"` waits forever.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub width: f32,
    pub height: f32,
    /// How long a stopped dialog may take to close before it is killed
    #[serde(with = "humantime_serde")]
    pub stop_grace: Duration,
}

impl Default for DialogSettings {
    fn default() -> Self {
        let window = WindowSize::default();
        Self {
            timeout: feedback_core::DEFAULT_TIMEOUT,
            width: window.width,
            height: window.height,
            stop_grace: DEFAULT_GRACE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ImageSettings {
    pub max_bytes: u64,
    pub max_count: usize,
    pub formats: Vec<String>,
    pub thumbnail_width: u32,
    pub thumbnail_height: u32,
}

impl Default for ImageSettings {
    fn default() -> Self {
        let ingest = IngestConfig::default();
        Self {
            max_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_count: Limits::default().max_images,
            formats: ingest.formats,
            thumbnail_width: ingest.thumbnail_width,
            thumbnail_height: ingest.thumbnail_height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct FeedbackSettings {
    pub max_text_chars: usize,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            max_text_chars: Limits::default().max_text_chars,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LogSettings {
    /// Filter directive, e.g. `"info"` or `"feedback_core=debug"`
    pub level: String,
    /// `pretty`, `json` or `compact`
    pub format: String,
    /// Also write daily rolling JSON log files
    pub file: bool,
    /// Directory for log files (default: the platform data dir)
    pub dir: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: false,
            dir: None,
        }
    }
}

impl Settings {
    /// `<config_dir>/feedback-collector/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("feedback-collector").join(CONFIG_FILE_NAME))
    }

    /// Priority: explicit path > `MCP_CONFIG_PATH` > default location
    pub fn resolve_path(explicit: Option<&Path>, env_path: Option<String>) -> Option<PathBuf> {
        explicit
            .map(Path::to_path_buf)
            .or_else(|| env_path.filter(|p| !p.trim().is_empty()).map(PathBuf::from))
            .or_else(Self::default_path)
    }

    /// Load settings from disk and the process environment.
    ///
    /// Returns the settings and any warnings about ignored overrides, to be
    /// logged once tracing is up.
    pub fn load(explicit: Option<&Path>) -> Result<(Self, Vec<String>)> {
        let path = Self::resolve_path(explicit, std::env::var(CONFIG_PATH_ENV).ok());
        let mut settings = match path {
            Some(path) => Self::from_file(&path)?.unwrap_or_default(),
            None => Self::default(),
        };
        let warnings = settings.apply_env(|key| std::env::var(key).ok());
        Ok((settings, warnings))
    }

    /// Load a config file.
    ///
    /// Returns:
    /// - `Ok(Some(settings))` if the file exists and parses successfully
    /// - `Ok(None)` if the file does not exist
    /// - `Err(...)` if the file exists but fails to parse (hard error)
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let settings: Settings = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Some(settings))
    }

    /// Apply `MCP_*` overrides. Unparsable values are skipped and reported.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut warnings = Vec::new();

        if let Some(value) = lookup(TIMEOUT_ENV) {
            match value.trim().parse::<u64>() {
                Ok(secs) => self.dialog.timeout = Duration::from_secs(secs),
                Err(_) => warnings.push(invalid(TIMEOUT_ENV, &value, "whole seconds")),
            }
        }
        if let Some(value) = lookup(WIDTH_ENV) {
            match parse_dimension(&value) {
                Some(width) => self.dialog.width = width,
                None => warnings.push(invalid(WIDTH_ENV, &value, "a positive number")),
            }
        }
        if let Some(value) = lookup(HEIGHT_ENV) {
            match parse_dimension(&value) {
                Some(height) => self.dialog.height = height,
                None => warnings.push(invalid(HEIGHT_ENV, &value, "a positive number")),
            }
        }
        if let Some(value) = lookup(LOG_LEVEL_ENV) {
            if value.trim().is_empty() {
                warnings.push(invalid(LOG_LEVEL_ENV, &value, "a level such as info"));
            } else {
                self.log.level = value.trim().to_string();
            }
        }

        warnings
    }

    /// Default round timeout; zero means none
    pub fn default_timeout(&self) -> Option<Duration> {
        Some(self.dialog.timeout).filter(|t| !t.is_zero())
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_images: self.images.max_count,
            max_text_chars: self.feedback.max_text_chars,
        }
    }

    pub fn ingest(&self) -> IngestConfig {
        IngestConfig {
            max_bytes: self.images.max_bytes,
            formats: self.images.formats.clone(),
            thumbnail_width: self.images.thumbnail_width,
            thumbnail_height: self.images.thumbnail_height,
        }
    }

    pub fn window(&self) -> WindowSize {
        WindowSize {
            width: self.dialog.width,
            height: self.dialog.height,
        }
    }

    pub fn log_format(&self) -> Result<LogFormat> {
        self.log
            .format
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("Invalid [log] format")
    }
}

fn parse_dimension(value: &str) -> Option<f32> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}

fn invalid(key: &str, value: &str, expected: &str) -> String {
    format!("Ignoring {}={:?}: expected {}", key, value, expected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        let result = Settings::from_file(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.default_timeout(), Some(Duration::from_secs(300)));
        assert_eq!(settings.limits(), Limits::default());
        assert_eq!(settings.ingest(), IngestConfig::default());
        assert_eq!(settings.window(), WindowSize::default());
        assert_eq!(settings.log_format().unwrap(), LogFormat::Pretty);
    }

    #[test]
    fn test_full_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"
[dialog]
timeout = "5m 30s"
width = 900
height = 700
stop_grace = "500ms"

[images]
max_bytes = 1048576
max_count = 4
formats = ["png", "jpeg"]

[feedback]
max_text_chars = 2000

[log]
level = "debug"
format = "json"
file = true
dir = "/tmp/feedback-logs"
"#,
        )
        .unwrap();

        let settings = Settings::from_file(&path).unwrap().unwrap();
        assert_eq!(settings.dialog.timeout, Duration::from_secs(330));
        assert_eq!(settings.window(), WindowSize { width: 900.0, height: 700.0 });
        assert_eq!(settings.dialog.stop_grace, Duration::from_millis(500));
        assert_eq!(
            settings.limits(),
            Limits {
                max_images: 4,
                max_text_chars: 2000
            }
        );
        assert_eq!(settings.ingest().max_bytes, 1_048_576);
        assert_eq!(settings.ingest().formats, vec!["png", "jpeg"]);
        assert_eq!(settings.ingest().thumbnail_width, 100);
        assert_eq!(settings.log_format().unwrap(), LogFormat::Json);
        assert!(settings.log.file);
        assert_eq!(settings.log.dir, Some(PathBuf::from("/tmp/feedback-logs")));
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[dialog]\ntimeout = \"0s\"\n").unwrap();

        let settings = Settings::from_file(&path).unwrap().unwrap();
        assert_eq!(settings.default_timeout(), None);
        assert_eq!(settings.dialog.width, 700.0);
        assert_eq!(settings.limits(), Limits::default());
    }

    #[test]
    fn test_unknown_key_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[dialog]\ntimeout_secs = 5\n").unwrap();

        let err = Settings::from_file(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        let warnings = settings.apply_env(env(&[
            ("MCP_DIALOG_TIMEOUT", "45"),
            ("MCP_WINDOW_WIDTH", "640"),
            ("MCP_WINDOW_HEIGHT", "600.5"),
            ("MCP_LOG_LEVEL", "debug"),
        ]));

        assert!(warnings.is_empty());
        assert_eq!(settings.default_timeout(), Some(Duration::from_secs(45)));
        assert_eq!(settings.window(), WindowSize { width: 640.0, height: 600.5 });
        assert_eq!(settings.log.level, "debug");
    }

    #[test]
    fn test_invalid_env_is_ignored_with_warning() {
        let mut settings = Settings::default();
        let warnings = settings.apply_env(env(&[
            ("MCP_DIALOG_TIMEOUT", "soon"),
            ("MCP_WINDOW_WIDTH", "-5"),
            ("MCP_WINDOW_HEIGHT", "tall"),
        ]));

        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("MCP_DIALOG_TIMEOUT"));
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_env_timeout_zero_disables_timeout() {
        let mut settings = Settings::default();
        settings.apply_env(env(&[("MCP_DIALOG_TIMEOUT", "0")]));
        assert_eq!(settings.default_timeout(), None);
    }

    #[test]
    fn test_path_priority() {
        let explicit = PathBuf::from("/etc/fc.toml");
        assert_eq!(
            Settings::resolve_path(Some(&explicit), Some("/env/fc.toml".to_string())),
            Some(explicit)
        );
        assert_eq!(
            Settings::resolve_path(None, Some("/env/fc.toml".to_string())),
            Some(PathBuf::from("/env/fc.toml"))
        );
        assert_eq!(
            Settings::resolve_path(None, Some("  ".to_string())),
            Settings::default_path()
        );
    }
}
