use std::time::Duration;

use uuid::Uuid;

/// One invocation of the feedback dialog
#[derive(Debug, Clone)]
pub struct FeedbackRequest {
    /// Correlates log lines for this round
    pub round_id: Uuid,
    /// Markdown shown read-only above the input area
    pub work_summary: String,
    /// How long to wait for the user (None = wait indefinitely)
    pub timeout: Option<Duration>,
}

impl FeedbackRequest {
    pub fn new(work_summary: impl Into<String>) -> Self {
        Self {
            round_id: Uuid::new_v4(),
            work_summary: work_summary.into(),
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Get a preview of the summary (first 100 chars)
    pub fn summary_preview(&self) -> String {
        let summary = self.work_summary.trim();
        if summary.chars().count() > 100 {
            let kept: String = summary.chars().take(100).collect();
            format!("{}...", kept)
        } else {
            summary.to_string()
        }
    }
}

/// Resolve a caller-supplied timeout in seconds.
///
/// Omitted means `default`; zero means no timeout at all.
pub fn resolve_timeout(secs: Option<u64>, default: Option<Duration>) -> Option<Duration> {
    match secs {
        None => default,
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
    }
}
