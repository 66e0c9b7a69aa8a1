//! MCP tool server exposing the feedback dialog to an assistant.

use std::path::Path;
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::SecondsFormat;
use feedback_core::{
    resolve_timeout, FeedbackCollector, FeedbackOutcome, FeedbackRequest, PickOutcome,
};
use feedback_images::{CapturedImage, ImageError, ImageInfo};
use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::schemars;
use rmcp::{tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::Deserialize;
use tracing::{info, warn};

const INSTRUCTIONS: &str = "Collects feedback from the human at the keyboard. \
Call collect_feedback with a markdown summary of the work you just did; a desktop \
dialog shows it and returns the user's text and images. Call pick_image to let the \
user send a single image, and get_image_info to describe an image file on disk.";

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CollectFeedbackParams {
    /// Markdown summary of the work done, shown read-only to the user
    #[serde(default)]
    pub work_summary: String,
    /// Seconds to wait for the user; 0 waits indefinitely
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImageInfoParams {
    /// Path to the image file
    pub image_path: String,
}

#[derive(Clone)]
pub struct FeedbackServer {
    collector: Arc<FeedbackCollector>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl FeedbackServer {
    pub fn new(collector: Arc<FeedbackCollector>) -> Self {
        Self {
            collector,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        description = "Show the user a summary of the work done and wait for their feedback. Returns the feedback text (with a submission timestamp) followed by any attached images. Fails if the user cancels or the timeout passes."
    )]
    async fn collect_feedback(
        &self,
        Parameters(params): Parameters<CollectFeedbackParams>,
    ) -> Result<CallToolResult, McpError> {
        let timeout = resolve_timeout(params.timeout_seconds, self.collector.default_timeout());
        let request = FeedbackRequest::new(params.work_summary).with_timeout(timeout);
        info!(round_id = %request.round_id, "collect_feedback called");

        let collector = Arc::clone(&self.collector);
        match tokio::task::spawn_blocking(move || collector.collect(request)).await {
            Ok(outcome) => Ok(feedback_result(outcome)),
            Err(e) => {
                warn!(error = %e, "Feedback round task failed");
                Ok(error_result(format!("Feedback round failed: {}", e)))
            }
        }
    }

    #[tool(
        description = "Let the user choose a single image from a file or the clipboard. Returns it as PNG. Fails if the user cancels."
    )]
    async fn pick_image(&self) -> Result<CallToolResult, McpError> {
        info!("pick_image called");

        let collector = Arc::clone(&self.collector);
        match tokio::task::spawn_blocking(move || collector.pick_image()).await {
            Ok(outcome) => Ok(pick_result(outcome)),
            Err(e) => {
                warn!(error = %e, "Image pick task failed");
                Ok(error_result(format!("Image selection failed: {}", e)))
            }
        }
    }

    #[tool(
        description = "Describe an image file: name, format, dimensions, color mode and size on disk."
    )]
    async fn get_image_info(
        &self,
        Parameters(params): Parameters<ImageInfoParams>,
    ) -> Result<CallToolResult, McpError> {
        let path = params.image_path;
        let text = tokio::task::spawn_blocking(move || image_info_text(Path::new(&path)))
            .await
            .unwrap_or_else(|e| format!("Failed to read image info: {}", e));
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }
}

#[tool_handler]
impl ServerHandler for FeedbackServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation::from_build_env(),
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}

/// Text item (if any text) followed by one image item per attachment
pub fn feedback_result(outcome: FeedbackOutcome) -> CallToolResult {
    match outcome.into_result() {
        Ok(submission) => {
            let mut content = Vec::with_capacity(submission.images.len() + 1);
            if let Some(text) = submission.text {
                content.push(Content::text(format!(
                    "User feedback: {}\nSubmitted at: {}",
                    text,
                    submission
                        .submitted_at
                        .to_rfc3339_opts(SecondsFormat::Secs, false)
                )));
            }
            content.extend(submission.images.iter().map(image_content));
            CallToolResult::success(content)
        }
        Err(e) => error_result(e.to_string()),
    }
}

pub fn pick_result(outcome: PickOutcome) -> CallToolResult {
    match outcome.into_result() {
        Ok(image) => CallToolResult::success(vec![image_content(&image)]),
        Err(e) => error_result(e.to_string()),
    }
}

/// Never fails; problems are described in the returned text
pub fn image_info_text(path: &Path) -> String {
    match ImageInfo::from_path(path) {
        Ok(info) => info.to_string(),
        Err(ImageError::FileNotFound(_)) => format!("File not found: {}", path.display()),
        Err(e) => format!("Failed to read image info: {}", e),
    }
}

fn image_content(image: &CapturedImage) -> Content {
    Content::image(
        general_purpose::STANDARD.encode(&image.png),
        CapturedImage::MIME_TYPE.to_string(),
    )
}

fn error_result(message: String) -> CallToolResult {
    CallToolResult::error(vec![Content::text(message)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedback_core::{CancelReason, ValidationError};
    use feedback_images::ImageSource;
    use image::{ImageFormat, Rgb, RgbImage};
    use rmcp::model::RawContent;
    use std::time::Duration;
    use tempfile::TempDir;

    fn image(name: &str, png: &[u8]) -> CapturedImage {
        CapturedImage {
            png: png.to_vec(),
            source: ImageSource::File {
                name: name.to_string(),
            },
            width: 1,
            height: 1,
        }
    }

    fn text_of(content: &Content) -> &str {
        match &content.raw {
            RawContent::Text(text) => &text.text,
            other => panic!("Expected text content, got {:?}", other),
        }
    }

    #[test]
    fn test_submitted_text_and_images_in_order() {
        let outcome = FeedbackOutcome::submitted(
            Some("  Looks good  ".to_string()),
            vec![image("a.png", b"first"), image("b.png", b"second")],
        );

        let result = feedback_result(outcome);
        assert_ne!(result.is_error, Some(true));
        assert_eq!(result.content.len(), 3);

        let text = text_of(&result.content[0]);
        assert!(text.starts_with("User feedback: Looks good\nSubmitted at: "));

        let encoded: Vec<&str> = result.content[1..]
            .iter()
            .map(|c| match &c.raw {
                RawContent::Image(image) => {
                    assert_eq!(image.mime_type, "image/png");
                    image.data.as_str()
                }
                other => panic!("Expected image content, got {:?}", other),
            })
            .collect();
        assert_eq!(
            encoded,
            vec![
                general_purpose::STANDARD.encode(b"first"),
                general_purpose::STANDARD.encode(b"second")
            ]
        );
    }

    #[test]
    fn test_images_only_has_no_text_item() {
        let result = feedback_result(FeedbackOutcome::submitted(
            None,
            vec![image("a.png", b"data")],
        ));
        assert_eq!(result.content.len(), 1);
        assert!(matches!(result.content[0].raw, RawContent::Image(_)));
    }

    #[test]
    fn test_cancel_is_error_result() {
        let result = feedback_result(FeedbackOutcome::cancelled(CancelReason::UserCancelled));
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result.content[0]).contains("User cancelled"));
    }

    #[test]
    fn test_timeout_is_error_result() {
        let result = feedback_result(FeedbackOutcome::timed_out(Duration::from_secs(5)));
        assert_eq!(result.is_error, Some(true));
        assert!(text_of(&result.content[0]).contains("Timed out after 5s"));
    }

    #[test]
    fn test_rejected_and_busy_are_error_results() {
        let rejected = feedback_result(FeedbackOutcome::cancelled(CancelReason::Rejected(
            ValidationError::Empty,
        )));
        assert_eq!(rejected.is_error, Some(true));

        let busy = pick_result(PickOutcome::Cancelled {
            reason: CancelReason::Busy,
        });
        assert_eq!(busy.is_error, Some(true));
    }

    #[test]
    fn test_picked_image() {
        let result = pick_result(PickOutcome::Picked {
            image: image("shot.png", b"png"),
        });
        assert_ne!(result.is_error, Some(true));
        assert_eq!(result.content.len(), 1);
        assert!(matches!(result.content[0].raw, RawContent::Image(_)));
    }

    #[test]
    fn test_image_info_text() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("chart.png");
        RgbImage::from_pixel(64, 32, Rgb([10, 20, 30]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let text = image_info_text(&path);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "File name: chart.png");
        assert_eq!(lines[1], "Format: PNG");
        assert_eq!(lines[2], "Dimensions: 64 x 32");
        assert_eq!(lines[3], "Color mode: RGB");
        assert!(lines[4].starts_with("File size: ") && lines[4].ends_with(" KB"));
    }

    #[test]
    fn test_image_info_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.png");
        assert_eq!(
            image_info_text(&path),
            format!("File not found: {}", path.display())
        );
    }

    #[test]
    fn test_image_info_not_an_image() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "plain text").unwrap();
        assert!(image_info_text(&path).starts_with("Failed to read image info: "));
    }
}
