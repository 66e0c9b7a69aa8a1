use std::io::BufRead;
use std::path::{Path, PathBuf};

use eframe::egui::{self, RichText};
use feedback_core::{CancelReason, DeliverySlot, PickOutcome, StopSignal};
use feedback_images::{CapturedImage, ImageError, ImageLoader};
use tracing::info;

use crate::app::POLL_INTERVAL;
use crate::protocol::{DialogReply, PickSpec};
use crate::session::{Notice, NoticeLevel};
use crate::DialogError;

pub const PICKER_TITLE: &str = "Select an image";

/// State of the single-image picker. The first image that loads ends it.
pub struct PickerSession {
    loader: ImageLoader,
    notice: Option<Notice>,
    closed: bool,
}

impl PickerSession {
    pub fn new(loader: ImageLoader) -> Self {
        Self {
            loader,
            notice: None,
            closed: false,
        }
    }

    pub fn loader(&self) -> &ImageLoader {
        &self.loader
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn choose(&mut self, path: &Path) -> Option<PickOutcome> {
        if self.closed {
            return None;
        }
        let result = self.loader.load_from_path(path);
        self.accept(result)
    }

    pub fn paste(&mut self) -> Option<PickOutcome> {
        if self.closed {
            return None;
        }
        let result = self.loader.load_from_clipboard();
        self.accept(result)
    }

    pub fn cancel(&mut self, reason: CancelReason) -> Option<PickOutcome> {
        if self.closed {
            return None;
        }
        self.closed = true;
        Some(PickOutcome::Cancelled { reason })
    }

    fn accept(&mut self, result: Result<CapturedImage, ImageError>) -> Option<PickOutcome> {
        match result {
            Ok(image) => {
                self.closed = true;
                Some(PickOutcome::Picked { image })
            }
            Err(e) => {
                self.notice = Some(Notice::for_image_error(&e));
                None
            }
        }
    }
}

enum Action {
    ChooseFile,
    Paste,
    Cancel,
}

/// The image picker window
pub struct ImagePickerApp {
    picker: PickerSession,
    stop: StopSignal,
    slot: DeliverySlot<DialogReply>,
}

impl ImagePickerApp {
    pub fn new(spec: &PickSpec, stop: StopSignal, slot: DeliverySlot<DialogReply>) -> Self {
        Self {
            picker: PickerSession::new(ImageLoader::new(spec.ingest.clone())),
            stop,
            slot,
        }
    }

    fn finish(&mut self, ctx: &egui::Context, outcome: Option<PickOutcome>) {
        if let Some(outcome) = outcome {
            info!(status = outcome.status(), "Image picker closing");
            self.slot.deliver(DialogReply::from_pick(outcome));
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }
}

impl eframe::App for ImagePickerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.picker.is_closed() {
            return;
        }
        if self.stop.is_triggered() {
            let outcome = self.picker.cancel(CancelReason::Stopped);
            self.finish(ctx, outcome);
            return;
        }
        if ctx.input(|i| i.viewport().close_requested()) {
            let outcome = self.picker.cancel(CancelReason::WindowClosed);
            self.finish(ctx, outcome);
            return;
        }

        let dropped: Option<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .find_map(|file| file.path.clone())
        });
        if let Some(path) = dropped {
            let outcome = self.picker.choose(&path);
            self.finish(ctx, outcome);
            return;
        }

        let mut action = None;
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.add_space(24.0);
                ui.heading("Choose an image to send");
                ui.add_space(16.0);
                if ui.button("Choose file…").clicked() {
                    action = Some(Action::ChooseFile);
                }
                ui.add_space(6.0);
                if ui.button("Paste from clipboard").clicked() {
                    action = Some(Action::Paste);
                }
                ui.add_space(6.0);
                if ui.button("Cancel").clicked() {
                    action = Some(Action::Cancel);
                }
                ui.add_space(12.0);
                if let Some(notice) = self.picker.notice() {
                    let color = match notice.level {
                        NoticeLevel::Info => ui.visuals().text_color(),
                        NoticeLevel::Warning => ui.visuals().warn_fg_color,
                        NoticeLevel::Error => ui.visuals().error_fg_color,
                    };
                    ui.label(RichText::new(&notice.message).color(color));
                }
            });
        });

        let outcome = match action {
            Some(Action::ChooseFile) => {
                let extensions = self.picker.loader().extensions();
                rfd::FileDialog::new()
                    .set_title("Choose an image")
                    .add_filter("Images", &extensions)
                    .pick_file()
                    .and_then(|path| self.picker.choose(&path))
            }
            Some(Action::Paste) => self.picker.paste(),
            Some(Action::Cancel) => self.picker.cancel(CancelReason::UserCancelled),
            None => None,
        };
        self.finish(ctx, outcome);

        ctx.request_repaint_after(POLL_INTERVAL);
    }
}

impl Drop for ImagePickerApp {
    fn drop(&mut self) {
        if let Some(outcome) = self.picker.cancel(CancelReason::WindowClosed) {
            self.slot.deliver(DialogReply::from_pick(outcome));
        }
    }
}

/// Run the picker window on the current thread until it closes
pub fn run<R>(
    spec: PickSpec,
    input: R,
    stop: StopSignal,
    slot: DeliverySlot<DialogReply>,
) -> Result<(), DialogError>
where
    R: BufRead + Send + 'static,
{
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(PICKER_TITLE)
            .with_inner_size([400.0, 300.0])
            .with_resizable(false)
            .with_drag_and_drop(true),
        centered: true,
        ..Default::default()
    };

    eframe::run_native(
        PICKER_TITLE,
        options,
        Box::new(move |cc| {
            crate::watch_host(input, stop.clone(), cc.egui_ctx.clone());
            Ok(Box::new(ImagePickerApp::new(&spec, stop, slot)))
        }),
    )
    .map_err(|e| DialogError::Window(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn test_first_good_image_closes_picker() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diagram.png");
        RgbImage::from_pixel(10, 5, Rgb([0, 0, 0]))
            .save_with_format(&path, ImageFormat::Png)
            .unwrap();

        let mut picker = PickerSession::new(ImageLoader::default());
        assert!(picker.choose(&dir.path().join("missing.png")).is_none());
        assert_eq!(picker.notice().map(|n| n.level), Some(NoticeLevel::Error));
        assert!(!picker.is_closed());

        match picker.choose(&path) {
            Some(PickOutcome::Picked { image }) => {
                assert_eq!((image.width, image.height), (10, 5));
                assert_eq!(image.source_label(), "file: diagram.png");
            }
            other => panic!("Expected Picked, got {:?}", other),
        }
        assert!(picker.is_closed());
        assert!(picker.cancel(CancelReason::UserCancelled).is_none());
    }

    #[test]
    fn test_empty_clipboard_keeps_picker_open() {
        let mut picker = PickerSession::new(ImageLoader::default());
        assert!(picker.accept(Err(ImageError::ClipboardEmpty)).is_none());
        assert_eq!(picker.notice().map(|n| n.level), Some(NoticeLevel::Info));
        assert!(!picker.is_closed());
    }

    #[test]
    fn test_cancel_once() {
        let mut picker = PickerSession::new(ImageLoader::default());
        assert_eq!(
            picker.cancel(CancelReason::UserCancelled),
            Some(PickOutcome::Cancelled {
                reason: CancelReason::UserCancelled
            })
        );
        assert!(picker.cancel(CancelReason::Stopped).is_none());
    }
}
