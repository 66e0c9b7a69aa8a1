use std::collections::HashMap;
use std::io::BufRead;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui::{self, load::SizedTexture, Align, Layout, RichText, ScrollArea};
use feedback_core::{CancelReason, DeliverySlot, FeedbackOutcome, StopSignal};
use feedback_images::ImageLoader;
use tracing::info;

use crate::markdown::{self, Block};
use crate::protocol::{DialogReply, DialogSpec};
use crate::session::{NoticeLevel, Session};
use crate::DialogError;

pub const FEEDBACK_TITLE: &str = "Work summary & feedback";

const MIN_WINDOW_SIZE: [f32; 2] = [520.0, 560.0];
const FEEDBACK_HINT: &str = "Describe what works, what should change, or what is missing…";

/// How often the UI wakes to check for a stop request and tick the countdown
pub(crate) const POLL_INTERVAL: Duration = Duration::from_millis(200);

enum Action {
    ChooseFiles,
    Paste,
    ClearAll,
    Remove(u64),
    Submit,
    Cancel,
}

/// The feedback dialog window
pub struct FeedbackApp {
    session: Session,
    summary: Vec<Block>,
    deadline: Option<Instant>,
    stop: StopSignal,
    slot: DeliverySlot<DialogReply>,
    textures: HashMap<u64, egui::TextureHandle>,
}

impl FeedbackApp {
    pub fn new(spec: &DialogSpec, stop: StopSignal, slot: DeliverySlot<DialogReply>) -> Self {
        Self {
            session: Session::new(spec.limits, ImageLoader::new(spec.ingest.clone())),
            summary: markdown::parse(&spec.work_summary),
            deadline: countdown_deadline(spec.timeout_secs, Instant::now()),
            stop,
            slot,
            textures: HashMap::new(),
        }
    }

    fn finish(&mut self, ctx: &egui::Context, outcome: Option<FeedbackOutcome>) {
        if let Some(outcome) = outcome {
            info!(status = outcome.status(), "Feedback dialog closing");
            self.slot.deliver(DialogReply::Outcome { outcome });
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
        }
    }

    fn apply(&mut self, ctx: &egui::Context, action: Action) {
        match action {
            Action::ChooseFiles => {
                let extensions = self.session.loader().extensions();
                if let Some(paths) = rfd::FileDialog::new()
                    .set_title("Choose images")
                    .add_filter("Images", &extensions)
                    .pick_files()
                {
                    self.session.add_paths(&paths);
                }
            }
            Action::Paste => {
                self.session.add_from_clipboard();
            }
            Action::ClearAll => self.session.clear_images(),
            Action::Remove(id) => {
                self.session.remove(id);
            }
            Action::Submit => {
                let outcome = self.session.submit();
                self.finish(ctx, outcome);
            }
            Action::Cancel => {
                let outcome = self.session.cancel(CancelReason::UserCancelled);
                self.finish(ctx, outcome);
            }
        }
    }

    fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Upload previews for new images and drop those for removed ones
    fn sync_textures(&mut self, ctx: &egui::Context) {
        let images = self.session.images();
        self.textures
            .retain(|id, _| images.iter().any(|staged| staged.id == *id));

        for staged in images {
            self.textures.entry(staged.id).or_insert_with(|| {
                let thumb = &staged.thumbnail;
                let pixels = egui::ColorImage::from_rgba_unmultiplied(
                    [thumb.width as usize, thumb.height as usize],
                    &thumb.rgba,
                );
                ctx.load_texture(
                    format!("thumbnail-{}", staged.id),
                    pixels,
                    egui::TextureOptions::LINEAR,
                )
            });
        }
    }

    fn render_footer(&self, ctx: &egui::Context, actions: &mut Vec<Action>) {
        egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
            ui.add_space(6.0);
            if let Some(notice) = self.session.notice() {
                let color = match notice.level {
                    NoticeLevel::Info => ui.visuals().text_color(),
                    NoticeLevel::Warning => ui.visuals().warn_fg_color,
                    NoticeLevel::Error => ui.visuals().error_fg_color,
                };
                ui.label(RichText::new(&notice.message).color(color));
            }

            ui.horizontal(|ui| {
                if ui.button(RichText::new("Submit").strong()).clicked() {
                    actions.push(Action::Submit);
                }
                if ui.button("Cancel").clicked() {
                    actions.push(Action::Cancel);
                }
                if let Some(remaining) = self.remaining() {
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        let secs = remaining.as_secs();
                        ui.label(
                            RichText::new(format!("Closes in {}:{:02}", secs / 60, secs % 60))
                                .weak(),
                        );
                    });
                }
            });
            ui.label(
                RichText::new("You can send text, images, or both.")
                    .small()
                    .weak(),
            );
            ui.add_space(4.0);
        });
    }

    fn render_body(&mut self, ctx: &egui::Context, actions: &mut Vec<Action>) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading("Work summary");
            ScrollArea::vertical()
                .id_salt("summary")
                .max_height(ui.available_height() * 0.4)
                .auto_shrink([false, true])
                .show(ui, |ui| markdown::show(ui, &self.summary));

            ui.separator();
            ui.label(RichText::new("Your feedback").strong());

            let max_chars = self.session.limits().max_text_chars;
            let response = ui.add(
                egui::TextEdit::multiline(self.session.text_mut())
                    .hint_text(FEEDBACK_HINT)
                    .char_limit(max_chars)
                    .desired_rows(6)
                    .desired_width(f32::INFINITY),
            );
            if response.changed() {
                self.session.text_changed();
            }
            ui.label(
                RichText::new(format!("{} / {}", self.session.char_count(), max_chars))
                    .small()
                    .weak(),
            );

            ui.separator();
            ui.horizontal(|ui| {
                ui.label(RichText::new("Images").strong());
                ui.label(
                    RichText::new(format!(
                        "{} / {}",
                        self.session.images().len(),
                        self.session.limits().max_images
                    ))
                    .small()
                    .weak(),
                );
                if ui.button("Choose files…").clicked() {
                    actions.push(Action::ChooseFiles);
                }
                if ui.button("Paste from clipboard").clicked() {
                    actions.push(Action::Paste);
                }
                if ui
                    .add_enabled(!self.session.images().is_empty(), egui::Button::new("Clear all"))
                    .clicked()
                {
                    actions.push(Action::ClearAll);
                }
            });

            if self.session.images().is_empty() {
                ui.label(RichText::new("No images added").weak());
                ui.label(
                    RichText::new("Drop image files onto this window to attach them.")
                        .small()
                        .weak(),
                );
                return;
            }

            ScrollArea::horizontal()
                .id_salt("thumbnails")
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        for staged in self.session.images() {
                            ui.group(|ui| {
                                ui.vertical(|ui| {
                                    if let Some(texture) = self.textures.get(&staged.id) {
                                        ui.image(SizedTexture::from_handle(texture));
                                    }
                                    ui.label(RichText::new(staged.image.source_label()).small());
                                    ui.label(
                                        RichText::new(format!(
                                            "{}×{}",
                                            staged.image.width, staged.image.height
                                        ))
                                        .small()
                                        .weak(),
                                    );
                                    if ui.small_button("✕").on_hover_text("Remove").clicked() {
                                        actions.push(Action::Remove(staged.id));
                                    }
                                });
                            });
                        }
                    });
                });
        });
    }
}

impl eframe::App for FeedbackApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.session.rendered();
        if self.session.is_closed() {
            return;
        }

        if self.stop.is_triggered() {
            let outcome = self.session.cancel(CancelReason::Stopped);
            self.finish(ctx, outcome);
            return;
        }
        if ctx.input(|i| i.viewport().close_requested()) {
            let outcome = self.session.cancel(CancelReason::WindowClosed);
            self.finish(ctx, outcome);
            return;
        }

        let dropped: Vec<PathBuf> = ctx.input(|i| {
            i.raw
                .dropped_files
                .iter()
                .filter_map(|file| file.path.clone())
                .collect()
        });
        if !dropped.is_empty() {
            self.session.add_paths(&dropped);
        }

        self.sync_textures(ctx);

        let mut actions = Vec::new();
        self.render_footer(ctx, &mut actions);
        self.render_body(ctx, &mut actions);
        for action in actions {
            self.apply(ctx, action);
        }

        ctx.request_repaint_after(POLL_INTERVAL);
    }
}

impl Drop for FeedbackApp {
    // Covers teardown paths that never reached `update`
    fn drop(&mut self) {
        if let Some(outcome) = self.session.cancel(CancelReason::WindowClosed) {
            self.slot.deliver(DialogReply::Outcome { outcome });
        }
        self.session.terminate();
    }
}

/// When the countdown reaches zero. None for no timeout, or one too far off to show.
fn countdown_deadline(timeout_secs: Option<u64>, now: Instant) -> Option<Instant> {
    timeout_secs
        .filter(|secs| *secs > 0)
        .and_then(|secs| now.checked_add(Duration::from_secs(secs)))
}

/// Run the feedback window on the current thread until it closes
pub fn run<R>(
    spec: DialogSpec,
    input: R,
    stop: StopSignal,
    slot: DeliverySlot<DialogReply>,
) -> Result<(), DialogError>
where
    R: BufRead + Send + 'static,
{
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(FEEDBACK_TITLE)
            .with_inner_size([spec.window.width, spec.window.height])
            .with_min_inner_size(MIN_WINDOW_SIZE)
            .with_drag_and_drop(true),
        centered: true,
        ..Default::default()
    };

    eframe::run_native(
        FEEDBACK_TITLE,
        options,
        Box::new(move |cc| {
            crate::watch_host(input, stop.clone(), cc.egui_ctx.clone());
            Ok(Box::new(FeedbackApp::new(&spec, stop, slot)))
        }),
    )
    .map_err(|e| DialogError::Window(e.to_string()))
}
