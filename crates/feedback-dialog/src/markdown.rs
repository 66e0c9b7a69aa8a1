//! Line-oriented markdown for the read-only summary pane.
//!
//! Supports headings (`#` to `###`), bullet and numbered lists, block
//! quotes, fenced code, horizontal rules, and inline `**bold**` and
//! `` `code` ``. Anything else renders as a plain paragraph.

use eframe::egui::{self, text::LayoutJob, FontId, RichText, TextFormat};

/// Shown when the agent sent an empty summary
pub const EMPTY_SUMMARY: &str = "No work summary was provided.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Text(String),
    Bold(String),
    Code(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading { level: u8, spans: Vec<Span> },
    Paragraph(Vec<Span>),
    Bullet(Vec<Span>),
    Numbered { number: String, spans: Vec<Span> },
    Quote(Vec<Span>),
    Code(String),
    Rule,
    Blank,
}

pub fn parse(source: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut code: Option<Vec<&str>> = None;

    for line in source.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with("```") {
            match code.take() {
                Some(lines) => blocks.push(Block::Code(lines.join("\n"))),
                None => code = Some(Vec::new()),
            }
            continue;
        }
        if let Some(lines) = code.as_mut() {
            lines.push(line);
            continue;
        }

        let block = if trimmed.is_empty() {
            if matches!(blocks.last(), Some(Block::Blank) | None) {
                continue;
            }
            Block::Blank
        } else if let Some(rest) = trimmed.strip_prefix("### ") {
            Block::Heading {
                level: 3,
                spans: parse_inline(rest),
            }
        } else if let Some(rest) = trimmed.strip_prefix("## ") {
            Block::Heading {
                level: 2,
                spans: parse_inline(rest),
            }
        } else if let Some(rest) = trimmed.strip_prefix("# ") {
            Block::Heading {
                level: 1,
                spans: parse_inline(rest),
            }
        } else if is_rule(trimmed) {
            Block::Rule
        } else if let Some(rest) = trimmed.strip_prefix('>') {
            Block::Quote(parse_inline(rest.trim_start()))
        } else if let Some(rest) = ["- ", "* ", "+ "]
            .iter()
            .find_map(|marker| trimmed.strip_prefix(marker))
        {
            Block::Bullet(parse_inline(rest))
        } else if let Some((number, rest)) = split_numbered(trimmed) {
            Block::Numbered {
                number: number.to_string(),
                spans: parse_inline(rest),
            }
        } else {
            Block::Paragraph(parse_inline(trimmed))
        };
        blocks.push(block);
    }

    // Unterminated fence runs to the end
    if let Some(lines) = code {
        blocks.push(Block::Code(lines.join("\n")));
    }
    while matches!(blocks.last(), Some(Block::Blank)) {
        blocks.pop();
    }
    blocks
}

pub fn parse_inline(text: &str) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while !rest.is_empty() {
        if let Some((inner, after)) = delimited(rest, "**") {
            flush(&mut plain, &mut spans);
            spans.push(Span::Bold(inner.to_string()));
            rest = after;
            continue;
        }
        if let Some((inner, after)) = delimited(rest, "`") {
            flush(&mut plain, &mut spans);
            spans.push(Span::Code(inner.to_string()));
            rest = after;
            continue;
        }

        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            plain.push(ch);
        }
        rest = chars.as_str();
    }

    flush(&mut plain, &mut spans);
    spans
}

/// `rest` starts with `marker`, contains a closing `marker`, and something in between
fn delimited<'a>(rest: &'a str, marker: &str) -> Option<(&'a str, &'a str)> {
    let after_open = rest.strip_prefix(marker)?;
    let end = after_open.find(marker)?;
    if end == 0 {
        return None;
    }
    Some((&after_open[..end], &after_open[end + marker.len()..]))
}

fn flush(plain: &mut String, spans: &mut Vec<Span>) {
    if !plain.is_empty() {
        spans.push(Span::Text(std::mem::take(plain)));
    }
}

fn is_rule(line: &str) -> bool {
    let mut chars = line.chars().filter(|c| !c.is_whitespace());
    match chars.next() {
        Some(first @ ('-' | '*' | '_')) => {
            let rest: Vec<char> = chars.collect();
            rest.len() >= 2 && rest.iter().all(|&c| c == first)
        }
        _ => false,
    }
}

fn split_numbered(line: &str) -> Option<(&str, &str)> {
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = line[digits..].strip_prefix(". ")?;
    Some((&line[..digits], rest))
}

/// Draw parsed blocks into `ui`
pub fn show(ui: &mut egui::Ui, blocks: &[Block]) {
    if blocks.is_empty() {
        ui.label(RichText::new(EMPTY_SUMMARY).italics().weak());
        return;
    }

    let body = egui::TextStyle::Body.resolve(ui.style()).size;
    for block in blocks {
        match block {
            Block::Heading { level, spans } => {
                let size = match level {
                    1 => body + 8.0,
                    2 => body + 5.0,
                    _ => body + 2.0,
                };
                ui.add_space(4.0);
                ui.label(layout(ui, spans, size, true));
            }
            Block::Paragraph(spans) => {
                ui.label(layout(ui, spans, body, false));
            }
            Block::Bullet(spans) => {
                ui.horizontal_wrapped(|ui| {
                    ui.label("  •");
                    ui.label(layout(ui, spans, body, false));
                });
            }
            Block::Numbered { number, spans } => {
                ui.horizontal_wrapped(|ui| {
                    ui.label(format!("  {}.", number));
                    ui.label(layout(ui, spans, body, false));
                });
            }
            Block::Quote(spans) => {
                ui.horizontal_wrapped(|ui| {
                    ui.label(RichText::new("▌").weak());
                    ui.label(layout(ui, spans, body, false));
                });
            }
            Block::Code(code) => {
                egui::Frame::new()
                    .fill(ui.visuals().code_bg_color)
                    .inner_margin(egui::Margin::same(6))
                    .corner_radius(egui::CornerRadius::same(4))
                    .show(ui, |ui| {
                        ui.set_width(ui.available_width());
                        ui.label(RichText::new(code).monospace());
                    });
            }
            Block::Rule => {
                ui.separator();
            }
            Block::Blank => {
                ui.add_space(body * 0.5);
            }
        }
    }
}

fn layout(ui: &egui::Ui, spans: &[Span], size: f32, strong: bool) -> LayoutJob {
    let visuals = ui.visuals();
    let normal = if strong {
        visuals.strong_text_color()
    } else {
        visuals.text_color()
    };

    let mut job = LayoutJob::default();
    for span in spans {
        let (text, format) = match span {
            Span::Text(text) => (
                text,
                TextFormat {
                    font_id: FontId::proportional(size),
                    color: normal,
                    ..Default::default()
                },
            ),
            Span::Bold(text) => (
                text,
                TextFormat {
                    font_id: FontId::proportional(size),
                    color: visuals.strong_text_color(),
                    ..Default::default()
                },
            ),
            Span::Code(text) => (
                text,
                TextFormat {
                    font_id: FontId::monospace(size * 0.9),
                    color: normal,
                    background: visuals.code_bg_color,
                    ..Default::default()
                },
            ),
        };
        job.append(text, 0.0, format);
    }
    job
}
