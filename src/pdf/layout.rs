use std::collections::HashMap;

use pdf_writer::{Content, Name, Str};

use crate::fonts::{Face, FontEntry, to_winansi_bytes};

#[derive(Clone, Copy, Debug, PartialEq)]
pub(super) enum Alignment {
    Left,
    Center,
}

/// A styled piece of text fed to the line builder.
pub(super) struct Span<'a> {
    pub(super) face: Face,
    pub(super) font_size: f32,
    pub(super) text: &'a str,
}

impl<'a> Span<'a> {
    pub(super) fn new(face: Face, font_size: f32, text: &'a str) -> Self {
        Self {
            face,
            font_size,
            text,
        }
    }
}

pub(super) struct WordChunk {
    pub(super) face: Face,
    pub(super) text: String,
    pub(super) font_size: f32,
    pub(super) x_offset: f32, // x relative to line start
    pub(super) width: f32,
}

pub(super) struct TextLine {
    pub(super) chunks: Vec<WordChunk>,
    pub(super) total_width: f32,
}

fn finish_line(chunks: &mut Vec<WordChunk>) -> TextLine {
    let total_width = chunks.last().map(|c| c.x_offset + c.width).unwrap_or(0.0);
    TextLine {
        chunks: std::mem::take(chunks),
        total_width,
    }
}

/// Wrap spans into lines no wider than `max_width`.
/// No space is inserted between spans unless the preceding text ended with
/// whitespace or the next span starts with it ("Phone:" + " 555" keeps one).
/// A single word wider than the line is placed on a line of its own.
pub(super) fn build_lines(
    spans: &[Span],
    fonts: &HashMap<Face, FontEntry>,
    max_width: f32,
) -> Vec<TextLine> {
    let mut lines: Vec<TextLine> = Vec::new();
    let mut current_chunks: Vec<WordChunk> = Vec::new();
    let mut current_x: f32 = 0.0;
    let mut prev_ended_with_ws = false;
    let mut prev_space_w: f32 = 0.0;

    for span in spans {
        let Some(entry) = fonts.get(&span.face) else {
            continue;
        };
        let space_w = entry.space_width(span.font_size);
        let starts_with_ws = span.text.starts_with(char::is_whitespace);

        for (i, word) in span.text.split_whitespace().enumerate() {
            let ww = entry.word_width(word, span.font_size);
            let need_space =
                !current_chunks.is_empty() && (i > 0 || starts_with_ws || prev_ended_with_ws);
            let effective_space_w = if i > 0 || starts_with_ws {
                space_w
            } else {
                prev_space_w
            };
            let proposed_x = if need_space {
                current_x + effective_space_w
            } else {
                current_x
            };

            if !current_chunks.is_empty() && proposed_x + ww > max_width {
                lines.push(finish_line(&mut current_chunks));
                current_x = 0.0;
            } else {
                current_x = proposed_x;
            }

            current_chunks.push(WordChunk {
                face: span.face,
                text: word.to_string(),
                font_size: span.font_size,
                x_offset: current_x,
                width: ww,
            });
            current_x += ww;
        }

        prev_ended_with_ws = span.text.ends_with(char::is_whitespace);
        prev_space_w = space_w;
    }

    if !current_chunks.is_empty() {
        lines.push(finish_line(&mut current_chunks));
    }

    if lines.is_empty() {
        lines.push(TextLine {
            chunks: vec![],
            total_width: 0.0,
        });
    }
    lines
}

/// Wrap text that may contain explicit line breaks. Each source line wraps on
/// its own; blank source lines stay as empty lines.
pub(super) fn build_text_block(
    text: &str,
    face: Face,
    font_size: f32,
    fonts: &HashMap<Face, FontEntry>,
    max_width: f32,
) -> Vec<TextLine> {
    let trimmed = text.trim_end_matches(['\n', '\r']);
    trimmed
        .lines()
        .flat_map(|line| build_lines(&[Span::new(face, font_size, line)], fonts, max_width))
        .collect()
}

/// Draw one line with its baseline at `baseline_y`.
pub(super) fn render_line(
    content: &mut Content,
    line: &TextLine,
    alignment: Alignment,
    margin_left: f32,
    text_width: f32,
    baseline_y: f32,
) {
    if line.chunks.is_empty() {
        return;
    }

    let line_start_x = match alignment {
        Alignment::Center => margin_left + (text_width - line.total_width).max(0.0) / 2.0,
        Alignment::Left => margin_left,
    };

    let mut cur_face: Option<Face> = None;
    let mut cur_font_size: f32 = -1.0;
    let mut td_x = 0.0_f32;
    let mut td_y = 0.0_f32;

    content.begin_text();
    for chunk in &line.chunks {
        if cur_face != Some(chunk.face) || cur_font_size != chunk.font_size {
            content.set_font(Name(chunk.face.pdf_name().as_bytes()), chunk.font_size);
            cur_face = Some(chunk.face);
            cur_font_size = chunk.font_size;
        }

        let x = line_start_x + chunk.x_offset;
        content.next_line(x - td_x, baseline_y - td_y);
        td_x = x;
        td_y = baseline_y;

        content.show(Str(&to_winansi_bytes(&chunk.text)));
    }
    content.end_text();
}
