//! # Text Layout
//!
//! Composes lines of pre-rasterized glyph bitmaps onto a [`Canvas`]:
//! alignment, word wrap, line spacing, and bold/italic emulation for
//! monospace cells.
//!
//! The renderer is a pure function of its inputs: glyph pixels come from a
//! [`GlyphLibrary`], never from font files read here.

use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::error::TintaError;
use crate::render::glyph::GlyphLibrary;

/// Height of the blank canvas produced for empty text.
pub const MIN_TEXT_HEIGHT: u32 = 10;

/// Shear divisor for italic emulation: one extra column per 4 rows.
const ITALIC_SLOPE: u32 = 4;

/// Horizontal text alignment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Layout options for a block of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextOptions {
    pub alignment: Alignment,

    /// Wrap words at the canvas width. Off for banners.
    pub wrap: bool,

    /// Line advance as a multiple of the glyph cell height.
    pub line_spacing: f32,

    /// Double-strike emulation (second pass shifted 1px right).
    pub bold: bool,

    /// Shear emulation (upper rows lean right).
    pub italic: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            alignment: Alignment::Left,
            wrap: true,
            line_spacing: 1.2,
            bold: false,
            italic: false,
        }
    }
}

/// Render text into a canvas of the given width.
///
/// Empty (or whitespace-only) text yields a blank canvas of
/// [`MIN_TEXT_HEIGHT`] rows, not an error. Content that would exceed the
/// canvas height cap fails with `ContentTooLarge`.
pub fn render_text(
    text: &str,
    library: &GlyphLibrary,
    width: u32,
    options: &TextOptions,
) -> Result<Canvas, TintaError> {
    if text.trim().is_empty() {
        return Canvas::with_height(width, MIN_TEXT_HEIGHT);
    }

    let (cell_w, cell_h) = library.cell();
    let lines = layout_lines(text, width, cell_w, options.wrap);
    let line_height = (cell_h as f32 * options.line_spacing).round() as u32;

    let mut canvas = Canvas::with_height(width, lines.len() as u32 * line_height)?;
    for (i, line) in lines.iter().enumerate() {
        let y0 = i as u32 * line_height;
        draw_line(&mut canvas, line, library, y0, width, options);
    }
    Ok(canvas)
}

/// The tightest canvas width that fits `text` without wrapping.
///
/// Banners render at natural width first, then rotate.
pub fn natural_width(text: &str, library: &GlyphLibrary, options: &TextOptions) -> u32 {
    let (cell_w, cell_h) = library.cell();
    let longest = text
        .split('\n')
        .map(|line| line.chars().count() as u32)
        .max()
        .unwrap_or(0);
    let mut width = longest * cell_w;
    if options.italic {
        width += (cell_h - 1) / ITALIC_SLOPE;
    }
    if options.bold {
        width += 1;
    }
    width.max(1)
}

/// Split text into display lines, optionally word-wrapping at `width`.
fn layout_lines(text: &str, width: u32, cell_w: u32, wrap: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        if !wrap {
            lines.push(paragraph.to_string());
            continue;
        }
        if paragraph.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        wrap_paragraph(paragraph, width, cell_w, &mut lines);
    }
    lines
}

/// Greedy word wrap by cell advance. A word longer than the whole line
/// keeps its own line and is clipped at the canvas edge.
fn wrap_paragraph(paragraph: &str, width: u32, cell_w: u32, lines: &mut Vec<String>) {
    let max_chars = (width / cell_w.max(1)).max(1) as usize;
    let mut current = String::new();

    for word in paragraph.split_whitespace() {
        let candidate_len = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if candidate_len <= max_chars {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(word);
        } else if current.is_empty() {
            lines.push(word.to_string());
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
}

/// Draw one line of glyphs at vertical offset `y0`.
fn draw_line(
    canvas: &mut Canvas,
    line: &str,
    library: &GlyphLibrary,
    y0: u32,
    width: u32,
    options: &TextOptions,
) {
    let (cell_w, cell_h) = library.cell();
    let line_px = line.chars().count() as u32 * cell_w;
    let x0 = match options.alignment {
        Alignment::Left => 0,
        Alignment::Center => width.saturating_sub(line_px) / 2,
        Alignment::Right => width.saturating_sub(line_px),
    };

    for (i, ch) in line.chars().enumerate() {
        let glyph = library.resolve(ch);
        let gx0 = x0 + i as u32 * cell_w;
        for gy in 0..cell_h {
            let shear = if options.italic {
                (cell_h - 1 - gy) / ITALIC_SLOPE
            } else {
                0
            };
            for gx in 0..cell_w {
                if !glyph.is_ink(gx, gy) {
                    continue;
                }
                let px = gx0 + gx + shear;
                canvas.mark(px, y0 + gy);
                if options.bold {
                    canvas.mark(px + 1, y0 + gy);
                }
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::glyph::FontSize;

    fn library() -> GlyphLibrary {
        GlyphLibrary::spleen(FontSize::Medium)
    }

    #[test]
    fn test_empty_text_gives_minimum_blank_canvas() {
        let canvas = render_text("", &library(), 384, &TextOptions::default()).unwrap();
        assert_eq!(canvas.width(), 384);
        assert_eq!(canvas.height(), MIN_TEXT_HEIGHT);
        assert_eq!(canvas.ink_count(), 0);

        let ws = render_text("   \n  ", &library(), 384, &TextOptions::default()).unwrap();
        assert_eq!(ws.height(), MIN_TEXT_HEIGHT);
    }

    #[test]
    fn test_single_line_height() {
        let canvas = render_text("Hello", &library(), 384, &TextOptions::default()).unwrap();
        // 16px cell at 1.2 spacing = 19 rows
        assert_eq!(canvas.height(), 19);
        assert!(canvas.ink_count() > 0);
    }

    #[test]
    fn test_deterministic() {
        let opts = TextOptions::default();
        let a = render_text("Hello world", &library(), 384, &opts).unwrap();
        let b = render_text("Hello world", &library(), 384, &opts).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_wrap_splits_long_paragraph() {
        // 48 cells per line at 8px; 60 chars must wrap onto 2+ lines
        let long = "aaaa ".repeat(12); // 60 chars including trailing space
        let canvas = render_text(long.trim(), &library(), 384, &TextOptions::default()).unwrap();
        assert!(canvas.height() >= 38, "height {}", canvas.height());
    }

    #[test]
    fn test_no_wrap_keeps_one_line() {
        let long = "aaaa ".repeat(12);
        let opts = TextOptions {
            wrap: false,
            ..TextOptions::default()
        };
        let canvas = render_text(long.trim(), &library(), 384, &opts).unwrap();
        assert_eq!(canvas.height(), 19);
    }

    #[test]
    fn test_wrap_paragraph_word_boundaries() {
        let mut lines = Vec::new();
        // 10 chars per line (80px / 8px cells)
        wrap_paragraph("one two three four", 80, 8, &mut lines);
        assert_eq!(lines, vec!["one two", "three four"]);
    }

    #[test]
    fn test_wrap_overlong_word_keeps_own_line() {
        let mut lines = Vec::new();
        wrap_paragraph("hi incomprehensibilities yo", 80, 8, &mut lines);
        assert_eq!(
            lines,
            vec!["hi", "incomprehensibilities", "yo"]
        );
    }

    #[test]
    fn test_alignment_positions() {
        let opts_left = TextOptions::default();
        let opts_right = TextOptions {
            alignment: Alignment::Right,
            ..TextOptions::default()
        };
        let opts_center = TextOptions {
            alignment: Alignment::Center,
            ..TextOptions::default()
        };

        let left = render_text("X", &library(), 384, &opts_left).unwrap();
        let right = render_text("X", &library(), 384, &opts_right).unwrap();
        let center = render_text("X", &library(), 384, &opts_center).unwrap();

        let first_ink_x = |c: &Canvas| {
            (0..c.width())
                .find(|&x| (0..c.height()).any(|y| c.get(x, y)))
                .unwrap()
        };
        assert!(first_ink_x(&left) < 8);
        assert!(first_ink_x(&right) >= 376 - 8);
        let cx = first_ink_x(&center);
        assert!((180..200).contains(&cx), "center ink at {}", cx);
    }

    #[test]
    fn test_bold_adds_ink() {
        let normal = render_text("Bold", &library(), 384, &TextOptions::default()).unwrap();
        let bold = render_text(
            "Bold",
            &library(),
            384,
            &TextOptions {
                bold: true,
                ..TextOptions::default()
            },
        )
        .unwrap();
        assert!(bold.ink_count() > normal.ink_count());
    }

    #[test]
    fn test_italic_shears_top_rows_right() {
        let opts = TextOptions {
            italic: true,
            wrap: false,
            ..TextOptions::default()
        };
        let normal = render_text("|", &library(), 32, &TextOptions { wrap: false, ..TextOptions::default() }).unwrap();
        let italic = render_text("|", &library(), 32, &opts).unwrap();
        assert_eq!(normal.ink_count(), italic.ink_count());
        assert_ne!(normal, italic);
    }

    #[test]
    fn test_blank_paragraph_keeps_line_advance() {
        let one = render_text("a", &library(), 384, &TextOptions::default()).unwrap();
        let three = render_text("a\n\na", &library(), 384, &TextOptions::default()).unwrap();
        assert_eq!(three.height(), one.height() * 3);
    }

    #[test]
    fn test_natural_width() {
        let opts = TextOptions {
            wrap: false,
            ..TextOptions::default()
        };
        assert_eq!(natural_width("abc", &library(), &opts), 24);
        assert_eq!(natural_width("ab\nabcd", &library(), &opts), 32);
        // Never zero
        assert_eq!(natural_width("", &library(), &opts), 1);
    }
}
