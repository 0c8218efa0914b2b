//! # Banner Rendering
//!
//! A banner is text printed sideways: rendered horizontally at its natural
//! width, padded across the printhead, then rotated 90° counterclockwise so
//! it runs along the paper feed direction.
//!
//! The requested vertical alignment refers to the *un-rotated* text: after
//! rotation it becomes a horizontal offset across the printhead.

use crate::canvas::{Canvas, VerticalAlign};
use crate::error::TintaError;
use crate::render::glyph::GlyphLibrary;
use crate::render::text::{self, TextOptions};

/// Render banner text for a printer of the given head width.
///
/// The output canvas is exactly `printer_width` dots wide; its height is
/// the pixel length of the text (subject to the canvas height cap).
pub fn render_banner(
    content: &str,
    library: &GlyphLibrary,
    printer_width: u32,
    valign: VerticalAlign,
) -> Result<Canvas, TintaError> {
    let options = TextOptions {
        wrap: false,
        ..TextOptions::default()
    };

    // Natural-width horizontal layout; wrapping makes no sense sideways.
    let width = text::natural_width(content, library, &options);
    let horizontal = text::render_text(content, library, width, &options)?;

    // Height becomes width after rotation, so the rotated canvas can only
    // match the printhead if we pad (or the text already overflows and the
    // rotation clips nothing; tall text is a ContentTooLarge at render).
    let padded = horizontal.pad_to_height(printer_width, valign)?;
    let rotated = padded.rotate90();

    if rotated.width() != printer_width {
        // Text taller than the printhead: resize by cropping is not
        // supported; surface it as oversized content.
        return Err(TintaError::ContentTooLarge(format!(
            "banner text is {} dots tall, printhead is {}",
            rotated.width(),
            printer_width
        )));
    }
    Ok(rotated)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::glyph::{FontSize, GlyphLibrary};

    fn library() -> GlyphLibrary {
        GlyphLibrary::spleen(FontSize::Medium)
    }

    #[test]
    fn test_banner_width_matches_printhead() {
        let canvas = render_banner("HELLO", &library(), 384, VerticalAlign::Center).unwrap();
        assert_eq!(canvas.width(), 384);
        // 5 chars × 8px cells rotate into height
        assert_eq!(canvas.height(), 40);
        assert!(canvas.ink_count() > 0);
    }

    #[test]
    fn test_banner_is_rotated_text() {
        let options = TextOptions {
            wrap: false,
            ..TextOptions::default()
        };
        let library = library();
        let width = text::natural_width("UP", &library, &options);
        let horizontal = text::render_text("UP", &library, width, &options).unwrap();
        let banner = render_banner("UP", &library, 384, VerticalAlign::Top).unwrap();

        // Every ink pixel survives the pad + rotation
        assert_eq!(horizontal.ink_count(), banner.ink_count());
    }

    #[test]
    fn test_vertical_alignment_becomes_horizontal_offset() {
        let library = library();
        let top = render_banner("X", &library, 384, VerticalAlign::Top).unwrap();
        let bottom = render_banner("X", &library, 384, VerticalAlign::Bottom).unwrap();

        let first_ink_x = |c: &Canvas| {
            (0..c.width()).find(|&x| (0..c.height()).any(|y| c.get(x, y)))
        };
        let top_x = first_ink_x(&top).unwrap();
        let bottom_x = first_ink_x(&bottom).unwrap();
        assert_ne!(top_x, bottom_x);
    }

    #[test]
    fn test_empty_banner_is_blank_strip() {
        let canvas = render_banner("", &library(), 384, VerticalAlign::Center).unwrap();
        assert_eq!(canvas.width(), 384);
        assert_eq!(canvas.ink_count(), 0);
    }

    #[test]
    fn test_deterministic() {
        let a = render_banner("Banner!", &library(), 384, VerticalAlign::Center).unwrap();
        let b = render_banner("Banner!", &library(), 384, VerticalAlign::Center).unwrap();
        assert_eq!(a, b);
    }
}
