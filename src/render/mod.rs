//! # Rendering Module
//!
//! Turns user content into a 1-bit [`Canvas`] sized to the printhead.
//!
//! ## Modules
//!
//! - [`glyph`]: glyph-source boundary and the built-in Spleen fonts
//! - [`text`]: line layout, wrapping, alignment
//! - [`banner`]: sideways text (pad + 90° rotation)
//! - [`template`]: text regions composited onto a background image
//! - [`gray`]: grayscale adjustment (brightness/contrast/rotation/fit)
//! - [`dither`]: the dithering engine
//!
//! ## Pipeline
//!
//! ```text
//! ContentDescriptor ──render──► GrayImage ──dither──► Canvas ──encode──► frames
//! ```
//!
//! [`render`] is pure and deterministic: all I/O (image decoding, template
//! documents) happens in the caller before the descriptor is built.

pub mod banner;
pub mod dither;
pub mod glyph;
pub mod gray;
pub mod template;
pub mod text;

use image::GrayImage;

use crate::canvas::{Canvas, VerticalAlign};
use crate::error::TintaError;
use self::dither::{DitherAlgorithm, DitherParams};
use self::glyph::{FontSize, GlyphLibrary};
use self::gray::ImageAdjust;
use self::template::TemplateContent;
use self::text::TextOptions;

/// Everything the renderer needs to produce a canvas, with all file I/O
/// already resolved.
#[derive(Debug, Clone)]
pub enum ContentDescriptor {
    /// Plain text block.
    Text {
        content: String,
        font: FontSize,
        options: TextOptions,
        /// 0–20 darkness scale, applied as a uniform threshold shift.
        darkness: u8,
    },

    /// Sideways text across the printhead.
    Banner {
        content: String,
        font: FontSize,
        /// Vertical alignment of the un-rotated text.
        valign: VerticalAlign,
        darkness: u8,
    },

    /// Text regions over a background image.
    Template {
        content: TemplateContent,
        dither: DitherParams,
    },

    /// A raster image through the adjustment + dithering pipeline.
    Image {
        image: GrayImage,
        adjust: ImageAdjust,
        dither: DitherParams,
    },

    /// A finished grid from the external calendar collaborator.
    Calendar {
        image: GrayImage,
        dither: DitherParams,
    },
}

/// Map the 0–20 darkness scale to a quantization threshold.
///
/// 10 is neutral (threshold 128); each step shifts the threshold by 12, so
/// darker settings ink more midtone pixels.
///
/// ```
/// use tinta::render::threshold_for_darkness;
///
/// assert_eq!(threshold_for_darkness(10), 128);
/// assert_eq!(threshold_for_darkness(0), 8);
/// assert_eq!(threshold_for_darkness(20), 248);
/// ```
pub fn threshold_for_darkness(darkness: u8) -> u8 {
    8 + darkness.min(20) * 12
}

/// Render a content descriptor into a canvas of the given printhead width.
pub fn render(descriptor: &ContentDescriptor, width: u32) -> Result<Canvas, TintaError> {
    match descriptor {
        ContentDescriptor::Text {
            content,
            font,
            options,
            darkness,
        } => {
            let library = GlyphLibrary::spleen(*font);
            let canvas = text::render_text(content, &library, width, options)?;
            binarize(canvas, *darkness)
        }

        ContentDescriptor::Banner {
            content,
            font,
            valign,
            darkness,
        } => {
            let library = GlyphLibrary::spleen(*font);
            let canvas = banner::render_banner(content, &library, width, *valign)?;
            binarize(canvas, *darkness)
        }

        ContentDescriptor::Template { content, dither } => {
            let composed = template::render_template(content, width)?;
            dither::dither(&composed, dither)
        }

        ContentDescriptor::Image {
            image,
            adjust,
            dither,
        } => {
            let prepared = gray::prepare(image, adjust, width);
            dither::dither(&prepared, dither)
        }

        ContentDescriptor::Calendar { image, dither } => {
            let fitted = gray::fit_width(image, width);
            dither::dither(&fitted, dither)
        }
    }
}

/// Re-quantize a glyph canvas through the darkness threshold.
///
/// Glyph coverage is binary, so this is exact for any darkness level; it
/// exists so text and grayscale content share one darkness semantic.
fn binarize(canvas: Canvas, darkness: u8) -> Result<Canvas, TintaError> {
    let params = DitherParams::new(DitherAlgorithm::None)
        .with_threshold(threshold_for_darkness(darkness));
    dither::dither(&canvas.to_gray(), &params)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_threshold_for_darkness_bounds() {
        assert_eq!(threshold_for_darkness(0), 8);
        assert_eq!(threshold_for_darkness(10), 128);
        assert_eq!(threshold_for_darkness(20), 248);
        // Clamped
        assert_eq!(threshold_for_darkness(99), 248);
    }

    #[test]
    fn test_text_descriptor_renders_at_width() {
        let descriptor = ContentDescriptor::Text {
            content: "Hello".to_string(),
            font: FontSize::Medium,
            options: TextOptions::default(),
            darkness: 10,
        };
        let canvas = render(&descriptor, 384).unwrap();
        assert_eq!(canvas.width(), 384);
        assert!(canvas.ink_count() > 0);
    }

    #[test]
    fn test_text_darkness_is_exact_for_binary_glyphs() {
        let at = |darkness| {
            render(
                &ContentDescriptor::Text {
                    content: "Q".to_string(),
                    font: FontSize::Medium,
                    options: TextOptions::default(),
                    darkness,
                },
                384,
            )
            .unwrap()
        };
        assert_eq!(at(0), at(20));
    }

    #[test]
    fn test_banner_descriptor() {
        let descriptor = ContentDescriptor::Banner {
            content: "UP".to_string(),
            font: FontSize::Medium,
            valign: VerticalAlign::Center,
            darkness: 10,
        };
        let canvas = render(&descriptor, 384).unwrap();
        assert_eq!(canvas.width(), 384);
        assert_eq!(canvas.height(), 16);
    }

    #[test]
    fn test_image_descriptor_full_pipeline() {
        let image = GrayImage::from_fn(768, 100, |x, _| Luma([(x % 256) as u8]));
        let descriptor = ContentDescriptor::Image {
            image,
            adjust: ImageAdjust::default(),
            dither: DitherParams::default(),
        };
        let canvas = render(&descriptor, 384).unwrap();
        assert_eq!(canvas.width(), 384);
        assert_eq!(canvas.height(), 50);
    }

    #[test]
    fn test_calendar_descriptor_is_fitted_and_dithered() {
        let image = GrayImage::from_pixel(100, 40, Luma([0]));
        let descriptor = ContentDescriptor::Calendar {
            image,
            dither: DitherParams::new(DitherAlgorithm::None),
        };
        let canvas = render(&descriptor, 384).unwrap();
        assert_eq!(canvas.width(), 384);
        assert_eq!(canvas.height(), 40);
        // 100 black columns centered on a white strip
        assert_eq!(canvas.ink_count(), 100 * 40);
    }

    #[test]
    fn test_render_is_deterministic() {
        let descriptor = ContentDescriptor::Text {
            content: "repeatable".to_string(),
            font: FontSize::Small,
            options: TextOptions::default(),
            darkness: 12,
        };
        assert_eq!(render(&descriptor, 384).unwrap(), render(&descriptor, 384).unwrap());
    }
}
