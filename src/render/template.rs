//! # Label Templates
//!
//! Composites independent text regions onto a background image. The
//! persistence format is a JSON document referencing the background path and
//! an ordered region list; regions may overlap, and later regions paint over
//! earlier ones (z-order = insertion order).
//!
//! Loading (I/O) and rendering (pure) are split: [`load_document`] +
//! [`TemplateDocument::resolve`] do the file work, [`render_template`] is a
//! pure function of the resolved content.

use std::path::{Path, PathBuf};

use image::GrayImage;
use serde::{Deserialize, Serialize};

use crate::error::TintaError;
use crate::render::glyph::{FontSize, GlyphLibrary, GlyphSource, SpleenFont};
use crate::render::text::{self, Alignment, TextOptions};
use crate::render::gray;

/// One text region of a template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub text: String,

    /// Font family name; `"small"`, `"medium"`, `"large"` select the
    /// built-in sizes directly, anything else falls back to nearest-by-size.
    #[serde(default)]
    pub font: String,

    /// Requested glyph height in pixels.
    #[serde(default = "default_font_size")]
    pub size: u32,

    #[serde(default)]
    pub bold: bool,

    #[serde(default)]
    pub italic: bool,

    #[serde(default)]
    pub alignment: Alignment,
}

fn default_font_size() -> u32 {
    16
}

impl TextRegion {
    /// Deterministic glyph library selection for this region.
    fn library(&self) -> GlyphLibrary {
        let size = match self.font.to_lowercase().as_str() {
            "small" => FontSize::Small,
            "medium" => FontSize::Medium,
            "large" => FontSize::Large,
            _ => match SpleenFont::nearest_height(self.size).cell() {
                (_, 12) => FontSize::Small,
                (_, 16) => FontSize::Medium,
                _ => FontSize::Large,
            },
        };
        GlyphLibrary::spleen(size)
    }
}

/// The on-disk template document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateDocument {
    /// Background image path, relative to the document's directory.
    pub background: PathBuf,

    #[serde(default)]
    pub regions: Vec<TextRegion>,

    /// Contrast enhancement applied after compositing (1.0 = none).
    #[serde(default = "default_darkness")]
    pub darkness: f32,
}

fn default_darkness() -> f32 {
    1.5
}

/// A template with its background image loaded.
#[derive(Debug, Clone)]
pub struct TemplateContent {
    pub background: GrayImage,
    pub regions: Vec<TextRegion>,
    pub darkness: f32,
}

/// Parse a template document from a JSON file.
pub fn load_document(path: &Path) -> Result<TemplateDocument, TintaError> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| TintaError::Template(format!("cannot read {}: {}", path.display(), e)))?;
    serde_json::from_str(&data)
        .map_err(|e| TintaError::Template(format!("bad template {}: {}", path.display(), e)))
}

impl TemplateDocument {
    /// Load the background image, resolving its path against `base_dir`.
    pub fn resolve(self, base_dir: &Path) -> Result<TemplateContent, TintaError> {
        let bg_path = if self.background.is_absolute() {
            self.background.clone()
        } else {
            base_dir.join(&self.background)
        };
        let background = gray::load_gray(&bg_path)?;
        Ok(TemplateContent {
            background,
            regions: self.regions,
            darkness: self.darkness,
        })
    }
}

/// Composite all regions onto the background, apply the darkness contrast,
/// and fit the result to the printer width.
///
/// Pure: all inputs are in memory. Regions are drawn in document order.
pub fn render_template(
    content: &TemplateContent,
    target_width: u32,
) -> Result<GrayImage, TintaError> {
    let mut composed = content.background.clone();

    for region in &content.regions {
        draw_region(&mut composed, region)?;
    }

    let adjusted = if (content.darkness - 1.0).abs() > f32::EPSILON {
        gray::brightness_contrast(&composed, 0, content.darkness)
    } else {
        composed
    };

    Ok(gray::fit_width(&adjusted, target_width))
}

/// Rasterize one region's text and stamp its ink onto the image, clipped to
/// the region rect and the image bounds.
fn draw_region(img: &mut GrayImage, region: &TextRegion) -> Result<(), TintaError> {
    if region.text.trim().is_empty() || region.width == 0 || region.height == 0 {
        return Ok(());
    }

    let library = region.library();
    let options = TextOptions {
        alignment: region.alignment,
        bold: region.bold,
        italic: region.italic,
        ..TextOptions::default()
    };
    let rendered = text::render_text(&region.text, &library, region.width, &options)?;

    let (img_w, img_h) = img.dimensions();
    let rows = rendered.height().min(region.height);
    for ry in 0..rows {
        for rx in 0..rendered.width() {
            if !rendered.get(rx, ry) {
                continue;
            }
            let px = region.x + rx;
            let py = region.y + ry;
            if px < img_w && py < img_h {
                img.put_pixel(px, py, image::Luma([0]));
            }
        }
    }
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn white_background(w: u32, h: u32) -> GrayImage {
        GrayImage::from_pixel(w, h, Luma([255]))
    }

    fn region(x: u32, y: u32, text: &str) -> TextRegion {
        TextRegion {
            x,
            y,
            width: 200,
            height: 40,
            text: text.to_string(),
            font: "medium".to_string(),
            size: 16,
            bold: false,
            italic: false,
            alignment: Alignment::Left,
        }
    }

    #[test]
    fn test_document_json_roundtrip() {
        let json = r#"{
            "background": "label.png",
            "darkness": 1.2,
            "regions": [
                {"x": 10, "y": 20, "width": 120, "height": 32,
                 "text": "SKU-1", "font": "small", "size": 12,
                 "bold": true, "italic": false, "alignment": "center"}
            ]
        }"#;
        let doc: TemplateDocument = serde_json::from_str(json).unwrap();
        assert_eq!(doc.background, PathBuf::from("label.png"));
        assert_eq!(doc.regions.len(), 1);
        assert_eq!(doc.regions[0].alignment, Alignment::Center);
        assert!(doc.regions[0].bold);
    }

    #[test]
    fn test_document_defaults() {
        let doc: TemplateDocument =
            serde_json::from_str(r#"{"background": "bg.png"}"#).unwrap();
        assert!(doc.regions.is_empty());
        assert_eq!(doc.darkness, 1.5);
    }

    #[test]
    fn test_region_ink_lands_at_offset() {
        let content = TemplateContent {
            background: white_background(384, 100),
            regions: vec![region(50, 30, "X")],
            darkness: 1.0,
        };
        let img = render_template(&content, 384).unwrap();

        let ink_in = |x0: u32, y0: u32, x1: u32, y1: u32| {
            (y0..y1).any(|y| (x0..x1).any(|x| img.get_pixel(x, y).0[0] < 128))
        };
        assert!(ink_in(50, 30, 70, 50));
        // Nothing above/left of the region
        assert!(!ink_in(0, 0, 50, 30));
    }

    #[test]
    fn test_regions_paint_in_insertion_order() {
        // Two overlapping regions both mark ink; the merged result keeps both
        let content = TemplateContent {
            background: white_background(384, 60),
            regions: vec![region(0, 0, "A"), region(4, 0, "B")],
            darkness: 1.0,
        };
        let img = render_template(&content, 384).unwrap();
        let ink: usize = img.pixels().filter(|p| p.0[0] < 128).count();
        let single = TemplateContent {
            background: white_background(384, 60),
            regions: vec![region(0, 0, "A")],
            darkness: 1.0,
        };
        let img_single = render_template(&single, 384).unwrap();
        let ink_single: usize = img_single.pixels().filter(|p| p.0[0] < 128).count();
        assert!(ink > ink_single);
    }

    #[test]
    fn test_region_clipped_to_height() {
        let mut r = region(0, 0, "a\nb\nc\nd\ne");
        r.height = 19; // one line only
        let content = TemplateContent {
            background: white_background(384, 200),
            regions: vec![r],
            darkness: 1.0,
        };
        let img = render_template(&content, 384).unwrap();
        let ink_below = (19..200).any(|y| (0..384).any(|x| img.get_pixel(x, y).0[0] < 128));
        assert!(!ink_below);
    }

    #[test]
    fn test_empty_region_is_skipped() {
        let content = TemplateContent {
            background: white_background(384, 50),
            regions: vec![region(0, 0, "   ")],
            darkness: 1.0,
        };
        let img = render_template(&content, 384).unwrap();
        assert!(img.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn test_output_fits_target_width() {
        let content = TemplateContent {
            background: white_background(768, 100),
            regions: vec![],
            darkness: 1.0,
        };
        let img = render_template(&content, 384).unwrap();
        assert_eq!(img.dimensions(), (384, 50));
    }
}
