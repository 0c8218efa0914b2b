//! # Glyph Sources
//!
//! Boundary to the external glyph-rasterization collaborator. The render
//! pipeline never touches font files; it consumes pixel coverage through
//! [`GlyphSource`] and selects fallbacks with a capability query
//! (`can_render`) *before* composition, so there is no failure-driven
//! control flow.
//!
//! A built-in source backed by the Spleen bitmap font family is provided so
//! the pipeline works out of the box; any other rasterizer can be plugged in
//! by implementing the trait.

use spleen_font::{FONT_6X12, FONT_8X16, FONT_12X24, PSF2Font};

/// Pixel coverage for one character cell.
///
/// Row-major, one byte per pixel: 0 = blank, anything else = ink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphBitmap {
    pub width: u32,
    pub height: u32,
    pub coverage: Vec<u8>,
}

impl GlyphBitmap {
    #[inline]
    pub fn is_ink(&self, x: u32, y: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        self.coverage[(y * self.width + x) as usize] != 0
    }
}

/// A provider of monospace glyph coverage.
pub trait GlyphSource: Send + Sync {
    /// Character cell dimensions (width, height) in pixels.
    fn cell(&self) -> (u32, u32);

    /// Capability query: can this source draw `ch`?
    fn can_render(&self, ch: char) -> bool;

    /// Pixel coverage for `ch`, `None` when the glyph is missing.
    fn coverage(&self, ch: char) -> Option<GlyphBitmap>;
}

// ============================================================================
// SPLEEN BITMAP FONTS
// ============================================================================

/// Built-in glyph source over a Spleen PSF2 bitmap font.
#[derive(Debug, Clone, Copy)]
pub struct SpleenFont {
    data: &'static [u8],
    width: u32,
    height: u32,
}

/// Font size selector for the built-in Spleen sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FontSize {
    /// 6×12 cell
    Small,
    /// 8×16 cell
    #[default]
    Medium,
    /// 12×24 cell
    Large,
}

impl SpleenFont {
    pub const SMALL: Self = Self {
        data: FONT_6X12,
        width: 6,
        height: 12,
    };

    pub const MEDIUM: Self = Self {
        data: FONT_8X16,
        width: 8,
        height: 16,
    };

    pub const LARGE: Self = Self {
        data: FONT_12X24,
        width: 12,
        height: 24,
    };

    pub const fn of_size(size: FontSize) -> Self {
        match size {
            FontSize::Small => Self::SMALL,
            FontSize::Medium => Self::MEDIUM,
            FontSize::Large => Self::LARGE,
        }
    }

    /// Pick the size whose cell height best matches `pixels`.
    pub fn nearest_height(pixels: u32) -> Self {
        if pixels <= 13 {
            Self::SMALL
        } else if pixels <= 19 {
            Self::MEDIUM
        } else {
            Self::LARGE
        }
    }
}

impl GlyphSource for SpleenFont {
    fn cell(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn can_render(&self, ch: char) -> bool {
        // Static font data; parsing cannot fail
        let mut font = PSF2Font::new(self.data).unwrap();
        let utf8 = ch.to_string();
        font.glyph_for_utf8(utf8.as_bytes()).is_some()
    }

    fn coverage(&self, ch: char) -> Option<GlyphBitmap> {
        let mut font = PSF2Font::new(self.data).unwrap();
        let utf8 = ch.to_string();
        let glyph = font.glyph_for_utf8(utf8.as_bytes())?;

        let mut coverage = vec![0u8; (self.width * self.height) as usize];
        for (y, row) in glyph.enumerate() {
            for (x, on) in row.enumerate() {
                if on && (x as u32) < self.width && (y as u32) < self.height {
                    coverage[y * self.width as usize + x] = 1;
                }
            }
        }
        Some(GlyphBitmap {
            width: self.width,
            height: self.height,
            coverage,
        })
    }
}

// ============================================================================
// FALLBACK RESOLUTION
// ============================================================================

/// A primary glyph source plus an ordered fallback chain.
///
/// Resolution is deterministic: the first source whose `can_render` answers
/// yes supplies the glyph (rescaled to the primary cell when the fallback
/// cell differs); when every source declines, a box glyph is drawn.
pub struct GlyphLibrary {
    sources: Vec<Box<dyn GlyphSource>>,
}

impl GlyphLibrary {
    /// Library with a single primary source.
    pub fn new(primary: Box<dyn GlyphSource>) -> Self {
        Self {
            sources: vec![primary],
        }
    }

    /// Built-in library: the requested Spleen size backed by the other two
    /// sizes as fallbacks.
    pub fn spleen(size: FontSize) -> Self {
        let order = match size {
            FontSize::Small => [SpleenFont::SMALL, SpleenFont::MEDIUM, SpleenFont::LARGE],
            FontSize::Medium => [SpleenFont::MEDIUM, SpleenFont::LARGE, SpleenFont::SMALL],
            FontSize::Large => [SpleenFont::LARGE, SpleenFont::MEDIUM, SpleenFont::SMALL],
        };
        Self {
            sources: order.into_iter().map(|f| Box::new(f) as Box<dyn GlyphSource>).collect(),
        }
    }

    /// Add a fallback source (queried after everything already present).
    pub fn with_fallback(mut self, source: Box<dyn GlyphSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Primary cell dimensions; all resolved glyphs have this size.
    pub fn cell(&self) -> (u32, u32) {
        self.sources[0].cell()
    }

    /// Resolve a character to coverage in the primary cell.
    pub fn resolve(&self, ch: char) -> GlyphBitmap {
        let (cw, ch_px) = self.cell();
        for source in &self.sources {
            if !source.can_render(ch) {
                continue;
            }
            if let Some(glyph) = source.coverage(ch) {
                if glyph.width == cw && glyph.height == ch_px {
                    return glyph;
                }
                return scale_bitmap(&glyph, cw, ch_px);
            }
        }
        box_glyph(cw, ch_px)
    }
}

/// Nearest-neighbor rescale of a coverage bitmap.
fn scale_bitmap(src: &GlyphBitmap, dst_w: u32, dst_h: u32) -> GlyphBitmap {
    let mut coverage = vec![0u8; (dst_w * dst_h) as usize];
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx * src.width / dst_w;
            let sy = dy * src.height / dst_h;
            if src.is_ink(sx, sy) {
                coverage[(dy * dst_w + dx) as usize] = 1;
            }
        }
    }
    GlyphBitmap {
        width: dst_w,
        height: dst_h,
        coverage,
    }
}

/// Box outline drawn for characters no source can render.
fn box_glyph(width: u32, height: u32) -> GlyphBitmap {
    let mut coverage = vec![0u8; (width * height) as usize];
    for x in 0..width {
        coverage[x as usize] = 1;
        coverage[((height - 1) * width + x) as usize] = 1;
    }
    for y in 0..height {
        coverage[(y * width) as usize] = 1;
        coverage[(y * width + width - 1) as usize] = 1;
    }
    GlyphBitmap {
        width,
        height,
        coverage,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_sizes() {
        assert_eq!(SpleenFont::SMALL.cell(), (6, 12));
        assert_eq!(SpleenFont::MEDIUM.cell(), (8, 16));
        assert_eq!(SpleenFont::LARGE.cell(), (12, 24));
    }

    #[test]
    fn test_nearest_height() {
        assert_eq!(SpleenFont::nearest_height(10).cell(), (6, 12));
        assert_eq!(SpleenFont::nearest_height(16).cell(), (8, 16));
        assert_eq!(SpleenFont::nearest_height(30).cell(), (12, 24));
    }

    #[test]
    fn test_ascii_renders() {
        let font = SpleenFont::MEDIUM;
        for ch in ['A', 'z', '0', '!', ' '] {
            assert!(font.can_render(ch), "{:?} should render", ch);
        }
    }

    #[test]
    fn test_coverage_has_ink_for_letter() {
        let glyph = SpleenFont::MEDIUM.coverage('H').unwrap();
        assert_eq!(glyph.width, 8);
        assert_eq!(glyph.height, 16);
        assert!(glyph.coverage.iter().any(|&v| v != 0));
    }

    #[test]
    fn test_space_is_blank() {
        let glyph = SpleenFont::MEDIUM.coverage(' ').unwrap();
        assert!(glyph.coverage.iter().all(|&v| v == 0));
    }

    #[test]
    fn test_library_resolves_to_primary_cell() {
        let library = GlyphLibrary::spleen(FontSize::Large);
        let glyph = library.resolve('A');
        assert_eq!((glyph.width, glyph.height), (12, 24));
    }

    #[test]
    fn test_unrenderable_gets_box_glyph() {
        let library = GlyphLibrary::spleen(FontSize::Medium);
        // A private-use-area codepoint no bitmap font carries
        let glyph = library.resolve('\u{e000}');
        assert_eq!((glyph.width, glyph.height), (8, 16));
        // Corners of the box are inked
        assert!(glyph.is_ink(0, 0));
        assert!(glyph.is_ink(7, 15));
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let library = GlyphLibrary::spleen(FontSize::Medium);
        assert_eq!(library.resolve('Q'), library.resolve('Q'));
    }

    #[test]
    fn test_scale_bitmap_preserves_full_cell() {
        let src = GlyphBitmap {
            width: 2,
            height: 2,
            coverage: vec![1, 1, 1, 1],
        };
        let scaled = scale_bitmap(&src, 4, 4);
        assert!(scaled.coverage.iter().all(|&v| v == 1));
    }
}
