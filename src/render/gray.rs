//! # Grayscale Adjustment
//!
//! Prepares a continuous-tone image for dithering: exact quarter-turn
//! rotation, scale/pad to the printer width, and the linear
//! brightness/contrast transform.
//!
//! The processing order matches the print path: rotate, fit to width,
//! adjust, invert (if requested), and only then dither.

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

use crate::error::TintaError;

/// Exact quarter-turn rotations, counterclockwise.
///
/// Pixels are remapped one-to-one; no interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Rotation {
    #[default]
    #[value(name = "0")]
    None,
    /// 90° counterclockwise
    #[value(name = "90")]
    Ccw90,
    /// 180°
    #[value(name = "180")]
    Half,
    /// 270° counterclockwise
    #[value(name = "270")]
    Ccw270,
}

/// Adjustment parameters applied before dithering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageAdjust {
    /// Additive brightness shift, -255..=255 (0 = unchanged)
    pub brightness: i16,

    /// Contrast multiplier around mid-gray (1.0 = unchanged)
    pub contrast: f32,

    /// Quarter-turn rotation applied first
    pub rotation: Rotation,
}

impl Default for ImageAdjust {
    fn default() -> Self {
        Self {
            brightness: 0,
            contrast: 1.0,
            rotation: Rotation::None,
        }
    }
}

/// Load an image file and convert it to 8-bit grayscale.
pub fn load_gray(path: &std::path::Path) -> Result<GrayImage, TintaError> {
    let img = image::open(path)
        .map_err(|e| TintaError::Image(format!("failed to load {}: {}", path.display(), e)))?;
    Ok(img.to_luma8())
}

/// Apply the full adjustment pipeline and fit the result to `target_width`.
pub fn prepare(img: &GrayImage, adjust: &ImageAdjust, target_width: u32) -> GrayImage {
    let rotated = rotate(img, adjust.rotation);
    let fitted = fit_width(&rotated, target_width);
    brightness_contrast(&fitted, adjust.brightness, adjust.contrast)
}

/// Exact quarter-turn rotation.
pub fn rotate(img: &GrayImage, rotation: Rotation) -> GrayImage {
    match rotation {
        Rotation::None => img.clone(),
        // imageops rotations are clockwise; CCW 90° = CW 270°
        Rotation::Ccw90 => imageops::rotate270(img),
        Rotation::Half => imageops::rotate180(img),
        Rotation::Ccw270 => imageops::rotate90(img),
    }
}

/// Fit an image to the printer width.
///
/// Wider images are scaled down with Lanczos3 (preserving aspect); narrower
/// images are centered on a white background. An exact match passes through
/// untouched.
pub fn fit_width(img: &GrayImage, target_width: u32) -> GrayImage {
    let (w, h) = img.dimensions();
    if w == target_width {
        return img.clone();
    }
    if w > target_width {
        let scaled_height = ((h as u64 * target_width as u64) / w as u64).max(1) as u32;
        return imageops::resize(img, target_width, scaled_height, FilterType::Lanczos3);
    }
    let mut padded = GrayImage::from_pixel(target_width, h, Luma([255]));
    let x_offset = (target_width - w) / 2;
    imageops::overlay(&mut padded, img, x_offset as i64, 0);
    padded
}

/// Linear brightness/contrast transform:
///
/// ```text
/// out = clamp((in - 128) * contrast + 128 + brightness, 0, 255)
/// ```
pub fn brightness_contrast(img: &GrayImage, brightness: i16, contrast: f32) -> GrayImage {
    if brightness == 0 && (contrast - 1.0).abs() < f32::EPSILON {
        return img.clone();
    }
    let mut out = img.clone();
    for pixel in out.pixels_mut() {
        let v = pixel.0[0] as f32;
        let adjusted = (v - 128.0) * contrast + 128.0 + brightness as f32;
        pixel.0[0] = adjusted.clamp(0.0, 255.0) as u8;
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Luma([0])
            } else {
                Luma([255])
            }
        })
    }

    #[test]
    fn test_brightness_contrast_identity() {
        let img = checker(8, 8);
        let out = brightness_contrast(&img, 0, 1.0);
        assert_eq!(out, img);
    }

    #[test]
    fn test_brightness_shift() {
        let img = GrayImage::from_pixel(2, 2, Luma([100]));
        let out = brightness_contrast(&img, 50, 1.0);
        assert_eq!(out.get_pixel(0, 0).0[0], 150);
    }

    #[test]
    fn test_contrast_formula() {
        let img = GrayImage::from_pixel(1, 1, Luma([100]));
        // (100 - 128) * 2 + 128 = 72
        let out = brightness_contrast(&img, 0, 2.0);
        assert_eq!(out.get_pixel(0, 0).0[0], 72);
    }

    #[test]
    fn test_contrast_clamps() {
        let img = GrayImage::from_pixel(1, 1, Luma([10]));
        let out = brightness_contrast(&img, 0, 4.0);
        assert_eq!(out.get_pixel(0, 0).0[0], 0);
        let img = GrayImage::from_pixel(1, 1, Luma([250]));
        let out = brightness_contrast(&img, 0, 4.0);
        assert_eq!(out.get_pixel(0, 0).0[0], 255);
    }

    #[test]
    fn test_mid_gray_fixed_under_contrast() {
        let img = GrayImage::from_pixel(1, 1, Luma([128]));
        let out = brightness_contrast(&img, 0, 3.0);
        assert_eq!(out.get_pixel(0, 0).0[0], 128);
    }

    #[test]
    fn test_rotation_dimensions() {
        let img = checker(10, 4);
        assert_eq!(rotate(&img, Rotation::Ccw90).dimensions(), (4, 10));
        assert_eq!(rotate(&img, Rotation::Half).dimensions(), (10, 4));
        assert_eq!(rotate(&img, Rotation::Ccw270).dimensions(), (4, 10));
    }

    #[test]
    fn test_rotation_round_trip() {
        let img = checker(10, 4);
        let back = rotate(&rotate(&img, Rotation::Ccw90), Rotation::Ccw270);
        assert_eq!(back, img);
        let twice = rotate(&rotate(&img, Rotation::Half), Rotation::Half);
        assert_eq!(twice, img);
    }

    #[test]
    fn test_ccw90_moves_top_right_to_top_left() {
        let mut img = GrayImage::from_pixel(4, 2, Luma([255]));
        img.put_pixel(3, 0, Luma([0]));
        let rotated = rotate(&img, Rotation::Ccw90);
        assert_eq!(rotated.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_fit_width_exact_passthrough() {
        let img = checker(384, 4);
        assert_eq!(fit_width(&img, 384), img);
    }

    #[test]
    fn test_fit_width_pads_narrow_centered() {
        let img = GrayImage::from_pixel(100, 2, Luma([0]));
        let fitted = fit_width(&img, 384);
        assert_eq!(fitted.dimensions(), (384, 2));
        // Margins white, content black
        assert_eq!(fitted.get_pixel(0, 0).0[0], 255);
        assert_eq!(fitted.get_pixel(142, 0).0[0], 0);
        assert_eq!(fitted.get_pixel(383, 0).0[0], 255);
    }

    #[test]
    fn test_fit_width_scales_wide_preserving_aspect() {
        let img = GrayImage::from_pixel(768, 100, Luma([128]));
        let fitted = fit_width(&img, 384);
        assert_eq!(fitted.dimensions(), (384, 50));
    }
}
