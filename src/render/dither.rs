//! # Dithering Engine
//!
//! Converts a continuous-tone [`GrayImage`] into a 1-bit [`Canvas`] using a
//! selectable algorithm.
//!
//! ## What is Dithering?
//!
//! A thermal head prints black or nothing. Dithering varies the density of
//! black dots to fake intermediate gray levels:
//!
//! ```text
//! Grayscale:    White    Light    Medium    Dark    Black
//!               ░░░░░░   ░░▒░░░   ░▒░▒░▒   ▒▓▒▓▒▓   ██████
//! ```
//!
//! ## Algorithms
//!
//! | Algorithm | Kind | Kernel |
//! |-----------|------|--------|
//! | None | fixed threshold | — |
//! | Ordered | 4×4 Bayer matrix | — |
//! | FloydSteinberg | error diffusion | 4 taps / 16 |
//! | Atkinson | error diffusion | 6 taps / 8 (lossy) |
//! | Burkes | error diffusion | 7 taps / 32 |
//! | Sierra | error diffusion | 10 taps / 32 |
//! | Stucki | error diffusion | 12 taps / 42 |
//!
//! Error diffusion scans rows left-to-right, quantizes each pixel against
//! the threshold, and pushes the quantization error onto unvisited
//! neighbors through the kernel. Errors accumulate in an `f32` buffer so a
//! pixel is never re-read after quantization.
//!
//! Atkinson's kernel sums to 6/8 on purpose — a quarter of the error is
//! discarded, which lightens highlights and shadows. That behavior is
//! characteristic of the algorithm and is reproduced, not corrected.
//!
//! All algorithms are deterministic: identical input and parameters produce
//! a byte-identical canvas.

use image::GrayImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::error::TintaError;

/// Dithering algorithm selector.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum DitherAlgorithm {
    /// Plain threshold, no dithering
    None,
    /// Floyd-Steinberg error diffusion
    #[default]
    FloydSteinberg,
    /// 4×4 Bayer ordered dithering
    Ordered,
    /// Atkinson error diffusion (classic Mac look)
    Atkinson,
    /// Burkes error diffusion
    Burkes,
    /// Sierra error diffusion
    Sierra,
    /// Stucki error diffusion
    Stucki,
}

/// Parameters for a dithering pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DitherParams {
    pub algorithm: DitherAlgorithm,

    /// Quantization threshold: intensities below it become ink.
    /// Ignored by `Ordered`, whose per-pixel threshold comes from the matrix.
    pub threshold: u8,

    /// Flip intensities before quantization.
    pub invert: bool,
}

impl DitherParams {
    pub fn new(algorithm: DitherAlgorithm) -> Self {
        Self {
            algorithm,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }
}

impl Default for DitherParams {
    fn default() -> Self {
        Self {
            algorithm: DitherAlgorithm::FloydSteinberg,
            threshold: 128,
            invert: false,
        }
    }
}

// ============================================================================
// DIFFUSION KERNELS
// ============================================================================

/// One error-diffusion tap: (dx, dy, weight numerator).
type Tap = (i32, u32, f32);

/// Floyd-Steinberg: right 7/16, below-left 3/16, below 5/16, below-right 1/16.
const FLOYD_STEINBERG: (&[Tap], f32) = (
    &[(1, 0, 7.0), (-1, 1, 3.0), (0, 1, 5.0), (1, 1, 1.0)],
    16.0,
);

/// Atkinson: six taps of 1/8 each; the remaining 2/8 is dropped.
const ATKINSON: (&[Tap], f32) = (
    &[
        (1, 0, 1.0),
        (2, 0, 1.0),
        (-1, 1, 1.0),
        (0, 1, 1.0),
        (1, 1, 1.0),
        (0, 2, 1.0),
    ],
    8.0,
);

/// Burkes: single-row-ahead kernel, divisor 32.
const BURKES: (&[Tap], f32) = (
    &[
        (1, 0, 8.0),
        (2, 0, 4.0),
        (-2, 1, 2.0),
        (-1, 1, 4.0),
        (0, 1, 8.0),
        (1, 1, 4.0),
        (2, 1, 2.0),
    ],
    32.0,
);

/// Sierra: ten taps across three rows, divisor 32.
const SIERRA: (&[Tap], f32) = (
    &[
        (1, 0, 5.0),
        (2, 0, 3.0),
        (-2, 1, 2.0),
        (-1, 1, 4.0),
        (0, 1, 5.0),
        (1, 1, 4.0),
        (2, 1, 2.0),
        (-1, 2, 2.0),
        (0, 2, 3.0),
        (1, 2, 2.0),
    ],
    32.0,
);

/// Stucki: twelve taps across three rows, divisor 42.
const STUCKI: (&[Tap], f32) = (
    &[
        (1, 0, 8.0),
        (2, 0, 4.0),
        (-2, 1, 2.0),
        (-1, 1, 4.0),
        (0, 1, 8.0),
        (1, 1, 4.0),
        (2, 1, 2.0),
        (-2, 2, 1.0),
        (-1, 2, 2.0),
        (0, 2, 4.0),
        (1, 2, 2.0),
        (2, 2, 1.0),
    ],
    42.0,
);

// ============================================================================
// BAYER MATRIX
// ============================================================================

/// 4×4 Bayer matrix, scaled ×16 so values span 0..=240 on the 8-bit range.
/// Indexed by `(y mod 4, x mod 4)`; a pixel prints when its intensity is at
/// or below the matrix threshold.
pub const BAYER4: [[u8; 4]; 4] = [
    [0, 128, 32, 160],
    [192, 64, 224, 96],
    [48, 176, 16, 144],
    [240, 112, 208, 80],
];

// ============================================================================
// ENTRY POINT
// ============================================================================

/// Dither a grayscale image into a 1-bit canvas of identical dimensions.
///
/// Intensity convention: 0 = black ink, 255 = white. Output satisfies the
/// canvas packing invariant (padding bits clear).
pub fn dither(img: &GrayImage, params: &DitherParams) -> Result<Canvas, TintaError> {
    match params.algorithm {
        DitherAlgorithm::None => threshold_dither(img, params),
        DitherAlgorithm::Ordered => ordered_dither(img, params),
        DitherAlgorithm::FloydSteinberg => error_diffusion(img, params, FLOYD_STEINBERG),
        DitherAlgorithm::Atkinson => error_diffusion(img, params, ATKINSON),
        DitherAlgorithm::Burkes => error_diffusion(img, params, BURKES),
        DitherAlgorithm::Sierra => error_diffusion(img, params, SIERRA),
        DitherAlgorithm::Stucki => error_diffusion(img, params, STUCKI),
    }
}

#[inline]
fn sample(img: &GrayImage, x: u32, y: u32, invert: bool) -> u8 {
    let v = img.get_pixel(x, y).0[0];
    if invert { 255 - v } else { v }
}

/// Plain threshold: ink wherever intensity drops below the threshold.
fn threshold_dither(img: &GrayImage, params: &DitherParams) -> Result<Canvas, TintaError> {
    let (w, h) = img.dimensions();
    let mut canvas = Canvas::with_height(w, h)?;
    for y in 0..h {
        for x in 0..w {
            if sample(img, x, y, params.invert) < params.threshold {
                canvas.mark(x, y);
            }
        }
    }
    Ok(canvas)
}

/// Ordered dithering against the tiled Bayer matrix.
///
/// No error propagation, so every row is independent; rows are dithered in
/// parallel and reassembled in order.
fn ordered_dither(img: &GrayImage, params: &DitherParams) -> Result<Canvas, TintaError> {
    let (w, h) = img.dimensions();
    let invert = params.invert;

    let rows: Vec<Vec<u8>> = (0..h)
        .into_par_iter()
        .map(|y| {
            let pixels: Vec<bool> = (0..w)
                .map(|x| {
                    let threshold = BAYER4[(y % 4) as usize][(x % 4) as usize];
                    sample(img, x, y, invert) <= threshold
                })
                .collect();
            pack_row(&pixels)
        })
        .collect();

    let mut canvas = Canvas::new(w);
    for row in &rows {
        canvas.push_row(row)?;
    }
    Ok(canvas)
}

/// Shared error-diffusion driver.
///
/// Works on a full-image `f32` buffer: each pixel is quantized exactly once,
/// and the residual error only ever lands on pixels that have not been
/// visited yet (taps point right and down).
fn error_diffusion(
    img: &GrayImage,
    params: &DitherParams,
    (taps, divisor): (&[Tap], f32),
) -> Result<Canvas, TintaError> {
    let (w, h) = img.dimensions();
    let mut canvas = Canvas::with_height(w, h)?;

    let mut buf: Vec<f32> = Vec::with_capacity((w * h) as usize);
    for y in 0..h {
        for x in 0..w {
            buf.push(sample(img, x, y, params.invert) as f32);
        }
    }

    let threshold = params.threshold as f32;
    let width = w as i64;

    for y in 0..h {
        for x in 0..w {
            let idx = (y * w + x) as usize;
            let old = buf[idx];
            let new = if old < threshold { 0.0 } else { 255.0 };
            buf[idx] = new;
            if new == 0.0 {
                canvas.mark(x, y);
            }

            let err = old - new;
            if err == 0.0 {
                continue;
            }
            for &(dx, dy, weight) in taps {
                let nx = x as i64 + dx as i64;
                let ny = y + dy;
                if nx < 0 || nx >= width || ny >= h {
                    continue;
                }
                let nidx = (ny as i64 * width + nx) as usize;
                buf[nidx] += err * weight / divisor;
            }
        }
    }

    Ok(canvas)
}

/// Pack a row of pixel flags (true = ink) into canvas bytes, MSB first,
/// padding the final byte with zeros.
///
/// ```
/// use tinta::render::dither::pack_row;
///
/// let row = vec![true, true, false, false, true, false, true, false];
/// assert_eq!(pack_row(&row), vec![0b11001010]);
///
/// let row = vec![true; 12];
/// assert_eq!(pack_row(&row), vec![0xFF, 0xF0]);
/// ```
pub fn pack_row(pixels: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; pixels.len().div_ceil(8)];
    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            bytes[i / 8] |= 1 << (7 - (i % 8));
        }
    }
    bytes
}

// ============================================================================
// TESTS
// ============================================================================
