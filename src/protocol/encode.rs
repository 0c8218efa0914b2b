//! # Command Frame Encoder
//!
//! Serializes a [`Canvas`] into the ordered frame stream the job scheduler
//! transmits: one frame per discrete protocol unit.
//!
//! ## Frame Sequence
//!
//! ```text
//! Init                 ESC @ + GS I F0 19
//! Darkness             GS I F1 n
//! Feed × feed_before   LF
//! Raster × height      GS v 0 + header + one packed row
//! Feed × feed_after    LF
//! Finish               9A
//! ```
//!
//! ## Laziness
//!
//! [`FrameStream`] is a single-pass, exact-size iterator. Frames are built
//! on demand so a tall canvas never has to exist as one contiguous command
//! buffer. The scheduler consumes the stream exactly once per job and checks
//! cancellation between frames.

use crate::canvas::Canvas;
use crate::error::TintaError;
use crate::printer::{PrintSettings, PrinterConfig};
use crate::protocol::commands;

/// Which protocol unit a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    /// Initialize + start-print sequence
    Init,
    /// Darkness parameter
    Darkness,
    /// One blank feed line
    Feed,
    /// One raster printhead row
    Raster,
    /// End-of-print marker
    Finish,
}

/// One immutable unit of the outbound command stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFrame {
    pub kind: FrameKind,
    pub bytes: Vec<u8>,
}

impl CommandFrame {
    fn init() -> Self {
        let mut bytes = commands::init();
        bytes.extend(commands::start_print());
        Self {
            kind: FrameKind::Init,
            bytes,
        }
    }

    fn darkness(level: u8) -> Self {
        Self {
            kind: FrameKind::Darkness,
            bytes: commands::set_darkness(level),
        }
    }

    fn feed() -> Self {
        Self {
            kind: FrameKind::Feed,
            bytes: commands::line_feed(),
        }
    }

    fn raster(row: &[u8]) -> Self {
        Self {
            kind: FrameKind::Raster,
            bytes: commands::raster_line(row),
        }
    }

    fn finish() -> Self {
        Self {
            kind: FrameKind::Finish,
            bytes: commands::end_print(),
        }
    }
}

/// Serialize a canvas into a lazy frame stream.
///
/// Fails with [`TintaError::UnsupportedWidth`] when the canvas width does
/// not match the printer's fixed raster width.
pub fn encode(
    canvas: Canvas,
    settings: &PrintSettings,
    printer: &PrinterConfig,
) -> Result<FrameStream, TintaError> {
    if canvas.width() != printer.width_dots as u32 {
        return Err(TintaError::UnsupportedWidth {
            canvas: canvas.width(),
            printer: printer.width_dots as u32,
        });
    }
    Ok(FrameStream {
        canvas,
        settings: settings.clamped(),
        cursor: 0,
    })
}

/// Lazy, single-pass iterator over a job's frames.
///
/// The total frame count is known up front (`ExactSizeIterator`), which is
/// what progress reporting divides by.
#[derive(Debug)]
pub struct FrameStream {
    canvas: Canvas,
    settings: PrintSettings,
    cursor: usize,
}

impl FrameStream {
    /// Total frames this stream will yield.
    pub fn total(&self) -> usize {
        2 + self.settings.feed_before as usize
            + self.canvas.height() as usize
            + self.settings.feed_after as usize
            + 1
    }

    /// Number of raster frames (= canvas height).
    pub fn raster_frames(&self) -> usize {
        self.canvas.height() as usize
    }
}

impl Iterator for FrameStream {
    type Item = CommandFrame;

    fn next(&mut self) -> Option<CommandFrame> {
        let before = self.settings.feed_before as usize;
        let rows = self.canvas.height() as usize;
        let after = self.settings.feed_after as usize;

        let idx = self.cursor;
        if idx >= self.total() {
            return None;
        }
        self.cursor += 1;

        let frame = if idx == 0 {
            CommandFrame::init()
        } else if idx == 1 {
            CommandFrame::darkness(self.settings.darkness)
        } else if idx < 2 + before {
            CommandFrame::feed()
        } else if idx < 2 + before + rows {
            let row = (idx - 2 - before) as u32;
            CommandFrame::raster(self.canvas.row(row))
        } else if idx < 2 + before + rows + after {
            CommandFrame::feed()
        } else {
            CommandFrame::finish()
        };
        Some(frame)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total() - self.cursor;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for FrameStream {}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn small_canvas(height: u32) -> Canvas {
        let mut canvas = Canvas::with_height(384, height).unwrap();
        for y in 0..height {
            canvas.set(y % 384, y, true);
        }
        canvas
    }

    #[test]
    fn test_frame_order() {
        let settings = PrintSettings::new(10, 2, 3);
        let stream = encode(small_canvas(5), &settings, &PrinterConfig::CTP500).unwrap();
        let kinds: Vec<FrameKind> = stream.map(|f| f.kind).collect();

        let mut expected = vec![FrameKind::Init, FrameKind::Darkness];
        expected.extend(std::iter::repeat_n(FrameKind::Feed, 2));
        expected.extend(std::iter::repeat_n(FrameKind::Raster, 5));
        expected.extend(std::iter::repeat_n(FrameKind::Feed, 3));
        expected.push(FrameKind::Finish);
        assert_eq!(kinds, expected);
    }

    #[test]
    fn test_total_matches_yielded() {
        let settings = PrintSettings::new(10, 2, 2);
        let stream = encode(small_canvas(7), &settings, &PrinterConfig::CTP500).unwrap();
        let total = stream.total();
        assert_eq!(total, 2 + 2 + 7 + 2 + 1);
        assert_eq!(stream.count(), total);
    }

    #[test]
    fn test_one_raster_frame_per_row_with_exact_width() {
        let height = 37;
        let stream = encode(
            small_canvas(height),
            &PrintSettings::default(),
            &PrinterConfig::CTP500,
        )
        .unwrap();

        let rasters: Vec<CommandFrame> = stream.filter(|f| f.kind == FrameKind::Raster).collect();
        assert_eq!(rasters.len(), height as usize);
        for frame in &rasters {
            // 8-byte header + exactly width/8 data bytes
            assert_eq!(frame.bytes.len(), 8 + 48);
            assert_eq!(&frame.bytes[..4], &[0x1D, 0x76, 0x30, 0x00]);
            assert_eq!(&frame.bytes[4..8], &[48, 0, 1, 0]);
        }
    }

    #[test]
    fn test_raster_payload_matches_canvas_rows() {
        let mut canvas = Canvas::with_height(384, 2).unwrap();
        for x in 0..384 {
            canvas.set(x, 1, true);
        }
        let stream = encode(
            canvas.clone(),
            &PrintSettings::new(10, 0, 0),
            &PrinterConfig::CTP500,
        )
        .unwrap();
        let rasters: Vec<CommandFrame> = stream.filter(|f| f.kind == FrameKind::Raster).collect();
        assert_eq!(&rasters[0].bytes[8..], canvas.row(0));
        assert_eq!(&rasters[1].bytes[8..], &[0xFF; 48][..]);
    }

    #[test]
    fn test_zero_feeds() {
        let stream = encode(
            small_canvas(3),
            &PrintSettings::new(10, 0, 0),
            &PrinterConfig::CTP500,
        )
        .unwrap();
        let kinds: Vec<FrameKind> = stream.map(|f| f.kind).collect();
        assert_eq!(
            kinds,
            vec![
                FrameKind::Init,
                FrameKind::Darkness,
                FrameKind::Raster,
                FrameKind::Raster,
                FrameKind::Raster,
                FrameKind::Finish,
            ]
        );
    }

    #[test]
    fn test_unsupported_width() {
        let canvas = Canvas::with_height(576, 4).unwrap();
        let err = encode(canvas, &PrintSettings::default(), &PrinterConfig::CTP500).unwrap_err();
        match err {
            TintaError::UnsupportedWidth { canvas, printer } => {
                assert_eq!(canvas, 576);
                assert_eq!(printer, 384);
            }
            other => panic!("expected UnsupportedWidth, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_size_iterator() {
        let stream = encode(
            small_canvas(4),
            &PrintSettings::new(5, 1, 1),
            &PrinterConfig::CTP500,
        )
        .unwrap();
        let mut stream = stream;
        let total = stream.total();
        assert_eq!(stream.len(), total);
        stream.next();
        assert_eq!(stream.len(), total - 1);
    }

    #[test]
    fn test_settings_clamped_at_encode() {
        let stream = encode(
            small_canvas(1),
            &PrintSettings {
                darkness: 50,
                feed_before: 30,
                feed_after: 0,
            },
            &PrinterConfig::CTP500,
        )
        .unwrap();
        let frames: Vec<CommandFrame> = stream.collect();
        let feeds = frames.iter().filter(|f| f.kind == FrameKind::Feed).count();
        assert_eq!(feeds, 20);
        let darkness = frames.iter().find(|f| f.kind == FrameKind::Darkness).unwrap();
        assert_eq!(darkness.bytes[3], 255);
    }
}
