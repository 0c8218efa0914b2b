//! # Printer Configuration
//!
//! Hardware specifications for supported thermal printers, plus the runtime
//! configuration consumed by the render pipeline, connection manager, and
//! job scheduler.
//!
//! ## Supported Printers
//!
//! | Model | Width (dots) | Resolution |
//! |-------|--------------|------------|
//! | CTP500 | 384 | 203 DPI |
//!
//! The CTP series has a fixed 384-dot printhead; every raster line carries
//! exactly 48 packed bytes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::render::dither::DitherAlgorithm;

/// # Printer Configuration
///
/// Hardware characteristics of a thermal printer model.
///
/// ```
/// use tinta::printer::PrinterConfig;
///
/// let config = PrinterConfig::CTP500;
/// assert_eq!(config.width_dots, 384);
/// assert_eq!(config.width_bytes, 48);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct PrinterConfig {
    /// Printer model name
    pub name: &'static str,

    /// Fixed print width in dots (pixels)
    pub width_dots: u16,

    /// Print width in bytes (width_dots / 8)
    pub width_bytes: u16,

    /// Resolution in dots per inch
    pub dpi: u16,
}

impl PrinterConfig {
    /// CTP500 - 58mm thermal label printer, Bluetooth SPP.
    pub const CTP500: Self = Self {
        name: "CTP500",
        width_dots: 384,
        width_bytes: 48,
        dpi: 203,
    };

    /// Dots per millimeter at this resolution.
    #[inline]
    pub fn dots_per_mm(&self) -> f32 {
        self.dpi as f32 / 25.4
    }

    /// Printable width in millimeters.
    #[inline]
    pub fn width_mm(&self) -> f32 {
        self.width_dots as f32 / self.dots_per_mm()
    }
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self::CTP500
    }
}

// ============================================================================
// PRINTER DESCRIPTOR
// ============================================================================

/// A discovered or configured printer endpoint.
///
/// Immutable once selected. Persisted as part of [`Config`] so the
/// connection manager can be handed "the last used printer" explicitly at
/// startup instead of fishing it out of global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrinterDescriptor {
    /// Bluetooth hardware address, `XX:XX:XX:XX:XX:XX`
    pub address: String,

    /// Human-readable device name (e.g. "CorePrint_5C21")
    pub name: String,

    /// RFCOMM channel number (1 is the SPP standard)
    #[serde(default = "default_channel")]
    pub channel: u8,
}

fn default_channel() -> u8 {
    1
}

impl PrinterDescriptor {
    pub fn new(address: impl Into<String>, name: impl Into<String>, channel: u8) -> Self {
        Self {
            address: address.into(),
            name: name.into(),
            channel,
        }
    }
}

// ============================================================================
// PRINT SETTINGS
// ============================================================================

/// UI bound for darkness and feed-line counts.
pub const SETTING_SCALE_MAX: u8 = 20;

/// Per-job print settings consumed by the command encoder.
///
/// Darkness and feed counts live on a 0–20 scale; [`PrintSettings::clamped`]
/// enforces the bounds at the configuration boundary so the encoder never
/// sees out-of-range values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintSettings {
    /// Print darkness, 0–20 (mapped to the device's native 0–255 range)
    pub darkness: u8,

    /// Blank feed lines before the raster block, 0–20
    pub feed_before: u8,

    /// Blank feed lines after the raster block, 0–20
    pub feed_after: u8,
}

impl PrintSettings {
    pub fn new(darkness: u8, feed_before: u8, feed_after: u8) -> Self {
        Self {
            darkness,
            feed_before,
            feed_after,
        }
        .clamped()
    }

    /// Clamp every field to the 0–20 scale.
    pub fn clamped(self) -> Self {
        Self {
            darkness: self.darkness.min(SETTING_SCALE_MAX),
            feed_before: self.feed_before.min(SETTING_SCALE_MAX),
            feed_after: self.feed_after.min(SETTING_SCALE_MAX),
        }
    }
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            darkness: 10,
            feed_before: 2,
            feed_after: 2,
        }
    }
}

// ============================================================================
// SCHEDULING POLICY
// ============================================================================

/// What to do with a submission while another job is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPolicy {
    /// Queue submissions FIFO behind the active job.
    #[default]
    Queue,
    /// Reject submissions with `Busy` while a job is active or queued.
    Reject,
}

// ============================================================================
// RUNTIME CONFIG
// ============================================================================

/// Runtime configuration for the whole pipeline.
///
/// Serializable so a front end can persist it; `Default` gives sane values
/// for every field. Durations are stored as milliseconds in the serialized
/// form.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// The printer to auto-connect to, if one has been selected before.
    pub printer: Option<PrinterDescriptor>,

    /// Default per-job settings.
    pub print: PrintSettings,

    /// Default dithering algorithm for image content.
    pub dither: DitherAlgorithm,

    /// Reconnect automatically after a dropped connection.
    pub auto_reconnect: bool,

    /// Maximum reconnect attempts before giving up.
    pub max_reconnect_attempts: u32,

    /// Base backoff delay (attempt 1), milliseconds.
    pub backoff_base_ms: u64,

    /// Backoff delay cap, milliseconds.
    pub backoff_max_ms: u64,

    /// Connection attempt timeout, milliseconds.
    pub connect_timeout_ms: u64,

    /// Per-send timeout, milliseconds.
    pub send_timeout_ms: u64,

    /// Maximum bytes per transport write.
    pub chunk_size: usize,

    /// Busy-submission policy.
    pub job_policy: JobPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            printer: None,
            print: PrintSettings::default(),
            dither: DitherAlgorithm::FloydSteinberg,
            auto_reconnect: true,
            max_reconnect_attempts: 5,
            backoff_base_ms: 1_000,
            backoff_max_ms: 30_000,
            connect_timeout_ms: 10_000,
            send_timeout_ms: 5_000,
            chunk_size: 4096,
            job_policy: JobPolicy::Queue,
        }
    }
}

impl Config {
    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }

    /// Load from a JSON file.
    pub fn load(path: &std::path::Path) -> Result<Self, crate::error::TintaError> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| crate::error::TintaError::Template(format!("bad config: {}", e)))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctp500_dimensions() {
        let config = PrinterConfig::CTP500;
        assert_eq!(config.width_dots, 384);
        assert_eq!(config.width_bytes, 48);
        assert_eq!(config.width_dots, config.width_bytes * 8);
    }

    #[test]
    fn test_dots_per_mm() {
        let config = PrinterConfig::CTP500;
        // 203 DPI ≈ 8 dots/mm
        assert!((config.dots_per_mm() - 8.0).abs() < 0.1);
    }

    #[test]
    fn test_width_mm() {
        // 384 dots / ~8 dpmm = ~48mm printable
        let width = PrinterConfig::CTP500.width_mm();
        assert!((width - 48.0).abs() < 1.0);
    }

    #[test]
    fn test_print_settings_clamp() {
        let settings = PrintSettings::new(99, 21, 5);
        assert_eq!(settings.darkness, 20);
        assert_eq!(settings.feed_before, 20);
        assert_eq!(settings.feed_after, 5);
    }

    #[test]
    fn test_config_default_roundtrip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.max_reconnect_attempts, config.max_reconnect_attempts);
        assert_eq!(back.job_policy, JobPolicy::Queue);
        assert!(back.printer.is_none());
    }

    #[test]
    fn test_config_partial_json_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"auto_reconnect": false}"#).unwrap();
        assert!(!config.auto_reconnect);
        assert_eq!(config.backoff_base_ms, 1_000);
    }

    #[test]
    fn test_descriptor_default_channel() {
        let d: PrinterDescriptor =
            serde_json::from_str(r#"{"address": "AA:BB:CC:DD:EE:FF", "name": "CorePrint_5C21"}"#)
                .unwrap();
        assert_eq!(d.channel, 1);
    }
}
