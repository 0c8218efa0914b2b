//! # CTP Protocol Implementation
//!
//! Low-level command builders and the frame encoder for the CTP-series
//! raster protocol.
//!
//! ## Module Structure
//!
//! - [`commands`]: byte-exact command builders (init, feed, darkness, raster)
//! - [`encode`]: [`encode::CommandFrame`] and the lazy frame stream over a canvas
//!
//! ## Protocol Overview
//!
//! The CTP series speaks a small ESC/POS-like dialect. A print job is:
//!
//! ```text
//! ESC @            initialize
//! GS I F0 19       start print
//! GS I F1 n        set darkness
//! LF × k           blank feed lines
//! GS v 0 ...       raster line commands (one per printhead row)
//! LF × k           blank feed lines
//! 9A               end print
//! ```
//!
//! Multi-byte integers are little-endian. Raster data is packed 8 dots per
//! byte, MSB = leftmost dot, 1 = ink.

pub mod commands;
pub mod encode;

pub use encode::{CommandFrame, FrameKind, FrameStream};
