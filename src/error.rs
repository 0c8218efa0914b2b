//! # Error Types
//!
//! This module defines error types used throughout the tinta library.
//!
//! Rendering and encoding errors are pure-function failures surfaced
//! synchronously to the caller. Transport errors carry enough structure for
//! the connection manager's retry machinery to decide what to do with them.

use thiserror::Error;

/// Main error type for tinta operations
#[derive(Debug, Error)]
pub enum TintaError {
    /// Rendered content exceeded the canvas height cap
    #[error("Content too large: {0}")]
    ContentTooLarge(String),

    /// Canvas width does not match the printer's raster width
    #[error("Unsupported width: canvas is {canvas} dots, printer expects {printer}")]
    UnsupportedWidth { canvas: u32, printer: u32 },

    /// Connection establishment failed
    #[error("Connect error: {0}")]
    Connect(#[from] ConnectError),

    /// Transmission failed mid-stream
    #[error("Send error: {0}")]
    Send(#[from] SendError),

    /// A job was submitted while another is active and the policy rejects
    #[error("Printer busy")]
    Busy,

    /// Image decoding/processing error
    #[error("Image error: {0}")]
    Image(String),

    /// Template document error (missing file, bad JSON, bad region)
    #[error("Template error: {0}")]
    Template(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure modes when opening a connection to the printer.
///
/// All variants are retryable through the reconnect state machine, up to the
/// configured attempt cap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    /// No device at the given address
    #[error("Device not found: {0}")]
    NotFound(String),

    /// Device present but the RFCOMM connection was refused or unreachable
    #[error("Connection refused or unreachable: {0}")]
    RefusedOrUnreachable(String),

    /// Insufficient privileges to open a Bluetooth socket
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Connection attempt did not complete within the configured timeout
    #[error("Connection timed out: {0}")]
    Timeout(String),
}

/// Failure modes when writing to an established connection.
///
/// A timeout is treated identically to a hard transport error: it marks the
/// connection dead and (when enabled) triggers the reconnect path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// The transport was closed (by the peer or a prior error)
    #[error("Connection closed: {0}")]
    Closed(String),

    /// The write did not complete within the configured timeout
    #[error("Send timed out: {0}")]
    Timeout(String),

    /// Any other transport-level I/O failure
    #[error("I/O failure: {0}")]
    Io(String),
}
