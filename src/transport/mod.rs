//! # Printer Transport Layer
//!
//! Byte-oriented duplex channel to the printer. The core depends only on
//! this boundary: `send(bytes) → ack-or-error` plus a status round-trip;
//! everything above routes through the connection manager, never touching
//! the wire directly.
//!
//! ## Available Transports
//!
//! - [`rfcomm`]: Bluetooth RFCOMM socket (Linux)
//! - [`mock`]: scripted in-memory transport for tests

pub mod mock;
pub mod rfcomm;

use std::time::Duration;

use crate::error::{ConnectError, SendError};
use crate::printer::PrinterDescriptor;
use crate::protocol::commands::STATUS_RESPONSE_LEN;

/// Connect/send deadlines handed to the opener. Expiry is a transport
/// error, never silent success.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub connect: Duration,
    pub send: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            send: Duration::from_secs(5),
        }
    }
}

/// An established byte channel to the printer.
pub trait Transport: Send {
    /// Write all bytes, blocking until the transport acknowledges them or
    /// fails. A timeout is an error.
    fn send(&mut self, bytes: &[u8]) -> Result<(), SendError>;

    /// Status round-trip: write the status request, read the fixed-length
    /// report. Used as a liveness probe after connect.
    fn request_status(&mut self) -> Result<[u8; STATUS_RESPONSE_LEN], SendError>;
}

/// Factory for transports; the connection manager owns one and calls it on
/// every (re)connect attempt.
pub trait TransportOpener: Send + Sync {
    fn open(
        &self,
        descriptor: &PrinterDescriptor,
        timeouts: &Timeouts,
    ) -> Result<Box<dyn Transport>, ConnectError>;
}
