//! # Tinta - CTP Thermal Label Printer Library
//!
//! Tinta renders heterogeneous content (text, banners, label templates,
//! images, calendar grids) into a monochrome bitmap sized to a CTP-series
//! thermal printhead, and transmits it as a command stream over Bluetooth
//! RFCOMM. It provides:
//!
//! - **Render pipeline**: canvas composition, grayscale adjustment, and
//!   seven dithering algorithms
//! - **Protocol implementation**: CTP command builders and a lazy frame
//!   encoder
//! - **Connection management**: reconnect state machine with exponential
//!   backoff
//! - **Job scheduling**: single-worker print queue with progress events and
//!   frame-boundary cancellation
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tinta::connection::{ConnectionConfig, ConnectionManager};
//! use tinta::job::JobScheduler;
//! use tinta::printer::{Config, PrintSettings, PrinterConfig, PrinterDescriptor};
//! use tinta::render::ContentDescriptor;
//! use tinta::render::glyph::FontSize;
//! use tinta::render::text::TextOptions;
//! use tinta::transport::rfcomm::RfcommOpener;
//!
//! let mut config = Config::default();
//! config.printer = Some(PrinterDescriptor::new("AA:BB:CC:DD:EE:FF", "CorePrint", 1));
//!
//! let connection = ConnectionManager::new(
//!     Arc::new(RfcommOpener::default()),
//!     ConnectionConfig::from(&config),
//!     config.printer.clone(),
//! );
//! let scheduler = JobScheduler::new(connection, PrinterConfig::CTP500, &config);
//!
//! let events = scheduler.subscribe();
//! let id = scheduler.submit(
//!     ContentDescriptor::Text {
//!         content: "Hello".into(),
//!         font: FontSize::Medium,
//!         options: TextOptions::default(),
//!         darkness: 10,
//!     },
//!     PrintSettings::default(),
//! )?;
//!
//! for event in events {
//!     if event.id == id && event.status.is_terminal() {
//!         println!("{}", event.status);
//!         break;
//!     }
//! }
//! # Ok::<(), tinta::error::TintaError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`canvas`] | Packed 1-bit raster buffer |
//! | [`render`] | Content renderers and the dithering engine |
//! | [`protocol`] | CTP command builders and frame encoder |
//! | [`connection`] | Connect/reconnect state machine |
//! | [`job`] | Print job scheduling, progress, cancellation |
//! | [`transport`] | RFCOMM and mock transports |
//! | [`printer`] | Hardware specs and runtime configuration |
//! | [`server`] | HTTP control surface |
//! | [`error`] | Error types |
//!
//! ## Supported Printers
//!
//! Currently targeted at the CTP500 (384-dot head, 203 DPI, Bluetooth SPP).
//! Other CTP-series printers speaking the same raster dialect should work
//! with a matching [`printer::PrinterConfig`].

pub mod canvas;
pub mod connection;
pub mod error;
pub mod job;
pub mod printer;
pub mod protocol;
pub mod render;
pub mod server;
pub mod transport;

// Re-exports for convenience
pub use canvas::Canvas;
pub use error::TintaError;
pub use printer::PrinterConfig;
