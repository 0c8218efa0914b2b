//! # tinta CLI
//!
//! Command-line front end for the render pipeline and printer driver.
//!
//! ## Usage
//!
//! ```bash
//! # Find printers
//! tinta scan
//!
//! # Print text
//! tinta print --device AA:BB:CC:DD:EE:FF --text "Hello" --darkness 12
//!
//! # Print a sideways banner
//! tinta print --device AA:BB:CC:DD:EE:FF --banner "GRAND OPENING"
//!
//! # Dither an image and print it
//! tinta print --device AA:BB:CC:DD:EE:FF --image photo.png --dither atkinson
//!
//! # Preview any content as PNG without a printer
//! tinta render --text "Hello" --out preview.png
//!
//! # Web control surface
//! tinta serve --listen 0.0.0.0:8080 --device AA:BB:CC:DD:EE:FF
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use tinta::canvas::VerticalAlign;
use tinta::connection::{ConnectionConfig, ConnectionManager};
use tinta::error::TintaError;
use tinta::job::{JobScheduler, JobStatus};
use tinta::printer::{Config, PrintSettings, PrinterConfig, PrinterDescriptor};
use tinta::render::dither::{DitherAlgorithm, DitherParams};
use tinta::render::glyph::FontSize;
use tinta::render::gray::{self, ImageAdjust, Rotation};
use tinta::render::template;
use tinta::render::text::{Alignment, TextOptions};
use tinta::render::{self, ContentDescriptor};
use tinta::server::{AppState, ServerConfig};
use tinta::transport::rfcomm::{self, RfcommOpener};

/// tinta - CTP thermal label printer utility
#[derive(Parser, Debug)]
#[command(name = "tinta")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render content and send it to the printer
    Print {
        #[command(flatten)]
        content: ContentArgs,

        #[command(flatten)]
        device: DeviceArgs,

        /// Blank feed lines before the content (0-20)
        #[arg(long, default_value_t = 2)]
        feed_before: u8,

        /// Blank feed lines after the content (0-20)
        #[arg(long, default_value_t = 2)]
        feed_after: u8,
    },

    /// Render content to a PNG preview instead of printing
    Render {
        #[command(flatten)]
        content: ContentArgs,

        /// Output PNG path
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },

    /// Scan for Bluetooth printers
    Scan {
        /// Scan duration in seconds
        #[arg(long, default_value_t = 10)]
        timeout: u64,
    },

    /// Start the HTTP control surface
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "0.0.0.0:8080")]
        listen: String,

        #[command(flatten)]
        device: DeviceArgs,
    },
}

#[derive(Args, Debug)]
struct DeviceArgs {
    /// Printer Bluetooth address (XX:XX:XX:XX:XX:XX)
    #[arg(long)]
    device: Option<String>,

    /// Printer display name
    #[arg(long, default_value = "CorePrint")]
    name: String,

    /// RFCOMM channel
    #[arg(long, default_value_t = 1)]
    channel: u8,

    /// Config file (JSON); CLI flags override it
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

impl DeviceArgs {
    fn load_config(&self) -> Result<Config, TintaError> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };
        if let Some(address) = &self.device {
            if !rfcomm::is_valid_mac(address) {
                return Err(TintaError::Connect(tinta::error::ConnectError::NotFound(
                    format!("invalid address {:?}", address),
                )));
            }
            config.printer = Some(PrinterDescriptor::new(
                address.clone(),
                self.name.clone(),
                self.channel,
            ));
        }
        Ok(config)
    }
}

#[derive(Args, Debug)]
struct ContentArgs {
    /// Text content
    #[arg(long, group = "content")]
    text: Option<String>,

    /// Banner content (rotated 90°)
    #[arg(long, group = "content")]
    banner: Option<String>,

    /// Image file to dither and print
    #[arg(long, value_name = "FILE", group = "content")]
    image: Option<PathBuf>,

    /// Label template document (JSON)
    #[arg(long, value_name = "FILE", group = "content")]
    template: Option<PathBuf>,

    /// Glyph size for text and banners
    #[arg(long, value_enum, default_value_t = FontSize::Medium)]
    font: FontSize,

    /// Text alignment
    #[arg(long, value_enum, default_value_t = Alignment::Left)]
    align: Alignment,

    /// Banner vertical alignment (of the un-rotated text)
    #[arg(long, value_enum, default_value_t = VerticalAlign::Center)]
    valign: VerticalAlign,

    /// Darkness, 0-20
    #[arg(long, default_value_t = 10)]
    darkness: u8,

    /// Dithering algorithm for images and templates
    #[arg(long, value_enum, default_value_t = DitherAlgorithm::FloydSteinberg)]
    dither: DitherAlgorithm,

    /// Quantization threshold
    #[arg(long, default_value_t = 128)]
    threshold: u8,

    /// Invert black/white
    #[arg(long)]
    invert: bool,

    /// Brightness shift for images (-255..=255)
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    brightness: i16,

    /// Contrast multiplier for images
    #[arg(long, default_value_t = 1.0)]
    contrast: f32,

    /// Rotation (counterclockwise degrees)
    #[arg(long, value_enum, default_value_t = Rotation::None)]
    rotate: Rotation,

    /// Disable word wrap
    #[arg(long)]
    no_wrap: bool,

    /// Bold text
    #[arg(long)]
    bold: bool,

    /// Italic text
    #[arg(long)]
    italic: bool,
}

impl ContentArgs {
    /// Resolve all file inputs and build the pure render descriptor.
    fn build_descriptor(&self) -> Result<ContentDescriptor, TintaError> {
        let dither = DitherParams::new(self.dither)
            .with_threshold(self.threshold)
            .inverted(self.invert);

        if let Some(content) = &self.text {
            return Ok(ContentDescriptor::Text {
                content: content.clone(),
                font: self.font,
                options: TextOptions {
                    alignment: self.align,
                    wrap: !self.no_wrap,
                    bold: self.bold,
                    italic: self.italic,
                    ..TextOptions::default()
                },
                darkness: self.darkness,
            });
        }
        if let Some(content) = &self.banner {
            return Ok(ContentDescriptor::Banner {
                content: content.clone(),
                font: self.font,
                valign: self.valign,
                darkness: self.darkness,
            });
        }
        if let Some(path) = &self.image {
            let image = gray::load_gray(path)?;
            return Ok(ContentDescriptor::Image {
                image,
                adjust: ImageAdjust {
                    brightness: self.brightness,
                    contrast: self.contrast,
                    rotation: self.rotate,
                },
                dither,
            });
        }
        if let Some(path) = &self.template {
            let base_dir = path.parent().unwrap_or(std::path::Path::new(".")).to_path_buf();
            let document = template::load_document(path)?;
            let content = document.resolve(&base_dir)?;
            return Ok(ContentDescriptor::Template { content, dither });
        }
        Err(TintaError::Template(
            "no content given; use --text, --banner, --image or --template".into(),
        ))
    }
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<(), TintaError> {
    let cli = Cli::parse();
    let printer = PrinterConfig::CTP500;

    match cli.command {
        Commands::Print {
            content,
            device,
            feed_before,
            feed_after,
        } => {
            let config = device.load_config()?;
            let descriptor = content.build_descriptor()?;
            let settings = PrintSettings::new(content.darkness, feed_before, feed_after);

            let connection = ConnectionManager::new(
                Arc::new(RfcommOpener::new(config.chunk_size)),
                ConnectionConfig::from(&config),
                config.printer.clone(),
            );
            let scheduler = JobScheduler::new(connection, printer, &config);
            let events = scheduler.subscribe();

            let id = scheduler.submit(descriptor, settings)?;
            let mut failed = false;
            while let Ok(event) = events.recv() {
                if event.id != id {
                    continue;
                }
                match &event.status {
                    JobStatus::Transmitting => {
                        eprint!(
                            "\rSending: {}/{} frames",
                            event.progress.frames_sent, event.progress.frames_total
                        );
                    }
                    status if status.is_terminal() => {
                        eprintln!();
                        println!("Job {}: {}", id, status);
                        failed = matches!(status, JobStatus::Failed(_));
                        break;
                    }
                    status => eprintln!("{}...", status),
                }
            }
            scheduler.shutdown();
            if failed {
                std::process::exit(1);
            }
        }

        Commands::Render { content, out } => {
            let descriptor = content.build_descriptor()?;
            let canvas = render::render(&descriptor, printer.width_dots as u32)?;
            canvas
                .to_gray()
                .save(&out)
                .map_err(|e| TintaError::Image(format!("failed to save PNG: {}", e)))?;
            println!(
                "Saved {}x{} preview to {}",
                canvas.width(),
                canvas.height(),
                out.display()
            );
        }

        Commands::Scan { timeout } => {
            println!("Scanning for {}s...", timeout);
            let devices = rfcomm::scan_for_printers(Duration::from_secs(timeout))?;
            if devices.is_empty() {
                println!("No devices found.");
            }
            for device in devices {
                let marker = if device.is_ctp_printer { "*" } else { " " };
                println!("{} {}  {}", marker, device.address, device.name);
            }
        }

        Commands::Serve { listen, device } => {
            let config = device.load_config()?;
            let connection = ConnectionManager::new(
                Arc::new(RfcommOpener::new(config.chunk_size)),
                ConnectionConfig::from(&config),
                config.printer.clone(),
            );
            let scheduler = JobScheduler::new(connection.clone(), printer, &config);
            let state = AppState {
                scheduler,
                connection,
                defaults: config.print,
            };

            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(tinta::server::serve(
                state,
                ServerConfig {
                    listen_addr: listen,
                },
            ))?;
        }
    }

    Ok(())
}
