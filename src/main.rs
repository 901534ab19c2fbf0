//! # Recibo CLI
//!
//! Command-line interface for rendering and printing receipts.
//!
//! ## Usage
//!
//! ```bash
//! # Show the laid-out receipt as text
//! recibo render demo
//!
//! # Encode a receipt to a command stream
//! recibo encode receipt.json --out receipt.bin --profile escpos-80
//!
//! # Preview the raster image, or the images inside an encoded stream
//! recibo preview receipt.json --png receipt.png --dither
//! recibo preview receipt.bin --png stream.png
//!
//! # Print over TCP, a device file, or nowhere
//! recibo print receipt.json --tcp 192.168.1.50
//! recibo print receipt.json --device /dev/rfcomm0 --raster
//! recibo print demo --dry-run
//!
//! # List printer profiles
//! recibo profiles
//! ```
//!
//! `RUST_LOG` controls log output (default `recibo=info`).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing::info;

use recibo::{
    ReciboError,
    document::{self, ReceiptDocument},
    encoder,
    job::{PrintMode, PrintRequest, PrintService},
    layout,
    printer::PrinterProfile,
    raster::{BitmapPainter, Painter, RasterFrame, Threshold, rasterize_with},
    settings::{Settings, TransportSettings},
    template::TemplateConfig,
    transport::{DeviceSpooler, NetworkSpooler, Spooler, VirtualSpooler},
};

/// Recibo - receipts for thermal printers
#[derive(Parser, Debug)]
#[command(name = "recibo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that lays out a receipt.
#[derive(Args, Debug)]
struct ReceiptArgs {
    /// Receipt JSON file, or `demo` / `demo-layby`
    receipt: String,

    /// Template JSON file (overrides the settings template)
    #[arg(long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Printer profile: tsp650ii, escpos-80, escpos-58, text-only or escpos:WIDTH
    #[arg(long)]
    profile: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the laid-out receipt as plain text
    Render {
        #[command(flatten)]
        receipt: ReceiptArgs,
    },

    /// Write the command stream to a file
    Encode {
        #[command(flatten)]
        receipt: ReceiptArgs,

        #[arg(long, value_name = "FILE")]
        out: PathBuf,

        /// Print as a raster image instead of printer fonts
        #[arg(long)]
        raster: bool,

        /// Ordered dithering for raster output
        #[arg(long)]
        dither: bool,
    },

    /// Save the raster image as PNG. Also accepts an encoded `.bin` stream.
    Preview {
        #[command(flatten)]
        receipt: ReceiptArgs,

        #[arg(long, value_name = "FILE")]
        png: PathBuf,

        #[arg(long)]
        dither: bool,
    },

    /// Send a receipt to a printer
    Print {
        #[command(flatten)]
        receipt: ReceiptArgs,

        /// Printer address, `host` or `host:port`
        #[arg(long, conflicts_with_all = ["device", "dry_run"])]
        tcp: Option<String>,

        /// Printer device path
        #[arg(long, conflicts_with = "dry_run")]
        device: Option<String>,

        /// Encode and submit to an in-memory spooler only
        #[arg(long)]
        dry_run: bool,

        /// Endpoint id (defaults to the only endpoint of the transport)
        #[arg(long)]
        endpoint: Option<String>,

        #[arg(long)]
        raster: bool,

        #[arg(long)]
        dither: bool,

        #[arg(long)]
        copies: Option<u16>,
    },

    /// List built-in printer profiles
    Profiles,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recibo=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), ReciboError> {
    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::Render { receipt } => {
            let (doc, template, profile) = load(&receipt, &settings)?;
            let view = layout::render(&doc, &template.with_default_columns(profile.chars_per_line))?;
            print!("{}", view.to_plain_text());
        }

        Commands::Encode {
            receipt,
            out,
            raster,
            dither,
        } => {
            let (doc, template, profile) = load(&receipt, &settings)?;
            let template = template.with_default_columns(profile.chars_per_line);
            let view = layout::render(&doc, &template)?;

            let bytes = if raster || settings.raster {
                let frame = paint(&view, &profile, threshold(dither || settings.dither))?;
                encoder::encode_raster(&frame, &profile)?
            } else {
                encoder::encode_text(&view, &profile)?
            };
            std::fs::write(&out, &bytes)?;
            println!("Wrote {} bytes to {}", bytes.len(), out.display());
        }

        Commands::Preview {
            receipt,
            png,
            dither,
        } => {
            let frame = if is_stream(&receipt.receipt) {
                let bytes = std::fs::read(&receipt.receipt)?;
                let frames = encoder::decode_raster(&bytes);
                if frames.is_empty() {
                    return Err(ReciboError::Image(format!(
                        "{} contains no raster images",
                        receipt.receipt
                    )));
                }
                stack(frames)
            } else {
                let (doc, template, profile) = load(&receipt, &settings)?;
                let view = layout::render(&doc, &template.with_default_columns(profile.chars_per_line))?;
                paint(&view, &profile, threshold(dither || settings.dither))?
            };

            frame
                .to_gray_image()
                .save(&png)
                .map_err(|e| ReciboError::Image(format!("Failed to save PNG: {}", e)))?;
            println!("Saved {}x{} preview to {}", frame.width, frame.height, png.display());
        }

        Commands::Print {
            receipt,
            tcp,
            device,
            dry_run,
            endpoint,
            raster,
            dither,
            copies,
        } => {
            let (doc, template, mut profile) = load(&receipt, &settings)?;
            if let Some(copies) = copies {
                profile = profile.with_copies(copies);
            }

            let spooler: Arc<dyn Spooler> = if dry_run {
                Arc::new(VirtualSpooler::with_endpoints(&["virtual"]))
            } else if let Some(addr) = tcp {
                Arc::new(NetworkSpooler::from_addr(&addr, profile.capabilities)?)
            } else if let Some(path) = device {
                Arc::new(DeviceSpooler::new(path, profile.capabilities))
            } else {
                settings.spooler(&profile)?
            };
            let virtual_run = dry_run || settings.transport == TransportSettings::Virtual;

            let service = PrintService::new(spooler, settings.service_config());
            let endpoint = match endpoint.or_else(|| settings.default_endpoint.clone()) {
                Some(id) => id,
                None => only_endpoint(&service).await?,
            };

            let mode = if raster || settings.raster {
                PrintMode::Raster {
                    threshold: threshold(dither || settings.dither),
                }
            } else {
                PrintMode::Text
            };
            let request = PrintRequest::new(doc)
                .with_template(template)
                .with_profile(profile)
                .with_mode(mode)
                .to_endpoint(endpoint);

            let job = service.print(request);
            info!(job = %job.id(), "Job queued");
            let outcome = job.wait().await;
            service.shutdown().await;

            match outcome.failure() {
                None if virtual_run => println!("Dry run: {} bytes encoded", outcome.bytes),
                None => println!("Printed successfully! ({} bytes)", outcome.bytes),
                Some(reason) => {
                    let mut message = format!("Print failed: {}", reason);
                    if reason.may_have_printed() {
                        message.push_str(" (the printer may have received part of the job)");
                    }
                    return Err(ReciboError::Config(message));
                }
            }
        }

        Commands::Profiles => {
            println!("Built-in profiles:");
            for (key, profile) in PrinterProfile::built_in() {
                println!(
                    "  {:<10} {:<16} {} dots, {} chars/line, raster: {}, cut: {}",
                    key,
                    profile.name,
                    profile.width_dots,
                    profile.chars_per_line,
                    if profile.capabilities.supports_raster { "yes" } else { "no" },
                    if profile.capabilities.supports_cut { "yes" } else { "no" },
                );
            }
        }
    }

    Ok(())
}

/// Read the receipt and resolve template and profile, command line first.
fn load(
    args: &ReceiptArgs,
    settings: &Settings,
) -> Result<(ReceiptDocument, TemplateConfig, PrinterProfile), ReciboError> {
    let doc = match args.receipt.as_str() {
        "demo" => document::demo_sale(),
        "demo-layby" => document::demo_layby_completed(),
        path => serde_json::from_str(&read(Path::new(path))?)?,
    };

    let template = match &args.template {
        Some(path) => serde_json::from_str(&read(path)?)?,
        None => settings.template.clone(),
    };

    let profile = match &args.profile {
        Some(name) => PrinterProfile::parse(name)
            .map_err(ReciboError::Config)?
            .with_copies(settings.copies),
        None => settings.profile()?,
    };

    Ok((doc, template, profile))
}

fn read(path: &Path) -> Result<String, ReciboError> {
    std::fs::read_to_string(path)
        .map_err(|e| ReciboError::Config(format!("Failed to read {}: {}", path.display(), e)))
}

fn is_stream(arg: &str) -> bool {
    Path::new(arg).extension().is_some_and(|ext| ext == "bin")
}

fn threshold(dither: bool) -> Threshold {
    if dither { Threshold::Bayer } else { Threshold::Fixed }
}

fn paint(
    view: &layout::VisualDocument,
    profile: &PrinterProfile,
    threshold: Threshold,
) -> Result<RasterFrame, ReciboError> {
    let width = profile.width_dots as usize;
    let canvas = BitmapPainter::new().paint(view, width)?;
    Ok(rasterize_with(&canvas, width, threshold))
}

/// Stack decoded frames vertically, padding narrower ones on the right.
fn stack(frames: Vec<RasterFrame>) -> RasterFrame {
    let width = frames.iter().map(|f| f.width).max().unwrap_or(0);
    let mut out = RasterFrame::empty(width);
    for frame in frames {
        if frame.width == width {
            out.append(&frame);
            continue;
        }
        let mut padded = RasterFrame::filled(width, frame.height, false);
        let (src_bytes, dst_bytes) = (frame.width_bytes(), padded.width_bytes());
        for y in 0..frame.height {
            let src = &frame.bits[y * src_bytes..(y + 1) * src_bytes];
            padded.bits[y * dst_bytes..y * dst_bytes + src_bytes].copy_from_slice(src);
        }
        out.append(&padded);
    }
    out
}

/// The single endpoint of a one-printer transport.
async fn only_endpoint(service: &PrintService) -> Result<String, ReciboError> {
    let mut endpoints = service.endpoints().await?;
    match endpoints.len() {
        1 => Ok(endpoints.remove(0).id),
        0 => Err(ReciboError::Config("The spooler offers no printers".into())),
        _ => Err(ReciboError::Config(format!(
            "Several printers available, pick one with --endpoint: {}",
            endpoints
                .iter()
                .map(|e| e.id.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}
