//! # Recibo - Receipt to Thermal Printer Pipeline
//!
//! Recibo turns structured receipts into command streams for ESC/POS-family
//! thermal printers and delivers them over a managed printer session. It
//! provides:
//!
//! - **Layout**: receipt document to a block-based visual document
//! - **Rasterization**: RGB canvas to packed 1bpp frames, optional dithering
//! - **Encoding**: StarPRNT and ESC/POS streams, in text or raster mode
//! - **Sessions**: connect timeout, backoff, automatic reconnect
//! - **Jobs**: per-endpoint FIFO printing with observable job state
//!
//! ## Quick Start
//!
//! ```
//! use recibo::{
//!     document::demo_sale,
//!     encoder,
//!     layout,
//!     printer::PrinterProfile,
//!     template::TemplateConfig,
//! };
//!
//! let profile = PrinterProfile::escpos_80();
//! let template = TemplateConfig::default().with_default_columns(profile.chars_per_line);
//!
//! let view = layout::render(&demo_sale(), &template)?;
//! let bytes = encoder::encode_text(&view, &profile)?;
//! assert_eq!(&bytes[..2], b"\x1b@");
//!
//! # Ok::<(), recibo::error::ReciboError>(())
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`document`] | Receipt document model |
//! | [`template`] | Template toggles |
//! | [`money`] | Currency formatting |
//! | [`layout`] | Layout renderer |
//! | [`raster`] | Rasterizer and bitmap painter |
//! | [`encoder`] | Stream encoder and reference decoder |
//! | [`ir`] | Command IR, optimizer and code generation |
//! | [`protocol`] | Command builders |
//! | [`printer`] | Printer profiles and endpoints |
//! | [`transport`] | Spooler backends |
//! | [`session`] | Device session manager |
//! | [`job`] | Print job orchestrator |
//! | [`settings`] | CLI settings file |
//! | [`error`] | Error types |

pub mod document;
pub mod encoder;
pub mod error;
pub mod ir;
pub mod job;
pub mod layout;
pub mod money;
pub mod printer;
pub mod protocol;
pub mod raster;
pub mod session;
pub mod settings;
pub mod template;
pub mod transport;

// Re-exports for convenience
pub use document::ReceiptDocument;
pub use error::ReciboError;
pub use job::{JobHandle, PrintRequest, PrintService};
pub use printer::PrinterProfile;
pub use template::TemplateConfig;
