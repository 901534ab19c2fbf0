//! # Printer Command Builders
//!
//! Low-level byte builders for the two command dialects receipts are
//! printed with. Every function returns the bytes of one command; the
//! [`ir`](crate::ir) code generator picks the dialect.
//!
//! ## Module Structure
//!
//! - [`commands`]: StarPRNT init, feed, cut
//! - [`text`]: StarPRNT alignment, bold, size, code page
//! - [`graphics`]: StarPRNT raster images (`ESC GS S`)
//! - [`qr`]: StarPRNT QR codes (`ESC GS y`)
//! - [`nv_graphics`]: stored logos, both dialects
//! - [`escpos`]: the ESC/POS equivalents
//!
//! ## Usage Example
//!
//! ```
//! use recibo::protocol::{commands, text};
//!
//! let mut data = Vec::new();
//! data.extend(commands::init());
//! data.extend(text::align(text::Alignment::Center));
//! data.extend(text::bold_on());
//! data.extend(b"RECEIPT\n");
//! data.extend(text::bold_off());
//! data.extend(commands::cut_feed(false));
//! ```

pub mod commands;
pub mod escpos;
pub mod graphics;
pub mod nv_graphics;
pub mod qr;
pub mod text;
