//! # ESC/POS Commands
//!
//! The Epson command set spoken by most generic 58mm and 80mm receipt
//! printers. Same building blocks as StarPRNT with different bytes:
//!
//! | Operation | StarPRNT | ESC/POS |
//! |-----------|----------|---------|
//! | Init | `ESC @` | `ESC @` |
//! | Align | `ESC GS a n` | `ESC a n` |
//! | Bold | `ESC E` / `ESC F` | `ESC E 1` / `ESC E 0` |
//! | Size | `ESC i h w` | `GS ! (w<<4 \| h)` |
//! | Code page | `ESC GS t 32` | `ESC t 16` |
//! | Cut | `ESC d 2` | `GS V 0` |
//! | Raster | `ESC GS S 1 xL xH yL yH 0` | `GS v 0 0 xL xH yL yH` |
//! | QR | `ESC GS y ...` | `GS ( k ...` |
//!
//! ```
//! use recibo::protocol::escpos;
//!
//! let cmd = escpos::raster(384, 2, &[0u8; 96]);
//! assert_eq!(&cmd[..8], &[0x1D, 0x76, 0x30, 0x00, 48, 0, 2, 0]);
//! ```

use super::commands::{ESC, GS, u16_le};
use super::qr::QrErrorLevel;
use super::text::Alignment;

/// Bytes before the pixel data in a `GS v 0` command.
pub const RASTER_HEADER_LEN: usize = 8;

/// WPC1252 in the Epson code table.
pub const CODEPAGE_WPC1252: u8 = 16;

/// # Initialize Printer (ESC @)
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// # Select Justification (ESC a n)
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, b'a', alignment as u8]
}

/// # Emphasized Mode (ESC E n)
pub fn bold(enabled: bool) -> Vec<u8> {
    vec![ESC, b'E', enabled as u8]
}

/// # Select Character Size (GS ! n)
///
/// Width multiplier in the high nibble, height in the low nibble,
/// 0 = 1x up to 7 = 8x.
///
/// ```
/// use recibo::protocol::escpos;
///
/// assert_eq!(escpos::size(1, 1), vec![0x1D, 0x21, 0x11]);
/// assert_eq!(escpos::size(1, 0), vec![0x1D, 0x21, 0x01]);
/// ```
pub fn size(height_mult: u8, width_mult: u8) -> Vec<u8> {
    vec![GS, b'!', (width_mult.min(7) << 4) | height_mult.min(7)]
}

/// # Select Character Code Table (ESC t n)
pub fn codepage(n: u8) -> Vec<u8> {
    vec![ESC, b't', n]
}

/// # Cut Paper (GS V m)
///
/// `GS V 0` full cut, `GS V 1` partial cut.
pub fn cut(partial: bool) -> Vec<u8> {
    vec![GS, b'V', partial as u8]
}

/// # Print Raster Bit Image (GS v 0)
///
/// ```text
/// GS v 0 m xL xH yL yH [data...]
/// 1D 76 30 00
/// ```
///
/// `m = 0` is normal density. `xL xH` is the width in bytes.
pub fn raster(width_dots: u16, height: u16, data: &[u8]) -> Vec<u8> {
    let width_bytes = width_dots.div_ceil(8);
    debug_assert_eq!(
        data.len(),
        width_bytes as usize * height as usize,
        "raster data length mismatch"
    );

    let [xl, xh] = u16_le(width_bytes);
    let [yl, yh] = u16_le(height);

    let mut cmd = Vec::with_capacity(RASTER_HEADER_LEN + data.len());
    cmd.extend([GS, b'v', b'0', 0, xl, xh, yl, yh]);
    cmd.extend_from_slice(data);
    cmd
}

/// # QR Code (GS ( k, functions 165/167/169/180/181)
///
/// Model 2, module size 1-16 dots, then store and print.
pub fn qr(data: &[u8], module_size: u8, level: QrErrorLevel) -> Vec<u8> {
    let data = &data[..data.len().min(u16::MAX as usize - 3)];
    let mut cmd = Vec::with_capacity(data.len() + 40);

    // 165: model 2
    cmd.extend([GS, b'(', b'k', 4, 0, 0x31, 0x41, 0x32, 0x00]);
    // 167: module size
    cmd.extend([GS, b'(', b'k', 3, 0, 0x31, 0x43, module_size.clamp(1, 16)]);
    // 169: error correction, 48 + level
    cmd.extend([GS, b'(', b'k', 3, 0, 0x31, 0x45, 0x30 + level as u8]);
    // 180: store data
    let [pl, ph] = u16_le(data.len() as u16 + 3);
    cmd.extend([GS, b'(', b'k', pl, ph, 0x31, 0x50, 0x30]);
    cmd.extend_from_slice(data);
    // 181: print
    cmd.extend([GS, b'(', b'k', 3, 0, 0x31, 0x51, 0x30]);
    cmd
}
