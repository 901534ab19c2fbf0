//! # StarPRNT Raster Graphics
//!
//! ## Raster Command (ESC GS S)
//!
//! ```text
//! ESC GS S m xL xH yL yH n [data...]
//!  │   │  │ │  │  │  │  │ │     │
//!  │   │  │ │  │  │  │  │ │     └─ (xL + xH*256) * (yL + yH*256) bytes
//!  │   │  │ │  │  │  │  │ └─ n = 0: black
//!  │   │  │ │  │  │  └──┴─ height in rows, little-endian
//!  │   │  │ │  └──┴─ width in BYTES, little-endian
//!  │   │  │ └─ m = 1: monochrome
//!  1B  1D 53
//! ```
//!
//! Each row is `width_bytes` bytes, MSB = leftmost pixel, 1 = black.
//! Large images are sent as several commands of at most
//! `max_chunk_rows` rows each to stay inside the printer's receive buffer.

use super::commands::{ESC, GS, u16_le};

/// Bytes before the pixel data in an `ESC GS S` command.
pub const RASTER_HEADER_LEN: usize = 9;

/// # Print Raster Image (ESC GS S)
///
/// `data` must hold `ceil(width_dots / 8) * height` bytes.
///
/// ```
/// use recibo::protocol::graphics;
///
/// let cmd = graphics::raster(576, 100, &vec![0u8; 72 * 100]);
/// assert_eq!(&cmd[..9], &[0x1B, 0x1D, 0x53, 1, 72, 0, 100, 0, 0]);
/// ```
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
    cmd.extend([ESC, GS, b'S', 1, xl, xh, yl, yh, 0]);
    cmd.extend_from_slice(data);
    cmd
}
