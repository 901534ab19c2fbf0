//! Reference decoder for graphics-mode streams.
//!
//! Walks a byte stream and reassembles the images carried by raster
//! commands of either dialect. Chunks that follow each other directly
//! and share a row width are joined into one frame; anything in between
//! (feeds, a cut, the next copy's init) starts a new frame.
//!
//! Only the raster commands are interpreted. Text-mode streams are not
//! decoded, and pixel data is skipped over rather than scanned.

use crate::protocol::commands::{ESC, GS};
use crate::raster::RasterFrame;

/// `ESC GS S 1 xL xH yL yH n`
const STAR_PREFIX: [u8; 4] = [ESC, GS, b'S', 1];
const STAR_HEADER_LEN: usize = 9;

/// `GS v 0 m xL xH yL yH`
const ESCPOS_PREFIX: [u8; 3] = [GS, b'v', b'0'];
const ESCPOS_HEADER_LEN: usize = 8;

/// Extract the images in a stream.
///
/// Decoded frames are `8 × width_bytes` dots wide, since the stream only
/// carries the row width in bytes. A truncated command ends decoding.
///
/// ```
/// use recibo::encoder::{decode_raster, encode_raster};
/// use recibo::printer::PrinterProfile;
/// use recibo::raster::RasterFrame;
///
/// let frame = RasterFrame::filled(384, 12, true);
/// let bytes = encode_raster(&frame, &PrinterProfile::escpos_58()).unwrap();
/// assert_eq!(decode_raster(&bytes), vec![frame]);
/// ```
pub fn decode_raster(bytes: &[u8]) -> Vec<RasterFrame> {
    let mut frames: Vec<RasterFrame> = Vec::new();
    // end offset of the last chunk, for joining
    let mut last_end = None;
    let mut i = 0;

    while i < bytes.len() {
        let rest = &bytes[i..];
        let header = if rest.starts_with(&STAR_PREFIX) && rest.len() >= STAR_HEADER_LEN {
            Some((STAR_HEADER_LEN, [rest[4], rest[5]], [rest[6], rest[7]]))
        } else if rest.starts_with(&ESCPOS_PREFIX) && rest.len() >= ESCPOS_HEADER_LEN {
            Some((ESCPOS_HEADER_LEN, [rest[4], rest[5]], [rest[6], rest[7]]))
        } else {
            None
        };

        let Some((header_len, x, y)) = header else {
            i += 1;
            continue;
        };

        let width_bytes = u16::from_le_bytes(x) as usize;
        let height = u16::from_le_bytes(y) as usize;
        let data_start = i + header_len;
        let data_end = data_start + width_bytes * height;
        if data_end > bytes.len() {
            break;
        }

        let chunk = RasterFrame {
            width: width_bytes * 8,
            height,
            bits: bytes[data_start..data_end].to_vec(),
        };
        match frames.last_mut() {
            Some(frame) if last_end == Some(i) && frame.width == chunk.width => frame.append(&chunk),
            _ => frames.push(chunk),
        }

        last_end = Some(data_end);
        i = data_end;
    }

    frames
}
