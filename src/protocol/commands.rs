//! # StarPRNT Printer Control
//!
//! Initialization and cutter commands for Star Micronics
//! printers (TSP650II, TSP700II, TSP800II, ...).
//!
//! ## Escape Sequence Structure
//!
//! - Single byte: `LF`
//! - Two bytes: `ESC @`, `ESC E`, `ESC F`
//! - With parameters: `ESC d n`, `ESC GS S m xL xH yL yH n data...`
//!
//! Multi-byte integers are **little-endian**: `0x1234` is sent as `[0x34, 0x12]`.
//!
//! ## Reference
//!
//! "StarPRNT Command Specifications Rev. 4.10", Star Micronics Co., Ltd.

/// ESC (0x1B), command prefix.
pub const ESC: u8 = 0x1B;

/// GS (0x1D), extended command prefix.
pub const GS: u8 = 0x1D;

/// LF (0x0A), print the line buffer and advance one line.
pub const LF: u8 = 0x0A;

/// # Initialize Printer (ESC @)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC @ |
/// | Hex     | 1B 40 |
///
/// Clears the print buffer and resets text formatting, alignment and
/// character size. NV graphics and configuration are kept.
///
/// ```
/// use recibo::protocol::commands;
///
/// assert_eq!(commands::init(), vec![0x1B, 0x40]);
/// ```
#[inline]
pub fn init() -> Vec<u8> {
    vec![ESC, b'@']
}

/// # Feed to Cut Position, Then Cut (ESC d 2 / ESC d 3)
///
/// | Format  | Bytes    |
/// |---------|----------|
/// | Full    | 1B 64 02 |
/// | Partial | 1B 64 03 |
///
/// Feeds so the last printed line is past the blade, then cuts. A partial
/// cut leaves a small hinge holding the receipt to the roll.
#[inline]
pub fn cut_feed(partial: bool) -> Vec<u8> {
    vec![ESC, b'd', 2 + partial as u8]
}

/// Encode a u16 as little-endian bytes `[low, high]`.
///
/// ```
/// use recibo::protocol::commands::u16_le;
///
/// assert_eq!(u16_le(576), [0x40, 0x02]);
/// ```
#[inline]
pub const fn u16_le(value: u16) -> [u8; 2] {
    [value as u8, (value >> 8) as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init() {
        assert_eq!(init(), vec![0x1B, 0x40]);
    }

    #[test]
    fn test_cut_feed_variants() {
        assert_eq!(cut_feed(false), vec![0x1B, 0x64, 0x02]);
        assert_eq!(cut_feed(true), vec![0x1B, 0x64, 0x03]);
    }

    #[test]
    fn test_u16_le() {
        assert_eq!(u16_le(0x0000), [0x00, 0x00]);
        assert_eq!(u16_le(0x00FF), [0xFF, 0x00]);
        assert_eq!(u16_le(0x1234), [0x34, 0x12]);
        assert_eq!(u16_le(576), [0x40, 0x02]);
    }
}
