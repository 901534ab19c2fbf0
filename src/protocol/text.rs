//! # StarPRNT Text Styling
//!
//! | Style | Command | Effect |
//! |-------|---------|--------|
//! | Alignment | ESC GS a n | Left / center / right |
//! | Bold | ESC E / ESC F | **Emphasized** text |
//! | Size | ESC i n1 n2 | 1x to 8x height and width |
//! | Code page | ESC GS t n | Character table for bytes 0x80-0xFF |
//!
//! ```text
//! Left aligned (default)    |LEFT TEXT
//! Center aligned            |  CENTER TEXT
//! Right aligned             |      RIGHT TEXT
//! ```

use super::commands::{ESC, GS};

/// Text alignment options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Alignment {
    #[default]
    Left = 0,
    Center = 1,
    Right = 2,
}

/// # Set Text Alignment (ESC GS a n)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC GS a n |
/// | Hex     | 1B 1D 61 n |
///
/// Takes effect at the start of the next line; reset by `ESC @`.
///
/// ```
/// use recibo::protocol::text::{align, Alignment};
///
/// assert_eq!(align(Alignment::Center), vec![0x1B, 0x1D, 0x61, 0x01]);
/// ```
pub fn align(alignment: Alignment) -> Vec<u8> {
    vec![ESC, GS, b'a', alignment as u8]
}

/// # Enable Bold (ESC E)
#[inline]
pub fn bold_on() -> Vec<u8> {
    vec![ESC, b'E']
}

/// # Disable Bold (ESC F)
#[inline]
pub fn bold_off() -> Vec<u8> {
    vec![ESC, b'F']
}

/// # Set Character Size (ESC i n1 n2)
///
/// | Format  | Bytes |
/// |---------|-------|
/// | ASCII   | ESC i n1 n2 |
/// | Hex     | 1B 69 n1 n2 |
///
/// `n1` is the vertical and `n2` the horizontal expansion, 0 = 1x up to 7 = 8x.
///
/// ```
/// use recibo::protocol::text::size;
///
/// assert_eq!(size(1, 1), vec![0x1B, 0x69, 0x01, 0x01]);
/// ```
pub fn size(height_mult: u8, width_mult: u8) -> Vec<u8> {
    vec![ESC, b'i', height_mult.min(7), width_mult.min(7)]
}

/// Character tables used for receipts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CodePage {
    /// US English, box drawing
    Cp437 = 1,
    /// Multilingual Latin-1 with Euro
    Cp858 = 3,
    /// Windows Latin-1
    Cp1252 = 32,
}

/// # Set Code Page (ESC GS t n)
///
/// ```
/// use recibo::protocol::text::{codepage, CodePage};
///
/// assert_eq!(codepage(CodePage::Cp1252), vec![0x1B, 0x1D, 0x74, 32]);
/// ```
pub fn codepage(cp: CodePage) -> Vec<u8> {
    vec![ESC, GS, b't', cp as u8]
}

/// Transcode text to Windows-1252, one byte per character.
///
/// Characters the code page cannot represent become `?`, so the byte
/// count always equals the character count.
///
/// ```
/// use recibo::protocol::text::encode_1252;
///
/// assert_eq!(encode_1252("caf\u{e9} \u{20ac}5"), vec![b'c', b'a', b'f', 0xE9, b' ', 0x80, b'5']);
/// assert_eq!(encode_1252("\u{65e5}"), vec![b'?']);
/// ```
pub fn encode_1252(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    let mut buf = [0u8; 4];
    for ch in s.chars() {
        if ch.is_ascii() {
            out.push(ch as u8);
            continue;
        }
        let (bytes, _, unmappable) = encoding_rs::WINDOWS_1252.encode(ch.encode_utf8(&mut buf));
        match (unmappable, bytes.as_ref()) {
            (false, &[b]) => out.push(b),
            _ => out.push(b'?'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(align(Alignment::Left), vec![0x1B, 0x1D, 0x61, 0x00]);
        assert_eq!(align(Alignment::Right), vec![0x1B, 0x1D, 0x61, 0x02]);
    }

    #[test]
    fn test_bold() {
        assert_eq!(bold_on(), vec![0x1B, 0x45]);
        assert_eq!(bold_off(), vec![0x1B, 0x46]);
    }

    #[test]
    fn test_size_clamps() {
        assert_eq!(size(0, 0), vec![0x1B, 0x69, 0, 0]);
        assert_eq!(size(9, 12), vec![0x1B, 0x69, 7, 7]);
    }

    #[test]
    fn test_encode_1252() {
        assert_eq!(encode_1252("R12.00"), b"R12.00".to_vec());
        assert_eq!(encode_1252("\u{a3}1"), vec![0xA3, b'1']);
        assert_eq!(encode_1252("\u{2192}x"), vec![b'?', b'x']);
    }

    #[test]
    fn test_codepage() {
        assert_eq!(codepage(CodePage::Cp437), vec![0x1B, 0x1D, 0x74, 0x01]);
    }
}
