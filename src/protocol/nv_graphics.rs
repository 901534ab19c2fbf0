//! # Stored Logos (NV Graphics)
//!
//! Logos kept in the printer's flash memory, addressed by a two-character
//! key such as `"A0"` or `"LG"`. Key characters must be printable ASCII
//! (32-126). Receipts only print stored logos; uploading them is done
//! once with the vendor's utility.
//!
//! ## Print (Function 69)
//!
//! | Dialect | Bytes |
//! |---------|-------|
//! | StarPRNT | ESC GS ( L 6 0 48 69 kc1 kc2 x y |
//! | ESC/POS | GS ( L 6 0 48 69 kc1 kc2 x y |
//!
//! `x` and `y` are the horizontal and vertical scale, 1 or 2.

use super::commands::{ESC, GS};

/// Validate a two-character key, returning its bytes.
pub fn validate_key(key: &str) -> Option<(u8, u8)> {
    match key.as_bytes() {
        &[kc1, kc2] if (32..=126).contains(&kc1) && (32..=126).contains(&kc2) => Some((kc1, kc2)),
        _ => None,
    }
}

/// Function 69 body, shared by both dialects.
fn print_body(key: &str, scale_x: u8, scale_y: u8) -> Option<[u8; 10]> {
    let (kc1, kc2) = validate_key(key)?;
    if !(1..=2).contains(&scale_x) || !(1..=2).contains(&scale_y) {
        return None;
    }
    Some([b'(', b'L', 6, 0, 48, 69, kc1, kc2, scale_x, scale_y])
}

/// # Print Stored Logo, StarPRNT (ESC GS ( L ... fn=69)
///
/// Must start on an empty line buffer. `None` for an invalid key or scale.
///
/// ```
/// use recibo::protocol::nv_graphics;
///
/// let cmd = nv_graphics::print("A0", 1, 1).unwrap();
/// assert_eq!(cmd, vec![0x1B, 0x1D, 0x28, 0x4C, 6, 0, 48, 69, b'A', b'0', 1, 1]);
/// ```
pub fn print(key: &str, scale_x: u8, scale_y: u8) -> Option<Vec<u8>> {
    let body = print_body(key, scale_x, scale_y)?;
    let mut cmd = vec![ESC, GS];
    cmd.extend(body);
    Some(cmd)
}

/// # Print Stored Logo, ESC/POS (GS ( L ... fn=69)
pub fn print_escpos(key: &str, scale_x: u8, scale_y: u8) -> Option<Vec<u8>> {
    let body = print_body(key, scale_x, scale_y)?;
    let mut cmd = vec![GS];
    cmd.extend(body);
    Some(cmd)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert_eq!(validate_key("A0"), Some((b'A', b'0')));
        assert_eq!(validate_key("  "), Some((b' ', b' ')));
        assert_eq!(validate_key("~~"), Some((b'~', b'~')));
        assert_eq!(validate_key("A"), None);
        assert_eq!(validate_key("ABC"), None);
        assert_eq!(validate_key("\u{e9}"), None);
    }

    #[test]
    fn test_print_scaled() {
        let cmd = print("LG", 2, 2).unwrap();
        assert_eq!(cmd, vec![0x1B, 0x1D, 0x28, 0x4C, 6, 0, 48, 69, b'L', b'G', 2, 2]);
    }

    #[test]
    fn test_print_escpos_drops_esc() {
        let cmd = print_escpos("A0", 1, 1).unwrap();
        assert_eq!(cmd, vec![0x1D, 0x28, 0x4C, 6, 0, 48, 69, b'A', b'0', 1, 1]);
    }

    #[test]
    fn test_print_invalid() {
        assert!(print("A0", 0, 1).is_none());
        assert!(print("A0", 1, 3).is_none());
        assert!(print("A", 1, 1).is_none());
        assert!(print_escpos("A0", 3, 1).is_none());
    }
}
