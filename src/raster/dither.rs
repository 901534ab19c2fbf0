//! # Thresholding and Ordered Dithering
//!
//! Two ways of turning a luminance value into a printed dot:
//!
//! - **Fixed threshold** (default): `Y > 127` is white, anything darker is black.
//!   Crisp text, no halftone texture.
//! - **Bayer 8x8**: the threshold varies per pixel position, simulating
//!   gray levels on logos and photos.
//!
//! ```text
//!     0   1   2   3   4   5   6   7   (x mod 8)
//! 0 │ 0 │32 │ 8 │40 │ 2 │34 │10 │42 │
//! 1 │48 │16 │56 │24 │50 │18 │58 │26 │
//! 2 │12 │44 │ 4 │36 │14 │46 │ 6 │38 │
//! 3 │60 │28 │52 │20 │62 │30 │54 │22 │
//! 4 │ 3 │35 │11 │43 │ 1 │33 │ 9 │41 │
//! 5 │51 │19 │59 │27 │49 │17 │57 │25 │
//! 6 │15 │47 │ 7 │39 │13 │45 │ 5 │37 │
//! 7 │63 │31 │55 │23 │61 │29 │53 │21 │
//! (y mod 8)
//! ```
//!
//! ## Example
//!
//! ```
//! use recibo::raster::dither;
//!
//! assert!(dither::is_dark(127));
//! assert!(!dither::is_dark(128));
//!
//! let row = vec![true, true, false, false, true, false, true, false];
//! assert_eq!(dither::pack_row(&row), vec![0b11001010]);
//! ```

/// Bayer 8x8 dithering matrix, values 0-63.
pub const BAYER8: [[u8; 8]; 8] = [
    [0, 32, 8, 40, 2, 34, 10, 42],
    [48, 16, 56, 24, 50, 18, 58, 26],
    [12, 44, 4, 36, 14, 46, 6, 38],
    [60, 28, 52, 20, 62, 30, 54, 22],
    [3, 35, 11, 43, 1, 33, 9, 41],
    [51, 19, 59, 27, 49, 17, 57, 25],
    [15, 47, 7, 39, 13, 45, 5, 37],
    [63, 31, 55, 23, 61, 29, 53, 21],
];

/// Luminance above this value prints white.
pub const WHITE_ABOVE: u8 = 127;

/// Fixed-threshold decision: `true` (black) when `luma <= 127`.
#[inline]
pub fn is_dark(luma: u8) -> bool {
    luma <= WHITE_ABOVE
}

/// Position-dependent threshold in (0, 1).
///
/// `(BAYER8[y mod 8][x mod 8] + 0.5) / 64`, so full black always prints
/// and full white never does.
#[inline]
pub fn threshold(x: usize, y: usize) -> f32 {
    let matrix_value = BAYER8[y & 7][x & 7];
    (matrix_value as f32 + 0.5) / 64.0
}

/// Ordered-dither decision for an intensity where 0.0 = white, 1.0 = black.
#[inline]
pub fn should_print(x: usize, y: usize, intensity: f32) -> bool {
    intensity > threshold(x, y)
}

/// Ordered-dither decision for a luminance value (255 = white).
#[inline]
pub fn should_print_luma(x: usize, y: usize, luma: u8) -> bool {
    should_print(x, y, 1.0 - luma as f32 / 255.0)
}

/// Pack a row of pixels (true = black) into bytes.
///
/// Bit 7 of each byte is the leftmost pixel. A partial last byte is
/// padded with white on the right.
pub fn pack_row(pixels: &[bool]) -> Vec<u8> {
    let mut bytes = vec![0u8; pixels.len().div_ceil(8)];

    for (i, &pixel) in pixels.iter().enumerate() {
        if pixel {
            bytes[i / 8] |= 0x80 >> (i % 8);
        }
    }

    bytes
}
