//! # Rasterizer
//!
//! Converts an RGB [`RenderedView`] into a packed 1bpp [`RasterFrame`] at
//! the printer's dot width.
//!
//! ## Pipeline
//!
//! ```text
//! RenderedView (RGB, any width)
//!     │  nearest-neighbor scale to target width,
//!     │  height = round(source_height × scale)
//!     ▼
//! luminance  Y = (R + G + B) / 3
//!     │  Fixed: Y > 127 → white, else black
//!     │  Bayer: ordered 8x8 dither
//!     ▼
//! RasterFrame (MSB = leftmost pixel, 1 = black)
//! ```
//!
//! Rows are independent, so they are computed in parallel. The output is
//! identical to a sequential pass.
//!
//! ## Example
//!
//! ```
//! use recibo::raster::{self, RenderedView};
//!
//! // 4x2 view: left half black, right half white
//! let mut rgb = Vec::new();
//! for _ in 0..2 {
//!     rgb.extend([0, 0, 0, 0, 0, 0, 255, 255, 255, 255, 255, 255]);
//! }
//! let view = RenderedView::new(4, 2, rgb);
//!
//! let frame = raster::rasterize(&view, 8);
//! assert_eq!((frame.width, frame.height), (8, 4));
//! assert_eq!(frame.row(0), &[0xF0]);
//! ```

pub mod dither;
pub mod font;
pub mod paint;

pub use paint::{BitmapPainter, Painter};

use image::{DynamicImage, GrayImage, Luma};
use rayon::prelude::*;

/// An RGB pixel buffer produced by a graphics collaborator.
///
/// `rgb` holds `width * height * 3` bytes, row-major. A buffer shorter
/// than that is treated as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedView {
    pub width: usize,
    pub height: usize,
    pub rgb: Vec<u8>,
}

impl RenderedView {
    pub fn new(width: usize, height: usize, rgb: Vec<u8>) -> Self {
        Self { width, height, rgb }
    }

    /// Adapt any decoded image (logo files, screenshots).
    pub fn from_image(img: &DynamicImage) -> Self {
        let rgb = img.to_rgb8();
        let (width, height) = (rgb.width() as usize, rgb.height() as usize);
        Self::new(width, height, rgb.into_raw())
    }

    fn has_data(&self) -> bool {
        self.width > 0 && self.height > 0 && self.rgb.len() >= self.width * self.height * 3
    }

    /// `(R + G + B) / 3` at a pixel.
    #[inline]
    pub fn luma(&self, x: usize, y: usize) -> u8 {
        let i = (y * self.width + x) * 3;
        let sum = self.rgb[i] as u16 + self.rgb[i + 1] as u16 + self.rgb[i + 2] as u16;
        (sum / 3) as u8
    }
}

/// A packed 1bpp image: `ceil(width / 8)` bytes per row, MSB = leftmost
/// pixel, 1 = black.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterFrame {
    pub width: usize,
    pub height: usize,
    pub bits: Vec<u8>,
}

impl RasterFrame {
    /// A frame with no rows.
    pub fn empty(width: usize) -> Self {
        Self {
            width,
            height: 0,
            bits: Vec::new(),
        }
    }

    /// A frame where every pixel is black or every pixel is white.
    ///
    /// Padding bits past `width` stay white.
    pub fn filled(width: usize, height: usize, black: bool) -> Self {
        let row = dither::pack_row(&vec![black; width]);
        Self {
            width,
            height,
            bits: row.repeat(height),
        }
    }

    /// Wrap packed bits, checking the length.
    pub fn from_bits(width: usize, height: usize, bits: Vec<u8>) -> Option<Self> {
        (bits.len() == width.div_ceil(8) * height).then_some(Self { width, height, bits })
    }

    /// Bytes per row.
    pub fn width_bytes(&self) -> usize {
        self.width.div_ceil(8)
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0 || self.width == 0
    }

    /// One packed row.
    pub fn row(&self, y: usize) -> &[u8] {
        let wb = self.width_bytes();
        &self.bits[y * wb..(y + 1) * wb]
    }

    /// `true` when the dot at (x, y) is black.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        let byte = self.bits[y * self.width_bytes() + x / 8];
        byte & (0x80 >> (x % 8)) != 0
    }

    /// Stack another frame of the same width underneath this one.
    pub fn append(&mut self, other: &RasterFrame) {
        debug_assert_eq!(self.width, other.width);
        self.bits.extend_from_slice(&other.bits);
        self.height += other.height;
    }

    /// Grayscale image of the frame, black dots as 0 and white as 255.
    pub fn to_gray_image(&self) -> GrayImage {
        GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            Luma([if self.pixel(x as usize, y as usize) { 0 } else { 255 }])
        })
    }
}

/// How luminance becomes a dot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threshold {
    /// `Y > 127` is white
    #[default]
    Fixed,
    /// Bayer 8x8 ordered dithering
    Bayer,
}

/// Scale `view` to `target_width` dots and threshold at 127.
pub fn rasterize(view: &RenderedView, target_width: usize) -> RasterFrame {
    rasterize_with(view, target_width, Threshold::Fixed)
}

/// Scale `view` to `target_width` dots using the given threshold mode.
///
/// A view with no pixel data gives an empty frame of the target width.
pub fn rasterize_with(view: &RenderedView, target_width: usize, mode: Threshold) -> RasterFrame {
    if !view.has_data() || target_width == 0 {
        return RasterFrame::empty(target_width);
    }

    let scale = target_width as f64 / view.width as f64;
    let height = (view.height as f64 * scale).round() as usize;
    let width_bytes = target_width.div_ceil(8);
    let mut bits = vec![0u8; width_bytes * height];

    // Source x per target column, shared by every row.
    let source_x: Vec<usize> = (0..target_width)
        .map(|x| x * view.width / target_width)
        .collect();

    bits.par_chunks_mut(width_bytes)
        .enumerate()
        .for_each(|(y, row)| {
            let sy = (y * view.width / target_width).min(view.height - 1);
            for (x, &sx) in source_x.iter().enumerate() {
                let luma = view.luma(sx, sy);
                let black = match mode {
                    Threshold::Fixed => dither::is_dark(luma),
                    Threshold::Bayer => dither::should_print_luma(x, y, luma),
                };
                if black {
                    row[x / 8] |= 0x80 >> (x % 8);
                }
            }
        });

    RasterFrame {
        width: target_width,
        height,
        bits,
    }
}
