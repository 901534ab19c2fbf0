//! Bitmap glyphs for the painter.
//!
//! Uses the Spleen bitmap font family. The character cell is chosen from
//! the paper width and the column count, so a 48-column receipt on 576
//! dots gets the native 12x24 face and narrower cells get the 6x12 face
//! scaled up.

use std::collections::HashMap;

use spleen_font::{FONT_6X12, FONT_12X24, PSF2Font};

/// Character cell dimensions in dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub char_width: usize,
    pub char_height: usize,
}

impl FontMetrics {
    /// Font A on a TSP650II: 48 columns on 576 dots.
    pub const LARGE: FontMetrics = FontMetrics {
        char_width: 12,
        char_height: 24,
    };

    pub const SMALL: FontMetrics = FontMetrics {
        char_width: 6,
        char_height: 12,
    };

    /// Largest cell that fits `columns` characters in `width_dots`.
    ///
    /// The height keeps the Spleen 1:2 aspect ratio.
    pub fn for_columns(width_dots: usize, columns: usize) -> FontMetrics {
        let char_width = (width_dots / columns.max(1)).clamp(1, Self::LARGE.char_width);
        FontMetrics {
            char_width,
            char_height: char_width * 2,
        }
    }
}

/// Which Spleen face a cell is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Face {
    Small,
    Large,
}

impl Face {
    fn for_metrics(metrics: FontMetrics) -> Face {
        if metrics.char_width >= Self::Large.metrics().char_width {
            Face::Large
        } else {
            Face::Small
        }
    }

    fn metrics(self) -> FontMetrics {
        match self {
            Face::Small => FontMetrics::SMALL,
            Face::Large => FontMetrics::LARGE,
        }
    }

    fn data(self) -> &'static [u8] {
        match self {
            Face::Small => FONT_6X12,
            Face::Large => FONT_12X24,
        }
    }
}

/// Glyph bitmaps (one byte per dot, 1 = black) at a fixed cell size, cached per char.
#[derive(Debug)]
pub struct GlyphCache {
    metrics: FontMetrics,
    face: Face,
    glyphs: HashMap<char, Vec<u8>>,
}

impl GlyphCache {
    pub fn new(metrics: FontMetrics) -> Self {
        Self {
            metrics,
            face: Face::for_metrics(metrics),
            glyphs: HashMap::new(),
        }
    }

    pub fn metrics(&self) -> FontMetrics {
        self.metrics
    }

    /// Bitmap for `ch`, `char_width * char_height` bytes.
    pub fn glyph(&mut self, ch: char) -> &[u8] {
        let metrics = self.metrics;
        let face = self.face;
        self.glyphs
            .entry(ch)
            .or_insert_with(|| generate_glyph(face, metrics, ch))
    }
}

fn generate_glyph(face: Face, metrics: FontMetrics, ch: char) -> Vec<u8> {
    let mut glyph = vec![0u8; metrics.char_width * metrics.char_height];
    if ch == ' ' {
        return glyph;
    }

    match spleen_bitmap(face, ch) {
        Some(src) => {
            let native = face.metrics();
            scale_bitmap(
                &src,
                native.char_width,
                native.char_height,
                &mut glyph,
                metrics.char_width,
                metrics.char_height,
            );
        }
        None => draw_box(&mut glyph, metrics.char_width, metrics.char_height),
    }
    glyph
}

/// Native-size glyph from the Spleen face, or `None` when the face lacks it.
fn spleen_bitmap(face: Face, ch: char) -> Option<Vec<u8>> {
    let native = face.metrics();
    let mut font = PSF2Font::new(face.data()).ok()?;
    let utf8 = ch.to_string();
    let rows = font.glyph_for_utf8(utf8.as_bytes())?;

    let mut bitmap = vec![0u8; native.char_width * native.char_height];
    for (y, row) in rows.enumerate() {
        for (x, on) in row.enumerate() {
            if x < native.char_width && y < native.char_height && on {
                bitmap[y * native.char_width + x] = 1;
            }
        }
    }
    Some(bitmap)
}

/// Nearest-neighbor scale between two glyph buffers.
fn scale_bitmap(src: &[u8], src_w: usize, src_h: usize, dst: &mut [u8], dst_w: usize, dst_h: usize) {
    for dy in 0..dst_h {
        for dx in 0..dst_w {
            let sx = dx * src_w / dst_w;
            let sy = dy * src_h / dst_h;
            if let (Some(&v), Some(d)) = (src.get(sy * src_w + sx), dst.get_mut(dy * dst_w + dx)) {
                *d = v;
            }
        }
    }
}

/// Box outline for characters missing from the font.
fn draw_box(glyph: &mut [u8], width: usize, height: usize) {
    if width < 3 || height < 3 {
        return;
    }
    let (top, bottom) = (height / 6, height - 1 - height / 6);
    for x in 1..width - 1 {
        glyph[top * width + x] = 1;
        glyph[bottom * width + x] = 1;
    }
    for y in top..=bottom {
        glyph[y * width + 1] = 1;
        glyph[y * width + width - 2] = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_for_columns() {
        assert_eq!(FontMetrics::for_columns(576, 48), FontMetrics::LARGE);
        assert_eq!(
            FontMetrics::for_columns(384, 48),
            FontMetrics {
                char_width: 8,
                char_height: 16
            }
        );
        assert_eq!(FontMetrics::for_columns(576, 0), FontMetrics::LARGE);
    }

    #[test]
    fn test_glyph_has_ink() {
        let mut cache = GlyphCache::new(FontMetrics::LARGE);
        let glyph = cache.glyph('A');
        assert_eq!(glyph.len(), 12 * 24);
        assert!(glyph.iter().any(|&p| p != 0));
    }

    #[test]
    fn test_space_is_blank() {
        let mut cache = GlyphCache::new(FontMetrics::for_columns(384, 48));
        assert!(cache.glyph(' ').iter().all(|&p| p == 0));
    }

    #[test]
    fn test_scaled_glyph_size() {
        let metrics = FontMetrics::for_columns(384, 48);
        let mut cache = GlyphCache::new(metrics);
        assert_eq!(cache.glyph('$').len(), 8 * 16);
    }
}
