//! # Painting
//!
//! A [`Painter`] turns a [`VisualDocument`] into pixels. The print
//! pipeline only depends on the trait, so a host application can plug in
//! its own graphics stack; [`BitmapPainter`] is the built-in one, drawing
//! Spleen bitmap glyphs on a character grid.
//!
//! ```text
//! ┌──────────────────────────┐
//! │        CHURRA MART       │  Double: 2x2 cells
//! │   12 Harbour Road ...    │
//! │------------------------- │  rules are glyph lines
//! │ITEM                  USD │  table header in bold
//! │Espresso Beans 1kg $45.00 │
//! │          ▄▄▄▄            │
//! │          █▀▀█  QR        │  centered, quiet zone included
//! └──────────────────────────┘
//! ```

use std::collections::HashMap;

use qrcode::{EcLevel, QrCode};
use tracing::debug;

use super::font::{FontMetrics, GlyphCache};
use super::{RasterFrame, RenderedView};
use crate::error::RenderError;
use crate::layout::{Block, ImageSource, TextSize, VisualDocument, Weight, table_lines};
use crate::protocol::text::Alignment;

/// Modules of white border around a QR code.
const QR_QUIET_ZONE: usize = 4;

/// Something that can draw a laid-out receipt.
pub trait Painter: Send + Sync {
    /// Paint `view` onto a canvas `width_dots` wide.
    fn paint(&self, view: &VisualDocument, width_dots: usize) -> Result<RenderedView, RenderError>;
}

/// Built-in bitmap-font painter.
///
/// Stored logos live in printer memory and cannot be seen from here; a
/// bitmap registered under the same key is drawn instead, and unknown
/// keys are skipped.
#[derive(Debug, Clone, Default)]
pub struct BitmapPainter {
    logos: HashMap<String, RasterFrame>,
}

impl BitmapPainter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the pixels for a stored logo key.
    pub fn with_logo(mut self, key: impl Into<String>, frame: RasterFrame) -> Self {
        self.logos.insert(key.into(), frame);
        self
    }
}

impl Painter for BitmapPainter {
    fn paint(&self, view: &VisualDocument, width_dots: usize) -> Result<RenderedView, RenderError> {
        let metrics = FontMetrics::for_columns(width_dots, view.columns);
        let mut ctx = PaintContext {
            canvas: Canvas::new(width_dots),
            glyphs: GlyphCache::new(metrics),
            columns: view.columns.max(1),
        };

        for block in &view.blocks {
            match block {
                Block::TextLine {
                    content,
                    align,
                    weight,
                    size,
                } => ctx.text(content, *align, *weight, *size),
                Block::Rule { style } => {
                    let line = style.line(ctx.columns);
                    ctx.text(&line, Alignment::Left, Weight::Regular, TextSize::Normal);
                }
                Block::Table { columns, rows } => {
                    let (header, body) = table_lines(columns, rows, ctx.columns);
                    ctx.text(&header, Alignment::Left, Weight::Bold, TextSize::Normal);
                    for line in body {
                        ctx.text(&line, Alignment::Left, Weight::Regular, TextSize::Normal);
                    }
                }
                Block::ImageRef { source } => match source {
                    ImageSource::Bitmap(frame) => ctx.bitmap(frame),
                    ImageSource::Stored { key } => match self.logos.get(key) {
                        Some(frame) => ctx.bitmap(frame),
                        None => debug!(key = %key, "stored logo has no bitmap, skipping"),
                    },
                },
                Block::QrBlock { payload } => ctx.qr(payload)?,
            }
        }

        Ok(ctx.canvas.into_view())
    }
}

struct PaintContext {
    canvas: Canvas,
    glyphs: GlyphCache,
    columns: usize,
}

impl PaintContext {
    fn line_gap(&self) -> usize {
        self.glyphs.metrics().char_height / 6
    }

    fn text(&mut self, content: &str, align: Alignment, weight: Weight, size: TextSize) {
        let metrics = self.glyphs.metrics();
        let (wm, hm) = size.scale();
        let cell_w = metrics.char_width * wm;
        let cell_h = metrics.char_height * hm;

        let chars: Vec<char> = content.chars().take((self.columns / wm).max(1)).collect();
        let line_w = chars.len() * cell_w;
        let area = (self.columns * metrics.char_width).min(self.canvas.width);
        let x0 = match align {
            Alignment::Left => 0,
            Alignment::Center => area.saturating_sub(line_w) / 2,
            Alignment::Right => area.saturating_sub(line_w),
        };
        let top = self.canvas.height;
        self.canvas.grow(cell_h + self.line_gap());

        for (i, ch) in chars.into_iter().enumerate() {
            let glyph = self.glyphs.glyph(ch);
            let left = x0 + i * cell_w;
            for gy in 0..metrics.char_height {
                for gx in 0..metrics.char_width {
                    if glyph[gy * metrics.char_width + gx] == 0 {
                        continue;
                    }
                    for dy in 0..hm {
                        for dx in 0..wm {
                            let (x, y) = (left + gx * wm + dx, top + gy * hm + dy);
                            self.canvas.set(x, y);
                            if weight == Weight::Bold {
                                self.canvas.set(x + 1, y);
                            }
                        }
                    }
                }
            }
        }
    }

    /// Draw a bitmap centered, cropped to the canvas width.
    fn bitmap(&mut self, frame: &RasterFrame) {
        let x0 = self.canvas.width.saturating_sub(frame.width) / 2;
        let top = self.canvas.height;
        self.canvas.grow(frame.height + self.line_gap());
        for y in 0..frame.height {
            for x in 0..frame.width.min(self.canvas.width) {
                if frame.pixel(x, y) {
                    self.canvas.set(x0 + x, top + y);
                }
            }
        }
    }

    fn qr(&mut self, payload: &str) -> Result<(), RenderError> {
        let code = QrCode::with_error_correction_level(payload, EcLevel::M)
            .map_err(|e| RenderError::Paint(format!("QR code generation failed: {}", e)))?;

        let modules = code.width() + 2 * QR_QUIET_ZONE;
        // Roughly a third of the paper width.
        let cell = (self.canvas.width / 3 / modules).max(1);
        let size = modules * cell;
        let x0 = self.canvas.width.saturating_sub(size) / 2;
        let top = self.canvas.height;
        self.canvas.grow(size);

        for qy in 0..code.width() {
            for qx in 0..code.width() {
                if code[(qx, qy)] != qrcode::Color::Dark {
                    continue;
                }
                let left = x0 + (qx + QR_QUIET_ZONE) * cell;
                let upper = top + (qy + QR_QUIET_ZONE) * cell;
                for y in upper..upper + cell {
                    for x in left..left + cell {
                        self.canvas.set(x, y);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Growable one-byte-per-dot ink buffer.
struct Canvas {
    width: usize,
    height: usize,
    ink: Vec<u8>,
}

impl Canvas {
    fn new(width: usize) -> Self {
        Self {
            width,
            height: 0,
            ink: Vec::new(),
        }
    }

    fn grow(&mut self, rows: usize) {
        self.height += rows;
        self.ink.resize(self.width * self.height, 0);
    }

    fn set(&mut self, x: usize, y: usize) {
        if x < self.width && y < self.height {
            self.ink[y * self.width + x] = 1;
        }
    }

    fn into_view(self) -> RenderedView {
        let rgb = self
            .ink
            .iter()
            .flat_map(|&dot| {
                let v = if dot != 0 { 0 } else { 0xFF };
                [v, v, v]
            })
            .collect();
        RenderedView::new(self.width, self.height, rgb)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{Block, RuleStyle};

    fn doc_with(blocks: Vec<Block>) -> VisualDocument {
        let mut doc = VisualDocument::new(48);
        for b in blocks {
            doc.push(b);
        }
        doc
    }

    fn ink(view: &RenderedView) -> usize {
        view.rgb.chunks(3).filter(|px| px[0] == 0).count()
    }

    #[test]
    fn test_text_line_height() {
        let view = BitmapPainter::new()
            .paint(&doc_with(vec![Block::text("HELLO")]), 576)
            .unwrap();
        assert_eq!(view.width, 576);
        assert_eq!(view.height, 24 + 4);
        assert!(ink(&view) > 0);
    }

    #[test]
    fn test_double_size_is_taller() {
        let view = BitmapPainter::new()
            .paint(&doc_with(vec![Block::text("BIG").sized(TextSize::Double)]), 576)
            .unwrap();
        assert_eq!(view.height, 48 + 4);
    }

    #[test]
    fn test_bold_adds_ink() {
        let painter = BitmapPainter::new();
        let regular = painter.paint(&doc_with(vec![Block::text("TOTAL")]), 576).unwrap();
        let bold = painter
            .paint(&doc_with(vec![Block::text("TOTAL").bold()]), 576)
            .unwrap();
        assert!(ink(&bold) > ink(&regular));
    }

    #[test]
    fn test_blank_rule_has_no_ink() {
        let view = BitmapPainter::new()
            .paint(&doc_with(vec![Block::rule(RuleStyle::Blank)]), 576)
            .unwrap();
        assert!(view.height > 0);
        assert_eq!(ink(&view), 0);
    }

    #[test]
    fn test_qr_block_is_square_and_centered() {
        let view = BitmapPainter::new()
            .paint(
                &doc_with(vec![Block::QrBlock {
                    payload: "https://churra.example/contact".into(),
                }]),
                576,
            )
            .unwrap();
        assert!(view.height >= 100);
        // left and right edges stay white
        for y in 0..view.height {
            assert!(view.luma(0, y) == 255 && view.luma(575, y) == 255);
        }
        assert!(ink(&view) > 0);
    }

    #[test]
    fn test_stored_logo_uses_registered_bitmap() {
        let logo = RasterFrame::filled(64, 10, true);
        let block = Block::ImageRef {
            source: ImageSource::Stored { key: "A1".into() },
        };
        let with_logo = BitmapPainter::new()
            .with_logo("A1", logo)
            .paint(&doc_with(vec![block.clone()]), 576)
            .unwrap();
        assert_eq!(ink(&with_logo), 64 * 10);

        let without = BitmapPainter::new().paint(&doc_with(vec![block]), 576).unwrap();
        assert_eq!(without.height, 0);
    }
}
