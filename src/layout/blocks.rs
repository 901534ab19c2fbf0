//! # Visual Blocks
//!
//! The [`VisualDocument`] is an ordered list of typed blocks. It is what
//! both the text encoder and the painter consume, so the character-grid
//! helpers that turn a table or a rule into fixed-width lines live here.

use std::ops::Range;

use crate::protocol::text::Alignment;
use crate::raster::RasterFrame;

/// Text weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Weight {
    #[default]
    Regular,
    Bold,
}

/// Character scaling for a text line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextSize {
    #[default]
    Normal,
    /// 2x height only
    Tall,
    /// 2x width and height
    Double,
}

impl TextSize {
    /// Width and height multipliers.
    pub fn scale(self) -> (usize, usize) {
        match self {
            TextSize::Normal => (1, 1),
            TextSize::Tall => (1, 2),
            TextSize::Double => (2, 2),
        }
    }
}

/// Divider style options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RuleStyle {
    /// Dashed line (default): ------------
    #[default]
    Dashed,
    /// Equals line: ============
    Double,
    /// Blank line used as vertical space
    Blank,
}

impl RuleStyle {
    pub fn glyph(self) -> char {
        match self {
            RuleStyle::Dashed => '-',
            RuleStyle::Double => '=',
            RuleStyle::Blank => ' ',
        }
    }

    /// The rule as a full-width line of repeated glyphs.
    pub fn line(self, columns: usize) -> String {
        std::iter::repeat_n(self.glyph(), columns).collect()
    }
}

/// A table column header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub title: String,
    pub align: Alignment,
}

impl Column {
    pub fn new(title: impl Into<String>, align: Alignment) -> Self {
        Self {
            title: title.into(),
            align,
        }
    }
}

/// Where an image block gets its pixels from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// A logo stored in the printer's NV memory, addressed by a two-character key
    Stored { key: String },
    /// An inline 1bpp bitmap
    Bitmap(RasterFrame),
}

/// One block of a rendered receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    TextLine {
        content: String,
        align: Alignment,
        weight: Weight,
        size: TextSize,
    },
    Rule {
        style: RuleStyle,
    },
    Table {
        columns: Vec<Column>,
        rows: Vec<Vec<String>>,
    },
    ImageRef {
        source: ImageSource,
    },
    QrBlock {
        payload: String,
    },
}

impl Block {
    /// A regular, left-aligned text line.
    pub fn text(content: impl Into<String>) -> Self {
        Block::TextLine {
            content: content.into(),
            align: Alignment::Left,
            weight: Weight::Regular,
            size: TextSize::Normal,
        }
    }

    /// A centered text line.
    pub fn centered(content: impl Into<String>) -> Self {
        Block::TextLine {
            content: content.into(),
            align: Alignment::Center,
            weight: Weight::Regular,
            size: TextSize::Normal,
        }
    }

    pub fn rule(style: RuleStyle) -> Self {
        Block::Rule { style }
    }

    /// Make a text line bold. Other blocks are returned unchanged.
    pub fn bold(self) -> Self {
        match self {
            Block::TextLine {
                content,
                align,
                size,
                ..
            } => Block::TextLine {
                content,
                align,
                weight: Weight::Bold,
                size,
            },
            other => other,
        }
    }

    /// Set the size of a text line. Other blocks are returned unchanged.
    pub fn sized(self, new_size: TextSize) -> Self {
        match self {
            Block::TextLine {
                content,
                align,
                weight,
                ..
            } => Block::TextLine {
                content,
                align,
                weight,
                size: new_size,
            },
            other => other,
        }
    }
}

/// Receipt sections, in print order. Used to inspect a rendered document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Header,
    Meta,
    Items,
    Totals,
    Payment,
    /// Installment still open: balance and progress
    InstallmentProgress,
    /// Installment paid off
    InstallmentComplete,
    /// Refund, cash drop, statement or cancellation banner
    TransactionNote,
    Tagline,
    Policy,
    Footer,
    ThankYou,
}

/// The laid-out receipt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisualDocument {
    pub blocks: Vec<Block>,
    /// Characters per line the layout was made for
    pub columns: usize,
    /// Block ranges per section, in order
    pub sections: Vec<(Section, Range<usize>)>,
}

impl VisualDocument {
    pub fn new(columns: usize) -> Self {
        Self {
            blocks: Vec::new(),
            columns,
            sections: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// Record blocks pushed by `f` as one section. Empty sections are not recorded.
    pub fn section(&mut self, section: Section, f: impl FnOnce(&mut Self)) {
        let start = self.blocks.len();
        f(self);
        let end = self.blocks.len();
        if end > start {
            self.sections.push((section, start..end));
        }
    }

    /// Section names in order.
    pub fn section_order(&self) -> Vec<Section> {
        self.sections.iter().map(|(s, _)| *s).collect()
    }

    /// Blocks that belong to a section.
    pub fn section_blocks(&self, section: Section) -> &[Block] {
        self.sections
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, r)| &self.blocks[r.clone()])
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Plain-text proof of the layout on its character grid. Images and QR
    /// codes appear as bracketed placeholders.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::TextLine {
                    content,
                    align,
                    size,
                    ..
                } => {
                    let (scale_w, _) = size.scale();
                    let width = (self.columns / scale_w).max(1);
                    for line in wrap(content, width) {
                        push_aligned(&mut out, &line, *align, width);
                    }
                }
                Block::Rule { style } => push_line(&mut out, &style.line(self.columns)),
                Block::Table { columns, rows } => {
                    let (header, body) = table_lines(columns, rows, self.columns);
                    push_line(&mut out, &header);
                    for line in body {
                        push_line(&mut out, &line);
                    }
                }
                Block::ImageRef {
                    source: ImageSource::Stored { key },
                } => push_aligned(&mut out, &format!("[logo {}]", key), Alignment::Center, self.columns),
                Block::ImageRef {
                    source: ImageSource::Bitmap(frame),
                } => push_aligned(
                    &mut out,
                    &format!("[bitmap {}x{}]", frame.width, frame.height),
                    Alignment::Center,
                    self.columns,
                ),
                Block::QrBlock { payload } => {
                    push_aligned(&mut out, &format!("[QR {}]", payload), Alignment::Center, self.columns)
                }
            }
        }
        out
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line.trim_end());
    out.push('\n');
}

fn push_aligned(out: &mut String, text: &str, align: Alignment, width: usize) {
    let slack = width.saturating_sub(char_len(text));
    let indent = match align {
        Alignment::Left => 0,
        Alignment::Center => slack / 2,
        Alignment::Right => slack,
    };
    out.push_str(&" ".repeat(indent));
    push_line(out, text);
}

// ============================================================================
// CHARACTER GRID HELPERS
// ============================================================================

/// Number of characters (not bytes) in a string.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// `label` on the left, `value` on the right, padded to `width` characters.
///
/// The label is truncated when both do not fit.
pub fn pair_line(label: &str, value: &str, width: usize) -> String {
    let value_len = char_len(value);
    let label_max = width.saturating_sub(value_len + 1);
    let label: String = label.chars().take(label_max).collect();
    let padding = width.saturating_sub(char_len(&label) + value_len).max(1);
    format!("{label}{}{value}", " ".repeat(padding))
}

/// Greedy word wrap. Words longer than `width` are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            lines.push(word.drain(..width).collect());
        }
        if word.is_empty() {
            continue;
        }

        let current_len = char_len(&current);
        if current_len > 0 && current_len + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.extend(word);
    }

    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Lay out a table on a fixed character grid.
///
/// Every column after the first is sized to its widest cell; the first
/// column takes the remaining width and wraps onto continuation lines.
/// Returns the header line followed by the body lines.
pub fn table_lines(columns: &[Column], rows: &[Vec<String>], width: usize) -> (String, Vec<String>) {
    if columns.is_empty() {
        return (String::new(), Vec::new());
    }

    let widths: Vec<usize> = (0..columns.len())
        .map(|i| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| char_len(c))
                .chain(std::iter::once(char_len(&columns[i].title)))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let fixed: usize = widths[1..].iter().map(|w| w + 1).sum();
    let first_width = width.saturating_sub(fixed).max(1);

    let render_row = |cells: &[&str]| -> Vec<String> {
        let wrapped = wrap(cells.first().copied().unwrap_or(""), first_width);
        let first_lines = if wrapped.is_empty() {
            vec![String::new()]
        } else {
            wrapped
        };
        let mut out = Vec::with_capacity(first_lines.len());
        for (n, part) in first_lines.iter().enumerate() {
            let mut line = pad(part, first_width, columns[0].align);
            if n == 0 {
                for (i, col) in columns.iter().enumerate().skip(1) {
                    line.push(' ');
                    line.push_str(&pad(cells.get(i).copied().unwrap_or(""), widths[i], col.align));
                }
            }
            out.push(line.trim_end().to_string());
        }
        out
    };

    let titles: Vec<&str> = columns.iter().map(|c| c.title.as_str()).collect();
    let header = render_row(&titles).into_iter().next().unwrap_or_default();
    let body = rows
        .iter()
        .flat_map(|r| {
            let cells: Vec<&str> = r.iter().map(String::as_str).collect();
            render_row(&cells)
        })
        .collect();
    (header, body)
}

/// Pad `s` to `width` characters using the given alignment.
fn pad(s: &str, width: usize, align: Alignment) -> String {
    let len = char_len(s);
    if len >= width {
        return s.to_string();
    }
    let gap = width - len;
    match align {
        Alignment::Left => format!("{s}{}", " ".repeat(gap)),
        Alignment::Right => format!("{}{s}", " ".repeat(gap)),
        Alignment::Center => {
            let left = gap / 2;
            format!("{}{s}{}", " ".repeat(left), " ".repeat(gap - left))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_pair_line_fills_width() {
        let line = pair_line("TOTAL", "$109.83", 20);
        assert_eq!(line, format!("TOTAL{}$109.83", " ".repeat(8)));
        assert_eq!(char_len(&line), 20);
    }

    #[test]
    fn test_pair_line_truncates_label() {
        let line = pair_line("A very long label indeed", "$1.00", 12);
        assert_eq!(line, "A very $1.00");
    }

    #[test]
    fn test_wrap_words() {
        assert_eq!(
            wrap("returns accepted within thirty days", 12),
            vec!["returns", "accepted", "within", "thirty days"]
        );
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
        assert!(wrap("   ", 10).is_empty());
    }

    #[test]
    fn test_table_two_columns() {
        let columns = vec![
            Column::new("ITEM", Alignment::Left),
            Column::new("TOTAL", Alignment::Right),
        ];
        let rows = vec![
            vec!["Coffee x2".to_string(), "$7.00".to_string()],
            vec!["Extra long pastry name".to_string(), "$12.50".to_string()],
        ];
        let (header, body) = table_lines(&columns, &rows, 20);
        assert_eq!(header, format!("ITEM{}TOTAL", " ".repeat(11)));
        assert_eq!(
            body,
            vec![
                format!("Coffee x2{}$7.00", " ".repeat(6)),
                format!("Extra long{}$12.50", " ".repeat(4)),
                "pastry name".to_string(),
            ]
        );
    }

    #[test]
    fn test_table_without_rows_has_header() {
        let columns = vec![
            Column::new("ITEM", Alignment::Left),
            Column::new("TOTAL", Alignment::Right),
        ];
        let (header, body) = table_lines(&columns, &[], 16);
        assert_eq!(header, format!("ITEM{}TOTAL", " ".repeat(7)));
        assert!(body.is_empty());
    }

    #[test]
    fn test_sections_record_ranges() {
        let mut doc = VisualDocument::new(32);
        doc.section(Section::Header, |d| {
            d.push(Block::centered("SHOP"));
            d.push(Block::centered("Main St"));
        });
        doc.section(Section::Tagline, |_| {});
        doc.section(Section::Items, |d| d.push(Block::rule(RuleStyle::Dashed)));
        assert_eq!(doc.section_order(), vec![Section::Header, Section::Items]);
        assert_eq!(doc.section_blocks(Section::Header).len(), 2);
        assert!(doc.section_blocks(Section::Tagline).is_empty());
    }

    #[test]
    fn test_rule_line() {
        assert_eq!(RuleStyle::Double.line(5), "=====");
    }

    #[test]
    fn test_plain_text_proof() {
        let mut doc = VisualDocument::new(10);
        doc.push(Block::centered("SHOP"));
        doc.push(Block::text("TOTAL").sized(TextSize::Double));
        doc.push(Block::rule(RuleStyle::Dashed));
        doc.push(Block::QrBlock {
            payload: "x".into(),
        });
        assert_eq!(doc.to_plain_text(), "   SHOP\nTOTAL\n----------\n  [QR x]\n");
    }
}
