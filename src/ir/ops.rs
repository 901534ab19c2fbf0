//! # IR Opcodes
//!
//! The intermediate representation for receipt streams. A program is a
//! flat sequence of opcodes that can be inspected, optimized, and
//! compiled to either command dialect.
//!
//! ```text
//! VisualDocument / RasterFrame → IR (inspectable) → Optimizer → Codegen → Bytes
//! ```
//!
//! Each opcode is a single, atomic operation. Style changes are separate
//! ops so the optimizer can drop the ones that change nothing.

use crate::protocol::qr::QrErrorLevel;
use crate::protocol::text::Alignment;

/// Text style the printer is in at a given point of the stream.
///
/// Used by the optimizer to eliminate redundant style changes. `Init`
/// returns the printer to the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleState {
    pub alignment: Alignment,
    pub bold: bool,
    /// 0 = 1x, 1 = 2x, ...
    pub height_mult: u8,
    pub width_mult: u8,
}

/// IR opcodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    // ========== Printer Control ==========
    /// Initialize printer (`ESC @`). Resets to default state.
    Init,

    /// Select the Windows-1252 character table that text ops are
    /// transcoded to.
    SelectCodepage,

    /// Cut paper. `partial: true` leaves a small hinge.
    Cut { partial: bool },

    // ========== Style Changes ==========
    SetAlign(Alignment),

    SetBold(bool),

    /// Character size multiplier, 0 = 1x up to 7 = 8x.
    SetSize { height: u8, width: u8 },

    // ========== Content ==========
    /// Text without trailing newline.
    Text(String),

    /// Line feed.
    Newline,

    // ========== Graphics ==========
    /// 1bpp raster image, `ceil(width/8)` bytes per row, MSB = leftmost.
    ///
    /// Split into several device commands when taller than the profile's
    /// `max_chunk_rows`.
    Raster {
        width: u16,
        height: u16,
        data: Vec<u8>,
    },

    /// Printer-side QR code.
    QrCode {
        data: String,
        cell_size: u8,
        error_level: QrErrorLevel,
    },

    /// Print a logo stored in the printer's NV memory.
    NvPrint {
        key: String,
        scale_x: u8,
        scale_y: u8,
    },
}

/// A compiled IR program.
///
/// Contains a sequence of ops that can be optimized and compiled to bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    pub ops: Vec<Op>,
}

impl Program {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    /// Create a program with an initial Init op.
    pub fn with_init() -> Self {
        Self {
            ops: vec![Op::Init],
        }
    }

    pub fn push(&mut self, op: Op) {
        self.ops.push(op);
    }

    pub fn extend(&mut self, ops: impl IntoIterator<Item = Op>) {
        self.ops.extend(ops);
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Op> {
        self.ops.iter()
    }

    /// Push one line of text followed by a newline.
    pub fn line(&mut self, text: impl Into<String>) {
        self.ops.push(Op::Text(text.into()));
        self.ops.push(Op::Newline);
    }
}

impl FromIterator<Op> for Program {
    fn from_iter<T: IntoIterator<Item = Op>>(iter: T) -> Self {
        Self {
            ops: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Program {
    type Item = Op;
    type IntoIter = std::vec::IntoIter<Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a Program {
    type Item = &'a Op;
    type IntoIter = std::slice::Iter<'a, Op>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}
