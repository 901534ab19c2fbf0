//! # Code Generation
//!
//! Converts IR programs to printer bytes in the profile's dialect.

use super::ops::{Op, Program};
use crate::printer::{Dialect, PrinterProfile};
use crate::protocol::{commands, escpos, graphics, nv_graphics, qr, text};

impl Program {
    /// Compile the program for a printer profile.
    ///
    /// Rasters taller than `profile.max_chunk_rows` are split into several
    /// image commands. `NvPrint` ops with an invalid key or scale produce
    /// no bytes.
    pub fn to_bytes(&self, profile: &PrinterProfile) -> Vec<u8> {
        let mut out = Vec::new();
        for op in &self.ops {
            match profile.dialect {
                Dialect::StarPrnt => star_op(op, profile, &mut out),
                Dialect::EscPos => escpos_op(op, profile, &mut out),
            }
        }
        out
    }
}

fn star_op(op: &Op, profile: &PrinterProfile, out: &mut Vec<u8>) {
    match op {
        Op::Init => out.extend(commands::init()),
        Op::SelectCodepage => out.extend(text::codepage(text::CodePage::Cp1252)),
        Op::Cut { partial } => out.extend(commands::cut_feed(*partial)),
        Op::SetAlign(align) => out.extend(text::align(*align)),
        Op::SetBold(true) => out.extend(text::bold_on()),
        Op::SetBold(false) => out.extend(text::bold_off()),
        Op::SetSize { height, width } => out.extend(text::size(*height, *width)),
        Op::Text(s) => out.extend(text::encode_1252(s)),
        Op::Newline => out.push(commands::LF),
        Op::Raster {
            width,
            height,
            data,
        } => chunked_raster(*width, *height, data, profile, graphics::raster, out),
        Op::QrCode {
            data,
            cell_size,
            error_level,
        } => out.extend(qr::generate(data.as_bytes(), *cell_size, *error_level)),
        Op::NvPrint {
            key,
            scale_x,
            scale_y,
        } => {
            if let Some(cmd) = nv_graphics::print(key, *scale_x, *scale_y) {
                out.extend(cmd);
            }
        }
    }
}

fn escpos_op(op: &Op, profile: &PrinterProfile, out: &mut Vec<u8>) {
    match op {
        Op::Init => out.extend(escpos::init()),
        Op::SelectCodepage => out.extend(escpos::codepage(escpos::CODEPAGE_WPC1252)),
        Op::Cut { partial } => out.extend(escpos::cut(*partial)),
        Op::SetAlign(align) => out.extend(escpos::align(*align)),
        Op::SetBold(enabled) => out.extend(escpos::bold(*enabled)),
        Op::SetSize { height, width } => out.extend(escpos::size(*height, *width)),
        Op::Text(s) => out.extend(text::encode_1252(s)),
        Op::Newline => out.push(commands::LF),
        Op::Raster {
            width,
            height,
            data,
        } => chunked_raster(*width, *height, data, profile, escpos::raster, out),
        Op::QrCode {
            data,
            cell_size,
            error_level,
        } => out.extend(escpos::qr(data.as_bytes(), *cell_size, *error_level)),
        Op::NvPrint {
            key,
            scale_x,
            scale_y,
        } => {
            if let Some(cmd) = nv_graphics::print_escpos(key, *scale_x, *scale_y) {
                out.extend(cmd);
            }
        }
    }
}

/// Emit a raster in chunks of at most `max_chunk_rows` rows to avoid
/// overflowing the printer's receive buffer. A zero-height raster emits
/// nothing.
fn chunked_raster(
    width: u16,
    height: u16,
    data: &[u8],
    profile: &PrinterProfile,
    raster: fn(u16, u16, &[u8]) -> Vec<u8>,
    out: &mut Vec<u8>,
) {
    let width_bytes = width.div_ceil(8) as usize;
    let chunk_rows = profile.max_chunk_rows.max(1) as usize;
    let total_height = height as usize;

    let mut row_offset = 0;
    while row_offset < total_height {
        let chunk_height = (total_height - row_offset).min(chunk_rows);
        let byte_start = row_offset * width_bytes;
        let byte_end = (row_offset + chunk_height) * width_bytes;
        out.extend(raster(width, chunk_height as u16, &data[byte_start..byte_end]));
        row_offset += chunk_height;
    }
}

/// Number of image commands a raster of `height` rows is split into.
pub fn chunk_count(height: usize, profile: &PrinterProfile) -> usize {
    height.div_ceil(profile.max_chunk_rows.max(1) as usize)
}
