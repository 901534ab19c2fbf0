//! # Protocol Encoder
//!
//! Turns a laid-out receipt or a raster image into the byte stream sent
//! to the printer. Both paths build an IR [`Program`], optimize it and
//! compile it in the profile's dialect.
//!
//! ## Stream Layout (one copy)
//!
//! ```text
//! ┌──────┬──────────────────────────┬──────────────┬─────┐
//! │ init │ blocks / image chunks    │ 3 × LF       │ cut │
//! └──────┴──────────────────────────┴──────────────┴─────┘
//! ```
//!
//! The cut is only emitted for profiles with a cutter. The whole stream
//! is repeated `profile.copies` times.
//!
//! ## Raster Byte Count
//!
//! ```text
//! len = copies × (height × ceil(width / 8) + raster_overhead)
//! ```
//!
//! ```
//! use recibo::encoder::{encode_raster, raster_overhead};
//! use recibo::printer::PrinterProfile;
//! use recibo::raster::RasterFrame;
//!
//! let frame = RasterFrame::filled(576, 10, true);
//! let profile = PrinterProfile::escpos_80();
//! let bytes = encode_raster(&frame, &profile).unwrap();
//! assert_eq!(bytes.len(), 10 * 72 + raster_overhead(&frame, &profile));
//! ```

use crate::error::EncodeError;
use crate::ir::{self, Op, Program};
use crate::layout::{Block, ImageSource, TextSize, VisualDocument, Weight, table_lines, wrap};
use crate::printer::{Dialect, PrinterProfile};
use crate::protocol::qr::QrErrorLevel;
use crate::protocol::text::Alignment;
use crate::protocol::{escpos, graphics, nv_graphics};
use crate::raster::RasterFrame;

mod decode;

pub use decode::decode_raster;

/// Line feeds between the content and the cut, so the last line clears
/// the cutter blade.
pub const TRAILING_FEED_LINES: usize = 3;

/// Encode a laid-out receipt as a text-mode stream.
///
/// Text is transcoded to Windows-1252. Stored logos print from NV memory,
/// QR codes are generated by the printer. Inline bitmaps need a profile
/// with raster support.
pub fn encode_text(view: &VisualDocument, profile: &PrinterProfile) -> Result<Vec<u8>, EncodeError> {
    check_copies(profile)?;
    let program = text_program(view, profile)?.optimize();
    Ok(repeat_copies(program.to_bytes(profile), profile))
}

/// Encode a raster image as a graphics-mode stream.
pub fn encode_raster(frame: &RasterFrame, profile: &PrinterProfile) -> Result<Vec<u8>, EncodeError> {
    check_copies(profile)?;
    let program = raster_program(frame, profile)?.optimize();
    Ok(repeat_copies(program.to_bytes(profile), profile))
}

/// Build the IR for a text-mode stream (one copy).
pub fn text_program(view: &VisualDocument, profile: &PrinterProfile) -> Result<Program, EncodeError> {
    let mut program = Program::with_init();
    program.push(Op::SelectCodepage);

    for block in &view.blocks {
        emit_block(&mut program, block, view.columns, profile)?;
    }

    finish(&mut program, profile);
    Ok(program)
}

/// Build the IR for a graphics-mode stream (one copy).
///
/// A zero-height frame produces a stream with no image command.
pub fn raster_program(frame: &RasterFrame, profile: &PrinterProfile) -> Result<Program, EncodeError> {
    let mut program = Program::with_init();
    if frame.height > 0 {
        program.push(raster_op(frame, profile)?);
    } else {
        check_raster(frame, profile)?;
    }
    finish(&mut program, profile);
    Ok(program)
}

/// Non-pixel bytes in one copy of [`encode_raster`]'s output.
pub fn raster_overhead(frame: &RasterFrame, profile: &PrinterProfile) -> usize {
    let init = 2;
    let header = match profile.dialect {
        Dialect::StarPrnt => graphics::RASTER_HEADER_LEN,
        Dialect::EscPos => escpos::RASTER_HEADER_LEN,
    };
    let cut = if profile.capabilities.supports_cut { 3 } else { 0 };
    init + ir::chunk_count(frame.height, profile) * header + TRAILING_FEED_LINES + cut
}

fn check_copies(profile: &PrinterProfile) -> Result<(), EncodeError> {
    if profile.copies == 0 {
        return Err(EncodeError::ZeroCopies(profile.name.clone()));
    }
    Ok(())
}

fn repeat_copies(bytes: Vec<u8>, profile: &PrinterProfile) -> Vec<u8> {
    match profile.copies {
        1 => bytes,
        n => bytes.repeat(n as usize),
    }
}

fn finish(program: &mut Program, profile: &PrinterProfile) {
    program.extend(std::iter::repeat_n(Op::Newline, TRAILING_FEED_LINES));
    if profile.capabilities.supports_cut {
        program.push(Op::Cut { partial: false });
    }
}

fn check_raster(frame: &RasterFrame, profile: &PrinterProfile) -> Result<(), EncodeError> {
    if !profile.capabilities.supports_raster {
        return Err(EncodeError::MissingCapability {
            profile: profile.name.clone(),
            capability: "raster graphics",
        });
    }
    let max = profile.width_dots.min(profile.capabilities.max_width) as usize;
    if frame.width > max {
        return Err(EncodeError::FrameTooWide {
            profile: profile.name.clone(),
            width: frame.width,
            max,
        });
    }
    Ok(())
}

fn raster_op(frame: &RasterFrame, profile: &PrinterProfile) -> Result<Op, EncodeError> {
    check_raster(frame, profile)?;
    let height = u16::try_from(frame.height).map_err(|_| {
        EncodeError::InvalidCommand(format!("raster height {} exceeds 65535 rows", frame.height))
    })?;
    Ok(Op::Raster {
        width: frame.width as u16,
        height,
        data: frame.bits.clone(),
    })
}

/// QR cell size for the paper width: 4 dots on 58mm, 6 on 80mm.
fn qr_cell_size(profile: &PrinterProfile) -> u8 {
    (profile.width_dots / 96).clamp(2, 8) as u8
}

fn emit_block(
    program: &mut Program,
    block: &Block,
    columns: usize,
    profile: &PrinterProfile,
) -> Result<(), EncodeError> {
    match block {
        Block::TextLine {
            content,
            align,
            weight,
            size,
        } => {
            let (width, height) = size.scale();
            program.push(Op::SetAlign(*align));
            program.push(Op::SetBold(*weight == Weight::Bold));
            program.push(Op::SetSize {
                height: height as u8 - 1,
                width: width as u8 - 1,
            });
            // Wrap at the scaled width so the printer never breaks mid-word
            let mut lines = wrap(content, (columns / width).max(1));
            if lines.is_empty() {
                lines.push(String::new());
            }
            for line in lines {
                program.line(line);
            }
            if *size != TextSize::Normal {
                program.push(Op::SetSize {
                    height: 0,
                    width: 0,
                });
            }
            program.push(Op::SetBold(false));
        }
        Block::Rule { style } => {
            program.push(Op::SetAlign(Alignment::Left));
            program.line(style.line(columns).trim_end());
        }
        Block::Table { columns: cols, rows } => {
            let (header, body) = table_lines(cols, rows, columns);
            program.push(Op::SetAlign(Alignment::Left));
            program.push(Op::SetBold(true));
            program.line(header);
            program.push(Op::SetBold(false));
            for line in body {
                program.line(line);
            }
        }
        Block::ImageRef { source } => match source {
            ImageSource::Stored { key } => {
                if nv_graphics::validate_key(key).is_none() {
                    return Err(EncodeError::InvalidCommand(format!(
                        "stored logo key must be two printable characters, got '{key}'"
                    )));
                }
                program.push(Op::SetAlign(Alignment::Center));
                program.push(Op::NvPrint {
                    key: key.clone(),
                    scale_x: 1,
                    scale_y: 1,
                });
                program.push(Op::Newline);
            }
            ImageSource::Bitmap(frame) => {
                if frame.height > 0 {
                    program.push(Op::SetAlign(Alignment::Center));
                    program.push(raster_op(frame, profile)?);
                }
            }
        },
        Block::QrBlock { payload } => {
            program.push(Op::SetAlign(Alignment::Center));
            program.push(Op::QrCode {
                data: payload.clone(),
                cell_size: qr_cell_size(profile),
                error_level: QrErrorLevel::M,
            });
            program.push(Op::Newline);
        }
    }
    Ok(())
}
