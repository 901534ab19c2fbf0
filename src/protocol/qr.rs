//! # StarPRNT QR Codes (ESC GS y)
//!
//! Printer-side QR generation: the host sends the payload and the printer
//! draws the symbol at the current alignment.
//!
//! | Step | Command | Hex |
//! |------|---------|-----|
//! | Model | ESC GS y S 0 n | 1B 1D 79 53 30 n |
//! | Error correction | ESC GS y S 1 n | 1B 1D 79 53 31 n |
//! | Cell size | ESC GS y S 2 n | 1B 1D 79 53 32 n |
//! | Data | ESC GS y D 1 0 nL nH d... | 1B 1D 79 44 31 00 nL nH |
//! | Print | ESC GS y P | 1B 1D 79 50 |

use super::commands::{ESC, GS, u16_le};

/// QR model. Model 2 has alignment patterns and is what scanners expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrModel {
    Model1 = 1,
    #[default]
    Model2 = 2,
}

/// Error correction level.
///
/// | Level | Recovery |
/// |-------|----------|
/// | L | ~7% |
/// | M | ~15% |
/// | Q | ~25% |
/// | H | ~30% |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QrErrorLevel {
    L = 0,
    #[default]
    M = 1,
    Q = 2,
    H = 3,
}

pub fn set_model(model: QrModel) -> Vec<u8> {
    vec![ESC, GS, b'y', b'S', b'0', model as u8]
}

pub fn set_error_correction(level: QrErrorLevel) -> Vec<u8> {
    vec![ESC, GS, b'y', b'S', b'1', level as u8]
}

/// Cell size in dots, clamped to 1-8.
pub fn set_cell_size(size: u8) -> Vec<u8> {
    vec![ESC, GS, b'y', b'S', b'2', size.clamp(1, 8)]
}

/// Store the payload (auto mode analysis, `m = 0`).
///
/// Payloads longer than 65535 bytes are truncated.
pub fn set_data(data: &[u8]) -> Vec<u8> {
    let data = &data[..data.len().min(u16::MAX as usize)];
    let [nl, nh] = u16_le(data.len() as u16);
    let mut cmd = vec![ESC, GS, b'y', b'D', b'1', 0, nl, nh];
    cmd.extend_from_slice(data);
    cmd
}

pub fn print() -> Vec<u8> {
    vec![ESC, GS, b'y', b'P']
}

/// Full sequence: model 2, error level, cell size, data, print.
///
/// ```
/// use recibo::protocol::qr::{self, QrErrorLevel};
///
/// let cmd = qr::generate(b"Hello", 4, QrErrorLevel::M);
/// assert!(cmd.ends_with(&[0x1B, 0x1D, 0x79, 0x50]));
/// ```
pub fn generate(data: &[u8], cell_size: u8, error_level: QrErrorLevel) -> Vec<u8> {
    let mut cmd = Vec::new();
    cmd.extend(set_model(QrModel::Model2));
    cmd.extend(set_error_correction(error_level));
    cmd.extend(set_cell_size(cell_size));
    cmd.extend(set_data(data));
    cmd.extend(print());
    cmd
}
