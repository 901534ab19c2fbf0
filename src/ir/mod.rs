//! # Intermediate Representation (IR)
//!
//! The IR is a "bytecode" that sits between laid-out receipts and raw
//! printer bytes, shared by both command dialects.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────┐     ┌─────────────┐     ┌───────────┐     ┌──────────────┐
//! │ VisualDocument │ ──► │     IR      │ ──► │ Optimizer │ ──► │   Codegen    │
//! │  RasterFrame   │     │  (Vec<Op>)  │     │           │     │ (per dialect)│
//! └────────────────┘     └─────────────┘     └───────────┘     └──────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use recibo::ir::{Op, Program};
//! use recibo::printer::PrinterProfile;
//! use recibo::protocol::text::Alignment;
//!
//! let mut program = Program::with_init();
//! program.push(Op::SetAlign(Alignment::Center));
//! program.push(Op::SetBold(true));
//! program.line("HELLO");
//! program.push(Op::Cut { partial: false });
//!
//! let bytes = program.optimize().to_bytes(&PrinterProfile::escpos_58());
//! assert!(bytes.ends_with(&[0x1D, 0x56, 0x00]));
//! ```

mod codegen;
mod ops;
mod optimize;

pub use codegen::chunk_count;
pub use ops::*;
