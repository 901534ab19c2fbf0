//! # Printer Module
//!
//! Printer profiles, endpoint descriptions and capabilities.
//!
//! ## Modules
//!
//! - [`config`]: Built-in profiles and profile parsing

pub mod config;

pub use config::{Capabilities, Dialect, PrinterEndpoint, PrinterProfile};
