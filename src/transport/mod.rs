//! # Printer Transport Layer
//!
//! Backends that carry finished byte streams to a print spooler. A
//! [`Spooler`] knows how to reach a device; opening it yields a
//! [`SpoolerLink`] that lists the printers behind it and accepts streams.
//!
//! ## Available Transports
//!
//! - [`network`]: raw TCP to port 9100 (JetDirect)
//! - [`device`]: serial / Bluetooth RFCOMM device files (Linux)
//! - [`memory`]: in-process virtual spooler for tests and dry runs
//!
//! Timeouts are not handled here. The session manager bounds `open` by
//! the connect timeout and `submit` by the acknowledgment timeout.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::printer::PrinterEndpoint;

pub mod device;
pub mod memory;
pub mod network;

pub use device::DeviceSpooler;
pub use memory::VirtualSpooler;
pub use network::NetworkSpooler;

/// Something that can be connected to.
#[async_trait]
pub trait Spooler: Send + Sync {
    /// Establish a link. May take arbitrarily long; callers apply a timeout.
    async fn open(&self) -> Result<Box<dyn SpoolerLink>, TransportError>;

    /// Short description for logs, e.g. `tcp://10.0.0.7:9100`.
    fn describe(&self) -> String;
}

/// An open connection to a spooler.
///
/// Links are shared: submissions to different endpoints may run at the
/// same time, so implementations serialize whatever a single device
/// cannot interleave.
#[async_trait]
pub trait SpoolerLink: Send + Sync {
    /// Printers reachable through this link.
    async fn endpoints(&self) -> Result<Vec<PrinterEndpoint>, TransportError>;

    /// Write a complete stream to one endpoint. Returns once the spooler
    /// has accepted all bytes.
    async fn submit(&self, endpoint_id: &str, data: &[u8]) -> Result<(), TransportError>;

    /// Release the link. Errors while closing are ignored.
    async fn close(&self);
}
