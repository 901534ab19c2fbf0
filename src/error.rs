//! # Error Types
//!
//! This module defines error types used throughout the recibo library.
//! Each pipeline stage has its own enum so that the job orchestrator can
//! map failures onto a precise reason code.

use rust_decimal::Decimal;
use thiserror::Error;

/// Invariant violations in a [`ReceiptDocument`](crate::document::ReceiptDocument).
///
/// Documents are validated by the caller before they reach the renderer;
/// these errors only come out of [`ReceiptDocument::check`](crate::document::ReceiptDocument::check).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    #[error("total {actual} does not equal subtotal + tax - discount ({expected})")]
    TotalsMismatch { expected: Decimal, actual: Decimal },

    #[error("change {actual} does not equal tendered - total ({expected})")]
    ChangeMismatch { expected: Decimal, actual: Decimal },
}

/// Layout failures. No partial output is produced when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The template names a currency code with no known symbol
    #[error("unknown currency code '{0}'")]
    UnknownCurrency(String),

    /// A string-keyed template toggle that does not exist
    #[error("unknown template toggle '{0}'")]
    UnknownToggle(String),

    /// A toggle value that could not be parsed for its key
    #[error("invalid value '{value}' for template toggle '{key}'")]
    InvalidToggle { key: String, value: String },

    /// The graphics collaborator could not paint the document
    #[error("paint failed: {0}")]
    Paint(String),
}

/// Encoder failures, raised before any byte is handed to a transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The profile lacks a capability the request needs
    #[error("profile '{profile}' does not support {capability}")]
    MissingCapability {
        profile: String,
        capability: &'static str,
    },

    /// Raster frame wider than the printable area
    #[error("frame is {width} dots wide but profile '{profile}' prints at most {max}")]
    FrameTooWide {
        profile: String,
        width: usize,
        max: usize,
    },

    #[error("profile '{0}' asks for zero copies")]
    ZeroCopies(String),

    /// Invalid command or parameter
    #[error("invalid command: {0}")]
    InvalidCommand(String),
}

/// Transport-level errors reported by a spooler link.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The underlying channel went away (peer closed, cable pulled, ...)
    #[error("transport lost: {0}")]
    Lost(String),

    /// The spooler refused the request
    #[error("spooler refused: {0}")]
    Refused(String),

    /// Bad address, device path or other transport setting
    #[error("invalid transport config: {0}")]
    Config(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransportError {
    /// Whether the link should be considered dead after this error.
    pub fn is_link_loss(&self) -> bool {
        match self {
            TransportError::Lost(_) => true,
            TransportError::Refused(_) | TransportError::Config(_) => false,
            TransportError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::NotConnected
                    | std::io::ErrorKind::UnexpectedEof
            ),
        }
    }
}

/// Session-level errors. All of them are retryable by the caller.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// `Connecting` did not resolve within the configured timeout
    #[error("connect timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The spooler could not be reached
    #[error("connect failed: {0}")]
    Failed(#[source] TransportError),

    /// The session was lost and the automatic reconnect did not succeed
    #[error("session lost: {0}")]
    Lost(String),

    /// Operation attempted on a session that is not connected
    #[error("session is not connected")]
    NotConnected,
}

impl ConnectionError {
    pub fn is_retryable(&self) -> bool {
        true
    }
}

/// Failure to hand a stream to the spooler.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The write did not complete within the acknowledgment timeout; the
    /// printer may or may not have received the stream
    #[error("no acknowledgment within {0:?}")]
    AckTimeout(std::time::Duration),

    /// The link failed during the write
    #[error("write failed: {0}")]
    Transport(#[source] TransportError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Main error type for recibo operations outside the job orchestrator
#[derive(Debug, Error)]
pub enum ReciboError {
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Submit error: {0}")]
    Submit(#[from] SubmitError),

    /// Configuration file or argument problem
    #[error("Config error: {0}")]
    Config(String),

    /// Image processing error
    #[error("Image error: {0}")]
    Image(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
