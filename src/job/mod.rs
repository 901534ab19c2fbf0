//! # Print Job Orchestrator
//!
//! Turns a [`PrintRequest`] into bytes on a printer and reports progress
//! through a [`JobHandle`].
//!
//! ## Job Lifecycle
//!
//! ```text
//! Pending ─► Rendering ─► Encoding ─► Submitting ─► Succeeded
//!    │           │            │            │
//!    └───────────┴────────────┴────────────┴──────► Failed(reason)
//! ```
//!
//! - `Rendering` lays out the document and, for raster jobs, paints and
//!   rasterizes it.
//! - `Encoding` validates the endpoint, builds the command stream and
//!   then waits until the session is connected and the endpoint queue
//!   reaches the job.
//! - `Submitting` is bounded by the session's acknowledgment timeout, so
//!   it always resolves.
//!
//! A job reaches exactly one terminal state and is never retried
//! automatically. Its stream is dropped at that transition.
//!
//! ## Ordering
//!
//! Jobs for the same endpoint are submitted in the order
//! [`PrintService::print`] was called. Jobs for different endpoints are
//! prepared in parallel and share the single session link.

use std::fmt;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use crate::document::ReceiptDocument;
use crate::error::SubmitError;
use crate::printer::PrinterProfile;
use crate::raster::Threshold;
use crate::template::TemplateConfig;

mod pipeline;
mod service;
mod tracker;

pub use service::{PrintService, ServiceConfig};
pub use tracker::JobHandle;

/// Why a job failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureReason {
    #[error("render failed: {0}")]
    Render(String),

    #[error("encode failed: {0}")]
    Encode(String),

    /// No endpoint on the request and no default configured
    #[error("no printer selected")]
    NoPrinterSelected,

    #[error("unknown printer '{0}'")]
    UnknownEndpoint(String),

    /// The session could not be connected within the device wait
    #[error("printer unavailable: {0}")]
    DeviceUnavailable(String),

    /// The write failed. `link_lost` is set when the link died mid-stream.
    #[error("transport failed: {message}")]
    Transport { message: String, link_lost: bool },

    #[error("no acknowledgment within {0:?}")]
    AckTimeout(Duration),

    #[error("cancelled")]
    Cancelled,
}

impl FailureReason {
    /// Whether printing the same request again may succeed without changes
    /// to the request itself.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FailureReason::DeviceUnavailable(_)
                | FailureReason::Transport { .. }
                | FailureReason::AckTimeout(_)
        )
    }

    /// Whether some or all of the stream may have reached the printer.
    /// Check the paper before retrying such a job.
    pub fn may_have_printed(&self) -> bool {
        match self {
            FailureReason::Transport { link_lost, .. } => *link_lost,
            FailureReason::AckTimeout(_) => true,
            _ => false,
        }
    }
}

impl From<SubmitError> for FailureReason {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::AckTimeout(d) => FailureReason::AckTimeout(d),
            SubmitError::Transport(e) => FailureReason::Transport {
                link_lost: e.is_link_loss(),
                message: e.to_string(),
            },
            SubmitError::Connection(e) => FailureReason::DeviceUnavailable(e.to_string()),
        }
    }
}

/// Where a job is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Rendering,
    Encoding,
    Submitting,
    Succeeded,
    Failed(FailureReason),
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed(_))
    }

    /// States in which cancellation still prevents any output.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, JobState::Pending | JobState::Rendering | JobState::Encoding)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Pending => f.write_str("pending"),
            JobState::Rendering => f.write_str("rendering"),
            JobState::Encoding => f.write_str("encoding"),
            JobState::Submitting => f.write_str("submitting"),
            JobState::Succeeded => f.write_str("succeeded"),
            JobState::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// How the document reaches paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrintMode {
    /// Printer-resident fonts
    #[default]
    Text,
    /// Painted and rasterized, printed as an image
    Raster { threshold: Threshold },
}

/// One explicit print action.
#[derive(Debug, Clone)]
pub struct PrintRequest {
    pub document: ReceiptDocument,
    pub template: TemplateConfig,
    pub profile: PrinterProfile,
    /// `None` uses the service's default endpoint
    pub endpoint_id: Option<String>,
    pub mode: PrintMode,
}

impl PrintRequest {
    /// Text-mode request with the default template and profile.
    pub fn new(document: ReceiptDocument) -> Self {
        Self {
            document,
            template: TemplateConfig::default(),
            profile: PrinterProfile::default(),
            endpoint_id: None,
            mode: PrintMode::Text,
        }
    }

    pub fn with_template(mut self, template: TemplateConfig) -> Self {
        self.template = template;
        self
    }

    pub fn with_profile(mut self, profile: PrinterProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn to_endpoint(mut self, endpoint_id: impl Into<String>) -> Self {
        self.endpoint_id = Some(endpoint_id.into());
        self
    }

    pub fn with_mode(mut self, mode: PrintMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Final report of a job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobOutcome {
    pub id: Uuid,
    pub endpoint_id: Option<String>,
    /// Always terminal
    pub state: JobState,
    /// Size of the encoded stream, 0 if encoding never finished
    pub bytes: usize,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.state == JobState::Succeeded
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match &self.state {
            JobState::Failed(reason) => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConnectionError, TransportError};

    #[test]
    fn test_retry_classification() {
        assert!(FailureReason::AckTimeout(Duration::from_secs(1)).is_retryable());
        assert!(FailureReason::DeviceUnavailable("offline".into()).is_retryable());
        assert!(!FailureReason::Render("bad".into()).is_retryable());
        assert!(!FailureReason::NoPrinterSelected.is_retryable());
        assert!(!FailureReason::Cancelled.is_retryable());
    }

    #[test]
    fn test_submit_error_mapping() {
        let lost: FailureReason = SubmitError::Transport(TransportError::Lost("eof".into())).into();
        assert!(lost.may_have_printed());
        assert!(lost.is_retryable());

        let refused: FailureReason =
            SubmitError::Transport(TransportError::Refused("busy".into())).into();
        assert!(!refused.may_have_printed());

        let offline: FailureReason = SubmitError::Connection(ConnectionError::NotConnected).into();
        assert!(matches!(offline, FailureReason::DeviceUnavailable(_)));
        assert!(!offline.may_have_printed());

        let timeout: FailureReason = SubmitError::AckTimeout(Duration::from_secs(5)).into();
        assert_eq!(timeout, FailureReason::AckTimeout(Duration::from_secs(5)));
        assert!(timeout.may_have_printed());
    }

    #[test]
    fn test_state_classification() {
        assert!(JobState::Encoding.is_cancellable());
        assert!(!JobState::Submitting.is_cancellable());
        assert!(!JobState::Submitting.is_terminal());
        assert!(JobState::Failed(FailureReason::Cancelled).is_terminal());
        assert_eq!(
            JobState::Failed(FailureReason::NoPrinterSelected).to_string(),
            "failed: no printer selected"
        );
    }
}
