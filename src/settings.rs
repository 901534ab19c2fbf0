//! # CLI Settings
//!
//! Optional JSON file passed with `--config`. Every field has a default,
//! so `{}` is a valid settings file.
//!
//! ```json
//! {
//!   "profile": "escpos-80",
//!   "transport": { "kind": "tcp", "addr": "192.168.1.50:9100" },
//!   "template": { "currency": "EUR", "show_qr": false },
//!   "ack_timeout_ms": 15000
//! }
//! ```

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReciboError;
use crate::job::ServiceConfig;
use crate::printer::PrinterProfile;
use crate::session::{Backoff, SessionConfig};
use crate::template::TemplateConfig;
use crate::transport::device::DEFAULT_DEVICE;
use crate::transport::{DeviceSpooler, NetworkSpooler, Spooler, VirtualSpooler};

/// Where print streams go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransportSettings {
    /// Raw TCP, `host` or `host:port`
    Tcp { addr: String },
    /// Serial or RFCOMM device file
    Device { path: String },
    /// Keep streams in memory (dry run)
    Virtual,
}

impl Default for TransportSettings {
    fn default() -> Self {
        TransportSettings::Device {
            path: DEFAULT_DEVICE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Profile key or `escpos:WIDTH`, see [`PrinterProfile::parse`]
    pub profile: String,
    pub copies: u16,
    pub template: TemplateConfig,
    pub transport: TransportSettings,
    /// Endpoint for print requests that name none
    pub default_endpoint: Option<String>,
    pub connect_timeout_ms: u64,
    pub ack_timeout_ms: u64,
    pub device_wait_ms: u64,
    /// Print raster images instead of printer fonts
    pub raster: bool,
    pub dither: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            profile: "tsp650ii".into(),
            copies: 1,
            template: TemplateConfig::default(),
            transport: TransportSettings::default(),
            default_endpoint: None,
            connect_timeout_ms: session.connect_timeout.as_millis() as u64,
            ack_timeout_ms: session.ack_timeout.as_millis() as u64,
            device_wait_ms: ServiceConfig::default().device_wait.as_millis() as u64,
            raster: false,
            dither: false,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ReciboError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ReciboError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ReciboError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Resolve the profile name and apply `copies`.
    pub fn profile(&self) -> Result<PrinterProfile, ReciboError> {
        let profile = PrinterProfile::parse(&self.profile).map_err(ReciboError::Config)?;
        Ok(profile.with_copies(self.copies))
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            session: SessionConfig {
                connect_timeout: Duration::from_millis(self.connect_timeout_ms),
                ack_timeout: Duration::from_millis(self.ack_timeout_ms),
                retry: Backoff::default(),
            },
            default_endpoint: self.default_endpoint.clone(),
            device_wait: Duration::from_millis(self.device_wait_ms),
        }
    }

    /// Build the configured spooler. Single-printer transports advertise
    /// the capabilities of `profile`.
    pub fn spooler(&self, profile: &PrinterProfile) -> Result<Arc<dyn Spooler>, ReciboError> {
        let caps = profile.capabilities;
        Ok(match &self.transport {
            TransportSettings::Tcp { addr } => Arc::new(NetworkSpooler::from_addr(addr, caps)?),
            TransportSettings::Device { path } => Arc::new(DeviceSpooler::new(path, caps)),
            TransportSettings::Virtual => Arc::new(VirtualSpooler::with_endpoints(&["virtual"])),
        })
    }
}
