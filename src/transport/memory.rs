//! # Virtual Spooler
//!
//! An in-process spooler that keeps every submitted stream in memory.
//! Used for tests, dry runs and the CLI `--dry-run` path. Its behavior
//! can be scripted: slow or hanging connects, refused connects, slow or
//! hanging writes, and dropped links.
//!
//! ```
//! use recibo::transport::{Spooler, VirtualSpooler};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let spooler = VirtualSpooler::with_endpoints(&["front", "kitchen"]);
//! let link = spooler.open().await.unwrap();
//! link.submit("kitchen", b"\x1b@hello").await.unwrap();
//! assert_eq!(spooler.received("kitchen"), vec![b"\x1b@hello".to_vec()]);
//! # }
//! ```

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Spooler, SpoolerLink};
use crate::error::TransportError;
use crate::printer::{Capabilities, PrinterEndpoint};

/// How a scripted operation behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Behavior {
    /// Complete immediately
    #[default]
    Ready,
    /// Complete after a delay
    Delay(Duration),
    /// Never complete
    Hang,
    /// Fail immediately
    Fail,
}

impl Behavior {
    async fn apply(self) -> bool {
        match self {
            Behavior::Ready => true,
            Behavior::Delay(d) => {
                tokio::time::sleep(d).await;
                true
            }
            Behavior::Hang => std::future::pending().await,
            Behavior::Fail => false,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    endpoints: Vec<PrinterEndpoint>,
    connect: Behavior,
    submit: Behavior,
    /// Submits that drop the link instead of completing
    drops_pending: usize,
    /// Bumped whenever links are dropped; older links are dead
    generation: u64,
    opens: usize,
    received: Vec<(String, Vec<u8>)>,
}

/// In-memory spooler. Clones share state, so a test can keep one handle
/// while the service owns another.
#[derive(Debug, Clone, Default)]
pub struct VirtualSpooler {
    state: Arc<Mutex<State>>,
}

impl VirtualSpooler {
    pub fn new(endpoints: Vec<PrinterEndpoint>) -> Self {
        let spooler = Self::default();
        spooler.lock().endpoints = endpoints;
        spooler
    }

    /// Raster-capable 80mm endpoints with the given ids.
    pub fn with_endpoints(ids: &[&str]) -> Self {
        Self::new(
            ids.iter()
                .map(|id| PrinterEndpoint {
                    id: id.to_string(),
                    display_name: format!("Virtual {}", id),
                    capabilities: Capabilities {
                        max_width: 576,
                        supports_raster: true,
                        supports_cut: true,
                    },
                })
                .collect(),
        )
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // State stays consistent even if a test panicked mid-update
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_connect(&self, behavior: Behavior) {
        self.lock().connect = behavior;
    }

    pub fn set_submit(&self, behavior: Behavior) {
        self.lock().submit = behavior;
    }

    /// The next `n` submits lose the link instead of completing.
    pub fn drop_next_submits(&self, n: usize) {
        self.lock().drops_pending = n;
    }

    /// Kill every open link, as if the spooler restarted.
    pub fn drop_links(&self) {
        self.lock().generation += 1;
    }

    /// Number of successful `open` calls.
    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    /// Streams accepted for one endpoint, in arrival order.
    pub fn received(&self, endpoint_id: &str) -> Vec<Vec<u8>> {
        self.lock()
            .received
            .iter()
            .filter(|(id, _)| id == endpoint_id)
            .map(|(_, data)| data.clone())
            .collect()
    }

    /// Every accepted stream with its endpoint id, in arrival order.
    pub fn log(&self) -> Vec<(String, Vec<u8>)> {
        self.lock().received.clone()
    }
}

#[async_trait]
impl Spooler for VirtualSpooler {
    async fn open(&self) -> Result<Box<dyn SpoolerLink>, TransportError> {
        let behavior = self.lock().connect;
        if !behavior.apply().await {
            return Err(TransportError::Refused("virtual spooler offline".into()));
        }
        let generation = {
            let mut state = self.lock();
            state.opens += 1;
            state.generation
        };
        debug!(generation, "Virtual link opened");
        Ok(Box::new(VirtualLink {
            spooler: self.clone(),
            generation,
        }))
    }

    fn describe(&self) -> String {
        "virtual://".into()
    }
}

struct VirtualLink {
    spooler: VirtualSpooler,
    generation: u64,
}

impl VirtualLink {
    fn check_alive(&self) -> Result<(), TransportError> {
        if self.spooler.lock().generation != self.generation {
            return Err(TransportError::Lost("virtual link dropped".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl SpoolerLink for VirtualLink {
    async fn endpoints(&self) -> Result<Vec<PrinterEndpoint>, TransportError> {
        self.check_alive()?;
        Ok(self.spooler.lock().endpoints.clone())
    }

    async fn submit(&self, endpoint_id: &str, data: &[u8]) -> Result<(), TransportError> {
        self.check_alive()?;
        let behavior = {
            let mut state = self.spooler.lock();
            if !state.endpoints.iter().any(|e| e.id == endpoint_id) {
                return Err(TransportError::Refused(format!("no endpoint '{}'", endpoint_id)));
            }
            if state.drops_pending > 0 {
                state.drops_pending -= 1;
                state.generation += 1;
                return Err(TransportError::Lost("virtual link dropped".into()));
            }
            state.submit
        };

        if !behavior.apply().await {
            return Err(TransportError::Refused("virtual spooler rejected the stream".into()));
        }
        self.check_alive()?;
        self.spooler
            .lock()
            .received
            .push((endpoint_id.to_string(), data.to_vec()));
        Ok(())
    }

    async fn close(&self) {}
}
