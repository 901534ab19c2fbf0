//! # Network Transport (TCP 9100)
//!
//! Most thermal printers accept raw command streams on TCP port 9100.
//! The printer is the spooler: a link is one TCP connection and it
//! offers exactly one endpoint.

use std::net::SocketAddr;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use super::{Spooler, SpoolerLink};
use crate::error::TransportError;
use crate::printer::{Capabilities, PrinterEndpoint};

/// Default raw printing port
pub const DEFAULT_PORT: u16 = 9100;

/// A printer reachable over TCP.
#[derive(Debug, Clone)]
pub struct NetworkSpooler {
    addr: SocketAddr,
    capabilities: Capabilities,
}

impl NetworkSpooler {
    pub fn new(host: &str, port: u16, capabilities: Capabilities) -> Result<Self, TransportError> {
        Self::from_addr(&format!("{}:{}", host, port), capabilities)
    }

    /// Parse `host:port`. A bare host gets port 9100.
    pub fn from_addr(addr: &str, capabilities: Capabilities) -> Result<Self, TransportError> {
        let with_port = if addr.contains(':') {
            addr.to_string()
        } else {
            format!("{}:{}", addr, DEFAULT_PORT)
        };
        let addr: SocketAddr = with_port
            .parse()
            .map_err(|_| TransportError::Config(format!("Invalid address: {}", with_port)))?;
        Ok(Self { addr, capabilities })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    fn endpoint(&self) -> PrinterEndpoint {
        PrinterEndpoint {
            id: self.addr.to_string(),
            display_name: format!("Printer at {}", self.addr),
            capabilities: self.capabilities,
        }
    }
}

#[async_trait]
impl Spooler for NetworkSpooler {
    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn open(&self) -> Result<Box<dyn SpoolerLink>, TransportError> {
        let stream = TcpStream::connect(self.addr).await?;
        stream.set_nodelay(true)?;
        info!("Connected");
        Ok(Box::new(NetworkLink {
            stream: Mutex::new(Some(stream)),
            endpoint: self.endpoint(),
        }))
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }
}

/// One TCP connection. Streams are written one at a time.
struct NetworkLink {
    stream: Mutex<Option<TcpStream>>,
    endpoint: PrinterEndpoint,
}

#[async_trait]
impl SpoolerLink for NetworkLink {
    async fn endpoints(&self) -> Result<Vec<PrinterEndpoint>, TransportError> {
        if self.stream.lock().await.is_none() {
            return Err(TransportError::Lost("connection closed".into()));
        }
        Ok(vec![self.endpoint.clone()])
    }

    #[instrument(skip(self, data), fields(endpoint = %endpoint_id, data_len = data.len()))]
    async fn submit(&self, endpoint_id: &str, data: &[u8]) -> Result<(), TransportError> {
        if endpoint_id != self.endpoint.id {
            return Err(TransportError::Refused(format!("no endpoint '{}'", endpoint_id)));
        }
        let mut guard = self.stream.lock().await;
        let stream = guard
            .as_mut()
            .ok_or_else(|| TransportError::Lost("connection closed".into()))?;

        let result = async {
            stream.write_all(data).await?;
            stream.flush().await
        }
        .await;

        if let Err(e) = result {
            let err = TransportError::Io(e);
            if err.is_link_loss() {
                *guard = None;
            }
            return Err(err);
        }

        info!("Stream sent");
        Ok(())
    }

    async fn close(&self) {
        if let Some(mut stream) = self.stream.lock().await.take() {
            let _ = stream.shutdown().await;
        }
    }
}
