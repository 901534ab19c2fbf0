//! # Device File Transport (serial, Bluetooth RFCOMM)
//!
//! Printers paired over Bluetooth SPP or attached to a serial port show up
//! as character devices. Bind a Bluetooth printer first:
//!
//! ```bash
//! $ sudo rfcomm bind 0 00:11:62:XX:XX:XX
//! # This creates /dev/rfcomm0
//! ```
//!
//! ## TTY Configuration
//!
//! The device is opened in raw mode so binary data passes through
//! unmodified:
//!
//! - **No input processing**: IGNBRK, BRKINT, PARMRK, ISTRIP, ... cleared
//! - **No software flow control**: IXON/IXOFF/IXANY cleared, since 0x11 and
//!   0x13 appear in raster data
//! - **No output processing**: OPOST cleared (no CR/LF translation)
//! - **8-bit characters**: CS8, no parity
//! - **Non-canonical, no echo**: ICANON, ECHO, ECHONL, ISIG, IEXTEN cleared
//!
//! ## Chunked Writes
//!
//! Streams are written in 4096-byte chunks with a 2ms pause between them
//! so the Bluetooth buffer does not overflow. Writes run on the blocking
//! pool.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use super::{Spooler, SpoolerLink};
use crate::error::TransportError;
use crate::printer::{Capabilities, PrinterEndpoint};

/// Default RFCOMM device path
pub const DEFAULT_DEVICE: &str = "/dev/rfcomm0";

const CHUNK_SIZE: usize = 4096;

const CHUNK_DELAY: Duration = Duration::from_millis(2);

/// A printer behind a device file.
#[derive(Debug, Clone)]
pub struct DeviceSpooler {
    path: PathBuf,
    capabilities: Capabilities,
    chunk_size: usize,
    chunk_delay: Duration,
}

impl DeviceSpooler {
    pub fn new(path: impl AsRef<Path>, capabilities: Capabilities) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            capabilities,
            chunk_size: CHUNK_SIZE,
            chunk_delay: CHUNK_DELAY,
        }
    }

    /// Larger chunks are faster but may overflow the device buffer.
    pub fn with_chunking(mut self, chunk_size: usize, chunk_delay: Duration) -> Self {
        self.chunk_size = chunk_size.max(1);
        self.chunk_delay = chunk_delay;
        self
    }

    fn endpoint(&self) -> PrinterEndpoint {
        let id = self.path.display().to_string();
        PrinterEndpoint {
            display_name: format!("Printer on {}", id),
            id,
            capabilities: self.capabilities,
        }
    }
}

#[async_trait]
impl Spooler for DeviceSpooler {
    #[instrument(skip(self), fields(device = %self.path.display()))]
    async fn open(&self) -> Result<Box<dyn SpoolerLink>, TransportError> {
        let path = self.path.clone();
        let file = tokio::task::spawn_blocking(move || open_raw(&path))
            .await
            .map_err(|e| TransportError::Lost(format!("open task failed: {}", e)))??;
        info!("Device opened");

        Ok(Box::new(DeviceLink {
            file: Mutex::new(Some(file)),
            endpoint: self.endpoint(),
            chunk_size: self.chunk_size,
            chunk_delay: self.chunk_delay,
        }))
    }

    fn describe(&self) -> String {
        format!("device://{}", self.path.display())
    }
}

fn open_raw(path: &Path) -> Result<File, TransportError> {
    let file = OpenOptions::new().write(true).open(path).map_err(|e| {
        TransportError::Config(format!("Failed to open {}: {}", path.display(), e))
    })?;
    configure_tty_raw(&file)?;
    Ok(file)
}

/// An open device file. Streams are written one at a time.
struct DeviceLink {
    file: Mutex<Option<File>>,
    endpoint: PrinterEndpoint,
    chunk_size: usize,
    chunk_delay: Duration,
}

#[async_trait]
impl SpoolerLink for DeviceLink {
    async fn endpoints(&self) -> Result<Vec<PrinterEndpoint>, TransportError> {
        if self.file.lock().await.is_none() {
            return Err(TransportError::Lost("device closed".into()));
        }
        Ok(vec![self.endpoint.clone()])
    }

    async fn submit(&self, endpoint_id: &str, data: &[u8]) -> Result<(), TransportError> {
        if endpoint_id != self.endpoint.id {
            return Err(TransportError::Refused(format!("no endpoint '{}'", endpoint_id)));
        }
        let mut slot = self.file.lock().await;
        let mut file = slot
            .take()
            .ok_or_else(|| TransportError::Lost("device closed".into()))?;

        let data = data.to_vec();
        let (chunk_size, chunk_delay) = (self.chunk_size, self.chunk_delay);
        let (file, result) = tokio::task::spawn_blocking(move || {
            let result = write_chunked(&mut file, &data, chunk_size, chunk_delay);
            (file, result)
        })
        .await
        .map_err(|e| TransportError::Lost(format!("write task failed: {}", e)))?;

        match result {
            Ok(()) => {
                *slot = Some(file);
                Ok(())
            }
            Err(e) => {
                let err = TransportError::Io(e);
                if !err.is_link_loss() {
                    *slot = Some(file);
                }
                Err(err)
            }
        }
    }

    async fn close(&self) {
        *self.file.lock().await = None;
    }
}

/// Small writes go out directly; large ones in chunks with a pause between.
fn write_chunked<W: Write>(
    out: &mut W,
    data: &[u8],
    chunk_size: usize,
    chunk_delay: Duration,
) -> io::Result<()> {
    if data.len() <= chunk_size {
        out.write_all(data)?;
    } else {
        for chunk in data.chunks(chunk_size) {
            out.write_all(chunk)?;
            if !chunk_delay.is_zero() {
                std::thread::sleep(chunk_delay);
            }
        }
    }
    debug!(bytes = data.len(), "Device write complete");
    out.flush()
}

/// Put the device in raw mode. Regular files (used for dry runs) are left
/// alone.
#[cfg(unix)]
fn configure_tty_raw(file: &File) -> Result<(), TransportError> {
    use std::mem::MaybeUninit;
    use std::os::unix::io::AsRawFd;

    let fd = file.as_raw_fd();
    if unsafe { libc::isatty(fd) } != 1 {
        return Ok(());
    }

    let mut termios = MaybeUninit::uninit();
    if unsafe { libc::tcgetattr(fd, termios.as_mut_ptr()) } != 0 {
        return Err(TransportError::Config(format!(
            "tcgetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    let mut termios = unsafe { termios.assume_init() };

    termios.c_iflag &= !(libc::IGNBRK
        | libc::BRKINT
        | libc::PARMRK
        | libc::ISTRIP
        | libc::INLCR
        | libc::IGNCR
        | libc::ICRNL
        | libc::IXON
        | libc::IXOFF
        | libc::IXANY);
    termios.c_oflag &= !libc::OPOST;
    termios.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::ISIG | libc::IEXTEN);
    termios.c_cflag &= !(libc::CSIZE | libc::PARENB);
    termios.c_cflag |= libc::CS8;

    if unsafe { libc::tcsetattr(fd, libc::TCSANOW, &termios) } != 0 {
        return Err(TransportError::Config(format!(
            "tcsetattr failed: {}",
            io::Error::last_os_error()
        )));
    }
    Ok(())
}

#[cfg(not(unix))]
fn configure_tty_raw(_file: &File) -> Result<(), TransportError> {
    Ok(())
}
