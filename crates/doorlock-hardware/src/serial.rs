//! Serial card reader.
//!
//! The reader sends one newline-terminated token per scan. Reading a serial
//! port is blocking, so a dedicated OS thread (the "pump") owns the port,
//! splits the byte stream into lines and forwards each completed line over a
//! bounded channel. The async side only ever waits on that channel.
//!
//! ```text
//! /dev/ttyAMA0 ──> pump thread ──(mpsc, 32)──> SerialCardReader::read_scan
//!                  read_until('\n')
//! ```
//!
//! The port is opened with a short read timeout so the pump notices when the
//! receiving side goes away. A line split across two timeouts is kept and
//! completed by the following bytes.

use std::io::{BufRead, BufReader, ErrorKind, Read};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};

use crate::{
    HardwareError, Result,
    traits::CardReader,
    types::{DeviceInfo, RawScan},
};

/// Capacity of the line channel between the pump thread and the reader.
const SCAN_BUFFER: usize = 32;

/// Longest line kept while waiting for a terminator. Longer input is noise.
const MAX_LINE_LENGTH: usize = 256;

/// Serial port settings for the card reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Serial device path.
    pub path: PathBuf,

    /// Baud rate.
    pub baud_rate: u32,

    /// Port-level read timeout used by the pump thread.
    pub poll_timeout: Duration,
}

/// Card reader attached to a serial port.
///
/// # Examples
///
/// ```no_run
/// use std::time::Duration;
/// use doorlock_hardware::serial::{SerialCardReader, SerialConfig};
/// use doorlock_hardware::traits::CardReader;
///
/// # async fn example() -> doorlock_hardware::Result<()> {
/// let config = SerialConfig {
///     path: "/dev/ttyAMA0".into(),
///     baud_rate: 2400,
///     poll_timeout: Duration::from_millis(100),
/// };
///
/// let mut reader = SerialCardReader::open(&config)?;
/// if let Some(scan) = reader.read_scan(Duration::from_millis(100)).await? {
///     println!("{:?}", scan.bytes);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct SerialCardReader {
    scans: mpsc::Receiver<RawScan>,
    info: DeviceInfo,
}

impl SerialCardReader {
    /// Open the serial port and start the pump thread.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be opened or the pump thread
    /// cannot be spawned.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        let path = config.path.to_string_lossy().into_owned();

        let port = serialport::new(path.as_str(), config.baud_rate)
            .timeout(config.poll_timeout)
            .open()?;

        info!(port = %path, baud_rate = config.baud_rate, "Serial initialized");

        Self::from_source(
            port,
            DeviceInfo::new(path, format!("serial {} baud", config.baud_rate)),
        )
    }

    /// Start a reader over any blocking byte source.
    ///
    /// The source is moved into the pump thread. Read timeouts
    /// (`TimedOut`/`WouldBlock`/`Interrupted`) are retried; end of stream or
    /// any other error stops the pump, after which [`read_scan`] reports the
    /// reader as disconnected.
    ///
    /// [`read_scan`]: CardReader::read_scan
    ///
    /// # Errors
    ///
    /// Returns an error if the pump thread cannot be spawned.
    pub fn from_source<S>(source: S, info: DeviceInfo) -> Result<Self>
    where
        S: Read + Send + 'static,
    {
        let (tx, scans) = mpsc::channel(SCAN_BUFFER);
        let name = info.name.clone();

        thread::Builder::new()
            .name("card-reader-pump".to_string())
            .spawn(move || pump_lines(source, tx, &name))?;

        Ok(Self { scans, info })
    }
}

impl CardReader for SerialCardReader {
    async fn read_scan(&mut self, timeout: Duration) -> Result<Option<RawScan>> {
        match tokio::time::timeout(timeout, self.scans.recv()).await {
            Ok(Some(scan)) => Ok(Some(scan)),
            Ok(None) => Err(HardwareError::disconnected(self.info.name.clone())),
            Err(_) => Ok(None),
        }
    }

    fn info(&self) -> DeviceInfo {
        self.info.clone()
    }
}

/// Split a blocking byte stream into lines and forward them.
fn pump_lines<S: Read>(source: S, tx: mpsc::Sender<RawScan>, name: &str) {
    let mut reader = BufReader::new(source);
    let mut line = Vec::new();

    loop {
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => {
                warn!(port = %name, "Serial stream closed");
                break;
            }
            Ok(_) if line.ends_with(b"\n") => {
                let scan = RawScan::new(std::mem::take(&mut line));
                trace!(port = %name, bytes = scan.bytes.len(), "Line received");

                if tx.blocking_send(scan).is_err() {
                    debug!(port = %name, "Card reader dropped, stopping pump");
                    break;
                }
            }
            // End of stream in the middle of a line; the next read reports it.
            Ok(_) => {}
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::TimedOut | ErrorKind::WouldBlock | ErrorKind::Interrupted
                ) =>
            {
                if tx.is_closed() {
                    debug!(port = %name, "Card reader dropped, stopping pump");
                    break;
                }
            }
            Err(e) => {
                error!(port = %name, error = %e, "Serial read failed");
                break;
            }
        }

        if line.len() > MAX_LINE_LENGTH {
            trace!(port = %name, bytes = line.len(), "Discarding unterminated noise");
            line.clear();
        }
    }
}
