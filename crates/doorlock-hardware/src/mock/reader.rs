//! Mock card reader implementation for testing and development.
//!
//! This module provides a simulated card reader that can be controlled
//! programmatically for testing without requiring physical hardware.

use std::time::Duration;

use crate::{
    Result,
    traits::CardReader,
    types::{DeviceInfo, RawScan},
};
use tokio::sync::mpsc;

/// Mock card reader for testing and development.
///
/// Tokens presented through the paired [`MockCardReaderHandle`] come out of
/// [`read_scan`](CardReader::read_scan) in order. Dropping every handle
/// disconnects the reader.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use doorlock_hardware::mock::MockCardReader;
/// use doorlock_hardware::traits::CardReader;
///
/// #[tokio::main]
/// async fn main() -> doorlock_hardware::Result<()> {
///     let (mut reader, handle) = MockCardReader::new();
///
///     handle.present_card("1234567890").await?;
///
///     let scan = reader.read_scan(Duration::from_millis(100)).await?.unwrap();
///     assert_eq!(scan.bytes, b"1234567890\n");
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct MockCardReader {
    /// Channel receiver for scan events
    scan_rx: mpsc::Receiver<RawScan>,

    /// Device name
    name: String,
}

impl MockCardReader {
    /// Create a new mock card reader with the default name.
    ///
    /// Returns a tuple of (MockCardReader, MockCardReaderHandle) where the
    /// handle can be used to simulate scans.
    pub fn new() -> (Self, MockCardReaderHandle) {
        Self::with_name("Mock Card Reader".to_string())
    }

    /// Create a new mock card reader with a custom name.
    pub fn with_name(name: String) -> (Self, MockCardReaderHandle) {
        let (scan_tx, scan_rx) = mpsc::channel(32);

        let reader = Self {
            scan_rx,
            name: name.clone(),
        };

        let handle = MockCardReaderHandle { scan_tx, name };

        (reader, handle)
    }
}

impl CardReader for MockCardReader {
    async fn read_scan(&mut self, timeout: Duration) -> Result<Option<RawScan>> {
        match tokio::time::timeout(timeout, self.scan_rx.recv()).await {
            Ok(Some(scan)) => Ok(Some(scan)),
            Ok(None) => Err(crate::HardwareError::disconnected(self.name.clone())),
            Err(_) => Ok(None),
        }
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.name.clone(), "mock")
    }
}

/// Handle for controlling a mock card reader.
#[derive(Debug, Clone)]
pub struct MockCardReaderHandle {
    /// Channel sender for scan events
    scan_tx: mpsc::Sender<RawScan>,

    /// Device name
    name: String,
}

impl MockCardReaderHandle {
    /// Present a card, as the reader would report it (newline-terminated).
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn present_card(&self, card: &str) -> Result<()> {
        self.send_raw(format!("{card}\n").into_bytes()).await
    }

    /// Send raw bytes as one token, exactly as given.
    ///
    /// Useful for simulating line noise and undecodable input.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader has been dropped.
    pub async fn send_raw(&self, bytes: Vec<u8>) -> Result<()> {
        self.scan_tx
            .send(RawScan::new(bytes))
            .await
            .map_err(|_| crate::HardwareError::disconnected(self.name.clone()))
    }

    /// Get the device name.
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_reader_present_and_read() {
        let (mut reader, handle) = MockCardReader::new();

        tokio::spawn(async move {
            handle.present_card("1234567890").await.unwrap();
        });

        let scan = reader
            .read_scan(Duration::from_secs(1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(scan.bytes, b"1234567890\n");
    }

    #[tokio::test]
    async fn test_mock_reader_preserves_order() {
        let (mut reader, handle) = MockCardReader::new();

        handle.present_card("1111111111").await.unwrap();
        handle.send_raw(vec![0xff, 0xfe]).await.unwrap();

        let first = reader.read_scan(Duration::from_secs(1)).await.unwrap();
        let second = reader.read_scan(Duration::from_secs(1)).await.unwrap();

        assert_eq!(first.unwrap().bytes, b"1111111111\n");
        assert_eq!(second.unwrap().bytes, vec![0xff, 0xfe]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_reader_times_out_when_idle() {
        let (mut reader, _handle) = MockCardReader::new();

        let scan = reader.read_scan(Duration::from_millis(100)).await.unwrap();
        assert!(scan.is_none());
    }

    #[tokio::test]
    async fn test_mock_reader_disconnects_when_handles_dropped() {
        let (mut reader, handle) = MockCardReader::new();
        drop(handle);

        let result = reader.read_scan(Duration::from_millis(100)).await;
        assert!(matches!(
            result,
            Err(crate::HardwareError::Disconnected { .. })
        ));
    }

    #[tokio::test]
    async fn test_mock_reader_send_after_drop_fails() {
        let (reader, handle) = MockCardReader::with_name("Door Reader".to_string());
        assert_eq!(reader.info().name, "Door Reader");
        assert_eq!(handle.name(), "Door Reader");

        drop(reader);
        assert!(handle.present_card("1234567890").await.is_err());
    }
}
