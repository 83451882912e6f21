//! Linux hardware watchdog device.
//!
//! Any write to `/dev/watchdog` resets the hardware timer. If the process
//! stops writing for longer than the timer's threshold, the board reboots.
//! The device is kept open for the lifetime of the process; closing it
//! without the magic character leaves the timer armed.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::{HardwareError, Result, traits::Watchdog, types::DeviceInfo};

/// Watchdog backed by a character device.
#[derive(Debug)]
pub struct DeviceWatchdog {
    path: PathBuf,
    device: File,
}

impl DeviceWatchdog {
    /// Open the watchdog device for writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the device cannot be opened.
    pub fn open(path: &Path) -> Result<Self> {
        let device = OpenOptions::new().write(true).open(path).map_err(|e| {
            HardwareError::initialization_failed(format!("{}: {e}", path.display()))
        })?;

        info!(device = %path.display(), "Watchdog opened");

        Ok(Self {
            path: path.to_path_buf(),
            device,
        })
    }
}

impl Watchdog for DeviceWatchdog {
    fn kick(&mut self) -> Result<()> {
        self.device
            .write_all(b"1")
            .and_then(|()| self.device.flush())
            .map_err(|e| {
                HardwareError::communication(format!("{}: {e}", self.path.display()))
            })
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(self.path.display().to_string(), "watchdog")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kick_writes_to_device() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("watchdog");
        std::fs::write(&path, "").unwrap();

        let mut watchdog = DeviceWatchdog::open(&path).unwrap();
        watchdog.kick().unwrap();
        watchdog.kick().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "11");
    }

    #[test]
    fn test_open_missing_device_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = DeviceWatchdog::open(&dir.path().join("missing"));
        assert!(matches!(
            result,
            Err(HardwareError::InitializationFailed { .. })
        ));
    }
}
