//! Lock outputs on the Linux sysfs GPIO interface.
//!
//! Two output lines make up the lock: the door relay and the reader's
//! "enabled" indicator. Both are exported and driven low when the lock is
//! opened, and always move together afterwards.
//!
//! ```text
//! /sys/class/gpio/
//! ├── export
//! ├── gpio17/{direction,value}   relay
//! └── gpio27/{direction,value}   reader enable
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::{HardwareError, Result, traits::LockOutput, types::DeviceInfo};

/// Pin assignment for the lock outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockPins {
    /// Root of the sysfs GPIO tree (normally `/sys/class/gpio`).
    pub gpio_root: PathBuf,

    /// Pin driving the door relay.
    pub relay: u32,

    /// Pin driving the reader's "enabled" indicator.
    pub reader_enable: u32,
}

impl LockPins {
    /// Drive both lines low without owning them.
    ///
    /// Last-resort release for paths that cannot reach the [`SysfsLock`],
    /// such as a panic hook. Errors are logged and otherwise ignored.
    pub fn force_release(&self) {
        for pin in [self.relay, self.reader_enable] {
            let value = pin_dir(&self.gpio_root, pin).join("value");
            if let Err(e) = fs::write(&value, "0") {
                warn!(pin, error = %e, "Failed to force GPIO line low");
            }
        }
    }
}

/// A single exported GPIO output line.
#[derive(Debug)]
pub struct GpioLine {
    pin: u32,
    value: PathBuf,
}

impl GpioLine {
    /// Export a pin (if needed), configure it as output and drive it low.
    ///
    /// Writing `low` to `direction` sets the direction and the initial level
    /// in one step, so the line never glitches high.
    ///
    /// # Errors
    ///
    /// Returns an error if any sysfs write fails.
    pub fn export(gpio_root: &Path, pin: u32) -> Result<Self> {
        let dir = pin_dir(gpio_root, pin);

        if !dir.exists() {
            debug!(pin, "Exporting GPIO pin");
            fs::write(gpio_root.join("export"), pin.to_string())
                .map_err(|e| HardwareError::gpio(pin, e))?;
        }

        fs::write(dir.join("direction"), "low").map_err(|e| HardwareError::gpio(pin, e))?;

        Ok(Self {
            pin,
            value: dir.join("value"),
        })
    }

    /// Drive the line high or low.
    ///
    /// # Errors
    ///
    /// Returns an error if the value write fails.
    pub fn set(&self, high: bool) -> Result<()> {
        fs::write(&self.value, if high { "1" } else { "0" })
            .map_err(|e| HardwareError::gpio(self.pin, e))
    }

    /// Get the pin number.
    pub fn pin(&self) -> u32 {
        self.pin
    }
}

/// Relay and reader-enable lines driven through sysfs.
#[derive(Debug)]
pub struct SysfsLock {
    relay: GpioLine,
    reader_enable: GpioLine,
}

impl SysfsLock {
    /// Export both lines and drive them low.
    ///
    /// # Errors
    ///
    /// Returns an error if the pins are identical or a line cannot be set up.
    pub fn open(pins: &LockPins) -> Result<Self> {
        if pins.relay == pins.reader_enable {
            return Err(HardwareError::initialization_failed(format!(
                "relay and reader enable share pin {}",
                pins.relay
            )));
        }

        let relay = GpioLine::export(&pins.gpio_root, pins.relay)?;
        let reader_enable = GpioLine::export(&pins.gpio_root, pins.reader_enable)?;

        info!(
            relay = pins.relay,
            reader_enable = pins.reader_enable,
            "GPIO initialized"
        );

        Ok(Self {
            relay,
            reader_enable,
        })
    }
}

impl LockOutput for SysfsLock {
    fn set_engaged(&mut self, engaged: bool) -> Result<()> {
        let relay = self.relay.set(engaged);
        let reader_enable = self.reader_enable.set(engaged);
        relay.and(reader_enable)
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new(
            format!("gpio{}+gpio{}", self.relay.pin(), self.reader_enable.pin()),
            "sysfs",
        )
    }
}

fn pin_dir(gpio_root: &Path, pin: u32) -> PathBuf {
    gpio_root.join(format!("gpio{pin}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Build a fake sysfs tree with the given pins already exported.
    fn fake_sysfs(pins: &[u32]) -> TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("export"), "").unwrap();
        for pin in pins {
            let dir = pin_dir(root.path(), *pin);
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("direction"), "in").unwrap();
            fs::write(dir.join("value"), "1").unwrap();
        }
        root
    }

    fn read(root: &Path, pin: u32, file: &str) -> String {
        fs::read_to_string(pin_dir(root, pin).join(file)).unwrap()
    }

    fn pins(root: &Path) -> LockPins {
        LockPins {
            gpio_root: root.to_path_buf(),
            relay: 17,
            reader_enable: 27,
        }
    }

    #[test]
    fn test_open_configures_outputs_low() {
        let root = fake_sysfs(&[17, 27]);
        let _lock = SysfsLock::open(&pins(root.path())).unwrap();

        assert_eq!(read(root.path(), 17, "direction"), "low");
        assert_eq!(read(root.path(), 27, "direction"), "low");
    }

    #[test]
    fn test_engage_and_release_move_both_lines() {
        let root = fake_sysfs(&[17, 27]);
        let mut lock = SysfsLock::open(&pins(root.path())).unwrap();

        lock.set_engaged(true).unwrap();
        assert_eq!(read(root.path(), 17, "value"), "1");
        assert_eq!(read(root.path(), 27, "value"), "1");

        lock.set_engaged(false).unwrap();
        assert_eq!(read(root.path(), 17, "value"), "0");
        assert_eq!(read(root.path(), 27, "value"), "0");
    }

    #[test]
    fn test_unexported_pin_is_exported() {
        let root = fake_sysfs(&[]);

        // The fake tree does not create gpio17/ on export, so the
        // direction write fails, but the export request must be issued.
        let result = GpioLine::export(root.path(), 17);

        assert!(matches!(result, Err(HardwareError::Gpio { pin: 17, .. })));
        assert_eq!(fs::read_to_string(root.path().join("export")).unwrap(), "17");
    }

    #[test]
    fn test_identical_pins_rejected() {
        let root = fake_sysfs(&[17]);
        let pins = LockPins {
            gpio_root: root.path().to_path_buf(),
            relay: 17,
            reader_enable: 17,
        };

        let result = SysfsLock::open(&pins);
        assert!(matches!(
            result,
            Err(HardwareError::InitializationFailed { .. })
        ));
    }

    #[test]
    fn test_release_drives_remaining_line_when_one_fails() {
        let root = fake_sysfs(&[17, 27]);
        let mut lock = SysfsLock::open(&pins(root.path())).unwrap();
        lock.set_engaged(true).unwrap();

        // Relay line vanishes
        fs::remove_dir_all(pin_dir(root.path(), 17)).unwrap();

        assert!(lock.set_engaged(false).is_err());
        assert_eq!(read(root.path(), 27, "value"), "0");
    }

    #[test]
    fn test_force_release() {
        let root = fake_sysfs(&[17, 27]);
        let mut lock = SysfsLock::open(&pins(root.path())).unwrap();
        lock.set_engaged(true).unwrap();

        pins(root.path()).force_release();

        assert_eq!(read(root.path(), 17, "value"), "0");
        assert_eq!(read(root.path(), 27, "value"), "0");
    }

    #[test]
    fn test_info() {
        let root = fake_sysfs(&[17, 27]);
        let lock = SysfsLock::open(&pins(root.path())).unwrap();
        assert_eq!(lock.info().name, "gpio17+gpio27");
    }
}
