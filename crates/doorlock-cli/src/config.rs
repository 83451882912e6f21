//! Configuration file for the `doorlock` binary.
//!
//! Every key is optional; a missing file section or key takes the default
//! shown below. Pins are sysfs GPIO numbers; check `/sys/class/gpio` for the
//! chip base, which is 512 on recent Raspberry Pi kernels. Only the API key has no usable default, and it may come from
//! the `DOOR_API_KEY` environment variable instead of the file.
//!
//! ```toml
//! [hardware]
//! serial_port = "/dev/ttyAMA0"
//! baud_rate = 2400
//! read_timeout_ms = 100
//! relay_pin = 17
//! reader_enable_pin = 27
//! gpio_root = "/sys/class/gpio"
//! watchdog_device = "/dev/watchdog"
//!
//! [access]
//! unlock_duration_ms = 4000
//! debounce_window_ms = 5000
//!
//! [authority]
//! base_url = "https://api.my.protospace.ca"
//! api_key = "..."
//! poll_interval_ms = 5000
//! request_timeout_ms = 5000
//! seen_timeout_ms = 2000
//!
//! [storage]
//! cards_file = "card_data.json"
//!
//! [liveness]
//! interval_ms = 1000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use doorlock_controller::{ReaderConfig, UpdaterConfig};
use doorlock_core::constants::{
    DEFAULT_AUTHORITY_URL, DEFAULT_BAUD_RATE, DEFAULT_CARDS_FILE, DEFAULT_DEBOUNCE_WINDOW_MS,
    DEFAULT_GPIO_ROOT, DEFAULT_LIVENESS_INTERVAL_MS, DEFAULT_POLL_INTERVAL_MS,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_READER_ENABLE_PIN, DEFAULT_RELAY_PIN,
    DEFAULT_REQUEST_TIMEOUT_MS, DEFAULT_SEEN_TIMEOUT_MS, DEFAULT_SERIAL_PORT,
    DEFAULT_UNLOCK_DURATION_MS, DEFAULT_WATCHDOG_DEVICE,
};
use doorlock_hardware::{LockPins, SerialConfig};
use doorlock_network::AuthorityConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error reading configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Validation error.
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// Complete controller configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DoorConfig {
    /// Serial reader, GPIO lines and watchdog.
    #[serde(default)]
    pub hardware: HardwareSection,

    /// Unlock and debounce timing.
    #[serde(default)]
    pub access: AccessSection,

    /// Remote authority endpoints and timing.
    #[serde(default)]
    pub authority: AuthoritySection,

    /// Local card directory file.
    #[serde(default)]
    pub storage: StorageSection,

    /// Watchdog heartbeat.
    #[serde(default)]
    pub liveness: LivenessSection,
}

impl DoorConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed or has unknown keys.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Serialize configuration to TOML. The API key is never included.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check the configuration for values the controller cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] describing the first problem.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let durations = [
            ("hardware.read_timeout_ms", self.hardware.read_timeout_ms),
            ("access.unlock_duration_ms", self.access.unlock_duration_ms),
            ("access.debounce_window_ms", self.access.debounce_window_ms),
            ("authority.poll_interval_ms", self.authority.poll_interval_ms),
            ("authority.request_timeout_ms", self.authority.request_timeout_ms),
            ("authority.seen_timeout_ms", self.authority.seen_timeout_ms),
            ("liveness.interval_ms", self.liveness.interval_ms),
        ];
        if let Some((key, _)) = durations.iter().find(|(_, ms)| *ms == 0) {
            return Err(invalid(format!("{key} must be greater than zero")));
        }

        if self.hardware.baud_rate == 0 {
            return Err(invalid("hardware.baud_rate must be greater than zero"));
        }
        if self.hardware.relay_pin == self.hardware.reader_enable_pin {
            return Err(invalid(format!(
                "hardware.relay_pin and hardware.reader_enable_pin are both {}",
                self.hardware.relay_pin
            )));
        }
        if self.authority.base_url.trim().is_empty() {
            return Err(invalid("authority.base_url must not be empty"));
        }
        if self.authority.api_key.trim().is_empty() {
            return Err(invalid(
                "authority.api_key is not set (use the config file, --api-key or DOOR_API_KEY)",
            ));
        }
        Ok(())
    }

    /// Serial reader settings.
    pub fn serial(&self) -> SerialConfig {
        SerialConfig {
            path: self.hardware.serial_port.clone(),
            baud_rate: self.hardware.baud_rate,
            poll_timeout: millis(self.hardware.read_timeout_ms),
        }
    }

    /// Lock output pin assignment.
    pub fn lock_pins(&self) -> LockPins {
        LockPins {
            gpio_root: self.hardware.gpio_root.clone(),
            relay: self.hardware.relay_pin,
            reader_enable: self.hardware.reader_enable_pin,
        }
    }

    /// Reader loop timing.
    pub fn reader(&self) -> ReaderConfig {
        ReaderConfig {
            read_timeout: millis(self.hardware.read_timeout_ms),
            unlock_duration: millis(self.access.unlock_duration_ms),
            debounce_window: millis(self.access.debounce_window_ms),
        }
    }

    /// Updater loop timing.
    pub fn updater(&self) -> UpdaterConfig {
        UpdaterConfig {
            poll_interval: millis(self.authority.poll_interval_ms),
        }
    }

    /// Remote authority client settings.
    pub fn authority(&self) -> AuthorityConfig {
        AuthorityConfig {
            base_url: self.authority.base_url.clone(),
            api_key: self.authority.api_key.clone(),
            request_timeout: millis(self.authority.request_timeout_ms),
            seen_timeout: millis(self.authority.seen_timeout_ms),
        }
    }

    /// Watchdog kick interval.
    pub fn liveness_interval(&self) -> Duration {
        millis(self.liveness.interval_ms)
    }
}

/// `[hardware]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HardwareSection {
    pub serial_port: PathBuf,
    pub baud_rate: u32,
    pub read_timeout_ms: u64,
    /// Sysfs GPIO number of the relay line. This is the kernel's global
    /// number, not the header's BCM number: on Raspberry Pi kernels 6.6 and
    /// later the bank starts at 512, so BCM 17 is `529`.
    pub relay_pin: u32,
    /// Sysfs GPIO number of the reader-enable line, numbered like
    /// `relay_pin` (BCM 27 is `539` on kernels 6.6 and later).
    pub reader_enable_pin: u32,
    pub gpio_root: PathBuf,
    pub watchdog_device: PathBuf,
}

impl Default for HardwareSection {
    fn default() -> Self {
        Self {
            serial_port: PathBuf::from(DEFAULT_SERIAL_PORT),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            relay_pin: DEFAULT_RELAY_PIN,
            reader_enable_pin: DEFAULT_READER_ENABLE_PIN,
            gpio_root: PathBuf::from(DEFAULT_GPIO_ROOT),
            watchdog_device: PathBuf::from(DEFAULT_WATCHDOG_DEVICE),
        }
    }
}

/// `[access]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AccessSection {
    pub unlock_duration_ms: u64,
    pub debounce_window_ms: u64,
}

impl Default for AccessSection {
    fn default() -> Self {
        Self {
            unlock_duration_ms: DEFAULT_UNLOCK_DURATION_MS,
            debounce_window_ms: DEFAULT_DEBOUNCE_WINDOW_MS,
        }
    }
}

/// `[authority]` section.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthoritySection {
    pub base_url: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub poll_interval_ms: u64,
    pub request_timeout_ms: u64,
    pub seen_timeout_ms: u64,
}

impl Default for AuthoritySection {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_AUTHORITY_URL.to_string(),
            api_key: String::new(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            request_timeout_ms: DEFAULT_REQUEST_TIMEOUT_MS,
            seen_timeout_ms: DEFAULT_SEEN_TIMEOUT_MS,
        }
    }
}

impl std::fmt::Debug for AuthoritySection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthoritySection")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .field("seen_timeout_ms", &self.seen_timeout_ms)
            .finish()
    }
}

/// `[storage]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageSection {
    pub cards_file: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            cards_file: PathBuf::from(DEFAULT_CARDS_FILE),
        }
    }
}

/// `[liveness]` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LivenessSection {
    pub interval_ms: u64,
}

impl Default for LivenessSection {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_LIVENESS_INTERVAL_MS,
        }
    }
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation(message.into())
}
