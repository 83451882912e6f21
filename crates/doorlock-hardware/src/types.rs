//! Common types shared across hardware device implementations.
//!
//! This module defines types used by multiple device traits, such as
//! device information and raw scan tokens.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Generic device information.
///
/// Contains metadata about a hardware device such as its name (usually the
/// device node or pin set it drives) and model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Device name (e.g., "/dev/ttyAMA0", "Mock Reader").
    pub name: String,

    /// Device model identifier.
    pub model: String,
}

impl DeviceInfo {
    /// Create a new DeviceInfo.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.model)
    }
}

/// One raw token as emitted by the card reader.
///
/// The bytes are exactly what arrived on the wire for one line, terminator
/// included. No decoding or validation has happened yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawScan {
    /// Raw line bytes.
    pub bytes: Vec<u8>,

    /// Monotonic instant the line was completed. Debouncing is measured
    /// from here, so tokens queued while the door is held open keep their
    /// arrival time.
    pub received_at: Instant,
}

impl RawScan {
    /// Create a raw scan stamped with the current instant.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            received_at: Instant::now(),
        }
    }
}
