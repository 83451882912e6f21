//! Core constants for the door lock controller.
//!
//! This module defines the timing, hardware and remote-authority defaults used
//! throughout the workspace. Every value here can be overridden through the
//! `doorlock` configuration file, except [`CARD_ID_LENGTH`], which is fixed by
//! the card reader's output format.
//!
//! # Timing Overview
//!
//! ```text
//! Reader loop   ─┬─ read (≤100ms) ─┬─ read ─┬─ unlock (4s) ─┬─ read ─ ...
//!                │                 │        │               │
//! Updater loop   └── sleep 5s ── poll ── sleep 5s ── poll ──┘
//!
//! Liveness       ─ kick ─ 1s ─ kick ─ 1s ─ kick ─ ...
//! ```
//!
//! # Usage
//!
//! ```
//! use doorlock_core::constants::*;
//! use std::time::Duration;
//!
//! let hold = Duration::from_millis(DEFAULT_UNLOCK_DURATION_MS);
//! assert_eq!(hold.as_secs(), 4);
//! assert_eq!(CARD_ID_LENGTH, 10);
//! ```

// ============================================================================
// Card Format
// ============================================================================

/// Exact length of a card identifier, in characters.
///
/// The reader emits one identifier per line. Anything that does not trim to
/// exactly this many characters is treated as line noise and discarded.
///
/// # Examples
///
/// ```
/// use doorlock_core::constants::CARD_ID_LENGTH;
///
/// assert_eq!("1234567890".chars().count(), CARD_ID_LENGTH);
/// ```
pub const CARD_ID_LENGTH: usize = 10;

// ============================================================================
// Access Timing
// ============================================================================

/// How long the relay stays energized after an authorized scan (milliseconds).
///
/// # Value: 4000ms (4 seconds)
pub const DEFAULT_UNLOCK_DURATION_MS: u64 = 4000;

/// Window during which repeated scans of the same card are ignored (milliseconds).
///
/// Readers report a card continuously while it is held against them, so a
/// single tap usually produces several identical lines.
///
/// # Value: 5000ms (5 seconds)
pub const DEFAULT_DEBOUNCE_WINDOW_MS: u64 = 5000;

/// Upper bound on a single serial read wait (milliseconds).
///
/// Bounds how long the reader loop waits for a token before it goes back to
/// check for a new card directory.
///
/// # Value: 100ms
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

// ============================================================================
// Remote Authority
// ============================================================================

/// Default base URL of the remote authority API.
pub const DEFAULT_AUTHORITY_URL: &str = "https://api.my.protospace.ca";

/// Interval between change-marker polls (milliseconds).
///
/// This is also the only retry interval: failed polls and failed fetches are
/// retried on the next cycle, without backoff.
///
/// # Value: 5000ms (5 seconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 5000;

/// Timeout for status and directory requests (milliseconds).
///
/// # Value: 5000ms
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;

/// Timeout for the fire-and-forget "seen" notification (milliseconds).
///
/// # Value: 2000ms
pub const DEFAULT_SEEN_TIMEOUT_MS: u64 = 2000;

/// JSON field of the status response carrying the change marker.
pub const CHANGE_MARKER_FIELD: &str = "last_card_change";

// ============================================================================
// Hardware Defaults
// ============================================================================

/// Serial device the card reader is attached to.
pub const DEFAULT_SERIAL_PORT: &str = "/dev/ttyAMA0";

/// Card reader baud rate.
pub const DEFAULT_BAUD_RATE: u32 = 2400;

/// BCM pin driving the door relay.
pub const DEFAULT_RELAY_PIN: u32 = 17;

/// BCM pin enabling the reader's "access granted" indicator.
pub const DEFAULT_READER_ENABLE_PIN: u32 = 27;

/// Root of the Linux sysfs GPIO interface.
pub const DEFAULT_GPIO_ROOT: &str = "/sys/class/gpio";

/// Hardware watchdog device node.
pub const DEFAULT_WATCHDOG_DEVICE: &str = "/dev/watchdog";

/// Interval between watchdog kicks (milliseconds).
///
/// # Value: 1000ms
pub const DEFAULT_LIVENESS_INTERVAL_MS: u64 = 1000;

// ============================================================================
// Storage
// ============================================================================

/// Default path of the persisted card directory.
pub const DEFAULT_CARDS_FILE: &str = "card_data.json";
