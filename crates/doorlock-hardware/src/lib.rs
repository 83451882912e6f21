//! Hardware device abstraction layer for the door lock controller.
//!
//! This crate provides trait-based abstractions for the three peripherals the
//! controller talks to: the serial card reader, the lock outputs (relay plus
//! reader-enable line) and the hardware watchdog. The traits allow the
//! controller loops to run unchanged against mock devices in tests.
//!
//! # Device Traits
//!
//! ## Card Readers
//!
//! The [`CardReader`] trait yields raw, unvalidated tokens with a bounded wait:
//!
//! ```no_run
//! use std::time::Duration;
//! use doorlock_hardware::traits::CardReader;
//! use doorlock_hardware::error::Result;
//!
//! async fn wait_for_token<R: CardReader>(reader: &mut R) -> Result<Vec<u8>> {
//!     loop {
//!         if let Some(scan) = reader.read_scan(Duration::from_millis(100)).await? {
//!             return Ok(scan.bytes);
//!         }
//!     }
//! }
//! ```
//!
//! ## Lock Outputs
//!
//! The [`LockOutput`] trait drives the relay and the reader-enable line
//! together:
//!
//! ```
//! use doorlock_hardware::mock::MockLock;
//! use doorlock_hardware::traits::LockOutput;
//!
//! let (mut lock, handle) = MockLock::new();
//! lock.set_engaged(true).unwrap();
//! lock.set_engaged(false).unwrap();
//! assert_eq!(handle.unlock_count(), 1);
//! ```
//!
//! ## Watchdog
//!
//! The [`Watchdog`] trait proves liveness to the board's hardware watchdog.
//!
//! # Implementations
//!
//! - [`serial::SerialCardReader`] - reader on a serial port (`serialport`)
//! - [`gpio::SysfsLock`] - lock lines on the Linux sysfs GPIO interface
//! - [`watchdog::DeviceWatchdog`] - `/dev/watchdog`
//! - [`mock`] - controllable stand-ins for all three
//!
//! # Error Handling
//!
//! All operations return [`Result<T>`][error::Result] which uses the
//! [`HardwareError`] error type.
//!
//! [`CardReader`]: traits::CardReader
//! [`LockOutput`]: traits::LockOutput
//! [`Watchdog`]: traits::Watchdog

pub mod error;
pub mod gpio;
pub mod mock;
pub mod serial;
pub mod traits;
pub mod types;
pub mod watchdog;

// Re-export commonly used types for convenience
pub use error::{HardwareError, Result};
pub use gpio::{LockPins, SysfsLock};
pub use serial::{SerialCardReader, SerialConfig};
pub use traits::{CardReader, LockOutput, Watchdog};
pub use types::{DeviceInfo, RawScan};
pub use watchdog::DeviceWatchdog;
