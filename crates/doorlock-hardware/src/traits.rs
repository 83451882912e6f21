//! Hardware device trait definitions.
//!
//! This module defines the contract between the door controller and its
//! peripherals: the card reader, the lock outputs and the watchdog. The
//! controller is generic over these traits so the same loops run against the
//! real devices in production and against the [`mock`](crate::mock) devices in
//! tests.
//!
//! Only reading a card waits on the outside world, so [`CardReader`] is the
//! only async trait. Driving a GPIO line and kicking the watchdog are single
//! short writes and stay synchronous, which also lets them run from `Drop`
//! and from a panic hook.
//!
//! The async method is declared as `fn -> impl Future + Send` rather than
//! `async fn` so generic loops built on it can be spawned onto the Tokio
//! runtime. Implementations still write a plain `async fn`.

use std::future::Future;
use std::time::Duration;

use crate::error::Result;
use crate::types::{DeviceInfo, RawScan};

/// Card reader abstraction.
///
/// A reader produces one raw token per scan. Tokens are not validated here;
/// decoding and length checks belong to the caller.
///
/// # Object Safety
///
/// **NOTE**: This trait is NOT object-safe because `read_scan` returns
/// `impl Future` (Edition 2024 RPITIT). Use generic type parameters:
///
/// ```no_run
/// use std::time::Duration;
/// use doorlock_hardware::traits::CardReader;
/// use doorlock_hardware::error::Result;
///
/// async fn next_line<R: CardReader>(reader: &mut R) -> Result<Option<Vec<u8>>> {
///     let scan = reader.read_scan(Duration::from_millis(100)).await?;
///     Ok(scan.map(|scan| scan.bytes))
/// }
/// ```
pub trait CardReader: Send + Sync {
    /// Wait up to `timeout` for the next raw token.
    ///
    /// Returns `Ok(None)` when nothing arrived in time. That is the normal
    /// idle outcome, not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the device is gone and no further tokens can
    /// ever arrive.
    fn read_scan(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<RawScan>>> + Send;

    /// Get device information.
    fn info(&self) -> DeviceInfo;
}

/// Lock output abstraction.
///
/// Drives the relay and the reader's "enabled" indicator together. Both
/// lines are always in the same state.
pub trait LockOutput: Send + Sync {
    /// Energize (`true`) or de-energize (`false`) both lines.
    ///
    /// Implementations must attempt to drive every line even if one of them
    /// fails, so a de-energize request never leaves a line behind.
    ///
    /// # Errors
    ///
    /// Returns the first error encountered while driving the lines.
    fn set_engaged(&mut self, engaged: bool) -> Result<()>;

    /// Get device information.
    fn info(&self) -> DeviceInfo;
}

/// Hardware watchdog abstraction.
///
/// The watchdog restarts the machine if it is not kicked within its
/// threshold period.
pub trait Watchdog: Send + Sync {
    /// Signal liveness to the watchdog.
    ///
    /// # Errors
    ///
    /// Returns an error if the write to the watchdog fails.
    fn kick(&mut self) -> Result<()>;

    /// Get device information.
    fn info(&self) -> DeviceInfo;
}
