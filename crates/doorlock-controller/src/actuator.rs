//! Door actuation.
//!
//! The [`Actuator`] owns the lock outputs and is the only code that
//! energizes them. Whatever happens to the task holding it (a returned
//! error, cancellation mid-unlock, or unwinding) the outputs end up
//! de-energized.

use std::fmt;
use std::time::Duration;

use doorlock_hardware::LockOutput;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;

/// State of the door outputs.
///
/// `Idle → Unlocking` only on a granted scan; `Unlocking → Idle` once the
/// hold elapses, or as soon as the outputs are secured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorState {
    /// Relay and reader-enable line de-energized; the reader is polling.
    Idle,

    /// Relay and reader-enable line energized for an unlock hold.
    Unlocking,
}

impl fmt::Display for DoorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            DoorState::Idle => "Idle",
            DoorState::Unlocking => "Unlocking",
        };
        write!(f, "{}", state_str)
    }
}

/// Owner of the lock outputs.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use doorlock_controller::actuator::{Actuator, DoorState};
/// use doorlock_hardware::mock::MockLock;
///
/// #[tokio::main(flavor = "current_thread", start_paused = true)]
/// async fn main() -> doorlock_controller::Result<()> {
///     let (lock, handle) = MockLock::new();
///     let mut actuator = Actuator::new(lock)?;
///
///     actuator.unlock(Duration::from_secs(4)).await?;
///
///     assert_eq!(actuator.state(), DoorState::Idle);
///     assert_eq!(handle.unlock_count(), 1);
///     Ok(())
/// }
/// ```
pub struct Actuator<L: LockOutput> {
    lock: L,
    state: DoorState,
}

impl<L: LockOutput> Actuator<L> {
    /// Take ownership of `lock`, driving both outputs low.
    ///
    /// # Errors
    ///
    /// Returns an error if the outputs cannot be driven.
    pub fn new(lock: L) -> Result<Self> {
        let mut actuator = Self {
            lock,
            state: DoorState::Unlocking,
        };
        actuator.secure()?;
        Ok(actuator)
    }

    /// Current output state.
    pub fn state(&self) -> DoorState {
        self.state
    }

    /// Energize the outputs, hold for `hold`, then de-energize them.
    ///
    /// If the returned future is dropped during the hold, the outputs stay
    /// energized until [`secure`](Self::secure) is called or the actuator
    /// is dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the outputs cannot be driven. A failed unlock is
    /// followed by a best-effort secure before returning.
    pub async fn unlock(&mut self, hold: Duration) -> Result<()> {
        self.state = DoorState::Unlocking;
        if let Err(e) = self.lock.set_engaged(true) {
            let _ = self.secure();
            return Err(e.into());
        }
        debug!(hold_ms = hold.as_millis() as u64, "Door unlocked");

        tokio::time::sleep(hold).await;

        self.secure()
    }

    /// De-energize the outputs.
    ///
    /// # Errors
    ///
    /// Returns an error if the outputs cannot be driven. Every line is still
    /// attempted.
    pub fn secure(&mut self) -> Result<()> {
        self.lock.set_engaged(false)?;
        if self.state == DoorState::Unlocking {
            debug!("Door locked");
        }
        self.state = DoorState::Idle;
        Ok(())
    }
}

impl<L: LockOutput> fmt::Debug for Actuator<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Actuator")
            .field("lock", &self.lock.info())
            .field("state", &self.state)
            .finish()
    }
}

impl<L: LockOutput> Drop for Actuator<L> {
    fn drop(&mut self) {
        if self.state != DoorState::Idle
            && let Err(e) = self.lock.set_engaged(false)
        {
            warn!(error = %e, "Failed to lock door while releasing outputs");
        }
    }
}
