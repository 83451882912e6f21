//! Mock lock outputs for testing and development.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{HardwareError, Result, traits::LockOutput, types::DeviceInfo};

#[derive(Debug, Default)]
struct LockState {
    engaged: bool,
    unlock_count: usize,
    transitions: Vec<bool>,
    fail_writes: bool,
}

/// Mock lock recording every state change.
///
/// # Examples
///
/// ```
/// use doorlock_hardware::mock::MockLock;
/// use doorlock_hardware::traits::LockOutput;
///
/// let (mut lock, handle) = MockLock::new();
///
/// lock.set_engaged(true).unwrap();
/// assert!(handle.is_engaged());
///
/// lock.set_engaged(false).unwrap();
/// assert_eq!(handle.unlock_count(), 1);
/// assert_eq!(handle.transitions(), vec![true, false]);
/// ```
#[derive(Debug)]
pub struct MockLock {
    state: Arc<Mutex<LockState>>,
}

impl MockLock {
    /// Create a new mock lock and its observation handle.
    pub fn new() -> (Self, MockLockHandle) {
        let state = Arc::new(Mutex::new(LockState::default()));
        (
            Self {
                state: Arc::clone(&state),
            },
            MockLockHandle { state },
        )
    }
}

impl LockOutput for MockLock {
    fn set_engaged(&mut self, engaged: bool) -> Result<()> {
        let mut state = lock_state(&self.state);

        if state.fail_writes {
            return Err(HardwareError::communication("mock lock write failure"));
        }

        if engaged && !state.engaged {
            state.unlock_count += 1;
        }
        state.engaged = engaged;
        state.transitions.push(engaged);
        Ok(())
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new("Mock Lock", "mock")
    }
}

/// Handle for observing and controlling a [`MockLock`].
#[derive(Debug, Clone)]
pub struct MockLockHandle {
    state: Arc<Mutex<LockState>>,
}

impl MockLockHandle {
    /// Whether the lock outputs are currently energized.
    pub fn is_engaged(&self) -> bool {
        lock_state(&self.state).engaged
    }

    /// Number of idle → engaged transitions so far.
    pub fn unlock_count(&self) -> usize {
        lock_state(&self.state).unlock_count
    }

    /// Every requested state, in order.
    pub fn transitions(&self) -> Vec<bool> {
        lock_state(&self.state).transitions.clone()
    }

    /// Make every following write fail (`true`) or succeed again (`false`).
    pub fn set_fail_writes(&self, fail: bool) {
        lock_state(&self.state).fail_writes = fail;
    }
}

fn lock_state(state: &Mutex<LockState>) -> MutexGuard<'_, LockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
