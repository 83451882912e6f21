//! Mock watchdog for testing and development.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{HardwareError, Result, traits::Watchdog, types::DeviceInfo};

/// Mock watchdog counting kicks, optionally failing after a number of them.
///
/// # Examples
///
/// ```
/// use doorlock_hardware::mock::MockWatchdog;
/// use doorlock_hardware::traits::Watchdog;
///
/// let (mut watchdog, handle) = MockWatchdog::failing_after(1);
///
/// assert!(watchdog.kick().is_ok());
/// assert!(watchdog.kick().is_err());
/// assert_eq!(handle.kicks(), 1);
/// ```
#[derive(Debug)]
pub struct MockWatchdog {
    kicks: Arc<AtomicUsize>,
    fail_after: Option<usize>,
}

impl MockWatchdog {
    /// Create a watchdog that accepts every kick.
    pub fn new() -> (Self, MockWatchdogHandle) {
        Self::build(None)
    }

    /// Create a watchdog whose kicks fail once `kicks` have succeeded.
    pub fn failing_after(kicks: usize) -> (Self, MockWatchdogHandle) {
        Self::build(Some(kicks))
    }

    fn build(fail_after: Option<usize>) -> (Self, MockWatchdogHandle) {
        let kicks = Arc::new(AtomicUsize::new(0));
        (
            Self {
                kicks: Arc::clone(&kicks),
                fail_after,
            },
            MockWatchdogHandle { kicks },
        )
    }
}

impl Watchdog for MockWatchdog {
    fn kick(&mut self) -> Result<()> {
        let done = self.kicks.load(Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| done >= limit) {
            return Err(HardwareError::communication("mock watchdog write failure"));
        }

        self.kicks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn info(&self) -> DeviceInfo {
        DeviceInfo::new("Mock Watchdog", "mock")
    }
}

/// Handle for observing a [`MockWatchdog`].
#[derive(Debug, Clone)]
pub struct MockWatchdogHandle {
    kicks: Arc<AtomicUsize>,
}

impl MockWatchdogHandle {
    /// Number of successful kicks so far.
    pub fn kicks(&self) -> usize {
        self.kicks.load(Ordering::SeqCst)
    }
}
