//! Mock device implementations for testing and development.
//!
//! This module provides simulated device implementations that can be controlled
//! programmatically without requiring physical hardware.

pub mod lock;
pub mod reader;
pub mod watchdog;

// Re-export commonly used types
pub use lock::{MockLock, MockLockHandle};
pub use reader::{MockCardReader, MockCardReaderHandle};
pub use watchdog::{MockWatchdog, MockWatchdogHandle};
