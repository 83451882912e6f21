use std::fmt;

use doorlock_hardware::HardwareError;
use thiserror::Error;

/// The long-running loops supervised by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    /// Card reader, authorization and actuation
    Reader,
    /// Remote directory polling
    Updater,
    /// Watchdog heartbeat
    Liveness,
}

impl fmt::Display for LoopKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoopKind::Reader => "reader",
            LoopKind::Updater => "updater",
            LoopKind::Liveness => "liveness",
        };
        write!(f, "{}", name)
    }
}

/// Errors that stop the controller.
///
/// Remote authority and persistence failures never appear here: they are
/// logged by the updater and retried on its next cycle.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// A peripheral failed
    #[error("Hardware error: {0}")]
    Hardware(#[from] HardwareError),

    /// A loop returned an error
    #[error("{task} loop failed: {source}")]
    LoopFailed {
        task: LoopKind,
        #[source]
        source: Box<ControllerError>,
    },

    /// A loop panicked
    #[error("{task} loop panicked")]
    LoopPanicked { task: LoopKind },

    /// A loop stopped without being asked to
    #[error("{task} loop exited unexpectedly")]
    LoopExited { task: LoopKind },
}

/// Specialized result type for controller operations
pub type Result<T> = std::result::Result<T, ControllerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_failure_message_chains_source() {
        let err = ControllerError::LoopFailed {
            task: LoopKind::Reader,
            source: Box::new(HardwareError::disconnected("/dev/ttyAMA0").into()),
        };

        let message = err.to_string();
        assert!(message.starts_with("reader loop failed"));
        assert!(message.contains("/dev/ttyAMA0"));
    }
}
