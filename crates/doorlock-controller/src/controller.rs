//! Supervisor for the controller's long-running loops.
//!
//! The loops run as independent Tokio tasks sharing one cancellation token.
//! The first loop to stop on its own (with an error, a panic, or
//! unexpectedly) cancels the token so the others wind down too. Every
//! termination is logged, and the first failure becomes the controller's
//! result.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;

use tokio::task::{self, JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::error::{ControllerError, LoopKind, Result};

/// Task termination classification for shutdown handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskTermination {
    /// Task completed successfully.
    Success,
    /// Task returned an error.
    Error,
    /// Task was cancelled (expected during shutdown).
    Cancelled,
    /// Task panicked.
    Panic,
}

impl fmt::Display for TaskTermination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TaskTermination::Success => "success",
            TaskTermination::Error => "error",
            TaskTermination::Cancelled => "cancelled",
            TaskTermination::Panic => "panic",
        };
        write!(f, "{}", name)
    }
}

/// Runs and supervises the reader, updater and liveness loops.
///
/// # Examples
///
/// ```no_run
/// use doorlock_controller::{Controller, LoopKind};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> doorlock_controller::Result<()> {
/// let shutdown = CancellationToken::new();
/// let mut controller = Controller::new(&shutdown);
///
/// controller.spawn(LoopKind::Updater, |stop| async move {
///     stop.cancelled().await;
///     Ok(())
/// });
///
/// shutdown.cancel();
/// controller.run().await
/// # }
/// ```
pub struct Controller {
    stop: CancellationToken,
    tasks: JoinSet<Result<()>>,
    names: HashMap<task::Id, LoopKind>,
}

impl Controller {
    /// Create a controller that stops when `shutdown` is cancelled.
    pub fn new(shutdown: &CancellationToken) -> Self {
        Self {
            stop: shutdown.child_token(),
            tasks: JoinSet::new(),
            names: HashMap::new(),
        }
    }

    /// Start a loop. `start` receives the token the loop must stop on.
    pub fn spawn<F, Fut>(&mut self, kind: LoopKind, start: F)
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let handle = self.tasks.spawn(start(self.stop.clone()));
        self.names.insert(handle.id(), kind);
    }

    /// Number of loops started.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no loop was started.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Wait for every loop to finish.
    ///
    /// # Errors
    ///
    /// Returns the first loop failure: an error, a panic, or a loop that
    /// stopped before shutdown was requested.
    pub async fn run(mut self) -> Result<()> {
        let mut first_failure = None;

        while let Some(joined) = self.tasks.join_next_with_id().await {
            let (task, termination, failure) = self.classify(joined);
            let requested = self.stop.is_cancelled();

            match termination {
                TaskTermination::Success | TaskTermination::Cancelled => {
                    info!(%task, %termination, "Loop stopped");
                }
                TaskTermination::Error | TaskTermination::Panic => {
                    error!(%task, %termination, "Loop failed");
                }
            }

            let failure =
                failure.or_else(|| (!requested).then_some(ControllerError::LoopExited { task }));
            if let Some(failure) = failure {
                if !requested {
                    error!(error = %failure, "Stopping remaining loops");
                }
                self.stop.cancel();
                first_failure.get_or_insert(failure);
            }
        }

        first_failure.map_or(Ok(()), Err)
    }

    /// Classify the termination status of a task.
    fn classify(
        &self,
        joined: std::result::Result<(task::Id, Result<()>), JoinError>,
    ) -> (LoopKind, TaskTermination, Option<ControllerError>) {
        match joined {
            Ok((id, Ok(()))) => (self.name(id), TaskTermination::Success, None),
            Ok((id, Err(e))) => {
                let task = self.name(id);
                let failure = ControllerError::LoopFailed {
                    task,
                    source: Box::new(e),
                };
                (task, TaskTermination::Error, Some(failure))
            }
            Err(e) if e.is_cancelled() => (self.name(e.id()), TaskTermination::Cancelled, None),
            Err(e) => {
                let task = self.name(e.id());
                (
                    task,
                    TaskTermination::Panic,
                    Some(ControllerError::LoopPanicked { task }),
                )
            }
        }
    }

    fn name(&self, id: task::Id) -> LoopKind {
        // Every task in the set was spawned through `spawn`, which records
        // its id.
        self.names.get(&id).copied().unwrap_or(LoopKind::Reader)
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("loops", &self.names.values().collect::<Vec<_>>())
            .field("stopping", &self.stop.is_cancelled())
            .finish()
    }
}
