//! Liveness monitor: keep the hardware watchdog from rebooting the board.
//!
//! The monitor has no data dependency on the other loops. It only proves
//! the process and its runtime are still scheduling work. A failed kick
//! stops the monitor with an error so the controller shuts down and the
//! watchdog resets the board.

use std::time::Duration;

use doorlock_core::constants::DEFAULT_LIVENESS_INTERVAL_MS;
use doorlock_hardware::Watchdog;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, trace};

use crate::error::Result;

/// Periodic watchdog kicker.
#[derive(Debug)]
pub struct LivenessMonitor<W: Watchdog> {
    watchdog: W,
    interval: Duration,
}

impl<W: Watchdog> LivenessMonitor<W> {
    /// Kick `watchdog` every `interval`.
    pub fn new(watchdog: W, interval: Duration) -> Self {
        Self { watchdog, interval }
    }

    /// Kick with the default one-second interval.
    pub fn with_default_interval(watchdog: W) -> Self {
        Self::new(watchdog, Duration::from_millis(DEFAULT_LIVENESS_INTERVAL_MS))
    }

    /// Kick immediately, then every interval, until `shutdown` fires.
    ///
    /// # Errors
    ///
    /// Returns the first failed kick.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            device = %self.watchdog.info(),
            interval_ms = self.interval.as_millis() as u64,
            "Liveness monitor started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => return Ok(()),
                _ = ticker.tick() => {
                    if let Err(e) = self.watchdog.kick() {
                        error!(error = %e, "Watchdog kick failed");
                        return Err(e.into());
                    }
                    trace!("Watchdog kicked");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use doorlock_hardware::mock::MockWatchdog;

    #[tokio::test(start_paused = true)]
    async fn test_kicks_every_interval() {
        let (watchdog, handle) = MockWatchdog::new();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(
            LivenessMonitor::new(watchdog, Duration::from_secs(1)).run(shutdown.clone()),
        );

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(handle.kicks(), 4);

        shutdown.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_kick_stops_monitor() {
        let (watchdog, handle) = MockWatchdog::failing_after(2);

        let result = LivenessMonitor::with_default_interval(watchdog)
            .run(CancellationToken::new())
            .await;

        assert!(result.is_err());
        assert_eq!(handle.kicks(), 2);
    }
}
