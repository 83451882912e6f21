//! Updater loop: keep the card directory in step with the remote authority.
//!
//! Every poll interval the updater fetches the authority's change marker.
//! When it differs from the last one seen, the full directory is fetched,
//! published to the reader and written to local storage. Failures are logged
//! and left for the next cycle; nothing here can stop the reader.

use std::sync::Arc;
use std::time::Duration;

use doorlock_core::ChangeMarker;
use doorlock_core::constants::DEFAULT_POLL_INTERVAL_MS;
use doorlock_network::Authority;
use doorlock_storage::DirectoryStore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::channel::DirectoryPublisher;
use crate::error::Result;

/// Timing configuration for the updater loop
#[derive(Debug, Clone)]
pub struct UpdaterConfig {
    /// Pause between the end of one poll and the start of the next
    pub poll_interval: Duration,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// What one poll did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The marker matched the last one seen.
    Unchanged,

    /// A new directory was fetched and published.
    Updated { cards: usize },

    /// The marker could not be fetched. The last marker is kept.
    StatusFailed,

    /// The marker moved but the directory could not be fetched. The marker
    /// is forgotten so the next poll tries again.
    FetchFailed,
}

/// The updater loop and everything it owns.
pub struct Updater<A, S>
where
    A: Authority,
    S: DirectoryStore,
{
    authority: Arc<A>,
    store: S,
    publisher: DirectoryPublisher,
    marker: Option<ChangeMarker>,
    config: UpdaterConfig,
}

impl<A, S> Updater<A, S>
where
    A: Authority,
    S: DirectoryStore,
{
    /// Assemble an updater. The change marker starts out unknown, so the
    /// first successful poll always fetches the directory.
    pub fn new(
        authority: Arc<A>,
        store: S,
        publisher: DirectoryPublisher,
        config: UpdaterConfig,
    ) -> Self {
        Self {
            authority,
            store,
            publisher,
            marker: None,
            config,
        }
    }

    /// The last change marker acted on, if any.
    pub fn marker(&self) -> Option<&ChangeMarker> {
        self.marker.as_ref()
    }

    /// Poll the authority once.
    pub async fn poll_once(&mut self) -> PollOutcome {
        let marker = match self.authority.fetch_change_marker().await {
            Ok(marker) => marker,
            Err(e) => {
                error!(error = %e, "Problem GETting stats");
                return PollOutcome::StatusFailed;
            }
        };

        if self.marker.as_ref() == Some(&marker) {
            debug!(marker = %marker, "Cards unchanged");
            return PollOutcome::Unchanged;
        }

        info!(marker = %marker, "Cards changed, pulling update from API");
        self.marker = Some(marker);

        let directory = match self.authority.fetch_directory().await {
            Ok(directory) => directory,
            Err(e) => {
                error!(error = %e, "Problem GETting door");
                self.marker = None;
                return PollOutcome::FetchFailed;
            }
        };

        let cards = directory.len();
        info!(cards, "Got cards from API");
        if directory.skipped() > 0 {
            warn!(
                skipped = directory.skipped(),
                "Ignored directory entries that are not valid card numbers"
            );
        }

        let published = self.publisher.publish(directory);

        debug!("Writing card data to disk");
        if let Err(e) = self.store.save(&published).await {
            warn!(error = %e, "Failed to write card data to disk");
        }

        PollOutcome::Updated { cards }
    }

    /// Poll every interval until `shutdown` fires. The first poll happens one
    /// interval after start.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` matches the other supervised loops.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(
            interval_ms = self.config.poll_interval.as_millis() as u64,
            "Updater loop started"
        );

        let interval = self.config.poll_interval;
        loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                _ = async {
                    tokio::time::sleep(interval).await;
                    self.poll_once().await
                } => {}
            }
        }

        debug!("Updater loop stopped");
        Ok(())
    }
}
