//! Scriptable in-process authority for testing and development.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use doorlock_core::{CardDirectory, CardId, ChangeMarker};
use tokio::sync::Notify;

use crate::authority::Authority;
use crate::error::{AuthorityError, AuthorityResult, Endpoint};

const UNAVAILABLE: u16 = 503;

#[derive(Debug, Default)]
struct MockState {
    marker: Option<ChangeMarker>,
    directory: CardDirectory,
    directory_failing: bool,
    seen_failing: bool,
    seen_delay: Duration,
    marker_fetches: usize,
    directory_fetches: usize,
    seen: Vec<CardId>,
}

/// Mock authority whose answers are set by the test.
///
/// Clones share state, so a test keeps one clone to script and inspect the
/// authority while the controller owns another.
///
/// # Examples
///
/// ```
/// use doorlock_core::{CardDirectory, ChangeMarker};
/// use doorlock_network::{Authority, mock::MockAuthority};
///
/// #[tokio::main]
/// async fn main() {
///     let authority = MockAuthority::new();
///     assert!(authority.fetch_change_marker().await.is_err());
///
///     authority.set_marker("v1");
///     authority.set_directory(CardDirectory::from_entries([("0000000001", "Ada")]));
///
///     assert_eq!(authority.fetch_change_marker().await.unwrap(), ChangeMarker::new("v1"));
///     assert_eq!(authority.fetch_directory().await.unwrap().len(), 1);
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockAuthority {
    state: Arc<Mutex<MockState>>,
    seen_notify: Arc<Notify>,
}

impl MockAuthority {
    /// Create an authority with no marker (status requests fail) and an
    /// empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `marker` from the status endpoint.
    pub fn set_marker(&self, marker: impl Into<String>) {
        self.state().marker = Some(ChangeMarker::new(marker));
    }

    /// Make the status endpoint fail.
    pub fn clear_marker(&self) {
        self.state().marker = None;
    }

    /// Serve `directory` from the directory endpoint.
    pub fn set_directory(&self, directory: CardDirectory) {
        self.state().directory = directory;
    }

    /// Make the directory endpoint fail (`true`) or succeed again (`false`).
    pub fn set_directory_failing(&self, failing: bool) {
        self.state().directory_failing = failing;
    }

    /// Make seen notifications fail (`true`) or succeed again (`false`).
    pub fn set_seen_failing(&self, failing: bool) {
        self.state().seen_failing = failing;
    }

    /// Delay every seen notification by `delay` before answering.
    pub fn set_seen_delay(&self, delay: Duration) {
        self.state().seen_delay = delay;
    }

    /// Number of status requests so far.
    pub fn marker_fetches(&self) -> usize {
        self.state().marker_fetches
    }

    /// Number of directory requests so far.
    pub fn directory_fetches(&self) -> usize {
        self.state().directory_fetches
    }

    /// Cards reported as seen, in order. Failed notifications are not
    /// recorded.
    pub fn seen(&self) -> Vec<CardId> {
        self.state().seen.clone()
    }

    /// Wait until at least `count` seen notifications have been recorded.
    pub async fn wait_for_seen(&self, count: usize) {
        loop {
            let notified = self.seen_notify.notified();
            if self.state().seen.len() >= count {
                return;
            }
            notified.await;
        }
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Authority for MockAuthority {
    async fn fetch_change_marker(&self) -> AuthorityResult<ChangeMarker> {
        let mut state = self.state();
        state.marker_fetches += 1;
        state.marker.clone().ok_or(AuthorityError::Status {
            endpoint: Endpoint::Stats,
            status: UNAVAILABLE,
        })
    }

    async fn fetch_directory(&self) -> AuthorityResult<CardDirectory> {
        let mut state = self.state();
        state.directory_fetches += 1;
        if state.directory_failing {
            return Err(AuthorityError::Status {
                endpoint: Endpoint::Door,
                status: UNAVAILABLE,
            });
        }
        Ok(state.directory.clone())
    }

    async fn mark_seen(&self, card: &CardId) -> AuthorityResult<()> {
        let (delay, failing) = {
            let state = self.state();
            (state.seen_delay, state.seen_failing)
        };

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(AuthorityError::Status {
                endpoint: Endpoint::Seen,
                status: UNAVAILABLE,
            });
        }

        self.state().seen.push(card.clone());
        self.seen_notify.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_counts() {
        let authority = MockAuthority::new();
        authority.set_marker("a");

        authority.fetch_change_marker().await.unwrap();
        authority.fetch_change_marker().await.unwrap();
        authority.fetch_directory().await.unwrap();

        assert_eq!(authority.marker_fetches(), 2);
        assert_eq!(authority.directory_fetches(), 1);
    }

    #[tokio::test]
    async fn test_failing_directory() {
        let authority = MockAuthority::new();
        authority.set_directory_failing(true);

        let err = authority.fetch_directory().await.unwrap_err();
        assert_eq!(err.endpoint(), Some(Endpoint::Door));
    }

    #[tokio::test]
    async fn test_seen_is_recorded_unless_failing() {
        let authority = MockAuthority::new();
        let card = CardId::new("0000000001").unwrap();

        authority.mark_seen(&card).await.unwrap();
        authority.set_seen_failing(true);
        assert!(authority.mark_seen(&card).await.is_err());

        assert_eq!(authority.seen(), vec![card]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_for_seen() {
        let authority = MockAuthority::new();
        authority.set_seen_delay(Duration::from_secs(1));
        let card = CardId::new("0000000001").unwrap();

        let reporter = authority.clone();
        tokio::spawn(async move { reporter.mark_seen(&card).await });

        authority.wait_for_seen(1).await;
        assert_eq!(authority.seen().len(), 1);
    }
}
