//! Reader loop: scan, debounce, authorize, actuate, report.
//!
//! Each iteration first adopts any directory published since the last one,
//! then waits a bounded time for a token. A valid, non-repeated token found
//! in the active directory unlocks the door for the unlock duration; the
//! loop does nothing else while the door is held open. The remote authority
//! is then told the card was seen, from a separate task whose outcome never
//! reaches this loop.

use std::sync::Arc;
use std::time::Duration;

use doorlock_core::constants::{
    DEFAULT_DEBOUNCE_WINDOW_MS, DEFAULT_READ_TIMEOUT_MS, DEFAULT_UNLOCK_DURATION_MS,
};
use doorlock_core::{CardDirectory, CardId};
use doorlock_hardware::{CardReader, LockOutput};
use doorlock_network::Authority;
use tokio::task::JoinSet;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::actuator::Actuator;
use crate::channel::DirectorySubscriber;
use crate::error::Result;
use crate::ledger::ScanLedger;

/// Timing configuration for the reader loop
///
/// # Example
///
/// ```
/// use doorlock_controller::reader::ReaderConfig;
/// use std::time::Duration;
///
/// let config = ReaderConfig {
///     unlock_duration: Duration::from_secs(6),
///     ..ReaderConfig::default()
/// };
/// assert_eq!(config.debounce_window, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Longest wait for a token before the loop checks for directory updates
    pub read_timeout: Duration,

    /// How long the outputs stay energized after a granted scan
    pub unlock_duration: Duration,

    /// Repeats of the same card within this window are ignored
    pub debounce_window: Duration,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(DEFAULT_READ_TIMEOUT_MS),
            unlock_duration: Duration::from_millis(DEFAULT_UNLOCK_DURATION_MS),
            debounce_window: Duration::from_millis(DEFAULT_DEBOUNCE_WINDOW_MS),
        }
    }
}

/// What one reader iteration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// No token arrived within the read timeout.
    NoScan,

    /// The token was not a valid card number and was discarded.
    Malformed,

    /// The card was accepted too recently and the token was discarded.
    Debounced { card: CardId },

    /// The card is not in the active directory.
    Denied { card: CardId },

    /// The card was found, the door was unlocked and a seen notification
    /// was dispatched.
    Granted { card: CardId, holder: String },
}

/// The reader loop and everything it owns.
pub struct ReaderLoop<R, L, A>
where
    R: CardReader,
    L: LockOutput,
    A: Authority + 'static,
{
    reader: R,
    actuator: Actuator<L>,
    authority: Arc<A>,
    updates: DirectorySubscriber,
    directory: Arc<CardDirectory>,
    ledger: ScanLedger,
    notifications: JoinSet<()>,
    config: ReaderConfig,
}

impl<R, L, A> ReaderLoop<R, L, A>
where
    R: CardReader,
    L: LockOutput,
    A: Authority + 'static,
{
    /// Assemble a reader loop. The subscriber's current directory becomes
    /// the active one.
    pub fn new(
        reader: R,
        actuator: Actuator<L>,
        authority: Arc<A>,
        updates: DirectorySubscriber,
        config: ReaderConfig,
    ) -> Self {
        let directory = updates.current();
        Self {
            reader,
            actuator,
            authority,
            updates,
            directory,
            ledger: ScanLedger::new(config.debounce_window),
            notifications: JoinSet::new(),
            config,
        }
    }

    /// The directory scans are currently checked against.
    pub fn directory(&self) -> &CardDirectory {
        &self.directory
    }

    /// Run one iteration: adopt a pending directory, then read and process
    /// at most one token.
    ///
    /// # Errors
    ///
    /// Returns an error if the reader is gone or the lock outputs cannot be
    /// driven.
    pub async fn step(&mut self) -> Result<ScanOutcome> {
        self.adopt_pending_directory();
        self.reap_notifications();

        let Some(scan) = self.reader.read_scan(self.config.read_timeout).await? else {
            return Ok(ScanOutcome::NoScan);
        };

        self.process_token(&scan.bytes, scan.received_at).await
    }

    /// Validate, debounce, authorize and, if granted, actuate on one token
    /// received just now.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock outputs cannot be driven.
    pub async fn process_scan(&mut self, raw: &[u8]) -> Result<ScanOutcome> {
        self.process_token(raw, Instant::now()).await
    }

    async fn process_token(&mut self, raw: &[u8], received_at: Instant) -> Result<ScanOutcome> {
        let Some(card) = CardId::from_scan(raw) else {
            trace!(len = raw.len(), "Discarded malformed token");
            return Ok(ScanOutcome::Malformed);
        };

        if !self.ledger.accept(&card, received_at) {
            trace!(card = %card, "Discarded repeated scan");
            return Ok(ScanOutcome::Debounced { card });
        }

        info!(card = %card, "Read card");

        let Some(holder) = self.directory.holder(&card).map(str::to_owned) else {
            info!(card = %card, "Card not recognized, denying access");
            return Ok(ScanOutcome::Denied { card });
        };

        info!(card = %card, holder = %holder, "DOOR ACCESS");
        self.actuator.unlock(self.config.unlock_duration).await?;

        self.notify_seen(card.clone());
        Ok(ScanOutcome::Granted { card, holder })
    }

    /// Run until `shutdown` fires or an iteration fails.
    ///
    /// The lock outputs are de-energized on every exit path, including
    /// cancellation in the middle of an unlock.
    ///
    /// # Errors
    ///
    /// Returns the error that stopped the loop, or the error from the final
    /// de-energize if that failed.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        info!(cards = self.directory.len(), "Reader loop started");

        let result = loop {
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break Ok(()),
                outcome = self.step() => {
                    if let Err(e) = outcome {
                        break Err(e);
                    }
                }
            }
        };

        let secured = self.actuator.secure();
        self.notifications.detach_all();
        info!("Exiting, door locked");

        result.and(secured)
    }

    fn adopt_pending_directory(&mut self) {
        if let Some(directory) = self.updates.poll_update() {
            debug!(
                previous = self.directory.len(),
                cards = directory.len(),
                "Adopted new card directory"
            );
            self.directory = directory;
        }
    }

    fn notify_seen(&mut self, card: CardId) {
        let authority = Arc::clone(&self.authority);
        self.notifications.spawn(async move {
            if let Err(e) = authority.mark_seen(&card).await {
                error!(card = %card, error = %e, "Problem POSTing seen");
            }
        });
    }

    fn reap_notifications(&mut self) {
        while let Some(result) = self.notifications.try_join_next() {
            if let Err(e) = result
                && e.is_panic()
            {
                warn!(error = %e, "Seen notification task panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{DirectoryPublisher, directory_channel};
    use doorlock_hardware::mock::{MockCardReader, MockCardReaderHandle, MockLock, MockLockHandle};
    use doorlock_network::mock::MockAuthority;
    use rstest::rstest;

    struct Fixture {
        reader: ReaderLoop<MockCardReader, MockLock, MockAuthority>,
        publisher: DirectoryPublisher,
        scans: MockCardReaderHandle,
        lock: MockLockHandle,
        authority: MockAuthority,
    }

    fn fixture() -> Fixture {
        let (reader, scans) = MockCardReader::new();
        let (lock, lock_handle) = MockLock::new();
        let authority = MockAuthority::new();
        let (publisher, subscriber) = directory_channel(CardDirectory::from_entries([
            ("0000000001", "Ada"),
            ("0000000002", "Grace"),
        ]));

        Fixture {
            reader: ReaderLoop::new(
                reader,
                Actuator::new(lock).unwrap(),
                Arc::new(authority.clone()),
                subscriber,
                ReaderConfig::default(),
            ),
            publisher,
            scans,
            lock: lock_handle,
            authority,
        }
    }

    fn card(id: &str) -> CardId {
        CardId::new(id).unwrap()
    }

    #[rstest]
    #[case::too_short(b"123456789\n".to_vec())]
    #[case::too_long(b"12345678901\n".to_vec())]
    #[case::empty(b"\n".to_vec())]
    #[case::not_utf8(vec![0xff, 0xfe, 0x00, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37])]
    #[tokio::test(start_paused = true)]
    async fn test_malformed_tokens_never_actuate(#[case] raw: Vec<u8>) {
        let mut f = fixture();

        let outcome = f.reader.process_scan(&raw).await.unwrap();

        assert_eq!(outcome, ScanOutcome::Malformed);
        assert_eq!(f.lock.unlock_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_known_card_unlocks_and_reports_seen() {
        let mut f = fixture();
        let started = Instant::now();

        let outcome = f.reader.process_scan(b"0000000001\r\n").await.unwrap();

        assert_eq!(
            outcome,
            ScanOutcome::Granted {
                card: card("0000000001"),
                holder: "Ada".to_string()
            }
        );
        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(f.lock.transitions(), vec![false, true, false]);

        f.authority.wait_for_seen(1).await;
        assert_eq!(f.authority.seen(), vec![card("0000000001")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_card_is_denied() {
        let mut f = fixture();

        let outcome = f.reader.process_scan(b"0000000099\n").await.unwrap();

        assert_eq!(
            outcome,
            ScanOutcome::Denied {
                card: card("0000000099")
            }
        );
        assert_eq!(f.lock.unlock_count(), 0);
        assert!(f.authority.seen().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_denied_card_is_debounced_too() {
        let mut f = fixture();

        f.reader.process_scan(b"0000000099\n").await.unwrap();
        tokio::time::advance(Duration::from_secs(1)).await;
        let outcome = f.reader.process_scan(b"0000000099\n").await.unwrap();

        assert_eq!(
            outcome,
            ScanOutcome::Debounced {
                card: card("0000000099")
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeat_after_window_is_evaluated_again() {
        let mut f = fixture();

        f.reader.process_scan(b"0000000001\n").await.unwrap();
        // The unlock hold already consumed 4 seconds of the window.
        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(matches!(
            f.reader.process_scan(b"0000000001\n").await.unwrap(),
            ScanOutcome::Debounced { .. }
        ));

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(matches!(
            f.reader.process_scan(b"0000000001\n").await.unwrap(),
            ScanOutcome::Granted { .. }
        ));
        assert_eq!(f.lock.unlock_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_step_reads_from_reader() {
        let mut f = fixture();

        assert_eq!(f.reader.step().await.unwrap(), ScanOutcome::NoScan);

        f.scans.present_card("0000000002").await.unwrap();
        assert!(matches!(
            f.reader.step().await.unwrap(),
            ScanOutcome::Granted { .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_published_directory_replaces_active_one() {
        let mut f = fixture();
        let grace_only = CardDirectory::from_entries([("0000000002", "Grace")]);

        f.publisher.publish(grace_only.clone());
        assert_eq!(f.reader.step().await.unwrap(), ScanOutcome::NoScan);
        assert_eq!(f.reader.directory().len(), 1);

        // Identical content again must not disturb cards already present.
        f.publisher.publish(grace_only);
        assert_eq!(f.reader.step().await.unwrap(), ScanOutcome::NoScan);

        assert_eq!(
            f.reader.process_scan(b"0000000001\n").await.unwrap(),
            ScanOutcome::Denied {
                card: card("0000000001")
            }
        );
        assert_eq!(
            f.reader.process_scan(b"0000000002\n").await.unwrap(),
            ScanOutcome::Granted {
                card: card("0000000002"),
                holder: "Grace".to_string()
            }
        );
        assert_eq!(f.lock.unlock_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiting_scan_is_debounced_from_arrival_time() {
        let mut f = fixture();

        f.scans.present_card("0000000001").await.unwrap();
        assert!(matches!(
            f.reader.step().await.unwrap(),
            ScanOutcome::Granted { .. }
        ));

        // Arrives at t=4.9 but is only read at t=5.1.
        tokio::time::advance(Duration::from_millis(900)).await;
        f.scans.present_card("0000000001").await.unwrap();
        tokio::time::advance(Duration::from_millis(200)).await;

        assert!(matches!(
            f.reader.step().await.unwrap(),
            ScanOutcome::Debounced { .. }
        ));
        assert_eq!(f.lock.unlock_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_seen_does_not_block_reader() {
        let mut f = fixture();
        f.authority.set_seen_delay(Duration::from_secs(60));

        f.reader.process_scan(b"0000000001\n").await.unwrap();
        let started = Instant::now();
        f.reader.process_scan(b"0000000002\n").await.unwrap();

        assert_eq!(started.elapsed(), Duration::from_secs(4));
        assert_eq!(f.lock.unlock_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_seen_is_not_reported_to_reader() {
        let mut f = fixture();
        f.authority.set_seen_failing(true);

        let outcome = f.reader.process_scan(b"0000000001\n").await.unwrap();
        tokio::task::yield_now().await;

        assert!(matches!(outcome, ScanOutcome::Granted { .. }));
        assert_eq!(f.reader.step().await.unwrap(), ScanOutcome::NoScan);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnected_reader_fails_step() {
        let mut f = fixture();
        drop(f.scans);

        assert!(f.reader.step().await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_secures_lock_when_cancelled_mid_unlock() {
        let f = fixture();
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(f.reader.run(shutdown.clone()));

        f.scans.present_card("0000000001").await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(f.lock.is_engaged());

        shutdown.cancel();
        task.await.unwrap().unwrap();

        assert!(!f.lock.is_engaged());
        assert_eq!(f.lock.unlock_count(), 1);
    }
}
