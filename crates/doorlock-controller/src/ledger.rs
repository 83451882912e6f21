//! Debounce ledger for card scans.
//!
//! Readers repeat a token for as long as the card stays in the field. The
//! ledger remembers when each card was last accepted and rejects repeats
//! that arrive inside the debounce window. Denied cards are recorded too,
//! so holding an unknown card to the reader does not flood the log.

use std::collections::HashMap;
use std::time::Duration;

use doorlock_core::CardId;
use tokio::time::Instant;

/// Last-accepted instants per card, bounded to one debounce window.
#[derive(Debug)]
pub struct ScanLedger {
    window: Duration,
    last_accepted: HashMap<CardId, Instant>,
}

impl ScanLedger {
    /// Create an empty ledger with the given debounce window.
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_accepted: HashMap::new(),
        }
    }

    /// Decide whether a scan of `card` at `now` should be processed.
    ///
    /// Returns `false` if the same card was accepted less than one window
    /// before `now`. Otherwise records `now` for the card and returns `true`.
    /// A scan exactly one window after the previous acceptance is accepted.
    pub fn accept(&mut self, card: &CardId, now: Instant) -> bool {
        if let Some(last) = self.last_accepted.get(card)
            && now.saturating_duration_since(*last) < self.window
        {
            return false;
        }

        self.sweep(now);
        self.last_accepted.insert(card.clone(), now);
        true
    }

    /// Number of cards currently remembered.
    pub fn len(&self) -> usize {
        self.last_accepted.len()
    }

    /// Whether no card is currently remembered.
    pub fn is_empty(&self) -> bool {
        self.last_accepted.is_empty()
    }

    /// Forget every card whose window has fully elapsed.
    fn sweep(&mut self, now: Instant) {
        let window = self.window;
        self.last_accepted
            .retain(|_, last| now.saturating_duration_since(*last) < window);
    }
}
