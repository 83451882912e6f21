//! Single-slot handoff of card directory versions.
//!
//! The updater publishes whole directories; the reader picks up whatever is
//! newest when it next looks. Nothing queues: two publishes before the
//! reader looks leave only the second one visible. Neither side ever waits
//! on the other.
//!
//! ```
//! use doorlock_controller::channel::directory_channel;
//! use doorlock_core::CardDirectory;
//!
//! let (publisher, mut subscriber) = directory_channel(CardDirectory::new());
//! assert!(subscriber.poll_update().is_none());
//!
//! publisher.publish(CardDirectory::from_entries([("0000000001", "Ada")]));
//! publisher.publish(CardDirectory::from_entries([("0000000002", "Grace")]));
//!
//! let latest = subscriber.poll_update().unwrap();
//! assert_eq!(latest.len(), 1);
//! assert!(subscriber.poll_update().is_none());
//! ```

use std::sync::Arc;

use doorlock_core::CardDirectory;
use tokio::sync::watch;

/// Create a directory channel whose current value is `initial`.
///
/// `initial` counts as already seen by the subscriber.
pub fn directory_channel(initial: CardDirectory) -> (DirectoryPublisher, DirectorySubscriber) {
    let (tx, rx) = watch::channel(Arc::new(initial));
    (DirectoryPublisher { tx }, DirectorySubscriber { rx })
}

/// Write side of the directory channel.
#[derive(Debug)]
pub struct DirectoryPublisher {
    tx: watch::Sender<Arc<CardDirectory>>,
}

impl DirectoryPublisher {
    /// Replace the pending directory with `directory` and return the shared
    /// snapshot that was published.
    ///
    /// Never blocks and never fails, even once the subscriber is gone.
    pub fn publish(&self, directory: CardDirectory) -> Arc<CardDirectory> {
        let snapshot = Arc::new(directory);
        self.tx.send_replace(Arc::clone(&snapshot));
        snapshot
    }
}

/// Read side of the directory channel.
#[derive(Debug)]
pub struct DirectorySubscriber {
    rx: watch::Receiver<Arc<CardDirectory>>,
}

impl DirectorySubscriber {
    /// The most recently published directory, without marking it seen.
    pub fn current(&self) -> Arc<CardDirectory> {
        Arc::clone(&self.rx.borrow())
    }

    /// Take the newest directory if one was published since the last call.
    ///
    /// Returns `None` when nothing new is pending, which is the common case.
    /// A value published just before the publisher was dropped is still
    /// delivered.
    pub fn poll_update(&mut self) -> Option<Arc<CardDirectory>> {
        let snapshot = self.rx.borrow_and_update();
        snapshot.has_changed().then(|| Arc::clone(&snapshot))
    }
}
