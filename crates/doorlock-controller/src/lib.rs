//! Door lock controller core.
//!
//! This crate wires the card reader, lock outputs, watchdog, remote authority
//! and local storage into three concurrent loops:
//!
//! - [`ReaderLoop`] - reads tokens, debounces them, checks them against the
//!   active card directory and unlocks the door for known cards
//! - [`Updater`] - polls the remote authority and publishes new directories
//! - [`LivenessMonitor`] - kicks the hardware watchdog
//!
//! New directories travel from the updater to the reader through a
//! single-slot [`channel`]. The [`Controller`] runs the loops as Tokio
//! tasks and stops all of them as soon as one fails.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use doorlock_controller::{
//!     Actuator, Controller, LoopKind, ReaderConfig, ReaderLoop, Updater, UpdaterConfig,
//!     channel::directory_channel,
//! };
//! use doorlock_core::CardDirectory;
//! use doorlock_hardware::mock::{MockCardReader, MockLock};
//! use doorlock_network::mock::MockAuthority;
//! use doorlock_storage::MemoryStore;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> doorlock_controller::Result<()> {
//!     let (reader, _scans) = MockCardReader::new();
//!     let (lock, _lock) = MockLock::new();
//!     let authority = Arc::new(MockAuthority::new());
//!     let (publisher, subscriber) = directory_channel(CardDirectory::new());
//!
//!     let reader = ReaderLoop::new(
//!         reader,
//!         Actuator::new(lock)?,
//!         Arc::clone(&authority),
//!         subscriber,
//!         ReaderConfig::default(),
//!     );
//!     let updater = Updater::new(authority, MemoryStore::new(), publisher, UpdaterConfig::default());
//!
//!     let shutdown = CancellationToken::new();
//!     let mut controller = Controller::new(&shutdown);
//!     controller.spawn(LoopKind::Reader, |stop| reader.run(stop));
//!     controller.spawn(LoopKind::Updater, |stop| updater.run(stop));
//!
//!     shutdown.cancel();
//!     controller.run().await
//! }
//! ```

pub mod actuator;
pub mod channel;
pub mod controller;
pub mod error;
pub mod ledger;
pub mod liveness;
pub mod reader;
pub mod updater;

pub use actuator::{Actuator, DoorState};
pub use channel::{DirectoryPublisher, DirectorySubscriber, directory_channel};
pub use controller::{Controller, TaskTermination};
pub use error::{ControllerError, LoopKind, Result};
pub use ledger::ScanLedger;
pub use liveness::LivenessMonitor;
pub use reader::{ReaderConfig, ReaderLoop, ScanOutcome};
pub use updater::{PollOutcome, Updater, UpdaterConfig};
