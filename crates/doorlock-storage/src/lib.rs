//! Durable storage for the door lock card directory.
//!
//! The controller keeps the last directory it received from the remote
//! authority on local disk so it can keep granting access across restarts
//! while the authority is unreachable.
//!
//! - [`JsonFileStore`] - the production store, a JSON file replaced atomically
//! - [`MemoryStore`] - a shared in-memory store for tests

pub mod error;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use store::{DirectoryStore, JsonFileStore, MemoryStore};
