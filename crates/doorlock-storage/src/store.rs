//! Durable storage for the card directory.
//!
//! The directory is stored as a single JSON object mapping card identifier to
//! holder label. It is read once at startup and overwritten wholesale after
//! every successful update.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use doorlock_core::CardDirectory;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::error::{StorageError, StorageResult};

/// Store for the last known card directory.
///
/// This trait defines the storage interface used by the controller, enabling
/// testability through in-memory implementations.
///
/// Methods are declared as `fn -> impl Future + Send` so loops generic over
/// the store can be spawned onto the runtime.
pub trait DirectoryStore: Send + Sync {
    /// Load the stored directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be read or parsed.
    fn load(&self) -> impl Future<Output = StorageResult<CardDirectory>> + Send;

    /// Replace the stored directory with `directory`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory could not be written. The previous
    /// contents are left intact in that case.
    fn save(&self, directory: &CardDirectory) -> impl Future<Output = StorageResult<()>> + Send;
}

/// JSON file backed directory store.
///
/// Saves go through a sibling temporary file that is flushed to disk before
/// it is renamed over the target, so a reader or a power cut never leaves a
/// half-written file behind.
///
/// # Examples
///
/// ```no_run
/// use doorlock_storage::{DirectoryStore, JsonFileStore};
///
/// # async fn example() -> doorlock_storage::StorageResult<()> {
/// let store = JsonFileStore::new("card_data.json");
/// let directory = store.load().await?;
/// println!("{} cards", directory.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl DirectoryStore for JsonFileStore {
    async fn load(&self) -> StorageResult<CardDirectory> {
        let raw = tokio::fs::read(&self.path)
            .await
            .map_err(|e| StorageError::io(&self.path, e))?;

        let directory: CardDirectory =
            serde_json::from_slice(&raw).map_err(|e| StorageError::json(&self.path, e))?;

        info!(
            path = %self.path.display(),
            cards = directory.len(),
            "Read card numbers from disk"
        );
        if directory.skipped() > 0 {
            warn!(
                path = %self.path.display(),
                skipped = directory.skipped(),
                "Ignored stored entries that are not valid card numbers"
            );
        }

        Ok(directory)
    }

    async fn save(&self, directory: &CardDirectory) -> StorageResult<()> {
        let json =
            serde_json::to_vec_pretty(directory).map_err(|e| StorageError::json(&self.path, e))?;
        let temp = self.temp_path();

        if let Err(e) = write_synced(&temp, &json).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(StorageError::io(&temp, e));
        }

        if let Err(e) = tokio::fs::rename(&temp, &self.path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(StorageError::io(&self.path, e));
        }

        // The rename itself is durable only once the directory entry is.
        if let Some(parent) = self.path.parent()
            && let Err(e) = sync_dir(parent).await
        {
            warn!(
                path = %parent.display(),
                error = %e,
                "Could not flush directory after saving card numbers"
            );
        }

        debug!(
            path = %self.path.display(),
            cards = directory.len(),
            "Wrote card numbers to disk"
        );
        Ok(())
    }
}

/// Write `bytes` to a fresh file at `path` and wait until they reach the disk.
async fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(path).await?;
    file.write_all(bytes).await?;
    file.sync_all().await
}

async fn sync_dir(dir: &Path) -> std::io::Result<()> {
    let dir = if dir.as_os_str().is_empty() {
        Path::new(".")
    } else {
        dir
    };
    tokio::fs::File::open(dir).await?.sync_all().await
}

#[derive(Debug, Default)]
struct MemoryState {
    directory: CardDirectory,
    saves: usize,
    fail_saves: bool,
}

/// In-memory directory store for tests and dry runs.
///
/// Clones share the same contents, so a test can keep one clone to inspect
/// what the controller persisted.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `directory`.
    pub fn with_directory(directory: CardDirectory) -> Self {
        let store = Self::new();
        store.state().directory = directory;
        store
    }

    /// The currently stored directory.
    pub fn contents(&self) -> CardDirectory {
        self.state().directory.clone()
    }

    /// Number of successful saves.
    pub fn save_count(&self) -> usize {
        self.state().saves
    }

    /// Make every following save fail (`true`) or succeed again (`false`).
    pub fn set_fail_saves(&self, fail: bool) {
        self.state().fail_saves = fail;
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl DirectoryStore for MemoryStore {
    async fn load(&self) -> StorageResult<CardDirectory> {
        Ok(self.contents())
    }

    async fn save(&self, directory: &CardDirectory) -> StorageResult<()> {
        let mut state = self.state();
        if state.fail_saves {
            return Err(StorageError::Unavailable(
                "memory store rejecting writes".to_string(),
            ));
        }
        state.directory = directory.clone();
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CardDirectory {
        CardDirectory::from_entries([("0000000001", "Ada"), ("0000000002", "Grace")])
    }

    #[test]
    fn test_temp_path_is_sibling() {
        let store = JsonFileStore::new("/var/lib/doorlock/card_data.json");
        assert_eq!(
            store.temp_path(),
            PathBuf::from("/var/lib/doorlock/card_data.json.tmp")
        );
    }

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryStore::new();
        assert!(store.load().await.unwrap().is_empty());

        store.save(&sample()).await.unwrap();

        assert_eq!(store.load().await.unwrap(), sample());
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_failing_saves_keep_contents() {
        let store = MemoryStore::with_directory(sample());
        store.set_fail_saves(true);

        let result = store.save(&CardDirectory::new()).await;

        assert!(matches!(result, Err(StorageError::Unavailable(_))));
        assert_eq!(store.contents(), sample());
        assert_eq!(store.save_count(), 0);
    }
}
