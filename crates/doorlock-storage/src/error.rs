use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or persisting the card directory.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading, writing or renaming the cards file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The cards file is not a JSON object of string keys to string values
    #[error("Malformed cards file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Failure injected by a test store
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }

    /// Whether the error means the file simply does not exist yet.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let missing = StorageError::io(
            "cards.json",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        let denied = StorageError::io(
            "cards.json",
            io::Error::new(io::ErrorKind::PermissionDenied, "nope"),
        );

        assert!(missing.is_not_found());
        assert!(!denied.is_not_found());
        assert!(missing.to_string().contains("cards.json"));
    }
}
