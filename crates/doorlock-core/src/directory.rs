//! Card directory snapshots.
//!
//! A [`CardDirectory`] is one complete version of "who may open the door":
//! card identifier to holder label. Snapshots are immutable once built and
//! are replaced as a whole, never merged, so a lookup always sees a single
//! consistent version.
//!
//! The JSON form is a flat object, the same on disk and on the wire:
//!
//! ```text
//! {"1234567890": "Alice", "1111111111": "Bob"}
//! ```
//!
//! Keys that are not valid card identifiers can never match a scan. They are
//! dropped when the snapshot is built and counted in
//! [`CardDirectory::skipped`] so callers can report them.

use crate::types::CardId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Immutable card identifier → holder label mapping.
///
/// # Examples
///
/// ```
/// use doorlock_core::{CardDirectory, CardId};
///
/// let directory: CardDirectory = serde_json::from_str(r#"{"1234567890": "Alice"}"#)?;
///
/// let card = CardId::new("1234567890")?;
/// assert_eq!(directory.holder(&card), Some("Alice"));
/// assert_eq!(directory.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct CardDirectory {
    entries: HashMap<CardId, String>,
    skipped: usize,
}

impl CardDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from raw identifier/label pairs.
    ///
    /// Pairs whose identifier is not a valid [`CardId`] are dropped and
    /// counted in [`skipped`](Self::skipped). Later duplicates win.
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut directory = Self::default();

        for (id, holder) in entries {
            match CardId::new(id.as_ref()) {
                Ok(card) => {
                    directory.entries.insert(card, holder.into());
                }
                Err(_) => directory.skipped += 1,
            }
        }

        directory
    }

    /// Look up the holder label of a card, if the card is authorized.
    #[must_use]
    pub fn holder(&self, card: &CardId) -> Option<&str> {
        self.entries.get(card).map(String::as_str)
    }

    /// Check whether a card is present in this snapshot.
    #[must_use]
    pub fn contains(&self, card: &CardId) -> bool {
        self.entries.contains_key(card)
    }

    /// Number of authorized cards.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no card is authorized.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of entries dropped because their key was not a valid card identifier.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Iterate over all (card, holder) pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&CardId, &str)> {
        self.entries.iter().map(|(card, holder)| (card, holder.as_str()))
    }
}

impl PartialEq for CardDirectory {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for CardDirectory {}

impl From<BTreeMap<String, String>> for CardDirectory {
    fn from(entries: BTreeMap<String, String>) -> Self {
        Self::from_entries(entries)
    }
}

impl From<CardDirectory> for BTreeMap<String, String> {
    fn from(directory: CardDirectory) -> Self {
        directory
            .entries
            .into_iter()
            .map(|(card, holder)| (card.into(), holder))
            .collect()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for CardDirectory {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self::from_entries(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(id: &str) -> CardId {
        CardId::new(id).unwrap()
    }

    #[test]
    fn test_lookup_is_exact() {
        let directory = CardDirectory::from_entries([("1234567890", "Alice")]);

        assert_eq!(directory.holder(&card("1234567890")), Some("Alice"));
        assert!(directory.contains(&card("1234567890")));
        assert!(!directory.contains(&card("0000000000")));
        assert!(!directory.contains(&card("1234567891")));
    }

    #[test]
    fn test_invalid_keys_are_skipped() {
        let directory = CardDirectory::from_entries([
            ("1234567890", "Alice"),
            ("123", "Too short"),
            ("", "Empty"),
        ]);

        assert_eq!(directory.len(), 1);
        assert_eq!(directory.skipped(), 2);
    }

    #[test]
    fn test_padded_key_never_matches_a_scan() {
        let directory = CardDirectory::from_entries([(" 1234567890 ", "Alice")]);
        let scanned = CardId::from_scan(b"1234567890\n").unwrap();

        assert!(!directory.contains(&scanned));
        assert_eq!(directory.skipped(), 1);
    }

    #[test]
    fn test_json_roundtrip_is_flat_object() {
        let json = r#"{"1111111111":"Bob","1234567890":"Alice"}"#;
        let directory: CardDirectory = serde_json::from_str(json).unwrap();

        assert_eq!(directory.len(), 2);
        assert_eq!(serde_json::to_string(&directory).unwrap(), json);
    }

    #[test]
    fn test_equality_ignores_skipped_count() {
        let a = CardDirectory::from_entries([("1234567890", "Alice"), ("bad", "x")]);
        let b = CardDirectory::from_entries([("1234567890", "Alice")]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_directory() {
        let directory: CardDirectory = serde_json::from_str("{}").unwrap();
        assert!(directory.is_empty());
        assert_eq!(directory, CardDirectory::new());
    }

    #[test]
    fn test_non_string_label_is_rejected() {
        let result = serde_json::from_str::<CardDirectory>(r#"{"1234567890": 42}"#);
        assert!(result.is_err());
    }
}
