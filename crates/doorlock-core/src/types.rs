use crate::{Result, constants::CARD_ID_LENGTH, error::Error};
use serde::{Deserialize, Serialize};
use std::fmt;
use subtle::ConstantTimeEq;

/// Card identifier (exactly 10 characters)
///
/// Identifiers are compared exactly. Only [`CardId::from_scan`] strips the
/// whitespace the reader wraps around a token; nothing else is normalized.
///
/// # Security
/// This type implements constant-time comparison to prevent timing attacks
/// when comparing card identifiers during authorization.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardId(String);

impl CardId {
    /// Create a new card identifier with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidCardFormat` if the input is not exactly
    /// [`CARD_ID_LENGTH`] characters long. Surrounding whitespace counts.
    pub fn new(id: &str) -> Result<Self> {
        let len = id.chars().count();
        if len != CARD_ID_LENGTH {
            return Err(Error::InvalidCardFormat(format!(
                "Card identifier must be {CARD_ID_LENGTH} chars, got {len}"
            )));
        }

        Ok(CardId(id.to_string()))
    }

    /// Decode a raw scan token read from the reader.
    ///
    /// Surrounding whitespace, the line terminator included, is stripped.
    /// Returns `None` for anything that is not valid UTF-8 or does not have
    /// the expected length. Malformed scans are line noise, not errors, so
    /// no reason is reported.
    ///
    /// # Examples
    ///
    /// ```
    /// use doorlock_core::CardId;
    ///
    /// assert!(CardId::from_scan(b"1234567890\r\n").is_some());
    /// assert!(CardId::from_scan(b"12345").is_none());
    /// assert!(CardId::from_scan(&[0xff; 10]).is_none());
    /// ```
    #[must_use]
    pub fn from_scan(raw: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(raw).ok()?;
        CardId::new(text.trim()).ok()
    }

    /// Get the card identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CardId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        CardId::new(s)
    }
}

impl TryFrom<String> for CardId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        CardId::new(&value)
    }
}

impl From<CardId> for String {
    fn from(id: CardId) -> Self {
        id.0
    }
}

/// Constant-time comparison implementation for CardId
///
/// This prevents timing attacks by ensuring comparison takes the same time
/// regardless of where the strings differ.
impl PartialEq for CardId {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_bytes().ct_eq(other.0.as_bytes()).into()
    }
}

impl std::hash::Hash for CardId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

/// Opaque token telling whether the remote card directory changed.
///
/// The remote authority's status endpoint reports a value that changes
/// whenever any card is added, removed or edited. Only equality is
/// meaningful; the content is never interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeMarker(String);

impl ChangeMarker {
    /// Wrap a raw marker value.
    pub fn new(marker: impl Into<String>) -> Self {
        ChangeMarker(marker.into())
    }

    /// Get the raw marker value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeMarker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("1234567890")]
    #[case("0A1B2C3D4E")]
    #[case("abcdefghij")]
    fn test_card_id_valid(#[case] input: &str) {
        let card = CardId::new(input).unwrap();
        assert_eq!(card.as_str(), input);
    }

    #[rstest]
    #[case(b"1234567890\n", "1234567890")]
    #[case(b"  0A1B2C3D4E\r\n", "0A1B2C3D4E")]
    fn test_from_scan_strips_surrounding_whitespace(#[case] raw: &[u8], #[case] expected: &str) {
        let card = CardId::from_scan(raw).unwrap();
        assert_eq!(card.as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case(" 1234567890 ")] // padding counts
    #[case("1234567890\n")]
    #[case("123456789")] // too short
    #[case("12345678901")] // too long
    #[case("12345 67890")] // inner whitespace counts
    fn test_card_id_invalid(#[case] input: &str) {
        let result = CardId::new(input);
        assert!(matches!(result, Err(Error::InvalidCardFormat(_))));
    }

    #[test]
    fn test_card_id_is_not_case_folded() {
        let lower = CardId::new("abcdef1234").unwrap();
        let upper = CardId::new("ABCDEF1234").unwrap();
        assert_ne!(lower, upper);
    }

    #[test]
    fn test_card_id_counts_characters_not_bytes() {
        // 10 characters, 20 bytes
        let card = CardId::new("éééééééééé").unwrap();
        assert_eq!(card.as_str().len(), 20);
    }

    #[test]
    fn test_from_scan_rejects_invalid_utf8() {
        let mut raw = b"12345678".to_vec();
        raw.extend_from_slice(&[0xc3, 0x28]);
        assert!(CardId::from_scan(&raw).is_none());
    }

    #[test]
    fn test_card_id_serde_validates() {
        let card: CardId = serde_json::from_str("\"1234567890\"").unwrap();
        assert_eq!(card.as_str(), "1234567890");
        assert_eq!(serde_json::to_string(&card).unwrap(), "\"1234567890\"");

        assert!(serde_json::from_str::<CardId>("\"123\"").is_err());
    }

    #[test]
    fn test_change_marker_equality() {
        let a = ChangeMarker::new("2025-10-17T10:00:00Z");
        let b = ChangeMarker::new("2025-10-17T10:00:00Z");
        let c = ChangeMarker::new("2025-10-17T10:00:05Z");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "2025-10-17T10:00:00Z");
    }

    proptest! {
        #[test]
        fn prop_wrong_length_tokens_never_decode(token in "[0-9A-Za-z]{0,32}") {
            prop_assume!(token.chars().count() != CARD_ID_LENGTH);
            prop_assert!(CardId::from_scan(token.as_bytes()).is_none());
        }

        #[test]
        fn prop_ten_character_tokens_decode_verbatim(token in "[0-9A-Za-z]{10}") {
            let card = CardId::from_scan(token.as_bytes()).unwrap();
            prop_assert_eq!(card.as_str(), token.as_str());
        }

        #[test]
        fn prop_non_utf8_tokens_never_decode(
            prefix in proptest::collection::vec(0x30u8..0x3a, 0..10),
        ) {
            let mut raw = prefix;
            raw.push(0xff);
            prop_assert!(CardId::from_scan(&raw).is_none());
        }
    }
}
