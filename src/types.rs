//! Core identity types shared across the retrieval subsystem.
//!
//! Documents are joined across the vector store, the lexical index, and the
//! in-memory cache by an explicit [`DocumentId`] instead of implicit build
//! order. The id is assigned once at ingest time and threaded through all
//! three structures.

use serde::{Deserialize, Serialize};

/// Default number of results returned by hybrid search.
pub const DEFAULT_TOP_K: usize = 5;

/// Identifier for one ingested document.
///
/// Equal to the document's zero-based position in the ingest batch, so ids
/// round-trip losslessly through the string form the vector store persists.
/// Position zero is valid, so this wraps a plain `u32`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct DocumentId(u32);

impl DocumentId {
    /// Creates a new `DocumentId`.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying u32 value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns the id as an index into the ordered document cache.
    #[must_use]
    pub const fn as_index(&self) -> usize {
        self.0 as usize
    }

    /// Converts to little-endian bytes for segment storage.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    /// Creates from little-endian bytes.
    #[must_use]
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }
}

impl std::fmt::Display for DocumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u32>().map(Self)
    }
}

/// One ingested document with its stable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub text: String,
}

impl DocumentRecord {
    /// Creates a new record.
    pub fn new(id: DocumentId, text: impl Into<String>) -> Self {
        Self {
            id,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_id_byte_round_trip() {
        let id = DocumentId::new(12345);
        let bytes = id.to_bytes();
        assert_eq!(DocumentId::from_bytes(bytes), id);

        // Zero is a valid position
        let zero = DocumentId::new(0);
        assert_eq!(DocumentId::from_bytes(zero.to_bytes()), zero);
    }

    #[test]
    fn test_document_id_string_round_trip() {
        let id = DocumentId::new(7);
        assert_eq!(id.to_string(), "7");
        assert_eq!("7".parse::<DocumentId>().unwrap(), id);

        assert!("not-a-number".parse::<DocumentId>().is_err());
        assert!("-1".parse::<DocumentId>().is_err());
    }

    #[test]
    fn test_document_id_ordering() {
        let a = DocumentId::new(1);
        let b = DocumentId::new(2);
        assert!(a < b);
        assert_eq!(a.as_index(), 1);
    }

    #[test]
    fn test_document_record() {
        let record = DocumentRecord::new(DocumentId::new(3), "cell biology");
        assert_eq!(record.id.get(), 3);
        assert_eq!(record.text, "cell biology");
    }
}
