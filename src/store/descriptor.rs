//! Collection descriptor: persisted compatibility metadata.
//!
//! Every collection carries a small JSON file recording the embedding
//! dimension and model identity it was built with. The lifecycle check reads
//! it at every process start; a collection without one is treated as legacy
//! and invalidated.

use crate::store::{StoreError, StoreResult};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name of the descriptor inside a collection directory.
pub const DESCRIPTOR_FILE: &str = "metadata.json";

/// Metadata identifying what a persisted collection was built with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDescriptor {
    /// Dimension of the stored embeddings
    pub dimension: usize,

    /// Identifier of the embedding model that produced them
    pub model: String,

    /// Unix timestamp when the collection was (re)built
    pub created_at: u64,

    /// Version of the descriptor format
    pub version: u32,
}

impl CollectionDescriptor {
    /// Current descriptor format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a descriptor for a collection being built now.
    pub fn new(dimension: usize, model: impl Into<String>) -> Self {
        Self {
            dimension,
            model: model.into(),
            created_at: Utc::now().timestamp() as u64,
            version: Self::CURRENT_VERSION,
        }
    }

    /// Save the descriptor into a collection directory.
    pub fn save(&self, dir: &Path) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dir.join(DESCRIPTOR_FILE), json)?;
        Ok(())
    }

    /// Load the descriptor from a collection directory.
    pub fn load(dir: &Path) -> StoreResult<Self> {
        let json = std::fs::read_to_string(dir.join(DESCRIPTOR_FILE))?;
        let descriptor: Self = serde_json::from_str(&json)?;

        if descriptor.version > Self::CURRENT_VERSION {
            return Err(StoreError::VersionMismatch {
                expected: Self::CURRENT_VERSION,
                actual: descriptor.version,
            });
        }

        Ok(descriptor)
    }

    /// Check whether a descriptor file exists in a collection directory.
    pub fn exists(dir: &Path) -> bool {
        dir.join(DESCRIPTOR_FILE).exists()
    }
}
