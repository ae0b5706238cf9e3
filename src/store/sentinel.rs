//! Model-version sentinel: coarse, file-based invalidation trigger.
//!
//! Independent of the per-collection descriptor check, a hash of a probe
//! embedding fingerprints the embedding model actually in use. The sentinel
//! is checked once per ingest run, before the lifecycle validation, so the
//! lifecycle never opens a directory the sentinel is about to clear. Either
//! mechanism invalidating is enough to rebuild.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::warn;

use crate::embedding::EmbeddingProvider;
use crate::store::{CollectionStore, StoreResult};

/// File name of the persisted model fingerprint.
pub const SENTINEL_FILE: &str = "model_version.hash";

/// Text embedded to fingerprint the model. Any drift in the model's output
/// for this probe changes the hash.
const PROBE_TEXT: &str = "model_version_check";

/// Persisted fingerprint of the embedding model in use.
#[derive(Debug)]
pub struct ModelSentinel {
    path: PathBuf,
}

impl ModelSentinel {
    /// Sentinel file under the index root.
    pub fn new(index_root: &Path) -> Self {
        Self {
            path: index_root.join(SENTINEL_FILE),
        }
    }

    /// Compare the live model's fingerprint against the persisted one, clear
    /// the named collection's directory if they disagree, and persist the
    /// current fingerprint for the next run.
    ///
    /// Returns `true` if the model changed and the collection was cleared.
    pub fn check_and_update(
        &self,
        provider: &dyn EmbeddingProvider,
        store: &CollectionStore,
        collection: &str,
    ) -> StoreResult<bool> {
        let current = fingerprint(provider)?;

        let changed = match std::fs::read_to_string(&self.path) {
            Ok(saved) => saved != current,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        if changed {
            warn!("Embedding model changed, resetting vector store");
            store.purge_collection_dir(collection);
        }

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, &current)?;

        Ok(changed)
    }
}

/// SHA-256 hex digest over the probe embedding's bytes.
fn fingerprint(provider: &dyn EmbeddingProvider) -> StoreResult<String> {
    let embedding = provider.embed(PROBE_TEXT)?;

    let mut hasher = Sha256::new();
    for value in &embedding {
        hasher.update(value.to_le_bytes());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::MockEmbeddingProvider;
    use tempfile::TempDir;

    #[test]
    fn test_first_run_writes_hash_without_reset() {
        let temp_dir = TempDir::new().unwrap();
        let store = CollectionStore::new(temp_dir.path());
        let provider = MockEmbeddingProvider::new(8);

        let sentinel = ModelSentinel::new(temp_dir.path());
        let changed = sentinel
            .check_and_update(&provider, &store, "lecture_materials")
            .unwrap();

        assert!(!changed);
        assert!(temp_dir.path().join(SENTINEL_FILE).exists());
    }

    #[test]
    fn test_same_model_leaves_data_alone() {
        let temp_dir = TempDir::new().unwrap();
        let store = CollectionStore::new(temp_dir.path());
        let provider = MockEmbeddingProvider::new(8);
        let sentinel = ModelSentinel::new(temp_dir.path());

        sentinel
            .check_and_update(&provider, &store, "lecture_materials")
            .unwrap();

        // Plant a file that a reset would remove
        let collection_dir = store.collection_path("lecture_materials");
        std::fs::create_dir_all(&collection_dir).unwrap();
        std::fs::write(collection_dir.join("segment_0.vec"), b"data").unwrap();

        let changed = sentinel
            .check_and_update(&provider, &store, "lecture_materials")
            .unwrap();
        assert!(!changed);
        assert!(collection_dir.join("segment_0.vec").exists());
    }

    #[test]
    fn test_model_change_clears_collection() {
        let temp_dir = TempDir::new().unwrap();
        let store = CollectionStore::new(temp_dir.path());
        let sentinel = ModelSentinel::new(temp_dir.path());

        // First run with an 8-dimensional model
        sentinel
            .check_and_update(
                &MockEmbeddingProvider::new(8),
                &store,
                "lecture_materials",
            )
            .unwrap();

        let collection_dir = store.collection_path("lecture_materials");
        std::fs::create_dir_all(&collection_dir).unwrap();
        std::fs::write(collection_dir.join("segment_0.vec"), b"stale").unwrap();

        // Second run with a different model: probe embedding differs
        let changed = sentinel
            .check_and_update(
                &MockEmbeddingProvider::new(16),
                &store,
                "lecture_materials",
            )
            .unwrap();

        assert!(changed);
        assert!(!collection_dir.exists());
    }

    #[test]
    fn test_fingerprint_is_stable() {
        let provider = MockEmbeddingProvider::new(8);
        let first = fingerprint(&provider).unwrap();
        let second = fingerprint(&provider).unwrap();
        assert_eq!(first, second);

        let other = fingerprint(&MockEmbeddingProvider::new(16)).unwrap();
        assert_ne!(first, other);
    }
}
