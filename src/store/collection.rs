//! Named vector collections and the store that roots them.
//!
//! A collection keeps (embedding, document, metadata) entries. Embeddings
//! live in the binary segment file, document text and metadata in a JSON
//! sidecar, and the compatibility descriptor alongside both. Entries are
//! held in memory once loaded; every mutation stages the full new state in
//! temporary files before renaming anything into place, so a failed write
//! leaves the previous snapshot intact. A torn commit (crash between the
//! two renames) is detected at open time and invalidates the collection.
//!
//! Similarity metric: cosine, which is what the MiniLM-family embedding
//! models are tuned for. Matches are ordered by descending score with an
//! ascending-id tie-break.
//!
//! Id-collision policy for `add`: upsert, last write wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::embedding::EmbeddingProvider;
use crate::store::descriptor::CollectionDescriptor;
use crate::store::segment::VectorSegmentFile;
use crate::store::{StoreError, StoreResult};
use crate::types::{DocumentId, DocumentRecord};

/// File name of the document sidecar inside a collection directory.
const DOCUMENTS_FILE: &str = "documents.json";

/// Root directory holding named collections.
#[derive(Debug, Clone)]
pub struct CollectionStore {
    root: PathBuf,
}

impl CollectionStore {
    /// Create a store rooted at `root`. Nothing is touched on disk until a
    /// collection is created.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory a named collection persists under.
    pub fn collection_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Whether a directory exists for the named collection.
    pub fn has_collection(&self, name: &str) -> bool {
        self.collection_path(name).is_dir()
    }

    /// Open an existing collection.
    pub fn open_collection(
        &self,
        name: &str,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> StoreResult<VectorCollection> {
        let path = self.collection_path(name);
        if !path.is_dir() {
            return Err(StoreError::MissingCollection(name.to_string()));
        }
        if !CollectionDescriptor::exists(&path) {
            return Err(StoreError::MissingDescriptor(name.to_string()));
        }
        let descriptor = CollectionDescriptor::load(&path)?;
        VectorCollection::open(name, path, descriptor, provider)
    }

    /// Create a fresh collection tagged with `descriptor`. Previous state
    /// under the directory is expected to have been removed by the
    /// lifecycle cleanup.
    pub fn create_collection(
        &self,
        name: &str,
        descriptor: CollectionDescriptor,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> StoreResult<VectorCollection> {
        let path = self.collection_path(name);
        std::fs::create_dir_all(&path)?;
        descriptor.save(&path)?;

        let collection = VectorCollection {
            name: name.to_string(),
            path,
            descriptor,
            provider,
            entries: Vec::new(),
        };
        collection.persist()?;
        Ok(collection)
    }

    /// Delete the named collection's known files and directory.
    ///
    /// A missing collection is not an error.
    pub fn delete_collection(&self, name: &str) -> StoreResult<()> {
        let path = self.collection_path(name);
        if !path.exists() {
            info!("Collection '{name}' not present, nothing to delete");
            return Ok(());
        }
        std::fs::remove_dir_all(&path)?;
        Ok(())
    }

    /// Best-effort removal of everything left under the named collection's
    /// directory. Per-item failures are logged, never fatal.
    pub fn purge_collection_dir(&self, name: &str) {
        let path = self.collection_path(name);
        let entries = match std::fs::read_dir(&path) {
            Ok(entries) => entries,
            // Nothing left to purge
            Err(_) => return,
        };

        for entry in entries {
            let item = match entry {
                Ok(item) => item.path(),
                Err(e) => {
                    warn!("Cleanup could not list an entry under {}: {e}", path.display());
                    continue;
                }
            };
            let result = if item.is_dir() {
                std::fs::remove_dir_all(&item)
            } else {
                std::fs::remove_file(&item)
            };
            if let Err(e) = result {
                warn!("Cleanup failed for {}: {e}", item.display());
            }
        }

        if let Err(e) = std::fs::remove_dir(&path) {
            warn!("Cleanup failed for {}: {e}", path.display());
        }
    }
}

/// One match returned by a similarity query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: DocumentId,
    pub score: f32,
    pub metadata: HashMap<String, String>,
}

/// Sidecar form of one entry: everything except the embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SidecarEntry {
    id: DocumentId,
    text: String,
    metadata: HashMap<String, String>,
}

/// One in-memory collection entry.
#[derive(Debug, Clone)]
struct CollectionEntry {
    id: DocumentId,
    embedding: Vec<f32>,
    text: String,
    metadata: HashMap<String, String>,
}

/// Handle to a persisted, named vector collection.
///
/// The handle holds the full entry set in memory; queries are a brute-force
/// cosine scan, which is the right trade at lecture-corpus scale.
pub struct VectorCollection {
    name: String,
    path: PathBuf,
    descriptor: CollectionDescriptor,
    provider: Arc<dyn EmbeddingProvider>,
    entries: Vec<CollectionEntry>,
}

impl std::fmt::Debug for VectorCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorCollection")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("descriptor", &self.descriptor)
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl VectorCollection {
    fn open(
        name: &str,
        path: PathBuf,
        descriptor: CollectionDescriptor,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> StoreResult<Self> {
        let segment = VectorSegmentFile::new(&path);
        let (dimension, vectors) = segment.read_all()?;

        if dimension != descriptor.dimension {
            return Err(StoreError::InvalidFormat(format!(
                "segment dimension {dimension} disagrees with descriptor dimension {}",
                descriptor.dimension
            )));
        }

        let sidecar_json = std::fs::read_to_string(path.join(DOCUMENTS_FILE))?;
        let sidecar: Vec<SidecarEntry> = serde_json::from_str(&sidecar_json)?;
        let mut documents: HashMap<DocumentId, SidecarEntry> =
            sidecar.into_iter().map(|entry| (entry.id, entry)).collect();

        let mut entries = Vec::with_capacity(vectors.len());
        for (id, embedding) in vectors {
            let sidecar_entry = documents.remove(&id).ok_or_else(|| {
                StoreError::InvalidFormat(format!(
                    "document sidecar has no entry for vector id {id}"
                ))
            })?;
            entries.push(CollectionEntry {
                id,
                embedding,
                text: sidecar_entry.text,
                metadata: sidecar_entry.metadata,
            });
        }

        if !documents.is_empty() {
            return Err(StoreError::InvalidFormat(format!(
                "document sidecar has {} entries with no stored vector",
                documents.len()
            )));
        }

        Ok(Self {
            name: name.to_string(),
            path,
            descriptor,
            provider,
            entries,
        })
    }

    /// The collection's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The descriptor the collection was built with.
    pub fn descriptor(&self) -> &CollectionDescriptor {
        &self.descriptor
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the collection holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Add a batch of entries.
    ///
    /// All three slices must have equal length, and every embedding must
    /// match the collection's dimension. Entries whose id already exists
    /// overwrite the stored entry (upsert). The new state is persisted
    /// before the call returns.
    pub fn add(
        &mut self,
        records: &[DocumentRecord],
        embeddings: &[Vec<f32>],
        metadata: &[HashMap<String, String>],
    ) -> StoreResult<()> {
        if embeddings.len() != records.len() {
            return Err(StoreError::BatchLengthMismatch {
                field: "embeddings",
                expected: records.len(),
                actual: embeddings.len(),
            });
        }
        if metadata.len() != records.len() {
            return Err(StoreError::BatchLengthMismatch {
                field: "metadata",
                expected: records.len(),
                actual: metadata.len(),
            });
        }
        for embedding in embeddings {
            if embedding.len() != self.descriptor.dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: self.descriptor.dimension,
                    actual: embedding.len(),
                });
            }
        }

        for ((record, embedding), meta) in records.iter().zip(embeddings).zip(metadata) {
            let entry = CollectionEntry {
                id: record.id,
                embedding: embedding.clone(),
                text: record.text.clone(),
                metadata: meta.clone(),
            };
            match self.entries.iter_mut().find(|e| e.id == record.id) {
                Some(existing) => *existing = entry,
                None => self.entries.push(entry),
            }
        }

        self.persist()
    }

    /// Query by text: the query is embedded with the collection's provider
    /// and matched against every entry.
    pub fn query(&self, text: &str, top_k: usize) -> StoreResult<Vec<QueryMatch>> {
        let query_embedding = self.provider.embed(text)?;
        self.query_embedding(&query_embedding, top_k)
    }

    /// Query by embedding: cosine similarity against every entry, descending
    /// score, ascending-id tie-break, truncated to `top_k`.
    pub fn query_embedding(
        &self,
        query_embedding: &[f32],
        top_k: usize,
    ) -> StoreResult<Vec<QueryMatch>> {
        if query_embedding.len() != self.descriptor.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.descriptor.dimension,
                actual: query_embedding.len(),
            });
        }

        let mut matches: Vec<QueryMatch> = self
            .entries
            .iter()
            .map(|entry| QueryMatch {
                id: entry.id,
                score: cosine_similarity(query_embedding, &entry.embedding),
                metadata: entry.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.id.cmp(&b.id))
        });
        matches.truncate(top_k);
        Ok(matches)
    }

    /// Stored text for an id, if present.
    pub fn document_text(&self, id: DocumentId) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| entry.text.as_str())
    }

    /// Persist the full entry set.
    ///
    /// The sidecar is staged first, so any error before the segment commit
    /// leaves the previous snapshot untouched. A crash between the segment
    /// rename and the sidecar rename is caught by the consistency check in
    /// `open`.
    fn persist(&self) -> StoreResult<()> {
        let sidecar: Vec<SidecarEntry> = self
            .entries
            .iter()
            .map(|entry| SidecarEntry {
                id: entry.id,
                text: entry.text.clone(),
                metadata: entry.metadata.clone(),
            })
            .collect();
        let json = serde_json::to_string(&sidecar)?;
        let tmp_path = self.path.join("documents.json.tmp");
        std::fs::write(&tmp_path, json)?;

        let vectors: Vec<(DocumentId, Vec<f32>)> = self
            .entries
            .iter()
            .map(|entry| (entry.id, entry.embedding.clone()))
            .collect();
        VectorSegmentFile::new(&self.path).write_all(self.descriptor.dimension, &vectors)?;

        std::fs::rename(&tmp_path, self.path.join(DOCUMENTS_FILE))?;
        Ok(())
    }
}

/// Cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}
