//! Hybrid retriever: dense vector search fused with BM25 keyword search.
//!
//! The retriever owns the lexical index and the in-memory document cache for
//! the lifetime of the process, and holds a handle to the durable vector
//! collection. `build_indices` replaces all retriever state wholesale;
//! `search` fuses the two rankings into one slate of document texts.
//!
//! # Failure policy
//!
//! Build failures are logged and propagated: a failed build leaves the
//! indices indeterminate and the caller must not search afterwards. Search
//! failures are logged and suppressed to an empty result, keeping the
//! interactive path alive. See the module docs on `store` for what happens
//! to durable state.
//!
//! # Concurrency
//!
//! Single-threaded: `build_indices` takes `&mut self` and
//! `search` takes `&self`, so a rebuild is exclusive with every reader and
//! the in-memory swap happens only after both indices are fully staged.
//! Embedding and store I/O are blocking calls with no timeout.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::Settings;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::lexical::LexicalIndex;
use crate::store::{self, CollectionStore, StoreError, VectorCollection};
use crate::types::{DocumentId, DocumentRecord};

/// Errors from retriever operations.
///
/// `search` never surfaces these; `build_indices` and construction do.
#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(
        "Search result position {position} is outside the document cache (len {cache_len}); rebuild the indices"
    )]
    IndexOutOfSync { position: usize, cache_len: usize },
}

/// Hybrid search over lecture documents.
pub struct HybridRetriever {
    settings: Arc<Settings>,
    provider: Arc<dyn EmbeddingProvider>,
    store: CollectionStore,
    collection: VectorCollection,
    lexical: Option<LexicalIndex>,
    documents: Vec<DocumentRecord>,
}

impl std::fmt::Debug for HybridRetriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HybridRetriever")
            .field("collection", &self.collection)
            .field("documents", &self.documents.len())
            .field("lexical_built", &self.lexical.is_some())
            .finish()
    }
}

impl HybridRetriever {
    /// Create a retriever over the configured text collection.
    ///
    /// Runs the collection lifecycle check: an incompatible or unreadable
    /// persisted collection is invalidated and recreated here, before any
    /// build or search can happen.
    pub fn new(
        settings: Arc<Settings>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, RetrievalError> {
        let store = CollectionStore::new(settings.index_path.clone());
        let collection = store::ensure_valid(
            &store,
            &settings.retrieval.text_collection,
            provider.clone(),
        )?;

        Ok(Self {
            settings,
            provider,
            store,
            collection,
            lexical: None,
            documents: Vec::new(),
        })
    }

    /// Re-run the lifecycle check and replace the collection handle.
    ///
    /// The ingest pipeline calls this after the model sentinel, which may
    /// have cleared the collection directory out from under the handle.
    pub fn ensure_collection(&mut self) -> Result<(), RetrievalError> {
        self.collection = store::ensure_valid(
            &self.store,
            &self.settings.retrieval.text_collection,
            self.provider.clone(),
        )?;
        Ok(())
    }

    /// The embedding provider in use.
    pub fn provider(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.provider
    }

    /// The collection store this retriever persists into.
    pub fn store(&self) -> &CollectionStore {
        &self.store
    }

    /// Number of documents currently indexed.
    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    /// Build both indices from a document set.
    ///
    /// An empty input is a warning and a no-op; prior state is untouched.
    /// Otherwise everything is staged first (embeddings, lexical index,
    /// record cache), the staged entries are written to the vector store
    /// with metadata `{"source": "document"}` and ids equal to their
    /// zero-based position, and only then is the in-memory state swapped.
    /// Any failure is logged and propagated; no partial swap happens.
    #[instrument(skip_all, fields(documents = documents.len()))]
    pub fn build_indices(&mut self, documents: Vec<String>) -> Result<(), RetrievalError> {
        if documents.is_empty() {
            warn!("No documents provided for indexing");
            return Ok(());
        }

        match self.stage_and_commit(documents) {
            Ok(count) => {
                info!("Built indices for {count} documents");
                Ok(())
            }
            Err(e) => {
                error!("Error building indices: {e}");
                Err(e)
            }
        }
    }

    fn stage_and_commit(&mut self, documents: Vec<String>) -> Result<usize, RetrievalError> {
        let records: Vec<DocumentRecord> = documents
            .into_iter()
            .enumerate()
            .map(|(position, text)| DocumentRecord::new(DocumentId::new(position as u32), text))
            .collect();
        let texts: Vec<&str> = records.iter().map(|record| record.text.as_str()).collect();

        // Stage every artifact before the durable write, so a lexical or
        // embedding failure cannot leave the store ahead of the cache.
        let embeddings = self.provider.embed_batch(&texts)?;
        let lexical = LexicalIndex::build(&texts);
        let metadata: Vec<HashMap<String, String>> = records
            .iter()
            .map(|_| HashMap::from([("source".to_string(), "document".to_string())]))
            .collect();

        self.collection.add(&records, &embeddings, &metadata)?;

        let count = records.len();
        self.lexical = Some(lexical);
        self.documents = records;
        Ok(count)
    }

    /// Hybrid search: fused vector and keyword results, mapped to document
    /// text.
    ///
    /// Returns an empty list if nothing is indexed. The fused ordering is
    /// positional (ascending document position), not relevance order: the
    /// union of both paths' positions, truncated to `top_k`. Errors never
    /// propagate: any failure is logged and degrades to an empty result.
    #[instrument(skip(self))]
    pub fn search(&self, query: &str, top_k: usize) -> Vec<String> {
        if self.documents.is_empty() {
            warn!("No documents indexed, returning empty results");
            return Vec::new();
        }

        match self.try_search(query, top_k) {
            Ok(results) => results,
            Err(e) => {
                error!("Search failed: {e}");
                Vec::new()
            }
        }
    }

    fn try_search(&self, query: &str, top_k: usize) -> Result<Vec<String>, RetrievalError> {
        let vector_matches = self.collection.query(query, top_k)?;
        let vector_positions = vector_matches.iter().map(|m| m.id.as_index());

        let lexical_positions = self
            .lexical
            .as_ref()
            .map(|index| index.top_positions(query, top_k))
            .unwrap_or_default();

        let fused = fuse_positions(vector_positions, lexical_positions, top_k);

        fused
            .into_iter()
            .map(|position| {
                self.documents
                    .get(position)
                    .map(|record| record.text.clone())
                    .ok_or(RetrievalError::IndexOutOfSync {
                        position,
                        cache_len: self.documents.len(),
                    })
            })
            .collect()
    }
}

/// Merge the vector-path and lexical-path positions into one slate.
///
/// The union of both sets, in ascending position order, truncated to
/// `top_k`. This is deliberately positional rather than a relevance
/// re-ranking: a document surfaced by either path qualifies, and the slate
/// order follows ingest order.
pub fn fuse_positions(
    vector: impl IntoIterator<Item = usize>,
    lexical: impl IntoIterator<Item = usize>,
    top_k: usize,
) -> Vec<usize> {
    let unique: BTreeSet<usize> = vector.into_iter().chain(lexical).collect();
    unique.into_iter().take(top_k).collect()
}
