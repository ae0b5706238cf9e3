//! BM25 lexical index over the document corpus.
//!
//! Wraps the [`bm25`](https://crates.io/crates/bm25) crate: one `Embedder`
//! is fit to the corpus at build time and embeds both documents and queries,
//! so document and query tokenization are always symmetric. Scores are
//! reported per document, aligned to build order, which is what the hybrid
//! fusion step consumes.
//!
//! Tokenization is the crate's English pipeline (lowercasing, stemming,
//! stopword removal). It is deterministic; a query term matches a document
//! term whenever both normalize to the same token.

use bm25::{Embedder, EmbedderBuilder, Language, Scorer};

/// In-memory BM25 index, rebuilt from scratch on every ingest.
///
/// Not thread-safe for mutation; the retriever owns exactly one instance and
/// replaces it wholesale after a successful build.
pub struct LexicalIndex {
    embedder: Embedder,
    scorer: Scorer<usize>,
    doc_count: usize,
}

impl LexicalIndex {
    /// Builds an index over `documents`, keyed by position.
    pub fn build(documents: &[&str]) -> Self {
        let embedder = EmbedderBuilder::with_fit_to_corpus(Language::English, documents).build();

        let mut scorer = Scorer::<usize>::new();
        for (position, text) in documents.iter().enumerate() {
            scorer.upsert(&position, embedder.embed(text));
        }

        Self {
            embedder,
            scorer,
            doc_count: documents.len(),
        }
    }

    /// BM25 score of `query` against every document, aligned to build order.
    ///
    /// Documents sharing no term with the query score 0.0.
    pub fn scores(&self, query: &str) -> Vec<f32> {
        let mut scores = vec![0.0_f32; self.doc_count];
        let query_embedding = self.embedder.embed(query);
        for scored in self.scorer.matches(&query_embedding) {
            if let Some(slot) = scores.get_mut(scored.id) {
                *slot = scored.score;
            }
        }
        scores
    }

    /// The `k` highest-scoring document positions.
    ///
    /// Ordered by descending score; equal scores break ties by ascending
    /// position, so the slate is fully deterministic.
    pub fn top_positions(&self, query: &str, k: usize) -> Vec<usize> {
        let scores = self.scores(query);
        let mut positions: Vec<usize> = (0..scores.len()).collect();
        positions.sort_by(|&a, &b| {
            scores[b]
                .partial_cmp(&scores[a])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.cmp(&b))
        });
        positions.truncate(k);
        positions
    }

    /// Returns the number of indexed documents.
    pub fn len(&self) -> usize {
        self.doc_count
    }

    /// Returns `true` if no documents have been indexed.
    pub fn is_empty(&self) -> bool {
        self.doc_count == 0
    }
}
