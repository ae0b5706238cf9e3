//! Embedding generation for vector search.
//!
//! Provides the [`EmbeddingProvider`] trait the rest of the crate is written
//! against, and a production implementation backed by fastembed. The provider
//! exposes its output dimensionality and a model identifier; both feed the
//! collection-compatibility checks in the store lifecycle.

use std::path::Path;
use std::sync::Mutex;

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use thiserror::Error;

/// Errors from embedding generation.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error(
        "Failed to initialize embedding model '{model}': {reason}. Ensure you have an internet connection for first-time model download"
    )]
    ModelInit { model: String, reason: String },

    #[error(
        "Unknown embedding model '{0}'. Supported: AllMiniLML6V2, AllMiniLML12V2, BGESmallENV15, BGEBaseENV15"
    )]
    UnknownModel(String),

    #[error("Failed to generate embeddings: {0}")]
    EmbeddingFailed(String),

    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Trait for generating text embeddings.
///
/// Implementations must be thread-safe and should handle batches
/// efficiently. All vectors from one provider have the same dimension.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate embeddings for multiple texts, one vector per input.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Dimension of the vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Stable identifier of the underlying model, recorded in collection
    /// descriptors for compatibility checks.
    fn model_id(&self) -> &str;

    /// Generate an embedding for a single text.
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut batch = self.embed_batch(&[text])?;
        batch
            .pop()
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("empty batch result".to_string()))
    }
}

/// FastEmbed-backed provider.
///
/// Wraps `TextEmbedding` in a `Mutex` for interior mutability; the model's
/// output dimension is probed once at construction with a test embedding.
pub struct FastEmbedProvider {
    model: Mutex<TextEmbedding>,
    model_id: String,
    dimension: usize,
}

impl FastEmbedProvider {
    /// Create a provider for the named model, caching weights under
    /// `cache_dir`.
    ///
    /// # Errors
    /// Returns an error if the model name is unknown or the model fails to
    /// initialize or download.
    pub fn new(model_id: &str, cache_dir: &Path) -> Result<Self, EmbeddingError> {
        let model_kind = parse_embedding_model(model_id)?;

        let mut model = TextEmbedding::try_new(
            InitOptions::new(model_kind)
                .with_cache_dir(cache_dir.to_path_buf())
                .with_show_download_progress(false),
        )
        .map_err(|e| EmbeddingError::ModelInit {
            model: model_id.to_string(),
            reason: e.to_string(),
        })?;

        // Probe the dimension rather than hard-coding it per model
        let probe = model
            .embed(vec!["dimension probe"], None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;
        let dimension = probe
            .into_iter()
            .next()
            .map(|v| v.len())
            .ok_or_else(|| EmbeddingError::EmbeddingFailed("empty probe result".to_string()))?;

        Ok(Self {
            model: Mutex::new(model),
            model_id: model_id.to_string(),
            dimension,
        })
    }
}

impl EmbeddingProvider for FastEmbedProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let text_strings: Vec<String> = texts.iter().map(|&s| s.to_string()).collect();

        let embeddings = self
            .model
            .lock()
            .map_err(|_| {
                EmbeddingError::EmbeddingFailed(
                    "embedding model lock poisoned by a panic in another thread".to_string(),
                )
            })?
            .embed(text_strings, None)
            .map_err(|e| EmbeddingError::EmbeddingFailed(e.to_string()))?;

        for embedding in &embeddings {
            if embedding.len() != self.dimension {
                return Err(EmbeddingError::DimensionMismatch {
                    expected: self.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

/// Maps a configured model name to a fastembed model.
fn parse_embedding_model(model_id: &str) -> Result<EmbeddingModel, EmbeddingError> {
    match model_id {
        "AllMiniLML6V2" | "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "AllMiniLML12V2" | "all-MiniLM-L12-v2" => Ok(EmbeddingModel::AllMiniLML12V2),
        "BGESmallENV15" | "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        "BGEBaseENV15" | "bge-base-en-v1.5" => Ok(EmbeddingModel::BGEBaseENV15),
        other => Err(EmbeddingError::UnknownModel(other.to_string())),
    }
}

/// Mock provider for unit tests: deterministic unit vectors derived from
/// text content, with a configurable dimension.
#[cfg(test)]
pub struct MockEmbeddingProvider {
    dimension: usize,
    model_id: String,
}

#[cfg(test)]
impl MockEmbeddingProvider {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_id: "mock-embedding".to_string(),
        }
    }
}

#[cfg(test)]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            let mut embedding = vec![0.1_f32; self.dimension];
            for (i, byte) in text.bytes().enumerate() {
                let slot = i % self.dimension;
                embedding[slot] += f32::from(byte) / 255.0;
            }
            let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            if magnitude > 0.0 {
                for value in &mut embedding {
                    *value /= magnitude;
                }
            }
            embeddings.push(embedding);
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
