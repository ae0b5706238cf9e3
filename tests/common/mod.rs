//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lectern::{
    AnswerGenerator, EmbeddingError, EmbeddingProvider, GenerationError, Settings, StudentLevel,
};
use tempfile::TempDir;

/// Deterministic embedding provider for tests.
///
/// Embeddings are unit vectors derived from the text bytes, so identical
/// texts embed identically and similarity search behaves predictably.
/// `salt` perturbs the mapping, simulating a changed model with the same
/// dimension; `start_failing` makes every subsequent call error, simulating
/// an embedding backend outage.
pub struct HashedEmbedding {
    dimension: usize,
    model_id: String,
    salt: u64,
    fail_now: AtomicBool,
}

impl HashedEmbedding {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            model_id: "mock-embedding".to_string(),
            salt: 0,
            fail_now: AtomicBool::new(false),
        }
    }

    pub fn with_salt(dimension: usize, salt: u64) -> Self {
        Self {
            salt,
            ..Self::new(dimension)
        }
    }

    pub fn with_model_id(dimension: usize, model_id: &str) -> Self {
        Self {
            model_id: model_id.to_string(),
            ..Self::new(dimension)
        }
    }

    /// Make every embedding call from now on fail.
    pub fn start_failing(&self) {
        self.fail_now.store(true, Ordering::SeqCst);
    }
}

impl EmbeddingProvider for HashedEmbedding {
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.fail_now.load(Ordering::SeqCst) {
            return Err(EmbeddingError::EmbeddingFailed(
                "injected embedding failure".to_string(),
            ));
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            let mut embedding = vec![0.1_f32; self.dimension];
            for (i, byte) in text.bytes().enumerate() {
                let slot = (i + self.salt as usize) % self.dimension;
                embedding[slot] += f32::from(byte) / 255.0;
            }
            embedding[0] += self.salt as f32 * 0.01;
            let magnitude: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
            for value in &mut embedding {
                *value /= magnitude;
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

/// Generator stub that echoes its inputs, making assertions easy.
pub struct EchoGenerator;

impl AnswerGenerator for EchoGenerator {
    fn generate(
        &self,
        context: &str,
        query: &str,
        level: StudentLevel,
        _images: Option<&[PathBuf]>,
    ) -> Result<String, GenerationError> {
        Ok(format!("[{level}] Q: {query} CONTEXT: {context}"))
    }
}

/// Settings rooted under a fresh temp dir, plus the dir guard.
pub fn test_settings() -> (TempDir, Arc<Settings>) {
    init_tracing();
    let temp_dir = TempDir::new().unwrap();
    let settings = Arc::new(Settings::rooted_at(temp_dir.path()));
    (temp_dir, settings)
}

/// Route log output through the test harness. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("lectern=debug")
        .try_init();
}
