//! Persisted vector collections and their lifecycle.
//!
//! A [`CollectionStore`] roots one or more named collections on disk. Each
//! collection directory holds a JSON descriptor (embedding dimension and
//! model identity), a binary vector segment, and a JSON document sidecar.
//! The lifecycle module validates a persisted collection against the live
//! embedding provider and rebuilds it when they disagree; the sentinel
//! module is the coarser, file-hash-based trigger for the same invalidation.

mod collection;
mod descriptor;
mod lifecycle;
mod segment;
mod sentinel;

pub use collection::{CollectionStore, QueryMatch, VectorCollection};
pub use descriptor::CollectionDescriptor;
pub use lifecycle::{InvalidReason, ensure_valid, validate};
pub use segment::VectorSegmentFile;
pub use sentinel::ModelSentinel;

use crate::embedding::EmbeddingError;
use thiserror::Error;

/// Errors from vector-store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error in vector store: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid storage format: {0}")]
    InvalidFormat(String),

    #[error("Invalid storage version: expected {expected}, got {actual}")]
    VersionMismatch { expected: u32, actual: u32 },

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Batch length mismatch: {field} has {actual} entries, expected {expected}")]
    BatchLengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Collection '{0}' not found")]
    MissingCollection(String),

    #[error("Collection '{0}' has no descriptor metadata")]
    MissingDescriptor(String),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
}

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
