//! Collection lifecycle: validate-or-rebuild at startup.
//!
//! This is the only path allowed to destroy durable data, and it runs
//! before any build or search in a process lifetime. Validation returns an
//! explicit reason instead of routing "collection invalid" through a caught
//! error, so callers can log exactly why a rebuild happened.

use std::sync::Arc;

use tracing::{info, warn};

use crate::embedding::EmbeddingProvider;
use crate::store::descriptor::CollectionDescriptor;
use crate::store::{CollectionStore, StoreResult, VectorCollection};

/// Why a persisted collection cannot be kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    /// No collection exists under the configured name
    Missing,
    /// The collection predates descriptors (legacy layout)
    MissingDescriptor,
    /// Persisted state exists but cannot be read
    Unreadable { detail: String },
    /// Descriptor dimension disagrees with the live provider
    DimensionMismatch { recorded: usize, expected: usize },
    /// Descriptor model identity disagrees with the live provider
    ModelMismatch { recorded: String, expected: String },
}

impl std::fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing => write!(f, "collection does not exist"),
            Self::MissingDescriptor => {
                write!(f, "legacy collection without descriptor metadata")
            }
            Self::Unreadable { detail } => write!(f, "persisted state unreadable: {detail}"),
            Self::DimensionMismatch { recorded, expected } => {
                write!(f, "dimension mismatch ({recorded} vs {expected})")
            }
            Self::ModelMismatch { recorded, expected } => {
                write!(f, "model mismatch ('{recorded}' vs '{expected}')")
            }
        }
    }
}

/// Check whether the persisted collection is compatible with the live
/// embedding provider. Returns the open handle if so, the reason if not.
pub fn validate(
    store: &CollectionStore,
    name: &str,
    provider: Arc<dyn EmbeddingProvider>,
) -> Result<VectorCollection, InvalidReason> {
    let path = store.collection_path(name);
    if !store.has_collection(name) {
        return Err(InvalidReason::Missing);
    }
    if !CollectionDescriptor::exists(&path) {
        warn!("Legacy collection '{name}' without metadata found");
        return Err(InvalidReason::MissingDescriptor);
    }

    let descriptor = match CollectionDescriptor::load(&path) {
        Ok(descriptor) => descriptor,
        Err(e) => {
            return Err(InvalidReason::Unreadable {
                detail: e.to_string(),
            });
        }
    };

    let expected_dimension = provider.dimension();
    if descriptor.dimension != expected_dimension {
        warn!(
            "Dimension mismatch ({} vs {expected_dimension})",
            descriptor.dimension
        );
        return Err(InvalidReason::DimensionMismatch {
            recorded: descriptor.dimension,
            expected: expected_dimension,
        });
    }

    if descriptor.model != provider.model_id() {
        warn!(
            "Model mismatch ('{}' vs '{}')",
            descriptor.model,
            provider.model_id()
        );
        return Err(InvalidReason::ModelMismatch {
            recorded: descriptor.model,
            expected: provider.model_id().to_string(),
        });
    }

    store
        .open_collection(name, provider)
        .map_err(|e| InvalidReason::Unreadable {
            detail: e.to_string(),
        })
}

/// Return a valid collection handle, rebuilding the persisted collection if
/// the compatibility check fails.
///
/// On rebuild: the named collection is deleted (a failed delete is logged,
/// not fatal, since the purge sweeps after it), remaining files under the
/// collection directory are removed best-effort, and a fresh collection is
/// created tagged with the provider's dimension and model identity.
pub fn ensure_valid(
    store: &CollectionStore,
    name: &str,
    provider: Arc<dyn EmbeddingProvider>,
) -> StoreResult<VectorCollection> {
    match validate(store, name, provider.clone()) {
        Ok(collection) => Ok(collection),
        Err(reason) => {
            info!("Creating new collection '{name}': {reason}");

            if let Err(e) = store.delete_collection(name) {
                info!("Collection delete error: {e}");
            }
            store.purge_collection_dir(name);

            let descriptor = CollectionDescriptor::new(provider.dimension(), provider.model_id());
            store.create_collection(name, descriptor, provider)
        }
    }
}
