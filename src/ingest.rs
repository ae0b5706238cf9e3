//! Ingest pipeline: raw lecture files to searchable indices.
//!
//! One run checks the model-version sentinel (which may reset the persisted
//! store), re-validates the collection, extracts one document per file from
//! the raw-materials directory, and rebuilds both indices. Per-file
//! extraction failures degrade to empty documents; a build failure aborts
//! the run.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

use crate::config::Settings;
use crate::extract::{PlainTextExtractor, TextExtractor};
use crate::retriever::{HybridRetriever, RetrievalError};
use crate::store::{ModelSentinel, StoreError};

/// Errors that abort an ingest run.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What one ingest run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// Files found in the raw-materials directory
    pub files_seen: usize,
    /// Documents indexed after the run
    pub documents_indexed: usize,
    /// Whether the model sentinel reset the persisted store
    pub store_reset: bool,
}

/// Drives one ingest run over the configured raw-materials directory.
pub struct IngestPipeline {
    settings: Arc<Settings>,
    extractor: Box<dyn TextExtractor>,
}

impl IngestPipeline {
    /// Pipeline with the plain-text extractor.
    pub fn new(settings: Arc<Settings>) -> Self {
        Self::with_extractor(settings, Box::new(PlainTextExtractor))
    }

    /// Pipeline with a custom extractor (PDF, slides, ...).
    pub fn with_extractor(settings: Arc<Settings>, extractor: Box<dyn TextExtractor>) -> Self {
        Self {
            settings,
            extractor,
        }
    }

    /// Run the pipeline: sentinel check, collection re-validation,
    /// extraction, index build.
    ///
    /// The sentinel runs first so the lifecycle check never keeps a handle
    /// to a directory the sentinel clears; both invalidation triggers run
    /// on every ingest and either one is enough to rebuild.
    #[instrument(skip_all)]
    pub fn run(&self, retriever: &mut HybridRetriever) -> Result<IngestReport, IngestError> {
        let sentinel = ModelSentinel::new(&self.settings.index_path);
        let store_reset = sentinel.check_and_update(
            retriever.provider().as_ref(),
            retriever.store(),
            &self.settings.retrieval.text_collection,
        )?;
        retriever.ensure_collection()?;

        let documents = self.extract_documents();
        let files_seen = documents.len();

        retriever.build_indices(documents)?;

        let report = IngestReport {
            files_seen,
            documents_indexed: retriever.document_count(),
            store_reset,
        };
        info!(
            "Ingest complete: {} files, {} documents indexed",
            report.files_seen, report.documents_indexed
        );
        Ok(report)
    }

    /// One document per file in the raw directory, in path order.
    ///
    /// A missing directory yields no documents; unreadable directory
    /// entries are skipped with a warning.
    fn extract_documents(&self) -> Vec<String> {
        let raw_dir = &self.settings.raw_path;
        if !raw_dir.is_dir() {
            warn!(
                "Raw materials directory {} not found",
                raw_dir.display()
            );
            return Vec::new();
        }

        let mut files: Vec<PathBuf> = WalkDir::new(raw_dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_file() => Some(entry.into_path()),
                Ok(_) => None,
                Err(e) => {
                    warn!("Skipping unreadable directory entry: {e}");
                    None
                }
            })
            .collect();
        files.sort();

        files
            .iter()
            .map(|path| self.extractor.extract_text(path))
            .collect()
    }
}
