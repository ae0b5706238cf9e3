//! Answer orchestration: retrieve context, hand it to the generator.
//!
//! The language-model call itself lives behind [`AnswerGenerator`]; this
//! crate only assembles the context string from hybrid search results and
//! forwards the student level from configuration.

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::Settings;
use crate::retriever::HybridRetriever;

/// How much scaffolding the answer should assume the student needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StudentLevel {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl std::fmt::Display for StudentLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Beginner => write!(f, "beginner"),
            Self::Intermediate => write!(f, "intermediate"),
            Self::Advanced => write!(f, "advanced"),
        }
    }
}

/// Errors from answer generation.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Answer generation failed: {0}")]
    Failed(String),

    #[error("No prompt template for student level '{0}'")]
    MissingTemplate(StudentLevel),
}

/// Produces an answer from retrieved context and a student question.
pub trait AnswerGenerator {
    /// Generate an answer.
    ///
    /// `context` is the retrieved passages joined together; `images` carries
    /// paths of relevant diagrams when an image pipeline supplies them.
    fn generate(
        &self,
        context: &str,
        query: &str,
        level: StudentLevel,
        images: Option<&[PathBuf]>,
    ) -> Result<String, GenerationError>;
}

/// Question-answering front over a retriever and a generator.
pub struct Assistant<G> {
    settings: Arc<Settings>,
    retriever: HybridRetriever,
    generator: G,
}

impl<G: AnswerGenerator> Assistant<G> {
    pub fn new(settings: Arc<Settings>, retriever: HybridRetriever, generator: G) -> Self {
        Self {
            settings,
            retriever,
            generator,
        }
    }

    /// The retriever, for ingest runs.
    pub fn retriever_mut(&mut self) -> &mut HybridRetriever {
        &mut self.retriever
    }

    pub fn retriever(&self) -> &HybridRetriever {
        &self.retriever
    }

    /// Answer a student question from retrieved lecture context.
    ///
    /// An empty retrieval result still reaches the generator, which is
    /// expected to say it cannot answer from the materials.
    pub fn answer(&self, query: &str) -> Result<String, GenerationError> {
        let passages = self
            .retriever
            .search(query, self.settings.retrieval.top_k);
        if passages.is_empty() {
            info!("No context retrieved for query");
        }
        let context = passages.join("\n\n");

        self.generator.generate(
            &context,
            query,
            self.settings.generation.default_level,
            None,
        )
    }
}
