//! Configuration for the retrieval assistant.
//!
//! Layered configuration: defaults, then a TOML file, then environment
//! variable overrides. Components receive an `Arc<Settings>` at construction
//! instead of reaching for fixed global paths, so tests can point the whole
//! stack at a temporary directory.
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `LECTERN_` and use double
//! underscores to separate nested levels:
//! - `LECTERN_EMBEDDING__MODEL=BGESmallENV15` sets `embedding.model`
//! - `LECTERN_RETRIEVAL__TOP_K=10` sets `retrieval.top_k`

use crate::assistant::StudentLevel;
use crate::types::DEFAULT_TOP_K;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Name of the TOML configuration file, looked up in the working directory.
const CONFIG_FILE: &str = "lectern.toml";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Directory holding raw lecture materials, one document per file
    #[serde(default = "default_raw_path")]
    pub raw_path: PathBuf,

    /// Root directory for persisted indices and the model sentinel
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Embedding model settings
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Retrieval settings
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Answer generation settings
    #[serde(default)]
    pub generation: GenerationConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EmbeddingConfig {
    /// Model used for text embeddings
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Cache directory for downloaded model weights
    #[serde(default = "default_model_cache_dir")]
    pub cache_dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RetrievalConfig {
    /// Name of the persisted collection holding lecture text
    #[serde(default = "default_text_collection")]
    pub text_collection: String,

    /// Name reserved for the image-embedding collection
    #[serde(default = "default_image_collection")]
    pub image_collection: String,

    /// Number of results each retrieval path requests
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GenerationConfig {
    /// Student level assumed when a query does not specify one
    #[serde(default)]
    pub default_level: StudentLevel,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_raw_path() -> PathBuf {
    PathBuf::from("data/raw")
}
fn default_index_path() -> PathBuf {
    PathBuf::from("data/processed")
}
fn default_embedding_model() -> String {
    "AllMiniLML6V2".to_string()
}
fn default_model_cache_dir() -> PathBuf {
    PathBuf::from(".lectern/models")
}
fn default_text_collection() -> String {
    "lecture_materials".to_string()
}
fn default_image_collection() -> String {
    "image_embeddings".to_string()
}
fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            raw_path: default_raw_path(),
            index_path: default_index_path(),
            embedding: EmbeddingConfig::default(),
            retrieval: RetrievalConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: default_model_cache_dir(),
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            text_collection: default_text_collection(),
            image_collection: default_image_collection(),
            top_k: default_top_k(),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            default_level: StudentLevel::default(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(CONFIG_FILE))
            // Layer in environment variables with LECTERN_ prefix.
            // Double underscore separates nested levels; single underscores
            // remain part of the field name.
            .merge(Env::prefixed("LECTERN_").map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Settings rooted under one base directory, for callers that keep raw
    /// materials and indices together (tests use this with a temp dir).
    pub fn rooted_at(base: impl Into<PathBuf>) -> Self {
        let base = base.into();
        Self {
            raw_path: base.join("raw"),
            index_path: base.join("processed"),
            ..Self::default()
        }
    }
}
