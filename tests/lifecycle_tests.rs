//! Integration tests for collection lifecycle validation and the model
//! sentinel.

mod common;

use std::sync::Arc;

use common::HashedEmbedding;
use lectern::{
    CollectionDescriptor, CollectionStore, HybridRetriever, IngestPipeline, ModelSentinel,
};

fn corpus() -> Vec<String> {
    vec![
        "Glycolysis splits glucose into pyruvate.".to_string(),
        "The Calvin cycle fixes carbon dioxide.".to_string(),
    ]
}

#[test]
fn dimension_change_invalidates_and_recreates() {
    let (_guard, settings) = common::test_settings();

    // Build a collection with a 384-dimensional model
    {
        let provider = Arc::new(HashedEmbedding::new(384));
        let mut retriever = HybridRetriever::new(settings.clone(), provider).unwrap();
        retriever.build_indices(corpus()).unwrap();
    }

    // Restart with a 768-dimensional model: the constructor must invalidate
    // and recreate, and the new descriptor must record 768
    let provider = Arc::new(HashedEmbedding::new(768));
    let _retriever = HybridRetriever::new(settings.clone(), provider.clone()).unwrap();

    let store = CollectionStore::new(settings.index_path.clone());
    let collection = store
        .open_collection("lecture_materials", provider)
        .unwrap();
    assert_eq!(collection.descriptor().dimension, 768);
    assert!(collection.is_empty(), "old entries must not survive");
}

#[test]
fn model_identity_change_invalidates() {
    let (_guard, settings) = common::test_settings();

    {
        let provider = Arc::new(HashedEmbedding::new(64));
        let mut retriever = HybridRetriever::new(settings.clone(), provider).unwrap();
        retriever.build_indices(corpus()).unwrap();
    }

    // Same dimension, different model identity
    let provider = Arc::new(HashedEmbedding::with_model_id(64, "another-model"));
    let _retriever = HybridRetriever::new(settings.clone(), provider.clone()).unwrap();

    let store = CollectionStore::new(settings.index_path.clone());
    let collection = store
        .open_collection("lecture_materials", provider)
        .unwrap();
    assert_eq!(collection.descriptor().model, "another-model");
    assert!(collection.is_empty());
}

#[test]
fn compatible_collection_survives_restart() {
    let (_guard, settings) = common::test_settings();

    {
        let provider = Arc::new(HashedEmbedding::new(64));
        let mut retriever = HybridRetriever::new(settings.clone(), provider).unwrap();
        retriever.build_indices(corpus()).unwrap();
    }

    // Same model on restart: persisted entries are kept
    let provider = Arc::new(HashedEmbedding::new(64));
    let _retriever = HybridRetriever::new(settings.clone(), provider.clone()).unwrap();

    let store = CollectionStore::new(settings.index_path.clone());
    let collection = store
        .open_collection("lecture_materials", provider)
        .unwrap();
    assert_eq!(collection.len(), corpus().len());
}

#[test]
fn legacy_collection_without_descriptor_is_rebuilt() {
    let (_guard, settings) = common::test_settings();

    // A pre-versioned layout: directory exists, no metadata.json
    let store = CollectionStore::new(settings.index_path.clone());
    let legacy_dir = store.collection_path("lecture_materials");
    std::fs::create_dir_all(&legacy_dir).unwrap();
    std::fs::write(legacy_dir.join("old_data.bin"), b"legacy").unwrap();

    let provider = Arc::new(HashedEmbedding::new(64));
    let _retriever = HybridRetriever::new(settings.clone(), provider).unwrap();

    assert!(
        CollectionDescriptor::exists(&legacy_dir),
        "rebuild must tag the fresh collection with a descriptor"
    );
    assert!(
        !legacy_dir.join("old_data.bin").exists(),
        "legacy files must be cleaned up"
    );
}

#[test]
fn corrupt_segment_is_rebuilt() {
    let (_guard, settings) = common::test_settings();

    {
        let provider = Arc::new(HashedEmbedding::new(64));
        let mut retriever = HybridRetriever::new(settings.clone(), provider).unwrap();
        retriever.build_indices(corpus()).unwrap();
    }

    let store = CollectionStore::new(settings.index_path.clone());
    let segment_path = store
        .collection_path("lecture_materials")
        .join("segment_0.vec");
    std::fs::write(&segment_path, b"not a segment").unwrap();

    // Construction succeeds by recreating the collection
    let provider = Arc::new(HashedEmbedding::new(64));
    let _retriever = HybridRetriever::new(settings.clone(), provider.clone()).unwrap();

    let collection = store
        .open_collection("lecture_materials", provider)
        .unwrap();
    assert!(collection.is_empty());
}

#[test]
fn sentinel_resets_store_when_model_drifts() {
    let (_guard, settings) = common::test_settings();

    // First ingest run with one model
    {
        let provider = Arc::new(HashedEmbedding::with_salt(64, 1));
        let mut retriever = HybridRetriever::new(settings.clone(), provider).unwrap();
        std::fs::create_dir_all(&settings.raw_path).unwrap();
        std::fs::write(settings.raw_path.join("a.txt"), "Glycolysis notes").unwrap();
        let report = IngestPipeline::new(settings.clone())
            .run(&mut retriever)
            .unwrap();
        assert!(!report.store_reset, "first run only records the fingerprint");
    }

    // Second run: same dimension and model id, but the probe embedding
    // drifted. The descriptor check alone would keep the data; the sentinel
    // must catch it (either trigger invalidates).
    let provider = Arc::new(HashedEmbedding::with_salt(64, 2));
    let mut retriever = HybridRetriever::new(settings.clone(), provider).unwrap();
    let report = IngestPipeline::new(settings.clone())
        .run(&mut retriever)
        .unwrap();
    assert!(report.store_reset, "sentinel must detect the drifted model");
    assert_eq!(report.documents_indexed, 1);

    // Third run with the same model: no reset
    let report = IngestPipeline::new(settings.clone())
        .run(&mut retriever)
        .unwrap();
    assert!(!report.store_reset);
}

#[test]
fn sentinel_file_is_written_every_run() {
    let (_guard, settings) = common::test_settings();
    let provider = Arc::new(HashedEmbedding::new(64));
    let store = CollectionStore::new(settings.index_path.clone());

    let sentinel = ModelSentinel::new(&settings.index_path);
    sentinel
        .check_and_update(provider.as_ref(), &store, "lecture_materials")
        .unwrap();

    let hash_path = settings.index_path.join("model_version.hash");
    let first = std::fs::read_to_string(&hash_path).unwrap();
    assert!(!first.is_empty());

    // Unchanged model rewrites the same fingerprint
    sentinel
        .check_and_update(provider.as_ref(), &store, "lecture_materials")
        .unwrap();
    assert_eq!(std::fs::read_to_string(&hash_path).unwrap(), first);
}
