use super::*;
use crate::chunker::ChunkerConfig;
use crate::config::{OllamaConfig, RateLimitConfig};
use crate::database::sqlite::models::CollectionStatus;
use tempfile::TempDir;

fn create_test_config(base_dir: &Path) -> Config {
    Config {
        ollama: OllamaConfig::default(),
        chunker: ChunkerConfig::default(),
        rate_limit: RateLimitConfig::default(),
        base_dir: base_dir.to_path_buf(),
    }
}

#[tokio::test]
async fn ingest_of_empty_directory_completes_with_zero_stats() {
    let state_dir = TempDir::new().expect("should create temp dir");
    let source_dir = TempDir::new().expect("should create temp dir");
    let config = create_test_config(state_dir.path());

    let mut pipeline = IngestPipeline::new(config.clone())
        .await
        .expect("should create pipeline");

    let stats = pipeline
        .run(source_dir.path(), "robotics_book")
        .await
        .expect("empty ingest should succeed");

    assert_eq!(stats, IngestStats::default());

    let database = Database::new(&config).await.expect("should open registry");
    let collection = database
        .get_collection("robotics_book")
        .await
        .expect("should query")
        .expect("collection should be recorded");
    assert_eq!(collection.status, CollectionStatus::Completed);
    assert_eq!(
        collection.source_dir,
        source_dir.path().display().to_string()
    );
}

#[tokio::test]
async fn reingest_reuses_collection_and_clears_documents() {
    let state_dir = TempDir::new().expect("should create temp dir");
    let source_dir = TempDir::new().expect("should create temp dir");
    let config = create_test_config(state_dir.path());

    let mut pipeline = IngestPipeline::new(config.clone())
        .await
        .expect("should create pipeline");

    pipeline
        .run(source_dir.path(), "robotics_book")
        .await
        .expect("first ingest should succeed");

    let database = Database::new(&config).await.expect("should open registry");
    let first = database
        .get_collection("robotics_book")
        .await
        .expect("should query")
        .expect("collection should exist");

    // Simulate a leftover document row from an earlier run.
    database
        .record_document(&crate::database::sqlite::models::NewDocumentRecord {
            collection_id: first.id,
            file_name: "stale.txt".to_string(),
            full_path: "/old/stale.txt".to_string(),
            format: "text".to_string(),
            chunk_count: 2,
        })
        .await
        .expect("should record document");

    pipeline
        .run(source_dir.path(), "robotics_book")
        .await
        .expect("re-ingest should succeed");

    let second = database
        .get_collection("robotics_book")
        .await
        .expect("should query")
        .expect("collection should exist");
    assert_eq!(second.id, first.id);

    let documents = database
        .get_documents(first.id)
        .await
        .expect("should get documents");
    assert!(documents.is_empty(), "stale document rows should be cleared");
}
