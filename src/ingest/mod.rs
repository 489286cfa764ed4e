// Ingest pipeline
// Reads a book directory, chunks each document, embeds the chunks, and
// stores them in the vector table while recording progress in the registry

#[cfg(test)]
mod tests;

use std::path::Path;

use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

use crate::chunker::{Chunk, build_chunks_for_document};
use crate::config::Config;
use crate::corpus::{collect_source_files, read_document};
use crate::database::lancedb::vector_store::VectorStore;
use crate::database::lancedb::{EmbeddingRecord, RecordMetadata};
use crate::database::sqlite::Database;
use crate::database::sqlite::models::{CollectionStatus, NewCollection, NewDocumentRecord};
use crate::embeddings::{OllamaClient, RateLimiter};

/// Statistics about one ingest run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub documents_indexed: usize,
    pub documents_skipped: usize,
    pub chunks_created: usize,
    pub chunks_skipped: usize,
    pub embeddings_stored: usize,
}

/// Foreground pipeline that turns a source directory into a searchable
/// collection.
pub struct IngestPipeline {
    config: Config,
    database: Database,
    ollama_client: OllamaClient,
    rate_limiter: RateLimiter,
}

impl IngestPipeline {
    pub async fn new(config: Config) -> Result<Self> {
        let database = Database::new(&config)
            .await
            .context("Failed to initialize registry database")?;

        let ollama_client =
            OllamaClient::new(&config).context("Failed to initialize Ollama client")?;

        let rate_limiter = RateLimiter::from_config(&config.rate_limit);

        Ok(Self {
            config,
            database,
            ollama_client,
            rate_limiter,
        })
    }

    /// Ingest every supported file under `source_dir` into `collection_name`.
    ///
    /// Re-running against an existing collection replaces its contents.
    /// Unreadable documents and failed embedding batches are skipped with a
    /// warning rather than aborting the run.
    pub async fn run(&mut self, source_dir: &Path, collection_name: &str) -> Result<IngestStats> {
        let files = collect_source_files(source_dir)?;
        info!(
            "Ingesting {} files from {} into collection '{}'",
            files.len(),
            source_dir.display(),
            collection_name
        );

        let collection_id = self
            .prepare_collection(source_dir, collection_name)
            .await?;

        let mut vector_store = VectorStore::new(&self.config, collection_name)
            .await
            .context("Failed to initialize vector store")?;

        self.database
            .update_collection_status(collection_id, CollectionStatus::Indexing)
            .await?;

        let bar = if console::user_attended_stderr() {
            ProgressBar::new(files.len() as u64).with_style(
                ProgressStyle::with_template("{bar:30} [{pos}/{len}] Ingesting {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };

        let mut stats = IngestStats::default();

        for file in &files {
            bar.set_message(
                file.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );

            match self
                .ingest_document(file, collection_id, &mut vector_store, &mut stats)
                .await
            {
                Ok(()) => stats.documents_indexed += 1,
                Err(e) => {
                    warn!("Skipping {}: {:#}", file.display(), e);
                    stats.documents_skipped += 1;
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        if stats.embeddings_stored > 0 {
            vector_store.optimize().await?;
        }

        let final_status = if stats.documents_indexed == 0 && !files.is_empty() {
            CollectionStatus::Failed
        } else {
            CollectionStatus::Completed
        };
        self.database
            .update_collection_status(collection_id, final_status)
            .await?;

        info!(
            "Ingest complete: {} documents, {} chunks, {} embeddings stored ({} documents and {} chunks skipped)",
            stats.documents_indexed,
            stats.chunks_created,
            stats.embeddings_stored,
            stats.documents_skipped,
            stats.chunks_skipped
        );

        Ok(stats)
    }

    /// Create or reset the registry row for this collection.
    async fn prepare_collection(&self, source_dir: &Path, name: &str) -> Result<i64> {
        match self.database.get_collection(name).await? {
            Some(existing) => {
                debug!("Re-ingesting existing collection '{name}'");
                self.database.clear_documents(existing.id).await?;
                Ok(existing.id)
            }
            None => {
                self.database
                    .create_collection(&NewCollection {
                        name: name.to_string(),
                        source_dir: source_dir.display().to_string(),
                    })
                    .await
            }
        }
    }

    async fn ingest_document(
        &mut self,
        path: &Path,
        collection_id: i64,
        vector_store: &mut VectorStore,
        stats: &mut IngestStats,
    ) -> Result<()> {
        let document = read_document(path)?;
        let chunks = build_chunks_for_document(&document, &self.config.chunker);
        debug!("{} produced {} chunks", path.display(), chunks.len());
        stats.chunks_created += chunks.len();

        let records = self.embed_chunks(&chunks, stats)?;
        stats.embeddings_stored += records.len();
        vector_store.store_embeddings_batch(records).await?;

        self.database
            .record_document(&NewDocumentRecord {
                collection_id,
                file_name: document.file_name.clone(),
                full_path: document.full_path.clone(),
                format: document.format.to_string(),
                chunk_count: chunks.len() as i64,
            })
            .await?;

        Ok(())
    }

    /// Embed chunks in batches. A failed batch falls back to one request per
    /// chunk so a single bad input cannot sink the whole document.
    fn embed_chunks(
        &mut self,
        chunks: &[Chunk],
        stats: &mut IngestStats,
    ) -> Result<Vec<EmbeddingRecord>> {
        let batch_size = self.config.ollama.batch_size as usize;
        let mut records = Vec::with_capacity(chunks.len());

        for batch in chunks.chunks(batch_size.max(1)) {
            self.rate_limiter.acquire();
            match self.ollama_client.generate_chunk_embeddings(batch) {
                Ok(results) => {
                    for (result, chunk) in results.iter().zip(batch.iter()) {
                        records.push(embedding_record(chunk, result.embedding.clone()));
                    }
                }
                Err(e) => {
                    warn!(
                        "Batch of {} chunks failed, retrying individually: {:#}",
                        batch.len(),
                        e
                    );
                    for chunk in batch {
                        self.rate_limiter.acquire();
                        match self.ollama_client.generate_embedding(&chunk.text) {
                            Ok(result) => {
                                records.push(embedding_record(chunk, result.embedding));
                            }
                            Err(e) => {
                                warn!("Skipping chunk {}: {:#}", chunk.id, e);
                                stats.chunks_skipped += 1;
                            }
                        }
                    }
                }
            }
        }

        Ok(records)
    }
}

fn embedding_record(chunk: &Chunk, embedding: Vec<f32>) -> EmbeddingRecord {
    EmbeddingRecord {
        id: chunk.id.clone(),
        vector: embedding,
        metadata: RecordMetadata::from_chunk(chunk),
    }
}
