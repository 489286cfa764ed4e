use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::Config;
use crate::database::lancedb::vector_store::VectorStore;
use crate::database::sqlite::Database;
use crate::database::sqlite::models::CollectionStatus;
use crate::embeddings::ollama::OllamaClient;
use crate::ingest::IngestPipeline;

/// Ingest a book directory into a named collection
#[inline]
pub async fn ingest_collection(dir: &Path, collection: &str) -> Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("Not a directory: {}", dir.display());
    }

    let config = Config::load_default()?;

    let mut pipeline = IngestPipeline::new(config)
        .await
        .context("Failed to initialize ingest pipeline")?;
    let stats = pipeline.run(dir, collection).await?;

    println!("Ingest completed for collection '{}'", collection);
    println!("  Documents indexed: {}", stats.documents_indexed);
    println!("  Chunks created: {}", stats.chunks_created);
    println!("  Embeddings stored: {}", stats.embeddings_stored);
    if stats.documents_skipped > 0 {
        println!("  Documents skipped: {}", stats.documents_skipped);
    }
    if stats.chunks_skipped > 0 {
        println!("  Chunks skipped: {}", stats.chunks_skipped);
    }

    Ok(())
}

/// Search a collection for chunks relevant to a query
#[inline]
pub async fn search_collection(
    query: &str,
    collection: &str,
    limit: usize,
    chapter: Option<&str>,
) -> Result<()> {
    if query.trim().is_empty() {
        anyhow::bail!("Search query cannot be empty");
    }

    let config = Config::load_default()?;

    let database = Database::new(&config)
        .await
        .context("Failed to initialize registry database")?;
    if database.get_collection(collection).await?.is_none() {
        anyhow::bail!(
            "Collection not found: {} (use 'bookrag list' to see available collections)",
            collection
        );
    }

    let client = OllamaClient::new(&config).context("Failed to initialize Ollama client")?;
    info!("Embedding search query ({} chars)", query.len());
    let query_embedding = client
        .generate_embedding(query)
        .context("Failed to embed search query")?;

    let store = VectorStore::new(&config, collection)
        .await
        .context("Failed to open vector store")?;
    let results = store
        .search_similar(&query_embedding.embedding, limit, chapter)
        .await?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} results:", results.len());
    println!();
    for (rank, result) in results.iter().enumerate() {
        let meta = &result.metadata;
        println!(
            "{}. {} (chapter {}, section {}) score {:.3}",
            rank + 1,
            meta.file,
            meta.chapter,
            meta.section,
            result.similarity_score
        );
        println!("   {}", meta.full_path);
        println!("   {}", preview(&meta.content, 240));
        println!();
    }

    Ok(())
}

/// List all collections with their registry status
#[inline]
pub async fn list_collections() -> Result<()> {
    let config = Config::load_default()?;
    let database = Database::new(&config)
        .await
        .context("Failed to initialize registry database")?;

    let collections = database
        .get_all_collections()
        .await
        .context("Failed to list collections")?;

    if collections.is_empty() {
        println!("No collections have been ingested yet.");
        println!("Use 'bookrag ingest <dir> --collection <name>' to create one.");
        return Ok(());
    }

    println!("Collections ({} total):", collections.len());
    println!();

    for collection in &collections {
        println!("{} (ID: {})", collection.name, collection.id);
        println!("   Source: {}", collection.source_dir);
        println!("   Status: {}", collection.status);

        let (doc_count, chunk_total) = database.collection_stats(collection.id).await?;
        println!("   Documents: {doc_count}");
        println!("   Chunks: {chunk_total}");

        if let Some(indexed_at) = collection.indexed_at {
            println!("   Last Ingested: {}", indexed_at.format("%Y-%m-%d %H:%M:%S"));
        }
        println!(
            "   Created: {}",
            collection.created_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!();
    }

    Ok(())
}

/// Delete a collection, its embeddings, and its registry rows
#[inline]
pub async fn delete_collection(name: &str) -> Result<()> {
    let config = Config::load_default()?;
    let database = Database::new(&config)
        .await
        .context("Failed to initialize registry database")?;

    let collection = database
        .get_collection(name)
        .await?
        .ok_or_else(|| anyhow::anyhow!("Collection not found: {name}"))?;

    let mut store = VectorStore::new(&config, name)
        .await
        .context("Failed to open vector store")?;
    store.delete_collection().await?;

    database.delete_collection(collection.id).await?;

    println!("Deleted collection: {} (ID: {})", collection.name, collection.id);

    Ok(())
}

/// Show connectivity and collection overview
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load_default()?;

    println!("Bookrag Status");
    println!("{}", "=".repeat(50));
    println!();

    println!("Registry Database:");
    let database = match Database::new(&config).await {
        Ok(db) => {
            println!("   SQLite: connected ({})", config.database_path().display());
            Some(db)
        }
        Err(e) => {
            println!("   SQLite: failed to connect ({e})");
            None
        }
    };

    println!("Ollama:");
    match OllamaClient::new(&config) {
        Ok(client) => match client.health_check() {
            Ok(()) => {
                println!(
                    "   Connected ({}:{})",
                    config.ollama.host, config.ollama.port
                );
                println!("   Model: {}", config.ollama.model);
                println!("   Batch Size: {}", config.ollama.batch_size);
            }
            Err(e) => {
                println!("   Reachable but unhealthy: {e}");
            }
        },
        Err(e) => {
            println!("   Failed to connect: {e}");
        }
    }

    println!("Vector Database:");
    match VectorStore::list_collections(&config).await {
        Ok(tables) => {
            println!(
                "   LanceDB: connected ({})",
                config.vector_database_path().display()
            );
            println!("   Tables: {}", tables.len());
        }
        Err(e) => {
            println!("   LanceDB: failed to connect ({e})");
        }
    }

    if let Some(database) = database {
        println!();
        println!("Collections:");
        let collections = database.get_all_collections().await?;
        if collections.is_empty() {
            println!("   None ingested yet");
        } else {
            let completed = collections
                .iter()
                .filter(|c| c.status == CollectionStatus::Completed)
                .count();
            let failed = collections
                .iter()
                .filter(|c| c.status == CollectionStatus::Failed)
                .count();

            println!("   Total: {}", collections.len());
            println!("   Completed: {completed}");
            println!("   Failed: {failed}");

            let mut total_chunks = 0;
            for collection in &collections {
                let (_, chunks) = database.collection_stats(collection.id).await?;
                total_chunks += chunks;
            }
            println!("   Total Chunks: {total_chunks}");
        }
    }

    Ok(())
}

fn preview(text: &str, max_chars: usize) -> String {
    let flattened = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flattened.chars().count() <= max_chars {
        return flattened;
    }
    let truncated: String = flattened.chars().take(max_chars).collect();
    format!("{truncated}...")
}
