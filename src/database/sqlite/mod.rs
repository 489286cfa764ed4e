// SQLite document registry
// Tracks which collections exist and which source files have been indexed

pub mod models;
pub mod queries;


use std::str::FromStr;

use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::debug;

use crate::config::Config;

use self::models::{Collection, CollectionStatus, DocumentRecord, NewCollection, NewDocumentRecord};
use self::queries::{CollectionQueries, DocumentQueries};

/// Registry database handle wrapping a SQLite connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open (creating if necessary) the registry database for this config.
    pub async fn new(config: &Config) -> Result<Self> {
        let db_path = config.database_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
            .context("Invalid database path")?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .context("Failed to connect to registry database")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    async fn run_migrations(&self) -> Result<()> {
        debug!("Running registry migrations");
        sqlx::migrate!("src/database/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn create_collection(&self, new_collection: &NewCollection) -> Result<i64> {
        CollectionQueries::create(&self.pool, new_collection).await
    }

    pub async fn get_collection(&self, name: &str) -> Result<Option<Collection>> {
        CollectionQueries::get_by_name(&self.pool, name).await
    }

    pub async fn get_all_collections(&self) -> Result<Vec<Collection>> {
        CollectionQueries::get_all(&self.pool).await
    }

    pub async fn update_collection_status(
        &self,
        id: i64,
        status: CollectionStatus,
    ) -> Result<()> {
        CollectionQueries::update_status(&self.pool, id, status).await
    }

    pub async fn delete_collection(&self, id: i64) -> Result<()> {
        CollectionQueries::delete(&self.pool, id).await
    }

    pub async fn record_document(&self, new_document: &NewDocumentRecord) -> Result<i64> {
        DocumentQueries::create(&self.pool, new_document).await
    }

    pub async fn get_documents(&self, collection_id: i64) -> Result<Vec<DocumentRecord>> {
        DocumentQueries::get_for_collection(&self.pool, collection_id).await
    }

    /// Returns `(document_count, chunk_total)` for a collection.
    pub async fn collection_stats(&self, collection_id: i64) -> Result<(i64, i64)> {
        DocumentQueries::stats_for_collection(&self.pool, collection_id).await
    }

    pub async fn clear_documents(&self, collection_id: i64) -> Result<u64> {
        DocumentQueries::delete_for_collection(&self.pool, collection_id).await
    }
}
