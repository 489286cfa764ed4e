use anyhow::Result;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

use super::models::{Collection, CollectionStatus, DocumentRecord, NewCollection, NewDocumentRecord};

/// Query operations for collections
pub struct CollectionQueries;

impl CollectionQueries {
    /// Insert a new collection, returning its id
    pub async fn create(pool: &SqlitePool, new_collection: &NewCollection) -> Result<i64> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            "INSERT INTO collections (name, source_dir, status, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&new_collection.name)
        .bind(&new_collection.source_dir)
        .bind(CollectionStatus::Pending.as_str())
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get a collection by name
    pub async fn get_by_name(pool: &SqlitePool, name: &str) -> Result<Option<Collection>> {
        let row = sqlx::query(
            "SELECT id, name, source_dir, status, created_at, indexed_at
             FROM collections WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(pool)
        .await?;

        match row {
            Some(row) => Ok(Some(Self::row_to_collection(&row)?)),
            None => Ok(None),
        }
    }

    /// Get all collections ordered by name
    pub async fn get_all(pool: &SqlitePool) -> Result<Vec<Collection>> {
        let rows = sqlx::query(
            "SELECT id, name, source_dir, status, created_at, indexed_at
             FROM collections ORDER BY name",
        )
        .fetch_all(pool)
        .await?;

        rows.iter().map(Self::row_to_collection).collect()
    }

    /// Update a collection's status, stamping indexed_at on completion
    pub async fn update_status(
        pool: &SqlitePool,
        id: i64,
        status: CollectionStatus,
    ) -> Result<()> {
        let indexed_at = if status == CollectionStatus::Completed {
            Some(Utc::now().naive_utc())
        } else {
            None
        };

        sqlx::query("UPDATE collections SET status = ?, indexed_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(indexed_at)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    /// Delete a collection and its document rows
    pub async fn delete(pool: &SqlitePool, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE collection_id = ?")
            .bind(id)
            .execute(pool)
            .await?;
        sqlx::query("DELETE FROM collections WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    fn row_to_collection(row: &sqlx::sqlite::SqliteRow) -> Result<Collection> {
        let status_str: String = row.get("status");
        Ok(Collection {
            id: row.get("id"),
            name: row.get("name"),
            source_dir: row.get("source_dir"),
            status: CollectionStatus::parse(&status_str)?,
            created_at: row.get("created_at"),
            indexed_at: row.get("indexed_at"),
        })
    }
}

/// Query operations for indexed documents
pub struct DocumentQueries;

impl DocumentQueries {
    /// Record an indexed document, returning its id
    pub async fn create(pool: &SqlitePool, new_document: &NewDocumentRecord) -> Result<i64> {
        let now = Utc::now().naive_utc();
        let result = sqlx::query(
            "INSERT INTO documents (collection_id, file_name, full_path, format, chunk_count, indexed_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(new_document.collection_id)
        .bind(&new_document.file_name)
        .bind(&new_document.full_path)
        .bind(&new_document.format)
        .bind(new_document.chunk_count)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Get all documents for a collection ordered by path
    pub async fn get_for_collection(
        pool: &SqlitePool,
        collection_id: i64,
    ) -> Result<Vec<DocumentRecord>> {
        let rows = sqlx::query(
            "SELECT id, collection_id, file_name, full_path, format, chunk_count, indexed_at
             FROM documents WHERE collection_id = ? ORDER BY full_path",
        )
        .bind(collection_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| DocumentRecord {
                id: row.get("id"),
                collection_id: row.get("collection_id"),
                file_name: row.get("file_name"),
                full_path: row.get("full_path"),
                format: row.get("format"),
                chunk_count: row.get("chunk_count"),
                indexed_at: row.get("indexed_at"),
            })
            .collect())
    }

    /// Count documents and chunks recorded for a collection
    pub async fn stats_for_collection(
        pool: &SqlitePool,
        collection_id: i64,
    ) -> Result<(i64, i64)> {
        let row = sqlx::query(
            "SELECT COUNT(*) as doc_count, COALESCE(SUM(chunk_count), 0) as chunk_total
             FROM documents WHERE collection_id = ?",
        )
        .bind(collection_id)
        .fetch_one(pool)
        .await?;

        Ok((row.get("doc_count"), row.get("chunk_total")))
    }

    /// Remove all document rows for a collection (used before re-ingest)
    pub async fn delete_for_collection(pool: &SqlitePool, collection_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE collection_id = ?")
            .bind(collection_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected())
    }
}
