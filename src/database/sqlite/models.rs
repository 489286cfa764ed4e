use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

/// One ingest target: a source directory indexed into a vector table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Collection {
    pub id: i64,
    pub name: String,
    pub source_dir: String,
    pub status: CollectionStatus,
    pub created_at: NaiveDateTime,
    pub indexed_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "TEXT", rename_all = "lowercase")]
pub enum CollectionStatus {
    Pending,
    Indexing,
    Completed,
    Failed,
}

impl std::fmt::Display for CollectionStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            CollectionStatus::Pending => write!(f, "Pending"),
            CollectionStatus::Indexing => write!(f, "Indexing"),
            CollectionStatus::Completed => write!(f, "Completed"),
            CollectionStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl CollectionStatus {
    pub(crate) fn parse(status: &str) -> anyhow::Result<Self> {
        match status {
            "pending" => Ok(CollectionStatus::Pending),
            "indexing" => Ok(CollectionStatus::Indexing),
            "completed" => Ok(CollectionStatus::Completed),
            "failed" => Ok(CollectionStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid collection status: {status}")),
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            CollectionStatus::Pending => "pending",
            CollectionStatus::Indexing => "indexing",
            CollectionStatus::Completed => "completed",
            CollectionStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCollection {
    pub name: String,
    pub source_dir: String,
}

/// One indexed source document within a collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DocumentRecord {
    pub id: i64,
    pub collection_id: i64,
    pub file_name: String,
    pub full_path: String,
    pub format: String,
    pub chunk_count: i64,
    pub indexed_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDocumentRecord {
    pub collection_id: i64,
    pub file_name: String,
    pub full_path: String,
    pub format: String,
    pub chunk_count: i64,
}
