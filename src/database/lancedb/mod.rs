// LanceDB vector database module
// Handles vector storage and similarity search for embeddings

pub mod vector_store;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::chunker::Chunk;

/// Embedding record stored in LanceDB.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    /// Unique identifier for this embedding
    pub id: String,
    /// The vector embedding
    pub vector: Vec<f32>,
    /// Metadata about the chunk this embedding represents
    pub metadata: RecordMetadata,
}

/// Chunk metadata persisted alongside its vector. Every source field from
/// the chunker must survive storage and search unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// Chunker-assigned chunk id
    pub chunk_id: String,
    /// Coarse chapter grouping (containing directory name)
    pub chapter_dir: String,
    /// Inferred chapter label, "unknown" when no marker was found
    pub chapter: String,
    /// Inferred section label, "unknown" when no marker was found
    pub section: String,
    /// Structural part index within the source document
    pub part: u32,
    /// Chunk index within the structural part
    pub sub_part: u32,
    /// Source file name
    pub file: String,
    /// Full path of the source file
    pub full_path: String,
    /// Chunk-type tag ("book_chapter")
    pub kind: String,
    /// The chunk text itself
    pub content: String,
    /// Timestamp when this embedding was created
    pub created_at: String,
}

impl RecordMetadata {
    /// Build the persisted metadata for a chunk, copying every source field
    /// verbatim.
    #[inline]
    pub fn from_chunk(chunk: &Chunk) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            chapter_dir: chunk.metadata.chapter_dir.clone(),
            chapter: chunk.metadata.chapter.clone(),
            section: chunk.metadata.section.clone(),
            part: chunk.metadata.part,
            sub_part: chunk.metadata.sub_part,
            file: chunk.metadata.file.clone(),
            full_path: chunk.metadata.full_path.clone(),
            kind: chunk.metadata.kind.clone(),
            content: chunk.text.clone(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
