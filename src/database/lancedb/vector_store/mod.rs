
use super::{EmbeddingRecord, RecordMetadata};
use crate::{BookragError, config::Config};
use arrow::array::{
    Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};

/// Fallback dimension until the first insert reveals the real one.
const DEFAULT_VECTOR_DIMENSION: usize = 768;

/// Vector store backed by LanceDB, one table per ingest collection.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    vector_dimension: Option<usize>,
}

/// Search result from vector similarity search.
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub metadata: RecordMetadata,
    pub similarity_score: f32,
    pub distance: f32,
}

impl VectorStore {
    /// Open (or create) the vector store table for a collection.
    #[inline]
    pub async fn new(config: &Config, collection: &str) -> Result<Self, BookragError> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                BookragError::Database(format!(
                    "Failed to create vector database directory: {}",
                    e
                ))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri).execute().await.map_err(|e| {
            BookragError::Database(format!("Failed to connect to LanceDB: {}", e))
        })?;

        let mut store = Self {
            connection,
            table_name: collection.to_string(),
            vector_dimension: None,
        };

        store.initialize_table().await?;

        info!("Vector store initialized for collection '{}'", collection);
        Ok(store)
    }

    /// List collection tables present in the database directory.
    #[inline]
    pub async fn list_collections(config: &Config) -> Result<Vec<String>, BookragError> {
        let db_path = config.vector_database_path();
        if !db_path.exists() {
            return Ok(Vec::new());
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri).execute().await.map_err(|e| {
            BookragError::Database(format!("Failed to connect to LanceDB: {}", e))
        })?;

        connection
            .table_names()
            .execute()
            .await
            .map_err(|e| BookragError::Database(format!("Failed to list tables: {}", e)))
    }

    async fn initialize_table(&mut self) -> Result<(), BookragError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| BookragError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            match self.detect_existing_vector_dimension().await {
                Ok(dim) => {
                    debug!("Detected existing vector dimension: {}", dim);
                    self.vector_dimension = Some(dim);
                }
                Err(e) => {
                    debug!("Could not detect vector dimension: {}, using default", e);
                    self.vector_dimension = Some(DEFAULT_VECTOR_DIMENSION);
                }
            }
            return Ok(());
        }

        // Placeholder dimension; the table is recreated on first insert if
        // the real embeddings differ.
        let schema = self.create_schema(DEFAULT_VECTOR_DIMENSION);

        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| BookragError::Database(format!("Failed to create table: {}", e)))?;

        self.vector_dimension = Some(DEFAULT_VECTOR_DIMENSION);
        Ok(())
    }

    async fn detect_existing_vector_dimension(&self) -> Result<usize, BookragError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| BookragError::Database(format!("Failed to open table: {}", e)))?;

        let schema = table
            .schema()
            .await
            .map_err(|e| BookragError::Database(format!("Failed to get table schema: {}", e)))?;

        for field in schema.fields() {
            if field.name() == "vector" {
                if let DataType::FixedSizeList(_, size) = field.data_type() {
                    return Ok(*size as usize);
                }
            }
        }

        Err(BookragError::Database(
            "Could not find vector column or determine dimension".to_string(),
        ))
    }

    fn create_schema(&self, vector_dim: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    vector_dim as i32,
                ),
                false,
            ),
            Field::new("chunk_id", DataType::Utf8, false),
            Field::new("chapter_dir", DataType::Utf8, false),
            Field::new("chapter", DataType::Utf8, false),
            Field::new("section", DataType::Utf8, false),
            Field::new("part", DataType::UInt32, false),
            Field::new("sub_part", DataType::UInt32, false),
            Field::new("file", DataType::Utf8, false),
            Field::new("full_path", DataType::Utf8, false),
            Field::new("kind", DataType::Utf8, false),
            Field::new("content", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Store a batch of embeddings with their metadata.
    #[inline]
    pub async fn store_embeddings_batch(
        &mut self,
        records: Vec<EmbeddingRecord>,
    ) -> Result<(), BookragError> {
        if records.is_empty() {
            debug!("No embeddings to store");
            return Ok(());
        }

        debug!("Storing batch of {} embeddings", records.len());

        let vector_dim = records[0].vector.len();
        if self.vector_dimension != Some(vector_dim) {
            info!(
                "Vector dimension changed from {:?} to {}, recreating table",
                self.vector_dimension, vector_dim
            );
            self.recreate_table_with_dimension(vector_dim).await?;
            self.vector_dimension = Some(vector_dim);
        }

        let record_batch = self.create_record_batch(&records)?;

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| BookragError::Database(format!("Failed to open table: {}", e)))?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| BookragError::Database(format!("Failed to insert embeddings: {}", e)))?;

        debug!("Stored {} embeddings", records.len());
        Ok(())
    }

    async fn recreate_table_with_dimension(&self, vector_dim: usize) -> Result<(), BookragError> {
        self.drop_table_if_exists().await?;

        let schema = self.create_schema(vector_dim);
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| {
                BookragError::Database(format!(
                    "Failed to create table with new dimensions: {}",
                    e
                ))
            })?;

        Ok(())
    }

    fn create_record_batch(
        &self,
        records: &[EmbeddingRecord],
    ) -> Result<RecordBatch, BookragError> {
        let len = records.len();
        let vector_dim = self
            .vector_dimension
            .ok_or_else(|| BookragError::Database("Vector dimension not set".to_string()))?;

        let mut ids = Vec::with_capacity(len);
        let mut vectors = Vec::with_capacity(len);
        let mut chunk_ids = Vec::with_capacity(len);
        let mut chapter_dirs = Vec::with_capacity(len);
        let mut chapters = Vec::with_capacity(len);
        let mut sections = Vec::with_capacity(len);
        let mut parts = Vec::with_capacity(len);
        let mut sub_parts = Vec::with_capacity(len);
        let mut files = Vec::with_capacity(len);
        let mut full_paths = Vec::with_capacity(len);
        let mut kinds = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        for record in records {
            ids.push(record.id.as_str());
            vectors.push(record.vector.clone());
            chunk_ids.push(record.metadata.chunk_id.as_str());
            chapter_dirs.push(record.metadata.chapter_dir.as_str());
            chapters.push(record.metadata.chapter.as_str());
            sections.push(record.metadata.section.as_str());
            parts.push(record.metadata.part);
            sub_parts.push(record.metadata.sub_part);
            files.push(record.metadata.file.as_str());
            full_paths.push(record.metadata.full_path.as_str());
            kinds.push(record.metadata.kind.as_str());
            contents.push(record.metadata.content.as_str());
            created_ats.push(record.metadata.created_at.as_str());
        }

        let schema = self.create_schema(vector_dim);

        let mut flat_values = Vec::with_capacity(len * vector_dim);
        for vector in &vectors {
            flat_values.extend_from_slice(vector);
        }
        let values_array = Float32Array::from(flat_values);
        let field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array =
            FixedSizeListArray::try_new(field, vector_dim as i32, Arc::new(values_array), None)
                .map_err(|e| {
                    BookragError::Database(format!("Failed to create vector array: {}", e))
                })?;

        let arrays: Vec<Arc<dyn arrow::array::Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(chunk_ids)),
            Arc::new(StringArray::from(chapter_dirs)),
            Arc::new(StringArray::from(chapters)),
            Arc::new(StringArray::from(sections)),
            Arc::new(UInt32Array::from(parts)),
            Arc::new(UInt32Array::from(sub_parts)),
            Arc::new(StringArray::from(files)),
            Arc::new(StringArray::from(full_paths)),
            Arc::new(StringArray::from(kinds)),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(schema, arrays)
            .map_err(|e| BookragError::Database(format!("Failed to create record batch: {}", e)))
    }

    /// Search for similar embeddings, optionally filtered to one chapter
    /// label.
    #[inline]
    pub async fn search_similar(
        &self,
        query_vector: &[f32],
        limit: usize,
        chapter_filter: Option<&str>,
    ) -> Result<Vec<SearchResult>, BookragError> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| BookragError::Database(format!("Failed to open table: {}", e)))?;

        let mut query = table
            .vector_search(query_vector)
            .map_err(|e| {
                BookragError::Database(format!("Failed to create vector search: {}", e))
            })?
            .column("vector")
            .limit(limit);

        if let Some(chapter) = chapter_filter {
            query = query.only_if(format!("chapter = '{}'", chapter.replace('\'', "''")));
        }

        let results = query
            .execute()
            .await
            .map_err(|e| BookragError::Database(format!("Failed to execute search: {}", e)))?;

        self.parse_search_results_stream(results).await
    }

    async fn parse_search_results_stream(
        &self,
        mut results: lancedb::arrow::SendableRecordBatchStream,
    ) -> Result<Vec<SearchResult>, BookragError> {
        let mut search_results = Vec::new();

        while let Some(batch_result) = results.try_next().await.map_err(|e| {
            BookragError::Database(format!("Failed to read result stream: {}", e))
        })? {
            let parsed_batch = parse_search_batch(&batch_result)?;
            search_results.extend(parsed_batch);
        }

        debug!("Parsed {} search results from stream", search_results.len());
        Ok(search_results)
    }

    /// Total number of embeddings in this collection.
    #[inline]
    pub async fn count_embeddings(&self) -> Result<u64, BookragError> {
        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| BookragError::Database(format!("Failed to open table: {}", e)))?;

        let count = table
            .count_rows(None)
            .await
            .map_err(|e| BookragError::Database(format!("Failed to count rows: {}", e)))?;

        Ok(count as u64)
    }

    /// Drop this collection's table and all its embeddings.
    #[inline]
    pub async fn delete_collection(&mut self) -> Result<(), BookragError> {
        self.drop_table_if_exists().await?;
        self.vector_dimension = None;
        info!("Deleted collection '{}'", self.table_name);
        Ok(())
    }

    /// Compact and reorganize the table for better search performance.
    #[inline]
    pub async fn optimize(&mut self) -> Result<(), BookragError> {
        debug!("Optimizing vector database");

        let table = self
            .connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| BookragError::Database(format!("Failed to open table: {}", e)))?;

        table
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(|e| BookragError::Database(format!("Failed to optimize table: {}", e)))?;

        Ok(())
    }

    async fn drop_table_if_exists(&self) -> Result<(), BookragError> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| BookragError::Database(format!("Failed to list tables: {}", e)))?;

        if table_names.contains(&self.table_name) {
            self.connection
                .drop_table(&self.table_name)
                .await
                .map_err(|e| BookragError::Database(format!("Failed to drop table: {}", e)))?;
        }

        Ok(())
    }
}

fn string_column<'a>(
    batch: &'a RecordBatch,
    name: &str,
) -> Result<&'a StringArray, BookragError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| BookragError::Database(format!("Missing {name} column")))?
        .as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| BookragError::Database(format!("Invalid {name} column type")))
}

fn u32_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a UInt32Array, BookragError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| BookragError::Database(format!("Missing {name} column")))?
        .as_any()
        .downcast_ref::<UInt32Array>()
        .ok_or_else(|| BookragError::Database(format!("Invalid {name} column type")))
}

fn parse_search_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>, BookragError> {
    let num_rows = batch.num_rows();
    let mut search_results = Vec::with_capacity(num_rows);

    let chunk_ids = string_column(batch, "chunk_id")?;
    let chapter_dirs = string_column(batch, "chapter_dir")?;
    let chapters = string_column(batch, "chapter")?;
    let sections = string_column(batch, "section")?;
    let parts = u32_column(batch, "part")?;
    let sub_parts = u32_column(batch, "sub_part")?;
    let files = string_column(batch, "file")?;
    let full_paths = string_column(batch, "full_path")?;
    let kinds = string_column(batch, "kind")?;
    let contents = string_column(batch, "content")?;
    let created_ats = string_column(batch, "created_at")?;

    let distances = batch
        .column_by_name("_distance")
        .map(|col| col.as_any().downcast_ref::<Float32Array>());

    for row in 0..num_rows {
        let metadata = RecordMetadata {
            chunk_id: chunk_ids.value(row).to_string(),
            chapter_dir: chapter_dirs.value(row).to_string(),
            chapter: chapters.value(row).to_string(),
            section: sections.value(row).to_string(),
            part: parts.value(row),
            sub_part: sub_parts.value(row),
            file: files.value(row).to_string(),
            full_path: full_paths.value(row).to_string(),
            kind: kinds.value(row).to_string(),
            content: contents.value(row).to_string(),
            created_at: created_ats.value(row).to_string(),
        };

        let distance = distances
            .flatten()
            .map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

        // Convert distance to similarity score (higher is better)
        let similarity_score = 1.0 - distance;

        search_results.push(SearchResult {
            metadata,
            similarity_score,
            distance,
        });
    }

    Ok(search_results)
}
