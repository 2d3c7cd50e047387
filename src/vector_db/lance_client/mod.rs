//! LanceDB vector database client

use crate::error::VectorDbError;
use crate::indexer::UnitKind;
use crate::types::SearchHit;
use crate::vector_db::{ChunkRecord, DatabaseStats, VectorDatabase};
use anyhow::{Context, Result};
use arrow_array::{
    Array, BooleanArray, FixedSizeListArray, Float32Array, RecordBatch, RecordBatchIterator,
    StringArray, UInt32Array, types::Float32Type,
};
use arrow_schema::{DataType, Field, Schema};
use futures::stream::TryStreamExt;
use lancedb::Table;
use lancedb::connection::Connection;
use lancedb::query::{ExecutableQuery, QueryBase};
use std::path::Path;
use std::sync::Arc;

/// LanceDB vector database implementation (embedded, no server required)
pub struct LanceVectorDB {
    connection: Connection,
    table_name: String,
    db_path: String,
}

/// Quote a value for a LanceDB SQL filter
fn sql_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .with_context(|| format!("Missing {} column", name))?
        .as_any()
        .downcast_ref::<T>()
        .with_context(|| format!("Invalid {} type", name))
}

fn string_column(records: &[ChunkRecord], f: impl Fn(&ChunkRecord) -> &str) -> StringArray {
    StringArray::from(records.iter().map(f).collect::<Vec<_>>())
}

fn u32_column(records: &[ChunkRecord], f: impl Fn(&ChunkRecord) -> usize) -> UInt32Array {
    UInt32Array::from(records.iter().map(|r| f(r) as u32).collect::<Vec<_>>())
}

impl LanceVectorDB {
    /// Create a new LanceDB instance at `db_path` using `table_name`
    pub async fn with_path(db_path: &Path, table_name: &str) -> Result<Self, VectorDbError> {
        let db_path = db_path.to_string_lossy().to_string();
        tracing::info!("Connecting to LanceDB at: {}", db_path);

        let connection = lancedb::connect(&db_path)
            .execute()
            .await
            .map_err(|e| VectorDbError::ConnectionFailed(e.to_string()))?;

        Ok(Self {
            connection,
            table_name: table_name.to_string(),
            db_path,
        })
    }

    /// Create schema for the chunks table
    fn create_schema(dimension: usize) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    dimension as i32,
                ),
                false,
            ),
            Field::new("id", DataType::Utf8, false),
            Field::new("chunk_id", DataType::Utf8, false),
            Field::new("symbol_name", DataType::Utf8, false),
            Field::new("kind", DataType::Utf8, false),
            Field::new("file_path", DataType::Utf8, false),
            Field::new("language", DataType::Utf8, false),
            Field::new("start_line", DataType::UInt32, false),
            Field::new("end_line", DataType::UInt32, false),
            Field::new("docstring", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("total_chunks", DataType::UInt32, false),
            Field::new("is_skeleton", DataType::Boolean, false),
            Field::new("content", DataType::Utf8, false),
        ]))
    }

    async fn get_table(&self) -> Result<Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .context("Failed to open table")
    }

    async fn create_table_if_missing(&self, dimension: usize) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .context("Failed to list tables")?;

        if table_names.contains(&self.table_name) {
            tracing::info!("Table '{}' already exists", self.table_name);
            return Ok(());
        }

        let schema = Self::create_schema(dimension);
        let empty_batch = RecordBatch::new_empty(schema.clone());
        let batches =
            RecordBatchIterator::new(vec![empty_batch].into_iter().map(Ok), schema.clone());

        self.connection
            .create_table(&self.table_name, Box::new(batches))
            .execute()
            .await
            .context("Failed to create table")?;

        tracing::info!("Created table '{}'", self.table_name);
        Ok(())
    }

    /// Convert records to a RecordBatch
    fn create_record_batch(records: Vec<ChunkRecord>, schema: Arc<Schema>) -> Result<RecordBatch> {
        let dimension = records.first().map_or(0, |r| r.vector.len());
        if let Some(bad) = records.iter().find(|r| r.vector.len() != dimension) {
            anyhow::bail!(
                "Vector for {} has {} dimensions, expected {}",
                bad.chunk_id,
                bad.vector.len(),
                dimension
            );
        }

        let id_array = string_column(&records, |r| r.id.as_str());
        let chunk_id_array = string_column(&records, |r| r.chunk_id.as_str());
        let symbol_array = string_column(&records, |r| r.metadata.symbol_name.as_str());
        let kind_array = string_column(&records, |r| r.metadata.kind.as_str());
        let file_path_array = string_column(&records, |r| r.metadata.file_path.as_str());
        let language_array = string_column(&records, |r| r.metadata.language.as_str());
        let start_line_array = u32_column(&records, |r| r.metadata.start_line);
        let end_line_array = u32_column(&records, |r| r.metadata.end_line);
        let docstring_array = string_column(&records, |r| r.metadata.docstring.as_str());
        let chunk_index_array = u32_column(&records, |r| r.metadata.chunk_index);
        let total_chunks_array = u32_column(&records, |r| r.metadata.total_chunks);
        let skeleton_array = BooleanArray::from(
            records
                .iter()
                .map(|r| r.metadata.is_skeleton)
                .collect::<Vec<_>>(),
        );
        let content_array = string_column(&records, |r| r.content.as_str());

        let vector_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            records
                .into_iter()
                .map(|r| Some(r.vector.into_iter().map(Some))),
            dimension as i32,
        );

        RecordBatch::try_new(
            schema,
            vec![
                Arc::new(vector_array),
                Arc::new(id_array),
                Arc::new(chunk_id_array),
                Arc::new(symbol_array),
                Arc::new(kind_array),
                Arc::new(file_path_array),
                Arc::new(language_array),
                Arc::new(start_line_array),
                Arc::new(end_line_array),
                Arc::new(docstring_array),
                Arc::new(chunk_index_array),
                Arc::new(total_chunks_array),
                Arc::new(skeleton_array),
                Arc::new(content_array),
            ],
        )
        .context("Failed to create RecordBatch")
    }

    async fn store_records(&self, records: Vec<ChunkRecord>) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let table = self.get_table().await?;

        // Upsert: drop any rows that share an id with the incoming batch
        let ids = records
            .iter()
            .map(|r| sql_literal(&r.id))
            .collect::<Vec<_>>()
            .join(", ");
        table
            .delete(&format!("id IN ({})", ids))
            .await
            .context("Failed to replace existing records")?;

        let schema = Self::create_schema(records[0].vector.len());
        let batch = Self::create_record_batch(records, schema.clone())?;
        let count = batch.num_rows();

        let batches = RecordBatchIterator::new(vec![batch].into_iter().map(Ok), schema);
        table
            .add(Box::new(batches))
            .execute()
            .await
            .context("Failed to add records to table")?;

        tracing::debug!("Stored {} chunk vectors", count);
        Ok(count)
    }

    async fn search_vectors(&self, query_vector: Vec<f32>, limit: usize) -> Result<Vec<SearchHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let table = self.get_table().await?;

        let stream = table
            .vector_search(query_vector)
            .context("Failed to create vector search")?
            .limit(limit)
            .execute()
            .await
            .context("Failed to execute search")?;

        let results: Vec<RecordBatch> = stream
            .try_collect()
            .await
            .context("Failed to collect search results")?;

        let mut hits = Vec::new();
        for batch in results {
            let chunk_ids = column::<StringArray>(&batch, "chunk_id")?;
            let symbols = column::<StringArray>(&batch, "symbol_name")?;
            let kinds = column::<StringArray>(&batch, "kind")?;
            let file_paths = column::<StringArray>(&batch, "file_path")?;
            let languages = column::<StringArray>(&batch, "language")?;
            let start_lines = column::<UInt32Array>(&batch, "start_line")?;
            let end_lines = column::<UInt32Array>(&batch, "end_line")?;
            let contents = column::<StringArray>(&batch, "content")?;
            let distances = column::<Float32Array>(&batch, "_distance")?;

            for i in 0..batch.num_rows() {
                let Some(kind) = UnitKind::parse(kinds.value(i)) else {
                    tracing::warn!("Skipping row with unknown kind '{}'", kinds.value(i));
                    continue;
                };
                hits.push(SearchHit {
                    chunk_id: chunk_ids.value(i).to_string(),
                    symbol_name: symbols.value(i).to_string(),
                    file_path: file_paths.value(i).to_string(),
                    kind,
                    language: languages.value(i).to_string(),
                    start_line: start_lines.value(i) as usize,
                    end_line: end_lines.value(i) as usize,
                    content: contents.value(i).to_string(),
                    score: 1.0 / (1.0 + distances.value(i)),
                });
            }
        }

        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(hits)
    }

    async fn delete_file_rows(&self, file_path: &str) -> Result<usize> {
        let table = self.get_table().await?;
        let filter = format!("file_path = {}", sql_literal(file_path));

        let count = table
            .count_rows(Some(filter.clone()))
            .await
            .context("Failed to count records")?;
        if count == 0 {
            return Ok(0);
        }

        table
            .delete(&filter)
            .await
            .context("Failed to delete records")?;

        tracing::debug!("Deleted {} chunk vectors for file: {}", count, file_path);
        Ok(count)
    }

    async fn collect_statistics(&self) -> Result<DatabaseStats> {
        let table = self.get_table().await?;

        let total_chunks = table
            .count_rows(None)
            .await
            .context("Failed to count rows")?;

        Ok(DatabaseStats { total_chunks })
    }
}

#[async_trait::async_trait]
impl VectorDatabase for LanceVectorDB {
    async fn initialize(&self, dimension: usize) -> Result<(), VectorDbError> {
        tracing::info!(
            "Initializing LanceDB with dimension {} at {}",
            dimension,
            self.db_path
        );
        self.create_table_if_missing(dimension)
            .await
            .map_err(|e| VectorDbError::TableCreationFailed {
                table: self.table_name.clone(),
                reason: format!("{:#}", e),
            })?;
        Ok(())
    }

    async fn store(&self, records: Vec<ChunkRecord>) -> Result<usize, VectorDbError> {
        self.store_records(records)
            .await
            .map_err(|e| VectorDbError::StoreFailed(format!("{:#}", e)))
    }

    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<SearchHit>, VectorDbError> {
        self.search_vectors(query_vector, limit)
            .await
            .map_err(|e| VectorDbError::SearchFailed(format!("{:#}", e)))
    }

    async fn delete_by_file(&self, file_path: &str) -> Result<usize, VectorDbError> {
        self.delete_file_rows(file_path)
            .await
            .map_err(|e| VectorDbError::DeleteFailed(format!("{:#}", e)))
    }

    async fn get_statistics(&self) -> Result<DatabaseStats, VectorDbError> {
        self.collect_statistics()
            .await
            .map_err(|e| VectorDbError::StatisticsFailed(format!("{:#}", e)))
    }

    async fn flush(&self) -> Result<(), VectorDbError> {
        // LanceDB persists automatically, no explicit flush needed
        Ok(())
    }
}

#[cfg(test)]
mod tests;
