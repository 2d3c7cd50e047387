//! Persistent storage for chunk vectors
//!
//! LanceDB is the embedded default. The trait is the seam tests and alternate
//! stores plug into.

pub mod lance_client;
pub use lance_client::LanceVectorDB;

use crate::error::VectorDbError;
use crate::types::{ChunkMetadata, SearchHit};

/// One chunk ready to be written: vector, metadata and the raw chunk text
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Storage key derived from `file_path` and `chunk_id`
    pub id: String,
    pub chunk_id: String,
    pub vector: Vec<f32>,
    pub metadata: ChunkMetadata,
    pub content: String,
}

/// Trait for vector database operations
#[async_trait::async_trait]
pub trait VectorDatabase: Send + Sync {
    /// Initialize the database and create collections if needed
    async fn initialize(&self, dimension: usize) -> Result<(), VectorDbError>;

    /// Insert records, replacing any existing record with the same id
    async fn store(&self, records: Vec<ChunkRecord>) -> Result<usize, VectorDbError>;

    /// Nearest neighbours of `query_vector`, best first
    async fn search(
        &self,
        query_vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<SearchHit>, VectorDbError>;

    /// Delete every record belonging to `file_path`, returning how many went
    async fn delete_by_file(&self, file_path: &str) -> Result<usize, VectorDbError>;

    /// Get statistics
    async fn get_statistics(&self) -> Result<DatabaseStats, VectorDbError>;

    /// Flush/save changes to disk
    async fn flush(&self) -> Result<(), VectorDbError>;
}

#[derive(Debug, Clone, Default)]
pub struct DatabaseStats {
    pub total_chunks: usize,
}
