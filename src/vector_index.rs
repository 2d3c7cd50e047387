//! Embedding plus storage behind one handle
//!
//! Owns the embedder and the vector database. Shared between the index manager
//! (writes) and the context builder (reads).

use crate::embedding::EmbeddingProvider;
use crate::error::{EmbeddingError, ReviewContextError};
use crate::indexer::CodeChunk;
use crate::types::SearchHit;
use crate::vector_db::{ChunkRecord, DatabaseStats, VectorDatabase};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

pub struct VectorIndex {
    embedder: Arc<dyn EmbeddingProvider>,
    db: Arc<dyn VectorDatabase>,
    batch_size: usize,
    timeout: Duration,
}

/// Text that is actually embedded for a chunk: a small provenance header
/// followed by the code
pub fn embedding_text(chunk: &CodeChunk) -> String {
    let meta = &chunk.metadata;
    let intent = if meta.docstring.trim().is_empty() {
        "N/A"
    } else {
        meta.docstring.trim()
    };
    format!(
        "File: {}\nSymbol: {}\nType: {}\nIntent: {}\nCode:\n{}",
        meta.file_path, meta.symbol_name, meta.kind, intent, chunk.content
    )
}

/// Storage key for a chunk, unique across files
pub fn storage_id(file_path: &str, chunk_id: &str) -> String {
    let digest = Sha256::digest(format!("{file_path}::{chunk_id}").as_bytes());
    format!("{:x}", digest)[..32].to_string()
}

impl VectorIndex {
    /// Build the handle and make sure the backing table exists
    pub async fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        db: Arc<dyn VectorDatabase>,
        batch_size: usize,
        timeout: Duration,
    ) -> Result<Self, ReviewContextError> {
        db.initialize(embedder.dimension()).await?;
        Ok(Self {
            embedder,
            db,
            batch_size: batch_size.max(1),
            timeout,
        })
    }

    pub fn dimension(&self) -> usize {
        self.embedder.dimension()
    }

    /// Embed and store `chunks`. Identical content maps to the same id, so
    /// re-upserting it replaces rows rather than adding duplicates. Any
    /// embedding failure aborts before the failing batch is written.
    pub async fn upsert(&self, chunks: &[CodeChunk]) -> Result<usize, ReviewContextError> {
        let mut stored = 0;
        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(embedding_text).collect();
            let vectors = self.embed(texts).await?;

            let records = batch
                .iter()
                .zip(vectors)
                .map(|(chunk, vector)| ChunkRecord {
                    id: storage_id(&chunk.metadata.file_path, &chunk.id),
                    chunk_id: chunk.id.clone(),
                    vector,
                    metadata: chunk.metadata.clone(),
                    content: chunk.content.clone(),
                })
                .collect();
            stored += self.db.store(records).await?;
        }
        Ok(stored)
    }

    /// Up to `k` chunks closest to `query`, best first
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, ReviewContextError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut vectors = self.embed(vec![query.to_string()]).await?;
        let vector = vectors.pop().ok_or(EmbeddingError::CountMismatch {
            expected: 1,
            actual: 0,
        })?;
        let mut hits = self.db.search(vector, k).await?;
        hits.truncate(k);
        Ok(hits)
    }

    pub async fn delete_by_file(&self, file_path: &str) -> Result<usize, ReviewContextError> {
        Ok(self.db.delete_by_file(file_path).await?)
    }

    pub async fn statistics(&self) -> Result<DatabaseStats, ReviewContextError> {
        Ok(self.db.get_statistics().await?)
    }

    pub async fn flush(&self) -> Result<(), ReviewContextError> {
        Ok(self.db.flush().await?)
    }

    /// Run the synchronous embedder on the blocking pool under a deadline and
    /// check the vectors it returns
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let expected = texts.len();
        let embedder = Arc::clone(&self.embedder);
        let task = tokio::task::spawn_blocking(move || embedder.embed_batch(&texts));

        let vectors = tokio::time::timeout(self.timeout, task)
            .await
            .map_err(|_| EmbeddingError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| EmbeddingError::Permanent(format!("embedding task failed: {e}")))??;

        if vectors.len() != expected {
            return Err(EmbeddingError::CountMismatch {
                expected,
                actual: vectors.len(),
            });
        }
        let dimension = self.embedder.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexer::UnitKind;
    use crate::types::ChunkMetadata;
    use crate::vector_db::LanceVectorDB;
    use tempfile::TempDir;

    struct Fixed {
        dimension: usize,
        returned: usize,
    }

    impl EmbeddingProvider for Fixed {
        fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
            Ok(texts
                .iter()
                .map(|t| {
                    let mut v = vec![0.0; self.returned];
                    v[t.len() % self.returned] = 1.0;
                    v
                })
                .collect())
        }

        fn dimension(&self) -> usize {
            self.dimension
        }

        fn model_name(&self) -> &str {
            "fixed"
        }
    }

    fn chunk(name: &str, file: &str, docstring: &str) -> CodeChunk {
        CodeChunk {
            id: format!("{name}-0-0123abcd"),
            content: format!("def {name}():\n    pass"),
            metadata: ChunkMetadata {
                kind: UnitKind::Function,
                symbol_name: name.to_string(),
                file_path: file.to_string(),
                language: "python".to_string(),
                start_line: 1,
                end_line: 2,
                docstring: docstring.to_string(),
                chunk_index: 0,
                total_chunks: 1,
                is_skeleton: false,
            },
        }
    }

    async fn index_with(embedder: Fixed) -> (VectorIndex, TempDir) {
        let dir = TempDir::new().unwrap();
        let db = LanceVectorDB::with_path(&dir.path().join("lancedb"), "code_chunks")
            .await
            .unwrap();
        let index = VectorIndex::new(Arc::new(embedder), Arc::new(db), 2, Duration::from_secs(10))
            .await
            .unwrap();
        (index, dir)
    }

    #[test]
    fn test_embedding_text_layout() {
        let text = embedding_text(&chunk("load", "src/io.py", "Reads a file."));
        assert_eq!(
            text,
            "File: src/io.py\nSymbol: load\nType: function\nIntent: Reads a file.\nCode:\ndef load():\n    pass"
        );
        assert!(embedding_text(&chunk("load", "src/io.py", "")).contains("Intent: N/A\n"));
    }

    #[test]
    fn test_storage_id_separates_files() {
        let a = storage_id("a.py", "run-0-0123abcd");
        let b = storage_id("b.py", "run-0-0123abcd");
        assert_ne!(a, b);
        assert_eq!(a, storage_id("a.py", "run-0-0123abcd"));
        assert_eq!(a.len(), 32);
    }

    #[tokio::test]
    async fn test_upsert_is_idempotent() {
        let (index, _dir) = index_with(Fixed {
            dimension: 8,
            returned: 8,
        })
        .await;
        let chunks = vec![chunk("a", "m.py", ""), chunk("b", "m.py", ""), chunk("c", "n.py", "")];

        assert_eq!(index.upsert(&chunks).await.unwrap(), 3);
        assert_eq!(index.upsert(&chunks).await.unwrap(), 3);
        assert_eq!(index.statistics().await.unwrap().total_chunks, 3);

        assert_eq!(index.delete_by_file("m.py").await.unwrap(), 2);
        assert_eq!(index.statistics().await.unwrap().total_chunks, 1);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_fails_loudly() {
        let (index, _dir) = index_with(Fixed {
            dimension: 8,
            returned: 4,
        })
        .await;
        let err = index.upsert(&[chunk("a", "m.py", "")]).await.unwrap_err();
        assert!(matches!(
            err,
            ReviewContextError::Embedding(EmbeddingError::DimensionMismatch {
                expected: 8,
                actual: 4
            })
        ));
        assert_eq!(index.statistics().await.unwrap().total_chunks, 0);
    }

    #[tokio::test]
    async fn test_search_zero_k() {
        let (index, _dir) = index_with(Fixed {
            dimension: 8,
            returned: 8,
        })
        .await;
        assert!(index.search("anything", 0).await.unwrap().is_empty());
    }
}
