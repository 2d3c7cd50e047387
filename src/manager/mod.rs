//! Incremental indexing orchestration
//!
//! The manager owns the parser, chunker, symbol graph, digest state and the
//! vector index handle. Every re-index of a file removes the file's previous
//! vectors and graph nodes before anything new is written.

use crate::config::Config;
use crate::context::ContextBuilder;
use crate::embedding::{self, EmbeddingProvider};
use crate::error::ReviewContextError;
use crate::indexer::{CodeParser, CodeUnit, FileWalker, SmartChunker, TokenCounter, is_supported};
use crate::relations::SymbolGraph;
use crate::state::{IndexState, content_digest};
use crate::types::{BatchSummary, IndexOutcome, IndexStats, SearchHit};
use crate::vector_db::{LanceVectorDB, VectorDatabase};
use crate::vector_index::VectorIndex;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

pub struct IndexManager {
    config: Arc<Config>,
    parser: Arc<CodeParser>,
    chunker: Arc<SmartChunker>,
    counter: TokenCounter,
    graph: Arc<RwLock<SymbolGraph>>,
    state: Arc<RwLock<IndexState>>,
    state_path: PathBuf,
    index: Arc<VectorIndex>,
    /// Serializes writers so graph and state changes of one file never interleave
    writer: Mutex<()>,
}

impl IndexManager {
    /// Build a manager from configuration: the configured embedder, a LanceDB
    /// store at the configured path and the persisted digest state
    pub async fn new(config: Config) -> Result<Self, ReviewContextError> {
        tracing::info!("Initializing index manager");
        tracing::debug!("Embedding model: {}", config.embedding.model_name);

        let embedding_config = config.embedding.clone();
        let embedder = tokio::task::spawn_blocking(move || embedding::from_config(&embedding_config))
            .await
            .context("Embedding provider initialization panicked")??;

        tracing::info!(
            "Using LanceDB vector database at {}",
            config.vector_db.lancedb_path.display()
        );
        let db = LanceVectorDB::with_path(
            &config.vector_db.lancedb_path,
            &config.vector_db.collection_name,
        )
        .await?;

        Self::with_components(config, embedder, Arc::new(db)).await
    }

    /// Build a manager around an explicit embedder and store
    pub async fn with_components(
        config: Config,
        embedder: Arc<dyn EmbeddingProvider>,
        db: Arc<dyn VectorDatabase>,
    ) -> Result<Self, ReviewContextError> {
        config.validate()?;

        let parser = CodeParser::new()?;
        let counter = TokenCounter::new()?;
        let chunker = SmartChunker::new(counter.clone(), config.chunking);

        let index = VectorIndex::new(
            embedder,
            db,
            config.embedding.batch_size,
            Duration::from_secs(config.embedding.timeout_secs),
        )
        .await?;

        let state_path = config.indexing.state_path.clone();
        let state = IndexState::load(&state_path)?;

        Ok(Self {
            config: Arc::new(config),
            parser: Arc::new(parser),
            chunker: Arc::new(chunker),
            counter,
            graph: Arc::new(RwLock::new(SymbolGraph::new())),
            state: Arc::new(RwLock::new(state)),
            state_path,
            index: Arc::new(index),
            writer: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn vector_index(&self) -> Arc<VectorIndex> {
        Arc::clone(&self.index)
    }

    pub fn graph(&self) -> Arc<RwLock<SymbolGraph>> {
        Arc::clone(&self.graph)
    }

    /// A context builder sharing this manager's graph and vector index
    pub fn context_builder(&self) -> ContextBuilder {
        ContextBuilder::new(
            Arc::clone(&self.parser),
            self.counter.clone(),
            Arc::clone(&self.graph),
            Arc::clone(&self.index),
            self.config.context,
        )
    }

    /// Index one file's content under `path`.
    ///
    /// Returns `Skipped` when the content digest matches the last successful
    /// index of this path and `force` is false. On failure the file's entries
    /// and digest are cleared so the next pass retries it from scratch.
    pub async fn index_file(
        &self,
        path: &str,
        content: &str,
        force: bool,
    ) -> Result<IndexOutcome, ReviewContextError> {
        let _guard = self.writer.lock().await;
        self.index_file_locked(path, content, force).await
    }

    async fn index_file_locked(
        &self,
        path: &str,
        content: &str,
        force: bool,
    ) -> Result<IndexOutcome, ReviewContextError> {
        let digest = content_digest(content);
        if !force && self.state.read().await.is_current(path, &digest) {
            tracing::debug!("Skipping unchanged file: {}", path);
            // The graph lives in memory only; after a restart, unchanged files
            // still need their symbols graphed
            if !self.graph.read().await.has_file(path) {
                let units = self.parse(path, content).await?;
                self.graph.write().await.build(&units);
            }
            return Ok(IndexOutcome::Skipped);
        }

        tracing::info!("Updating {}", path);
        self.remove_entries(path).await?;

        match self.reindex(path, content).await {
            Ok(outcome) => {
                self.state.write().await.record(path, digest);
                Ok(outcome)
            }
            Err(e) => {
                self.state.write().await.remove(path);
                if let Err(cleanup) = self.remove_entries(path).await {
                    tracing::warn!("Failed to clean up after error in {}: {}", path, cleanup);
                }
                Err(e)
            }
        }
    }

    /// Vectors first, then graph nodes
    async fn remove_entries(&self, path: &str) -> Result<usize, ReviewContextError> {
        let removed = self.index.delete_by_file(path).await?;
        self.graph.write().await.remove_file(path);
        Ok(removed)
    }

    async fn parse(&self, path: &str, content: &str) -> Result<Vec<CodeUnit>, ReviewContextError> {
        let parser = Arc::clone(&self.parser);
        let (owned_path, owned_content) = (path.to_string(), content.to_string());
        let units = tokio::task::spawn_blocking(move || parser.parse(&owned_content, &owned_path))
            .await
            .context("Parse task panicked")?;
        Ok(units)
    }

    async fn reindex(&self, path: &str, content: &str) -> Result<IndexOutcome, ReviewContextError> {
        let parser = Arc::clone(&self.parser);
        let chunker = Arc::clone(&self.chunker);
        let owned_path = path.to_string();
        let owned_content = content.to_string();

        let (units, chunks) = tokio::task::spawn_blocking(move || {
            let units = parser.parse(&owned_content, &owned_path);
            let chunks = chunker.chunk_units(&units);
            (units, chunks)
        })
        .await
        .context("Parse task panicked")?;

        let stored = self.index.upsert(&chunks).await?;
        self.graph.write().await.build(&units);

        tracing::debug!(
            "Indexed {}: {} units, {} chunks",
            path,
            units.len(),
            stored
        );
        Ok(IndexOutcome::Indexed {
            units: units.len(),
            chunks: stored,
        })
    }

    /// Drop everything known about `path`: vectors, graph nodes and digest
    pub async fn remove_file(&self, path: &str) -> Result<usize, ReviewContextError> {
        let _guard = self.writer.lock().await;
        let removed = self.remove_entries(path).await?;
        self.state.write().await.remove(path);
        Ok(removed)
    }

    /// Process paths (relative to `root`) changed by a diff.
    ///
    /// Paths missing on disk are treated as deletions. Paths the parser has
    /// no grammar for are counted as skipped without being read. A failure on
    /// one file is logged and counted without aborting the batch. State is
    /// persisted once, after every path has been handled.
    pub async fn process_batch<S: AsRef<str>>(
        &self,
        paths: &[S],
        root: &Path,
    ) -> Result<BatchSummary, ReviewContextError> {
        let start = Instant::now();
        let _guard = self.writer.lock().await;
        let mut summary = BatchSummary::default();

        for rel_path in paths {
            let rel_path = rel_path.as_ref();
            let full_path = root.join(rel_path);
            let key = full_path.to_string_lossy().to_string();

            if !full_path.exists() {
                tracing::info!("File deleted: {}", rel_path);
                match self.remove_entries(&key).await {
                    Ok(_) => {
                        self.state.write().await.remove(&key);
                        summary.removed += 1;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to remove {}: {}", rel_path, e);
                        summary.failed += 1;
                        summary.errors.push(format!("{}: {}", rel_path, e));
                    }
                }
                continue;
            }

            if !is_supported(&full_path) {
                tracing::debug!("Skipping unsupported file: {}", rel_path);
                summary.skipped += 1;
                continue;
            }

            let result = match tokio::fs::read_to_string(&full_path).await {
                Ok(content) => self.index_file_locked(&key, &content, false).await,
                Err(e) => Err(e.into()),
            };

            match result {
                Ok(IndexOutcome::Skipped) => summary.skipped += 1,
                Ok(IndexOutcome::Indexed { chunks, .. }) => {
                    summary.processed += 1;
                    summary.chunks_indexed += chunks;
                }
                Err(e) => {
                    tracing::warn!("Failed to process {}: {}", rel_path, e);
                    summary.failed += 1;
                    summary.errors.push(format!("{}: {}", rel_path, e));
                }
            }
        }

        self.persist_state().await?;
        self.index.flush().await?;

        summary.duration_ms = start.elapsed().as_millis() as u64;
        tracing::info!("{} in {}ms", summary, summary.duration_ms);
        Ok(summary)
    }

    /// Walk `root` and bring the index in line with what is on disk: every
    /// supported file is passed through `process_batch`, and tracked files
    /// under `root` that no longer exist are removed.
    pub async fn index_repository(&self, root: &Path) -> Result<BatchSummary, ReviewContextError> {
        let walker = FileWalker::new(root, self.config.indexing.max_file_size)
            .with_exclude_patterns(&self.config.indexing.exclude_patterns)?;

        let files = tokio::task::spawn_blocking(move || walker.walk())
            .await
            .context("File walk task panicked")??;
        tracing::info!("Found {} indexable files under {}", files.len(), root.display());

        let mut paths: Vec<String> = files.into_iter().map(|f| f.relative_path).collect();

        let stale: Vec<String> = {
            let state = self.state.read().await;
            state
                .paths_under(root)
                .filter(|p| !Path::new(p).exists())
                .filter_map(|p| Path::new(p).strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().to_string())
                .collect()
        };
        paths.extend(stale);

        self.process_batch(&paths[..], root).await
    }

    /// Similarity search over the stored chunks
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, ReviewContextError> {
        self.index.search(query, k).await
    }

    pub async fn stats(&self) -> Result<IndexStats, ReviewContextError> {
        let stored = self.index.statistics().await?;
        let graph = self.graph.read().await;
        Ok(IndexStats {
            tracked_files: self.state.read().await.len(),
            stored_chunks: stored.total_chunks,
            graph_nodes: graph.node_count(),
            graph_edges: graph.edge_count(),
        })
    }

    /// Write the digest map to disk
    pub async fn save_state(&self) -> Result<(), ReviewContextError> {
        let _guard = self.writer.lock().await;
        self.persist_state().await
    }

    async fn persist_state(&self) -> Result<(), ReviewContextError> {
        let state = self.state.read().await.clone();
        let path = self.state_path.clone();
        tokio::task::spawn_blocking(move || state.save(&path))
            .await
            .context("State save task panicked")?
            .map_err(|e| {
                tracing::error!("Could not persist index state: {}", e);
                e.into()
            })
    }
}

#[cfg(test)]
mod tests;
