//! Shared fixtures for integration tests

#![allow(dead_code)]

use review_context::config::Config;
use review_context::embedding::EmbeddingProvider;
use review_context::error::EmbeddingError;
use review_context::vector_db::LanceVectorDB;
use review_context::IndexManager;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tempfile::TempDir;

pub const DIM: usize = 64;

/// Deterministic bag-of-identifiers embedder; never touches the network
pub struct HashEmbedder;

impl EmbeddingProvider for HashEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "hash-test"
    }
}

fn embed(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; DIM];
    for token in text
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|t| !t.is_empty())
    {
        let mut h = DefaultHasher::new();
        token.hash(&mut h);
        v[(h.finish() % DIM as u64) as usize] += 1.0;
    }
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
    v.iter_mut().for_each(|x| *x /= norm);
    v
}

pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.vector_db.lancedb_path = dir.path().join("lancedb");
    config.indexing.state_path = dir.path().join("index_state.json");
    config
}

pub async fn manager_with(config: Config) -> IndexManager {
    let db = LanceVectorDB::with_path(
        &config.vector_db.lancedb_path,
        &config.vector_db.collection_name,
    )
    .await
    .unwrap();
    IndexManager::with_components(config, Arc::new(HashEmbedder), Arc::new(db))
        .await
        .unwrap()
}

pub async fn create_test_manager() -> (IndexManager, TempDir) {
    let dir = TempDir::new().unwrap();
    let manager = manager_with(test_config(&dir)).await;
    (manager, dir)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("review_context=debug")
        .try_init();
}
