use super::*;
use crate::error::EmbeddingError;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;

const DIM: usize = 64;

/// Bag-of-identifiers vectors; optionally fails every call
#[derive(Default)]
struct HashEmbedder {
    fail: AtomicBool,
}

impl EmbeddingProvider for HashEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if self.fail.load(Ordering::Relaxed) {
            return Err(EmbeddingError::Permanent("embedder offline".into()));
        }
        Ok(texts
            .iter()
            .map(|text| {
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
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        DIM
    }

    fn model_name(&self) -> &str {
        "hash-test"
    }
}

fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.vector_db.lancedb_path = dir.path().join("lancedb");
    config.indexing.state_path = dir.path().join("state.json");
    config
}

async fn create_test_manager() -> (IndexManager, Arc<HashEmbedder>, TempDir) {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let embedder = Arc::new(HashEmbedder::default());
    let db = LanceVectorDB::with_path(&config.vector_db.lancedb_path, "code_chunks")
        .await
        .unwrap();
    let manager = IndexManager::with_components(config, embedder.clone(), Arc::new(db))
        .await
        .unwrap();
    (manager, embedder, dir)
}

const TWO_FUNCTIONS: &str = "\
def helper(x):
    return x * 2


def main():
    return helper(21)
";

#[tokio::test]
async fn test_index_file_then_skip() {
    let (manager, _embedder, _dir) = create_test_manager().await;

    let first = manager
        .index_file("/repo/app.py", TWO_FUNCTIONS, false)
        .await
        .unwrap();
    assert_eq!(first, IndexOutcome::Indexed { units: 2, chunks: 2 });

    let second = manager
        .index_file("/repo/app.py", TWO_FUNCTIONS, false)
        .await
        .unwrap();
    assert_eq!(second, IndexOutcome::Skipped);

    let stats = manager.stats().await.unwrap();
    assert_eq!(stats.tracked_files, 1);
    assert_eq!(stats.stored_chunks, 2);
    assert_eq!(stats.graph_nodes, 2);
    assert_eq!(stats.graph_edges, 1);
}

#[tokio::test]
async fn test_force_reindexes_without_duplicates() {
    let (manager, _embedder, _dir) = create_test_manager().await;
    manager
        .index_file("/repo/app.py", TWO_FUNCTIONS, false)
        .await
        .unwrap();
    let forced = manager
        .index_file("/repo/app.py", TWO_FUNCTIONS, true)
        .await
        .unwrap();
    assert!(matches!(forced, IndexOutcome::Indexed { .. }));
    assert_eq!(manager.stats().await.unwrap().stored_chunks, 2);
}

#[tokio::test]
async fn test_failed_index_leaves_no_ghosts() {
    let (manager, embedder, _dir) = create_test_manager().await;
    manager
        .index_file("/repo/app.py", TWO_FUNCTIONS, false)
        .await
        .unwrap();

    embedder.fail.store(true, Ordering::Relaxed);
    let changed = TWO_FUNCTIONS.replace("21", "22");
    assert!(manager.index_file("/repo/app.py", &changed, false).await.is_err());

    let stats = manager.stats().await.unwrap();
    assert_eq!(stats.stored_chunks, 0);
    assert_eq!(stats.graph_nodes, 0);
    assert_eq!(stats.tracked_files, 0);

    // The old content is no longer considered current either
    embedder.fail.store(false, Ordering::Relaxed);
    let again = manager
        .index_file("/repo/app.py", TWO_FUNCTIONS, false)
        .await
        .unwrap();
    assert!(matches!(again, IndexOutcome::Indexed { .. }));
}

#[tokio::test]
async fn test_unsupported_file_indexes_nothing() {
    let (manager, _embedder, _dir) = create_test_manager().await;
    let outcome = manager
        .index_file("/repo/README.md", "# Title\n", false)
        .await
        .unwrap();
    assert_eq!(outcome, IndexOutcome::Indexed { units: 0, chunks: 0 });
}

#[tokio::test]
async fn test_process_batch_handles_deletions_and_persists() {
    let (manager, _embedder, dir) = create_test_manager().await;
    let root = dir.path().join("repo");
    std::fs::create_dir_all(root.join("pkg")).unwrap();
    std::fs::write(root.join("pkg/a.py"), TWO_FUNCTIONS).unwrap();
    std::fs::write(root.join("pkg/b.py"), "def lonely():\n    pass\n").unwrap();

    let summary = manager
        .process_batch(&["pkg/a.py", "pkg/b.py"], &root)
        .await
        .unwrap();
    assert_eq!(summary.processed, 2);
    assert_eq!(summary.to_string(), "Processed 2, Skipped 0");

    std::fs::remove_file(root.join("pkg/b.py")).unwrap();
    let summary = manager
        .process_batch(&["pkg/a.py", "pkg/b.py"], &root)
        .await
        .unwrap();
    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.to_string(), "Processed 0, Skipped 1, Removed 1");

    let stats = manager.stats().await.unwrap();
    assert_eq!(stats.tracked_files, 1);
    assert!(!manager.graph().read().await.contains("lonely"));

    let persisted = IndexState::load(&dir.path().join("state.json")).unwrap();
    let key = root.join("pkg/a.py").to_string_lossy().to_string();
    assert!(persisted.digest(&key).is_some());
    assert_eq!(persisted.len(), 1);
}

#[tokio::test]
async fn test_process_batch_continues_past_failures() {
    let (manager, _embedder, dir) = create_test_manager().await;
    let root = dir.path().join("repo");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("ok.py"), "def ok():\n    pass\n").unwrap();
    // Not valid UTF-8, so reading it as text fails
    std::fs::write(root.join("bad.py"), [0xff, 0xfe, 0x00, 0x41]).unwrap();

    let summary = manager
        .process_batch(&["bad.py", "ok.py"], &root)
        .await
        .unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].starts_with("bad.py"));
}

#[tokio::test]
async fn test_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let root = dir.path().join("repo");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("m.py"), TWO_FUNCTIONS).unwrap();

    for expected_processed in [1, 0] {
        let db = LanceVectorDB::with_path(&config.vector_db.lancedb_path, "code_chunks")
            .await
            .unwrap();
        let manager =
            IndexManager::with_components(config.clone(), Arc::new(HashEmbedder::default()), Arc::new(db))
                .await
                .unwrap();
        let summary = manager.process_batch(&["m.py"], &root).await.unwrap();
        assert_eq!(summary.processed, expected_processed);
    }
}

#[tokio::test]
async fn test_remove_file() {
    let (manager, _embedder, _dir) = create_test_manager().await;
    manager
        .index_file("/repo/app.py", TWO_FUNCTIONS, false)
        .await
        .unwrap();
    assert_eq!(manager.remove_file("/repo/app.py").await.unwrap(), 2);
    assert_eq!(manager.stats().await.unwrap(), IndexStats::default());
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir);
    config.chunking.overlap_tokens = config.chunking.window_tokens;
    let db = LanceVectorDB::with_path(&config.vector_db.lancedb_path, "code_chunks")
        .await
        .unwrap();
    let result =
        IndexManager::with_components(config, Arc::new(HashEmbedder::default()), Arc::new(db)).await;
    assert!(matches!(result, Err(ReviewContextError::Config(_))));
}

#[tokio::test]
async fn test_skipped_files_are_graphed_after_restart() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);
    let root = dir.path().join("repo");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("m.py"), TWO_FUNCTIONS).unwrap();

    for _ in 0..2 {
        let db = LanceVectorDB::with_path(&config.vector_db.lancedb_path, "code_chunks")
            .await
            .unwrap();
        let manager =
            IndexManager::with_components(config.clone(), Arc::new(HashEmbedder::default()), Arc::new(db))
                .await
                .unwrap();
        manager.process_batch(&["m.py"], &root).await.unwrap();
        let graph = manager.graph();
        let graph = graph.read().await;
        assert!(graph.contains("helper"));
        assert_eq!(graph.edge_count(), 1);
    }
}

#[tokio::test]
async fn test_process_batch_skips_unsupported_paths() {
    let (manager, _embedder, dir) = create_test_manager().await;
    let root = dir.path().join("repo");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("README.md"), "# Notes\n").unwrap();
    std::fs::write(root.join("ok.py"), "def ok():\n    pass\n").unwrap();

    let summary = manager
        .process_batch(&["README.md", "ok.py"], &root)
        .await
        .unwrap();
    assert_eq!(summary.processed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(manager.stats().await.unwrap().tracked_files, 1);
}
