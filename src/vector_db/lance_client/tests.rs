use super::*;
use crate::types::ChunkMetadata;
use tempfile::TempDir;

const DIM: usize = 8;

async fn create_test_db() -> (LanceVectorDB, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db = LanceVectorDB::with_path(&temp_dir.path().join("lancedb"), "code_chunks")
        .await
        .unwrap();
    db.initialize(DIM).await.unwrap();
    (db, temp_dir)
}

fn unit_vector(hot: usize) -> Vec<f32> {
    let mut v = vec![0.0; DIM];
    v[hot % DIM] = 1.0;
    v
}

fn record(id: &str, file_path: &str, symbol: &str, hot: usize) -> ChunkRecord {
    ChunkRecord {
        id: id.to_string(),
        chunk_id: format!("{symbol}-0-deadbeef"),
        vector: unit_vector(hot),
        metadata: ChunkMetadata {
            kind: UnitKind::Function,
            symbol_name: symbol.to_string(),
            file_path: file_path.to_string(),
            language: "python".to_string(),
            start_line: 1,
            end_line: 3,
            docstring: String::new(),
            chunk_index: 0,
            total_chunks: 1,
            is_skeleton: false,
        },
        content: format!("def {symbol}():\n    pass"),
    }
}

#[tokio::test]
async fn test_initialize_creates_table() {
    let (db, _dir) = create_test_db().await;
    let table_names = db.connection.table_names().execute().await.unwrap();
    assert!(table_names.contains(&"code_chunks".to_string()));
}

#[tokio::test]
async fn test_initialize_idempotent() {
    let (db, _dir) = create_test_db().await;
    assert!(db.initialize(DIM).await.is_ok());
}

#[tokio::test]
async fn test_store_empty() {
    let (db, _dir) = create_test_db().await;
    assert_eq!(db.store(vec![]).await.unwrap(), 0);
}

#[tokio::test]
async fn test_store_and_search() {
    let (db, _dir) = create_test_db().await;
    db.store(vec![
        record("a", "src/a.py", "alpha", 0),
        record("b", "src/b.py", "beta", 3),
    ])
    .await
    .unwrap();

    let hits = db.search(unit_vector(3), 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].symbol_name, "beta");
    assert_eq!(hits[0].file_path, "src/b.py");
    assert_eq!(hits[0].kind, UnitKind::Function);
    assert_eq!(hits[0].chunk_id, "beta-0-deadbeef");
    assert!(hits[0].score > hits[1].score);
    assert!((hits[0].score - 1.0).abs() < 1e-4);
}

#[tokio::test]
async fn test_store_replaces_same_id() {
    let (db, _dir) = create_test_db().await;
    db.store(vec![record("a", "src/a.py", "alpha", 0)])
        .await
        .unwrap();
    db.store(vec![record("a", "src/a.py", "alpha", 1)])
        .await
        .unwrap();

    let stats = db.get_statistics().await.unwrap();
    assert_eq!(stats.total_chunks, 1);
}

#[tokio::test]
async fn test_store_rejects_mixed_dimensions() {
    let (db, _dir) = create_test_db().await;
    let mut bad = record("b", "src/b.py", "beta", 1);
    bad.vector.push(0.5);
    let result = db.store(vec![record("a", "src/a.py", "alpha", 0), bad]).await;
    assert!(matches!(result, Err(VectorDbError::StoreFailed(_))));
}

#[tokio::test]
async fn test_delete_by_file_counts_rows() {
    let (db, _dir) = create_test_db().await;
    db.store(vec![
        record("a1", "src/a.py", "alpha", 0),
        record("a2", "src/a.py", "alpha_two", 1),
        record("b", "src/b.py", "beta", 2),
    ])
    .await
    .unwrap();

    assert_eq!(db.delete_by_file("src/a.py").await.unwrap(), 2);
    assert_eq!(db.delete_by_file("src/a.py").await.unwrap(), 0);

    let hits = db.search(unit_vector(0), 10).await.unwrap();
    assert!(hits.iter().all(|h| h.file_path == "src/b.py"));
}

#[tokio::test]
async fn test_delete_handles_quotes_in_path() {
    let (db, _dir) = create_test_db().await;
    db.store(vec![record("q", "src/it's.py", "quoted", 0)])
        .await
        .unwrap();
    assert_eq!(db.delete_by_file("src/it's.py").await.unwrap(), 1);
}

#[tokio::test]
async fn test_statistics_counts_rows() {
    let (db, _dir) = create_test_db().await;
    assert_eq!(db.get_statistics().await.unwrap().total_chunks, 0);
    db.store(vec![
        record("a", "a.py", "alpha", 0),
        record("b", "b.py", "beta", 1),
    ])
    .await
    .unwrap();
    assert_eq!(db.get_statistics().await.unwrap().total_chunks, 2);
}

#[tokio::test]
async fn test_search_zero_limit() {
    let (db, _dir) = create_test_db().await;
    assert!(db.search(unit_vector(0), 0).await.unwrap().is_empty());
}

#[test]
fn test_sql_literal_escapes_quotes() {
    assert_eq!(sql_literal("a'b"), "'a''b'");
    assert_eq!(sql_literal("plain"), "'plain'");
}
