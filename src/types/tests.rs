use super::*;

#[test]
fn test_batch_summary_display_minimal() {
    let summary = BatchSummary {
        processed: 3,
        skipped: 2,
        ..Default::default()
    };
    assert_eq!(summary.to_string(), "Processed 3, Skipped 2");
}

#[test]
fn test_batch_summary_display_with_removals_and_failures() {
    let summary = BatchSummary {
        processed: 1,
        skipped: 0,
        removed: 2,
        failed: 1,
        errors: vec!["src/a.py: embedding failed".to_string()],
        ..Default::default()
    };
    assert_eq!(
        summary.to_string(),
        "Processed 1, Skipped 0, Removed 2, Failed 1"
    );
}

#[test]
fn test_index_outcome_serialization() {
    let json = serde_json::to_string(&IndexOutcome::Indexed { units: 2, chunks: 3 }).unwrap();
    assert_eq!(json, r#"{"status":"indexed","units":2,"chunks":3}"#);

    let skipped: IndexOutcome = serde_json::from_str(r#"{"status":"skipped"}"#).unwrap();
    assert_eq!(skipped, IndexOutcome::Skipped);
}

#[test]
fn test_chunk_metadata_docstring_defaults() {
    let json = r#"{
        "kind": "method",
        "symbol_name": "greet",
        "file_path": "src/greeter.py",
        "language": "python",
        "start_line": 7,
        "end_line": 9,
        "chunk_index": 0,
        "total_chunks": 1,
        "is_skeleton": false
    }"#;
    let meta: ChunkMetadata = serde_json::from_str(json).unwrap();
    assert_eq!(meta.kind, UnitKind::Method);
    assert!(meta.docstring.is_empty());
}
