use crate::indexer::UnitKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Metadata stored alongside every chunk vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub kind: UnitKind,
    /// Name of the owning code unit
    pub symbol_name: String,
    pub file_path: String,
    pub language: String,
    /// First line of the owning unit (1-based)
    pub start_line: usize,
    /// Last line of the owning unit (1-based)
    pub end_line: usize,
    #[serde(default)]
    pub docstring: String,
    /// 0-based position among the unit's chunks
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Set for class chunks whose method bodies were elided
    pub is_skeleton: bool,
}

/// A single similarity search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Chunk id (`{name}-{ordinal}-{digest}`)
    pub chunk_id: String,
    pub symbol_name: String,
    pub file_path: String,
    pub kind: UnitKind,
    pub language: String,
    pub start_line: usize,
    pub end_line: usize,
    pub content: String,
    /// Similarity score (0.0 to 1.0, higher is closer)
    pub score: f32,
}

/// Result of indexing one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IndexOutcome {
    /// Content digest matched the last indexed version
    Skipped,
    Indexed { units: usize, chunks: usize },
}

/// Totals for one `process_batch` / `index_repository` call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Files parsed, chunked and embedded
    pub processed: usize,
    /// Files whose digest was unchanged
    pub skipped: usize,
    /// Files missing on disk whose entries were dropped
    pub removed: usize,
    /// Files whose indexing failed (see `errors`)
    pub failed: usize,
    pub chunks_indexed: usize,
    #[serde(default)]
    pub errors: Vec<String>,
    pub duration_ms: u64,
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Processed {}, Skipped {}", self.processed, self.skipped)?;
        if self.removed > 0 {
            write!(f, ", Removed {}", self.removed)?;
        }
        if self.failed > 0 {
            write!(f, ", Failed {}", self.failed)?;
        }
        Ok(())
    }
}

/// Token-bounded context block handed to the prompting layer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReviewContext {
    pub text: String,
    /// Names of the units overlapping the diff, in source order
    pub changed_symbols: Vec<String>,
    /// Token count of `text`
    pub tokens: usize,
}

/// Statistics about the index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub tracked_files: usize,
    pub stored_chunks: usize,
    pub graph_nodes: usize,
    pub graph_edges: usize,
}

#[cfg(test)]
mod tests;
