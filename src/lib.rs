//! # Review Context - Code Indexing and Context Retrieval for Code Review
//!
//! Indexes a repository into function/method/class units, keeps a caller/callee
//! graph and a vector index of those units up to date incrementally, and builds
//! a token-bounded context block for a changed file and its diff.
//!
//! ## Key Features
//!
//! - **Grammar-Driven Parsing**: Tree-sitter queries for Python, JavaScript,
//!   TypeScript/TSX, Java, Go, C, C++ and Rust, driven by one language table
//! - **Signature-Anchored Chunking**: Large functions are split into overlapping
//!   token windows that each repeat the function's header
//! - **Symbol Graph**: Caller/callee edges between indexed units (petgraph)
//! - **Semantic Search**: FastEmbed or an OpenAI-compatible endpoint, stored in
//!   embedded LanceDB
//! - **Incremental Indexing**: Per-file SHA-256 digests; unchanged files are
//!   skipped and changed files are surgically replaced
//!
//! ## Architecture
//!
//! ```text
//!             ┌──────────────┐
//!  diff ─────▶│ContextBuilder│─────▶ ReviewContext
//!             └──┬───────┬───┘
//!                │       │
//!     ┌──────────▼┐   ┌──▼──────────┐
//!     │SymbolGraph│   │ VectorIndex │ (embedder + LanceDB)
//!     └─────▲─────┘   └──▲──────────┘
//!           │            │
//!        ┌──┴────────────┴──┐
//!        │   IndexManager   │──▶ IndexState (path → digest)
//!        └────────┬─────────┘
//!                 │
//!        CodeParser → SmartChunker
//! ```
//!
//! ## Usage Example
//!
//! ```no_run
//! use review_context::{Config, IndexManager};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = IndexManager::new(Config::new()?).await?;
//!     let root = Path::new("/path/to/repo");
//!
//!     let summary = manager.index_repository(root).await?;
//!     println!("{summary}");
//!
//!     let file = root.join("src/app.py");
//!     let content = std::fs::read_to_string(&file)?;
//!     let diff = "@@ -10,3 +10,4 @@\n-old\n+new\n+more\n";
//!     let context = manager
//!         .context_builder()
//!         .build(&file.to_string_lossy(), &content, diff)
//!         .await?;
//!     println!("{}", context.text);
//!     Ok(())
//! }
//! ```

/// Configuration management with environment variable overrides
pub mod config;

/// Diff mapping and review context assembly
pub mod context;

/// Embedding providers with retry and backoff
pub mod embedding;

/// Error types and utilities
pub mod error;

/// File walking, AST parsing and code chunking
pub mod indexer;

/// Incremental indexing orchestration
pub mod manager;

/// Platform-specific data and config locations
pub mod paths;

/// Caller/callee symbol graph
pub mod relations;

/// Persisted path to content digest map
pub mod state;

/// Shared result and metadata types
pub mod types;

/// Vector database abstraction (LanceDB)
pub mod vector_db;

/// Embedding plus storage behind one handle
pub mod vector_index;

pub use config::Config;
pub use context::ContextBuilder;
pub use error::ReviewContextError;
pub use indexer::{CodeChunk, CodeParser, CodeUnit, Language, SmartChunker, UnitKind};
pub use manager::IndexManager;
pub use relations::{SymbolContext, SymbolGraph};
pub use types::{BatchSummary, IndexOutcome, IndexStats, ReviewContext, SearchHit};
pub use vector_index::VectorIndex;
