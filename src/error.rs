/// Centralized error types for review-context using thiserror
///
/// Only failures that cross a component boundary are typed here. A syntax error
/// inside one region of a file, an unsupported extension and a query for an
/// unknown symbol are not errors at all: they yield partial or empty results.
use thiserror::Error;

/// Main error type for the indexing and context pipeline
#[derive(Error, Debug)]
pub enum ReviewContextError {
    #[error("Parser error: {0}")]
    Parse(#[from] ParseError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Vector database error: {0}")]
    VectorDb(#[from] VectorDbError),

    #[error("Index state error: {0}")]
    State(#[from] StateError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Errors raised while preparing the grammar-driven parser.
///
/// These only occur at construction time (a grammar that fails to load or a
/// query that fails to compile); parsing a file never returns one.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to load grammar for {language}: {reason}")]
    GrammarLoadFailed { language: String, reason: String },

    #[error("Invalid {query} query for {language}: {reason}")]
    QueryCompileFailed {
        language: String,
        query: String,
        reason: String,
    },

    #[error("Invalid complexity pattern for {language}: {reason}")]
    PatternCompileFailed { language: String, reason: String },

    #[error("Failed to load tokenizer: {0}")]
    TokenizerLoadFailed(String),
}

/// Errors related to embedding generation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EmbeddingError {
    #[error("Failed to initialize embedding model: {0}")]
    InitializationFailed(String),

    /// Network blips, rate limits and server-side failures
    #[error("Transient embedding failure: {0}")]
    Transient(String),

    #[error("Embedding request rejected: {0}")]
    Permanent(String),

    #[error("Embedding service returned {actual} vectors for {expected} inputs")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Embedding generation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid embedding dimension: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Model lock was poisoned: {0}")]
    LockPoisoned(String),

    #[error("Embedding failed after {attempts} attempts: {last}")]
    RetriesExhausted { attempts: u32, last: String },
}

impl EmbeddingError {
    /// Whether a retry with backoff has a chance of succeeding
    pub fn is_retryable(&self) -> bool {
        matches!(self, EmbeddingError::Transient(_) | EmbeddingError::Timeout(_))
    }
}

/// Errors related to vector database operations
#[derive(Error, Debug)]
pub enum VectorDbError {
    #[error("Failed to connect to vector database: {0}")]
    ConnectionFailed(String),

    #[error("Failed to create table '{table}': {reason}")]
    TableCreationFailed { table: String, reason: String },

    #[error("Failed to store embeddings: {0}")]
    StoreFailed(String),

    #[error("Failed to search embeddings: {0}")]
    SearchFailed(String),

    #[error("Failed to delete embeddings: {0}")]
    DeleteFailed(String),

    #[error("Failed to get statistics: {0}")]
    StatisticsFailed(String),
}

/// Errors related to the persisted path -> digest map
#[derive(Error, Debug)]
pub enum StateError {
    #[error("Failed to load index state from '{path}': {reason}")]
    LoadFailed { path: String, reason: String },

    #[error("Failed to save index state to '{path}': {reason}")]
    SaveFailed { path: String, reason: String },

    #[error("Index state document is malformed: {0}")]
    Malformed(String),
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration file: {0}")]
    LoadFailed(String),

    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    #[error("Invalid configuration value for '{key}': {reason}")]
    InvalidValue { key: String, reason: String },

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

impl From<anyhow::Error> for ReviewContextError {
    fn from(err: anyhow::Error) -> Self {
        ReviewContextError::Other(format!("{:#}", err))
    }
}

impl ReviewContextError {
    pub fn other(msg: impl Into<String>) -> Self {
        ReviewContextError::Other(msg.into())
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ReviewContextError::Embedding(e) => e.is_retryable(),
            ReviewContextError::VectorDb(VectorDbError::ConnectionFailed(_)) => true,
            ReviewContextError::Io(_) => true,
            _ => false,
        }
    }
}
