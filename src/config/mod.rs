/// Configuration system for review-context
///
/// Supports loading from multiple sources with priority:
/// Environment variables > Config file > Defaults
use crate::error::{ConfigError, ReviewContextError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const ENV_PREFIX: &str = "REVIEW_CONTEXT_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub vector_db: VectorDbConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub context: ContextConfig,

    #[serde(default)]
    pub indexing: IndexingConfig,
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorDbConfig {
    /// LanceDB data directory path
    #[serde(default = "default_lancedb_path")]
    pub lancedb_path: PathBuf,

    /// Table name for chunk vectors
    #[serde(default = "default_collection_name")]
    pub collection_name: String,
}

/// Which embedding backend produces vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Local ONNX model via fastembed
    Fastembed,
    /// OpenAI-compatible `/embeddings` endpoint
    Http,
}

/// Embedding model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: EmbeddingProviderKind,

    /// Model name (e.g., "all-MiniLM-L6-v2", "text-embedding-3-small")
    #[serde(default = "default_model_name")]
    pub model_name: String,

    /// Batch size for embedding generation
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Timeout in seconds for one embedding batch, retries included
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Total attempts per batch, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before the second attempt; doubles after each failure
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,

    /// Base URL of the HTTP provider (the `/embeddings` path is appended)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Name of the environment variable holding the HTTP provider's API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Vector width reported by the HTTP provider's model
    #[serde(default = "default_http_dimension")]
    pub dimension: usize,
}

impl EmbeddingConfig {
    /// Sum of the backoff sleeps between `max_attempts` attempts
    pub fn total_backoff(&self) -> Duration {
        let base = Duration::from_millis(self.retry_base_delay_ms);
        (1..self.max_attempts.max(1))
            .map(|attempt| base.saturating_mul(1u32 << (attempt - 1).min(16)))
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Deadline for a single provider request, sized so that every attempt
    /// and every backoff fits inside `timeout_secs`
    pub fn request_timeout(&self) -> Duration {
        let budget = Duration::from_secs(self.timeout_secs).saturating_sub(self.total_backoff());
        (budget / self.max_attempts.max(1)).max(Duration::from_secs(1))
    }
}

/// Token limits used when splitting code units into chunks
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Units at or below this size are stored whole
    #[serde(default = "default_max_chunk_tokens")]
    pub max_chunk_tokens: usize,

    /// Cap on the signature prefix repeated in every window
    #[serde(default = "default_signature_tokens")]
    pub signature_tokens: usize,

    #[serde(default = "default_window_tokens")]
    pub window_tokens: usize,

    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

/// Review context assembly
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Token ceiling for the assembled context block
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Similar chunks retrieved per changed unit
    #[serde(default = "default_similar_per_unit")]
    pub similar_per_unit: usize,
}

/// Indexing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexingConfig {
    /// Persisted path -> digest map
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,

    /// Maximum file size to index (in bytes)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Glob patterns skipped during repository walks
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

// Default value functions
fn default_lancedb_path() -> PathBuf {
    crate::paths::PlatformPaths::default_lancedb_path()
}

fn default_collection_name() -> String {
    "code_chunks".to_string()
}

fn default_provider() -> EmbeddingProviderKind {
    EmbeddingProviderKind::Fastembed
}

fn default_model_name() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_embedding_timeout() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    500
}

fn default_api_url() -> String {
    "https://models.inference.ai.azure.com".to_string()
}

fn default_api_key_env() -> String {
    "GITHUB_TOKEN".to_string()
}

fn default_http_dimension() -> usize {
    1536
}

fn default_max_chunk_tokens() -> usize {
    1500
}

fn default_signature_tokens() -> usize {
    100
}

fn default_window_tokens() -> usize {
    1000
}

fn default_overlap_tokens() -> usize {
    200
}

fn default_token_budget() -> usize {
    8000
}

fn default_similar_per_unit() -> usize {
    2
}

fn default_state_path() -> PathBuf {
    crate::paths::PlatformPaths::default_state_path()
}

fn default_max_file_size() -> usize {
    1_048_576 // 1 MB
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "target/**".to_string(),
        "node_modules/**".to_string(),
        "dist/**".to_string(),
        "build/**".to_string(),
        "vendor/**".to_string(),
    ]
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            lancedb_path: default_lancedb_path(),
            collection_name: default_collection_name(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model_name: default_model_name(),
            batch_size: default_batch_size(),
            timeout_secs: default_embedding_timeout(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            api_url: default_api_url(),
            api_key_env: default_api_key_env(),
            dimension: default_http_dimension(),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: default_max_chunk_tokens(),
            signature_tokens: default_signature_tokens(),
            window_tokens: default_window_tokens(),
            overlap_tokens: default_overlap_tokens(),
        }
    }
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            similar_per_unit: default_similar_per_unit(),
        }
    }
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self {
            state_path: default_state_path(),
            max_file_size: default_max_file_size(),
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

fn invalid(key: &str, reason: impl Into<String>) -> ReviewContextError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.into(),
    }
    .into()
}

impl Config {
    /// Load configuration from file
    pub fn from_file(path: &Path) -> Result<Self, ReviewContextError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadFailed(format!("Failed to read {}: {}", path.display(), e))
        })?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseFailed(format!("Invalid TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default location or create default
    pub fn load_or_default() -> Result<Self, ReviewContextError> {
        let config_path = crate::paths::PlatformPaths::default_config_path();

        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            Self::from_file(&config_path)
        } else {
            tracing::debug!("No config file found, using defaults");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<(), ReviewContextError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::SaveFailed(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::SaveFailed(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ReviewContextError> {
        if self.vector_db.collection_name.trim().is_empty() {
            return Err(invalid("vector_db.collection_name", "must not be empty"));
        }

        if self.embedding.batch_size == 0 {
            return Err(invalid("embedding.batch_size", "must be greater than 0"));
        }

        if self.embedding.max_attempts == 0 {
            return Err(invalid("embedding.max_attempts", "must be at least 1"));
        }

        if self.embedding.total_backoff() >= Duration::from_secs(self.embedding.timeout_secs) {
            return Err(invalid(
                "embedding.timeout_secs",
                format!(
                    "must exceed the total retry backoff ({:?})",
                    self.embedding.total_backoff()
                ),
            ));
        }

        if self.embedding.provider == EmbeddingProviderKind::Http && self.embedding.dimension == 0 {
            return Err(invalid("embedding.dimension", "must be greater than 0"));
        }

        let chunking = &self.chunking;
        if chunking.max_chunk_tokens == 0 || chunking.window_tokens == 0 {
            return Err(invalid(
                "chunking",
                "max_chunk_tokens and window_tokens must be greater than 0",
            ));
        }

        if chunking.overlap_tokens >= chunking.window_tokens {
            return Err(invalid(
                "chunking.overlap_tokens",
                format!(
                    "must be smaller than window_tokens ({}), got {}",
                    chunking.window_tokens, chunking.overlap_tokens
                ),
            ));
        }

        if chunking.signature_tokens >= chunking.max_chunk_tokens {
            return Err(invalid(
                "chunking.signature_tokens",
                format!(
                    "must be smaller than max_chunk_tokens ({}), got {}",
                    chunking.max_chunk_tokens, chunking.signature_tokens
                ),
            ));
        }

        if self.context.token_budget == 0 {
            return Err(invalid("context.token_budget", "must be greater than 0"));
        }

        if self.indexing.max_file_size == 0 {
            return Err(invalid("indexing.max_file_size", "must be greater than 0"));
        }

        Ok(())
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        let var = |name: &str| std::env::var(format!("{}{}", ENV_PREFIX, name)).ok();

        if let Some(path) = var("LANCEDB_PATH") {
            self.vector_db.lancedb_path = PathBuf::from(path);
        }

        if let Some(path) = var("STATE_PATH") {
            self.indexing.state_path = PathBuf::from(path);
        }

        if let Some(provider) = var("EMBEDDING_PROVIDER") {
            match provider.to_lowercase().as_str() {
                "fastembed" => self.embedding.provider = EmbeddingProviderKind::Fastembed,
                "http" => self.embedding.provider = EmbeddingProviderKind::Http,
                other => tracing::warn!("Ignoring unknown embedding provider '{}'", other),
            }
        }

        if let Some(model) = var("MODEL") {
            self.embedding.model_name = model;
        }

        if let Some(url) = var("EMBEDDING_URL") {
            self.embedding.api_url = url;
        }

        if let Some(size) = var("BATCH_SIZE").and_then(|v| v.parse().ok()) {
            self.embedding.batch_size = size;
        }

        if let Some(budget) = var("TOKEN_BUDGET").and_then(|v| v.parse().ok()) {
            self.context.token_budget = budget;
        }
    }

    /// Create a new Config with defaults and environment overrides
    pub fn new() -> Result<Self, ReviewContextError> {
        let mut config = Self::load_or_default()?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }
}
