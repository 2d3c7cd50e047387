//! Text embedding providers
//!
//! Providers are synchronous; async callers run them on the blocking pool.

mod fastembed_manager;
mod http_embedder;
mod retry;

pub use fastembed_manager::FastEmbedManager;
pub use http_embedder::HttpEmbedder;
pub use retry::RetryingEmbedder;

use crate::config::{EmbeddingConfig, EmbeddingProviderKind};
use crate::error::EmbeddingError;
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation
pub trait EmbeddingProvider: Send + Sync {
    /// Generate one vector per input text, in input order
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Get the dimension of the embeddings
    fn dimension(&self) -> usize;

    /// Get the model name
    fn model_name(&self) -> &str;
}

/// Build the configured provider, wrapped with retry and backoff
pub fn from_config(config: &EmbeddingConfig) -> Result<Arc<dyn EmbeddingProvider>, EmbeddingError> {
    let inner: Arc<dyn EmbeddingProvider> = match config.provider {
        EmbeddingProviderKind::Fastembed => {
            Arc::new(FastEmbedManager::from_model_name(&config.model_name)?)
        }
        EmbeddingProviderKind::Http => Arc::new(HttpEmbedder::from_config(config)?),
    };
    tracing::info!(
        "Using {} embeddings ({} dimensions)",
        inner.model_name(),
        inner.dimension()
    );
    Ok(Arc::new(RetryingEmbedder::new(
        inner,
        config.max_attempts,
        Duration::from_millis(config.retry_base_delay_ms),
    )))
}
