use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use std::sync::Arc;
use std::time::Duration;

/// Retries transient failures of an inner provider with exponential backoff.
///
/// Attempt `n` (1-based) that fails transiently sleeps `base * 2^(n-1)` before
/// the next one. Permanent failures are returned immediately.
pub struct RetryingEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    max_attempts: u32,
    base_delay: Duration,
}

impl RetryingEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(1u32 << (attempt - 1).min(16))
    }
}

impl EmbeddingProvider for RetryingEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut attempt = 1;
        loop {
            match self.inner.embed_batch(texts) {
                Ok(vectors) => return Ok(vectors),
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(EmbeddingError::RetriesExhausted {
                        attempts: attempt,
                        last: e.to_string(),
                    });
                }
                Err(e) => {
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        "Embedding attempt {}/{} failed: {}; retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        e,
                        delay
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
            }
        }
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
