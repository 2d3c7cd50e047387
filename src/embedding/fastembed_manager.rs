use super::EmbeddingProvider;
use crate::error::EmbeddingError;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Mutex;

/// FastEmbed-based local embedding provider
pub struct FastEmbedManager {
    model: Mutex<TextEmbedding>,
    dimension: usize,
    name: String,
}

impl FastEmbedManager {
    /// Create a new FastEmbedManager with the default model (all-MiniLM-L6-v2)
    pub fn new() -> Result<Self, EmbeddingError> {
        Self::with_model(EmbeddingModel::AllMiniLML6V2)
    }

    /// Resolve a configured model name such as "all-MiniLM-L6-v2"
    pub fn from_model_name(name: &str) -> Result<Self, EmbeddingError> {
        let model = match name.to_ascii_lowercase().trim_start_matches("sentence-transformers/") {
            "all-minilm-l6-v2" => EmbeddingModel::AllMiniLML6V2,
            "all-minilm-l12-v2" => EmbeddingModel::AllMiniLML12V2,
            "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            "bge-base-en-v1.5" => EmbeddingModel::BGEBaseENV15,
            other => {
                return Err(EmbeddingError::InitializationFailed(format!(
                    "unsupported local model '{other}'"
                )));
            }
        };
        Self::with_model(model)
    }

    /// Create a new FastEmbedManager with a specific model
    pub fn with_model(model: EmbeddingModel) -> Result<Self, EmbeddingError> {
        tracing::info!("Initializing FastEmbed model: {:?}", model);

        let (dimension, name) = match model {
            EmbeddingModel::AllMiniLML6V2 => (384, "all-MiniLM-L6-v2"),
            EmbeddingModel::AllMiniLML12V2 => (384, "all-MiniLM-L12-v2"),
            EmbeddingModel::BGEBaseENV15 => (768, "bge-base-en-v1.5"),
            EmbeddingModel::BGESmallENV15 => (384, "bge-small-en-v1.5"),
            _ => (384, "unknown"),
        };

        let mut options = InitOptions::default();
        options.model_name = model;
        options.show_download_progress = true;

        let embedding_model = TextEmbedding::try_new(options)
            .map_err(|e| EmbeddingError::InitializationFailed(format!("{:#}", e)))?;

        Ok(Self {
            model: Mutex::new(embedding_model),
            dimension,
            name: name.to_string(),
        })
    }
}

impl EmbeddingProvider for FastEmbedManager {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        tracing::debug!("Generating embeddings for {} texts", texts.len());

        let mut model = self
            .model
            .lock()
            .map_err(|e| EmbeddingError::LockPoisoned(e.to_string()))?;
        // Local inference failures are not network related; retrying won't help
        let embeddings = model
            .embed(texts.to_vec(), None)
            .map_err(|e| EmbeddingError::Permanent(format!("{:#}", e)))?;

        if embeddings.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: embeddings.len(),
            });
        }
        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_name_rejected() {
        let err = FastEmbedManager::from_model_name("definitely-not-a-model")
            .err()
            .unwrap();
        assert!(matches!(err, EmbeddingError::InitializationFailed(_)));
    }

    #[test]
    #[ignore = "downloads the ONNX model"]
    fn test_embedding_generation() {
        let manager = FastEmbedManager::new().unwrap();
        let texts = vec![
            "fn main() { println!(\"Hello, world!\"); }".to_string(),
            "pub struct Vector { x: f32, y: f32 }".to_string(),
        ];

        let embeddings = manager.embed_batch(&texts).unwrap();
        assert_eq!(embeddings.len(), 2);
        assert_eq!(embeddings[0].len(), 384);
        assert_eq!(manager.model_name(), "all-MiniLM-L6-v2");
    }

    #[test]
    #[ignore = "downloads the ONNX model"]
    fn test_empty_batch() {
        let manager = FastEmbedManager::new().unwrap();
        assert!(manager.embed_batch(&[]).unwrap().is_empty());
    }

    #[test]
    #[ignore = "downloads the ONNX model"]
    fn test_with_model_bge_base() {
        let manager = FastEmbedManager::from_model_name("bge-base-en-v1.5").unwrap();
        assert_eq!(manager.dimension(), 768);
    }
}
