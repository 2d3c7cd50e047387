use super::EmbeddingProvider;
use crate::config::EmbeddingConfig;
use crate::error::EmbeddingError;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Remote embeddings over an OpenAI-compatible `/embeddings` endpoint
pub struct HttpEmbedder {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

impl HttpEmbedder {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        model: impl Into<String>,
        dimension: usize,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .timeout(timeout)
            .user_agent(concat!("review-context/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| EmbeddingError::InitializationFailed(e.to_string()))?;

        Ok(Self {
            client,
            url: format!("{}/embeddings", base_url.trim_end_matches('/')),
            api_key,
            model: model.into(),
            dimension,
        })
    }

    /// Reads the API key from the environment variable named in the config
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.is_empty());
        if api_key.is_none() {
            tracing::warn!(
                "{} is not set; sending embedding requests without credentials",
                config.api_key_env
            );
        }
        Self::new(
            &config.api_url,
            api_key,
            config.model_name.clone(),
            config.dimension,
            config.request_timeout(),
        )
    }
}

/// Rate limits and server errors may clear up; other client errors won't
fn classify_status(status: StatusCode, body: &str) -> EmbeddingError {
    let msg = format!("status {status}: {}", body.chars().take(200).collect::<String>());
    if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
        EmbeddingError::Transient(msg)
    } else {
        EmbeddingError::Permanent(msg)
    }
}

impl EmbeddingProvider for HttpEmbedder {
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut request = self.client.post(&self.url).json(&EmbeddingRequest {
            input: texts,
            model: &self.model,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .map_err(|e| EmbeddingError::Transient(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .map_err(|e| EmbeddingError::Transient(e.to_string()))?;

        if !status.is_success() {
            tracing::error!("Embedding API error {status}");
            return Err(classify_status(status, &body));
        }

        let mut parsed: EmbeddingResponse = serde_json::from_str(&body)
            .map_err(|e| EmbeddingError::Permanent(format!("malformed response: {e}")))?;
        if parsed.data.len() != texts.len() {
            return Err(EmbeddingError::CountMismatch {
                expected: texts.len(),
                actual: parsed.data.len(),
            });
        }
        parsed.data.sort_by_key(|d| d.index.unwrap_or(usize::MAX));

        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
