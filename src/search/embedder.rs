//! Embedder trait and implementations
//!
//! Provides abstraction over the embedding providers:
//! - OpenAiEmbedder: OpenAI embeddings API (text-embedding-3-large, 3072d)
//! - HtpEmbedder: Harmonic Token Projection (built-in, offline, 384d)
//!
//! Providers never retry; a failed call surfaces as an [`EmbeddingError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::embedding::{EmbeddingModel, EMBEDDING_DIM};
use crate::core::config::{Config, EmbedderBackend};
use crate::error::EmbeddingError;

/// Embedding model abstraction
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Generate embeddings for multiple texts, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Get embedding dimension
    fn dimension(&self) -> usize;

    /// Get model name/identifier
    fn name(&self) -> &str;
}

// ============================================================================
// HTP Embedder
// ============================================================================

/// HTP (Harmonic Token Projection) Embedder wrapper
#[derive(Debug, Default)]
pub struct HtpEmbedder {
    model: EmbeddingModel,
}

impl HtpEmbedder {
    pub fn new() -> Self {
        Self {
            model: EmbeddingModel::new(),
        }
    }
}

#[async_trait]
impl Embedder for HtpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(self.model.embed(text))
    }

    fn dimension(&self) -> usize {
        EMBEDDING_DIM
    }

    fn name(&self) -> &str {
        "htp-384"
    }
}

// ============================================================================
// OpenAI Embedder
// ============================================================================

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// OpenAI embeddings API client
pub struct OpenAiEmbedder {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    dimension: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_key: String, base_url: &str, model: String, dimension: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model,
            dimension,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, EmbeddingError> {
        let openai = &config.openai;
        let api_key = openai
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| EmbeddingError::Config("OPENAI_API_KEY is not set".to_string()))?;

        Ok(Self::new(
            api_key,
            &openai.base_url,
            openai.embedding_model.clone(),
            openai.dimension,
        ))
    }

    async fn request(&self, input: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        debug!(model = %self.model, inputs = input.len(), "requesting embeddings");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&EmbedRequest {
                model: &self.model,
                input,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let mut parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::Decode(e.to_string()))?;

        if parsed.data.len() != input.len() {
            return Err(EmbeddingError::Decode(format!(
                "expected {} embeddings, got {}",
                input.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index.unwrap_or(0));
        parsed
            .data
            .into_iter()
            .map(|d| {
                if d.embedding.len() == self.dimension {
                    Ok(d.embedding)
                } else {
                    Err(EmbeddingError::DimensionMismatch {
                        expected: self.dimension,
                        actual: d.embedding.len(),
                    })
                }
            })
            .collect()
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let input = [text.to_string()];
        self.request(&input)
            .await?
            .pop()
            .ok_or_else(|| EmbeddingError::Decode("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Factory function
// ============================================================================

/// Create embedder based on configuration
pub fn create_embedder(config: &Config) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    match config.backend.embedder {
        EmbedderBackend::OpenAi => Ok(Arc::new(OpenAiEmbedder::from_config(config)?)),
        EmbedderBackend::Htp => Ok(Arc::new(HtpEmbedder::new())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_htp_embedder() {
        let embedder = HtpEmbedder::new();

        let emb = embedder.embed("hello world").await.unwrap();
        assert_eq!(emb.len(), embedder.dimension());
        assert_eq!(embedder.name(), "htp-384");

        let batch = embedder
            .embed_batch(&["hello world".to_string(), "villa".to_string()])
            .await
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], emb);
    }

    #[test]
    fn test_create_embedder_htp() {
        let mut config = Config::default();
        config.backend.embedder = EmbedderBackend::Htp;
        let embedder = create_embedder(&config).unwrap();

        assert_eq!(embedder.dimension(), 384);
        assert_eq!(embedder.name(), "htp-384");
    }

    #[test]
    fn test_openai_requires_api_key() {
        let mut config = Config::default();
        config.openai.api_key = None;
        let err = OpenAiEmbedder::from_config(&config).err().unwrap();
        assert!(matches!(err, EmbeddingError::Config(_)));
    }

    #[test]
    fn test_openai_endpoint() {
        let embedder = OpenAiEmbedder::new(
            "sk-test".to_string(),
            "https://api.openai.com/v1/",
            "text-embedding-3-large".to_string(),
            3072,
        );
        assert_eq!(embedder.endpoint, "https://api.openai.com/v1/embeddings");
        assert_eq!(embedder.dimension(), 3072);
        assert_eq!(embedder.name(), "text-embedding-3-large");
    }
}
