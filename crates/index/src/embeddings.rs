use anyhow::{Context, Result};
use async_trait::async_trait;
use ingest::Tokenizer;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::retry::RetryPolicy;

/// Text embedding model plus the tokenizer it was trained with.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn tokenizer(&self) -> &dyn Tokenizer;

    /// Vector length, probed with a throwaway embedding.
    async fn dimension(&self) -> Result<usize> {
        let probe = self.embed("test").await?;
        Ok(probe.len())
    }
}

#[derive(Clone)]
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    client: reqwest::Client,
    tokenizer: Arc<dyn Tokenizer>,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedder {
    pub const DEFAULT_MODEL: &'static str = "all-minilm";

    pub fn new(base_url: String, model: String, tokenizer: Arc<dyn Tokenizer>) -> Self {
        Self {
            base_url,
            model,
            client: reqwest::Client::new(),
            tokenizer,
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);

        let request = EmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request")?;

        if !response.status().is_success() {
            anyhow::bail!("Embedding request failed: {}", response.status());
        }

        let embedding_response: EmbeddingResponse = response
            .json()
            .await
            .context("Failed to parse embedding response")?;

        if embedding_response.embedding.is_empty() {
            anyhow::bail!("Model '{}' returned an empty embedding", self.model);
        }

        Ok(embedding_response.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.retry
            .retry("embed", || self.request_embedding(text))
            .await
    }

    fn tokenizer(&self) -> &dyn Tokenizer {
        self.tokenizer.as_ref()
    }
}
