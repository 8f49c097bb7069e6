use anyhow::{Context, Result};
use async_trait::async_trait;
use index::RetryPolicy;
use serde::{Deserialize, Serialize};

use crate::message::{Message, TokenUsage};

pub const DEFAULT_TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// Chat model that continues a transcript.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, messages: &[Message]) -> Result<Completion>;
}

#[derive(Clone)]
pub struct OllamaChat {
    base_url: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ChatMessage,
    #[serde(default)]
    prompt_eval_count: u64,
    #[serde(default)]
    eval_count: u64,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl OllamaChat {
    pub const DEFAULT_MODEL: &'static str = "llama3";

    pub fn new(base_url: String, model: String) -> Self {
        Self {
            base_url,
            model,
            temperature: DEFAULT_TEMPERATURE,
            client: reqwest::Client::new(),
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn chat(&self, messages: &[Message]) -> Result<Completion> {
        let url = format!("{}/api/chat", self.base_url);

        let request = ChatRequest {
            model: &self.model,
            messages,
            stream: false,
            options: ChatOptions {
                temperature: self.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Ollama")?;

        if !response.status().is_success() {
            anyhow::bail!("Ollama request failed: {}", response.status());
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse Ollama response")?;

        Ok(Completion {
            text: chat_response.message.content,
            usage: TokenUsage::new(chat_response.prompt_eval_count, chat_response.eval_count),
        })
    }
}

#[async_trait]
impl CompletionService for OllamaChat {
    async fn complete(&self, messages: &[Message]) -> Result<Completion> {
        self.retry.retry("chat", || self.chat(messages)).await
    }
}
