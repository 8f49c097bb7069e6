use anyhow::{Context, Result};
use index::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Path to an optional JSON config file
pub const CONFIG_PATH_VAR: &str = "RESUME_CHAT_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub ollama: OllamaConfig,
    pub qdrant: QdrantConfig,
    pub index: IndexConfig,
    pub agent: AgentSettings,
    pub retry: RetryConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub base_url: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QdrantConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub mapping_path: PathBuf,
    /// HuggingFace tokenizer.json matching the embedding model
    pub tokenizer_path: PathBuf,
    pub max_sequence_length: usize,
    pub overlap_tokens: usize,
    pub upload_pacing_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentSettings {
    pub max_turns: usize,
    pub top_k: usize,
    pub action_pacing_ms: u64,
    pub system_prompt_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            chat_model: agent::OllamaChat::DEFAULT_MODEL.to_string(),
            embedding_model: index::OllamaEmbedder::DEFAULT_MODEL.to_string(),
            temperature: agent::llm::DEFAULT_TEMPERATURE,
        }
    }
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:6333".to_string(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            mapping_path: PathBuf::from("data/mapping.json"),
            tokenizer_path: PathBuf::from("models/all-MiniLM-L6-v2/tokenizer.json"),
            max_sequence_length: 512,
            overlap_tokens: ingest::DEFAULT_OVERLAP_TOKENS,
            upload_pacing_ms: 1000,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_turns: agent::session::DEFAULT_MAX_TURNS,
            top_k: query::DEFAULT_TOP_K,
            action_pacing_ms: agent::session::DEFAULT_ACTION_PACING.as_millis() as u64,
            system_prompt_path: None,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:3000".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the JSON file named by `RESUME_CHAT_CONFIG`, then
    /// environment variables (a `.env` file is honoured).
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let mut config = match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_json(
                &std::fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file '{path}'"))?,
            )?,
            Err(_) => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Invalid configuration file")
    }

    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("OLLAMA_URL") {
            self.ollama.base_url = v;
        }
        if let Some(v) = lookup("CHAT_MODEL") {
            self.ollama.chat_model = v;
        }
        if let Some(v) = lookup("EMBEDDING_MODEL") {
            self.ollama.embedding_model = v;
        }
        if let Some(v) = lookup("QDRANT_URL") {
            self.qdrant.base_url = v;
        }
        if let Some(v) = lookup("TOKENIZER_PATH") {
            self.index.tokenizer_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MAPPING_PATH") {
            self.index.mapping_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("MAX_TURNS") {
            self.agent.max_turns = v
                .parse()
                .context("MAX_TURNS must be a non-negative integer")?;
        }
        if let Some(v) = lookup("BIND_ADDR") {
            self.server.bind_addr = v;
        }

        self.validate()
    }

    pub fn validate(&self) -> Result<()> {
        if self.index.overlap_tokens >= self.index.max_sequence_length {
            anyhow::bail!(
                "index.overlap_tokens ({}) must be smaller than index.max_sequence_length ({})",
                self.index.overlap_tokens,
                self.index.max_sequence_length
            );
        }
        if self.agent.top_k == 0 {
            anyhow::bail!("agent.top_k must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.agent.max_turns, 5);
        assert_eq!(config.agent.top_k, 2);
        assert_eq!(config.agent.action_pacing_ms, 2000);
        assert_eq!(config.index.overlap_tokens, 20);
        assert!((config.ollama.temperature - 0.7).abs() < f32::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = AppConfig::from_json(r#"{"agent": {"max_turns": 3}, "qdrant": {"base_url": "http://qdrant:6333"}}"#)
            .unwrap();

        assert_eq!(config.agent.max_turns, 3);
        assert_eq!(config.agent.top_k, 2);
        assert_eq!(config.qdrant.base_url, "http://qdrant:6333");
        assert_eq!(config.server.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_env_overrides() {
        let env = HashMap::from([
            ("OLLAMA_URL", "http://ollama:11434"),
            ("MAPPING_PATH", "/tmp/mapping.json"),
            ("MAX_TURNS", "8"),
        ]);

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.ollama.base_url, "http://ollama:11434");
        assert_eq!(config.index.mapping_path, PathBuf::from("/tmp/mapping.json"));
        assert_eq!(config.agent.max_turns, 8);

        let bad = HashMap::from([("MAX_TURNS", "many")]);
        assert!(
            AppConfig::default()
                .apply_overrides(|key| bad.get(key).map(|v| v.to_string()))
                .is_err()
        );
    }

    #[test]
    fn test_rejects_overlap_wider_than_window() {
        let mut config = AppConfig::default();
        config.index.overlap_tokens = config.index.max_sequence_length;
        assert!(config.validate().is_err());
    }
}
