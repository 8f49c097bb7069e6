use agent::{Agent, AgentConfig, OllamaChat, load_system_prompt};
use anyhow::Result;
use index::{
    OllamaEmbedder, Pacing, QdrantStore, ResumeIndexBuilder, RetryPolicy, VectorStore,
};
use ingest::HfTokenizer;
use query::Retriever;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::AppConfig;

/// Upstream services probed by `/health`
#[derive(Debug, Clone)]
pub struct HealthTargets {
    pub ollama_url: String,
    pub qdrant_url: String,
}

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<Agent>,
    pub builder: Arc<ResumeIndexBuilder>,
    pub store: Arc<dyn VectorStore>,
    pub mapping_path: PathBuf,
    pub health: HealthTargets,
    /// Held by index builds and purges so they never interleave
    pub maintenance: Arc<Mutex<()>>,
}

impl AppState {
    /// Wire the Ollama and Qdrant clients described by `config`.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let retry = RetryPolicy::new(&config.retry);

        let tokenizer = HfTokenizer::from_file(
            &config.index.tokenizer_path,
            config.index.max_sequence_length,
        )?;
        let embedder = Arc::new(
            OllamaEmbedder::new(
                config.ollama.base_url.clone(),
                config.ollama.embedding_model.clone(),
                Arc::new(tokenizer),
            )
            .with_retry(retry.clone()),
        );
        let store: Arc<dyn VectorStore> = Arc::new(QdrantStore::new(config.qdrant.base_url.clone()));

        let builder = Arc::new(ResumeIndexBuilder::new(
            embedder.clone(),
            store.clone(),
            config.index.overlap_tokens,
            Pacing::from_millis(config.index.upload_pacing_ms),
        ));

        let retriever = Retriever::new(embedder, store.clone(), config.index.mapping_path.clone())
            .with_top_k(config.agent.top_k);

        let chat = OllamaChat::new(
            config.ollama.base_url.clone(),
            config.ollama.chat_model.clone(),
        )
        .with_temperature(config.ollama.temperature)
        .with_retry(retry);

        let agent_config = AgentConfig {
            max_turns: config.agent.max_turns,
            system_prompt: load_system_prompt(config.agent.system_prompt_path.as_deref()).await?,
            action_pacing: Pacing::from_millis(config.agent.action_pacing_ms),
        };

        Ok(Self {
            agent: Arc::new(Agent::new(Arc::new(chat), Arc::new(retriever), agent_config)),
            builder,
            store,
            mapping_path: config.index.mapping_path.clone(),
            health: HealthTargets {
                ollama_url: config.ollama.base_url.clone(),
                qdrant_url: config.qdrant.base_url.clone(),
            },
            maintenance: Arc::new(Mutex::new(())),
        })
    }
}
