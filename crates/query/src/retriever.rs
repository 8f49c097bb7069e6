use anyhow::{Context, Result};
use async_trait::async_trait;
use index::{CollectionHandle, CollectionMapping, EmbeddingProvider, VectorStore};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_TOP_K: usize = 2;

/// Résumé lookups the agent can dispatch to.
#[async_trait]
pub trait ResumeSearch: Send + Sync {
    /// Passages from one person's résumé, or a not-found message.
    async fn lookup(&self, person_name: &str) -> Result<String>;

    /// Comma-separated names, looked up one after another and joined by newlines.
    async fn lookup_multi(&self, names_csv: &str) -> Result<String> {
        let mut results = Vec::new();
        for name in names_csv.split(',').map(str::trim) {
            results.push(self.lookup(name).await?);
        }
        Ok(results.join("\n"))
    }
}

pub fn not_found_message(person_name: &str) -> String {
    format!("No se encontró un índice para '{}'.", person_name)
}

pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    mapping_path: PathBuf,
    top_k: usize,
}

impl Retriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        mapping_path: PathBuf,
    ) -> Self {
        Self {
            embedder,
            store,
            mapping_path,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Top `top_k` chunks of the person's résumé, newline-joined.
    ///
    /// The mapping is re-read on every call so a rebuilt index is picked up
    /// without restarting. The query vector is the embedding of the name.
    pub async fn lookup_top_k(&self, person_name: &str, top_k: usize) -> Result<String> {
        info!(person = person_name, top_k, "Looking up résumé");

        let mapping = CollectionMapping::load(&self.mapping_path).await?;

        let Some(collection) = mapping.resolve(person_name) else {
            debug!(person = person_name, "No collection for name");
            return Ok(not_found_message(person_name));
        };

        let query_embedding = self
            .embedder
            .embed(person_name)
            .await
            .context("Failed to embed query")?;

        let matches = self
            .store
            .query(&CollectionHandle::new(collection), query_embedding, top_k)
            .await
            .context("Failed to search vector store")?;

        debug!(collection, matches = matches.len(), "Retrieved chunks");

        Ok(matches
            .iter()
            .map(|m| m.text())
            .collect::<Vec<_>>()
            .join("\n"))
    }
}

#[async_trait]
impl ResumeSearch for Retriever {
    async fn lookup(&self, person_name: &str) -> Result<String> {
        self.lookup_top_k(person_name, self.top_k).await
    }
}
