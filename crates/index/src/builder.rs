use anyhow::{Context, Result};
use ingest::{Chunker, ChunkerConfig, ResumeRecord, collection_id};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::embeddings::EmbeddingProvider;
use crate::mapping::CollectionMapping;
use crate::pacing::Pacing;
use crate::vector_store::{Metadata, VectorStore};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_tokens: usize,
    pub num_chunks: usize,
    pub num_resumes: usize,
    /// Résumés longer than the embedding model's context
    pub truncated: usize,
    /// Records dropped because their name collides with an earlier one
    pub skipped: usize,
}

impl IndexStats {
    pub fn truncated_percent(&self) -> f64 {
        if self.num_resumes == 0 {
            0.0
        } else {
            self.truncated as f64 / self.num_resumes as f64 * 100.0
        }
    }
}

/// Uploads one collection per person and records where each person went.
pub struct ResumeIndexBuilder {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    overlap_tokens: usize,
    pacing: Pacing,
}

impl ResumeIndexBuilder {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        overlap_tokens: usize,
        pacing: Pacing,
    ) -> Self {
        Self {
            embedder,
            store,
            overlap_tokens,
            pacing,
        }
    }

    /// Index every record, in order. Nothing is rolled back on failure:
    /// collections uploaded before the error stay in the store.
    pub async fn build(
        &self,
        records: &[ResumeRecord],
    ) -> Result<(CollectionMapping, IndexStats)> {
        let tokenizer = self.embedder.tokenizer();
        let max_length = tokenizer.max_sequence_length();
        let chunker = Chunker::new(ChunkerConfig::for_tokenizer(tokenizer, self.overlap_tokens))
            .context("Invalid chunking parameters")?;

        let dimension = self.embedder.dimension().await?;
        info!(dimension, max_length, resumes = records.len(), "Building résumé index");

        let mut mapping = CollectionMapping::new();
        let mut stats = IndexStats::default();
        let mut claimed = HashSet::new();

        for record in records {
            let collection = collection_id(&record.person_name);

            if !claimed.insert(collection.clone()) {
                warn!(
                    person = %record.person_name,
                    collection = %collection,
                    "Name collides with an earlier résumé, skipping"
                );
                stats.skipped += 1;
                continue;
            }
            mapping.insert(&record.person_name, &collection);

            let handle = self
                .store
                .create_or_get_collection(&collection, dimension)
                .await?;

            let num_tokens = tokenizer.count_model_tokens(&record.raw_text)?;
            stats.total_tokens += num_tokens;
            stats.num_resumes += 1;

            if num_tokens > max_length {
                warn!(
                    person = %record.person_name,
                    tokens = num_tokens,
                    max_length,
                    "Résumé exceeds the model's token limit"
                );
                stats.truncated += 1;
            }

            let chunks = chunker.chunk_text(tokenizer, &collection, &record.raw_text)?;

            for chunk in &chunks {
                let embedding = self
                    .embedder
                    .embed(&chunk.text)
                    .await
                    .context("Failed to generate embedding")?;

                let metadata = Metadata::from([
                    ("text".to_string(), json!(chunk.text)),
                    ("person_name".to_string(), json!(record.person_name)),
                    ("chunk_index".to_string(), json!(chunk.index)),
                ]);

                self.store
                    .upsert(&handle, &chunk.chunk_id, embedding, metadata)
                    .await
                    .with_context(|| format!("Failed to upload {}", chunk.chunk_id))?;
            }
            stats.num_chunks += chunks.len();

            info!(collection = %collection, chunks = chunks.len(), "Uploaded résumé");
            self.pacing.wait().await;
        }

        info!(
            resumes = stats.num_resumes,
            chunks = stats.num_chunks,
            truncated = stats.truncated,
            truncated_percent = %format!("{:.1}", stats.truncated_percent()),
            skipped = stats.skipped,
            "Index build finished"
        );

        Ok((mapping, stats))
    }

    /// Build, then write the mapping once at the end of the batch.
    pub async fn build_and_save(
        &self,
        records: &[ResumeRecord],
        mapping_path: &Path,
    ) -> Result<IndexStats> {
        let (mapping, stats) = self.build(records).await?;
        mapping.save(mapping_path).await?;
        info!(path = ?mapping_path, entries = mapping.len(), "Saved collection mapping");
        Ok(stats)
    }

    /// Drop every collection whose name starts with `prefix`.
    pub async fn purge_collections(&self, prefix: &str) -> Result<Vec<String>> {
        let mut deleted = Vec::new();

        for name in self.store.list_collections().await? {
            if name.starts_with(prefix) {
                self.store.delete_collection(&name).await?;
                deleted.push(name);
            }
        }

        if deleted.is_empty() {
            info!(prefix, "No collections to delete");
        }
        Ok(deleted)
    }
}
