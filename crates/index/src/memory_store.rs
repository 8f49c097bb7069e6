use anyhow::{Context, Result};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::vector_store::{
    CollectionHandle, Metadata, VectorMatch, VectorStore, cosine_similarity,
};

struct StoredPoint {
    vector: Vec<f32>,
    metadata: Metadata,
}

struct Collection {
    dimension: usize,
    points: BTreeMap<String, StoredPoint>,
}

/// Brute-force cosine search held in process memory.
#[derive(Default)]
pub struct InMemoryVectorStore {
    collections: Mutex<BTreeMap<String, Collection>>,
    queries: AtomicUsize,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `query` calls served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }

    pub fn point_ids(&self, collection: &str) -> Vec<String> {
        let collections = self.lock();
        collections
            .get(collection)
            .map(|c| c.points.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Collection>> {
        // A poisoned map is still structurally valid
        self.collections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn create_or_get_collection(
        &self,
        name: &str,
        dimension: usize,
    ) -> Result<CollectionHandle> {
        let mut collections = self.lock();
        let collection = collections.entry(name.to_string()).or_insert_with(|| Collection {
            dimension,
            points: BTreeMap::new(),
        });

        if collection.dimension != dimension {
            anyhow::bail!(
                "Collection '{}' has dimension {}, requested {}",
                name,
                collection.dimension,
                dimension
            );
        }

        Ok(CollectionHandle::new(name))
    }

    async fn upsert(
        &self,
        collection: &CollectionHandle,
        id: &str,
        vector: Vec<f32>,
        metadata: Metadata,
    ) -> Result<()> {
        let mut collections = self.lock();
        let stored = collections
            .get_mut(&collection.name)
            .with_context(|| format!("Unknown collection '{}'", collection.name))?;

        if vector.len() != stored.dimension {
            anyhow::bail!(
                "Vector of length {} does not fit collection '{}' ({})",
                vector.len(),
                collection.name,
                stored.dimension
            );
        }

        stored
            .points
            .insert(id.to_string(), StoredPoint { vector, metadata });
        Ok(())
    }

    async fn query(
        &self,
        collection: &CollectionHandle,
        vector: Vec<f32>,
        top_k: usize,
    ) -> Result<Vec<VectorMatch>> {
        self.queries.fetch_add(1, Ordering::Relaxed);

        let collections = self.lock();
        let stored = collections
            .get(&collection.name)
            .with_context(|| format!("Unknown collection '{}'", collection.name))?;

        let mut matches: Vec<VectorMatch> = stored
            .points
            .iter()
            .map(|(id, point)| VectorMatch {
                id: id.clone(),
                score: cosine_similarity(&vector, &point.vector),
                metadata: point.metadata.clone(),
            })
            .collect();

        matches.sort_by(|a, b| b.score.total_cmp(&a.score));
        matches.truncate(top_k);
        Ok(matches)
    }

    async fn list_collections(&self) -> Result<Vec<String>> {
        Ok(self.lock().keys().cloned().collect())
    }

    async fn delete_collection(&self, name: &str) -> Result<()> {
        self.lock().remove(name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn metadata(text: &str) -> Metadata {
        Metadata::from([("text".to_string(), json!(text))])
    }

    #[tokio::test]
    async fn test_query_ranks_by_cosine() {
        let store = InMemoryVectorStore::new();
        let handle = store.create_or_get_collection("cv-ana", 2).await.unwrap();

        store.upsert(&handle, "a", vec![1.0, 0.0], metadata("east")).await.unwrap();
        store.upsert(&handle, "b", vec![0.0, 1.0], metadata("north")).await.unwrap();
        store.upsert(&handle, "c", vec![0.7, 0.7], metadata("north-east")).await.unwrap();

        let matches = store.query(&handle, vec![0.1, 1.0], 2).await.unwrap();

        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].text(), "north");
        assert_eq!(matches[1].text(), "north-east");
        assert_eq!(store.query_count(), 1);
    }

    #[tokio::test]
    async fn test_collection_lifecycle() {
        let store = InMemoryVectorStore::new();
        let handle = store.create_or_get_collection("cv-ana", 3).await.unwrap();

        // Reusing keeps existing points
        store.upsert(&handle, "p", vec![1.0, 2.0, 3.0], Metadata::new()).await.unwrap();
        store.create_or_get_collection("cv-ana", 3).await.unwrap();
        assert_eq!(store.point_ids("cv-ana"), vec!["p"]);

        assert!(store.create_or_get_collection("cv-ana", 4).await.is_err());
        assert!(store.upsert(&handle, "q", vec![1.0], Metadata::new()).await.is_err());

        store.delete_collection("cv-ana").await.unwrap();
        assert!(store.list_collections().await.unwrap().is_empty());
    }
}
